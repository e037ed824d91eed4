// src/extract/chrome.rs
// =============================================================================
// Headless Chromium engine, compiled with `--features chrome`.
//
// Each session launches its own browser process. chromiumoxide splits a
// browser into two halves:
// - Browser: the handle we send commands through
// - Handler: a stream of CDP events that must be polled or nothing happens
// We poll the handler on a background task and stop it when the session closes.
//
// A Browser has no async Drop, so close() must be called explicitly. The
// extractor does that on every exit path.
// =============================================================================

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::engine::{ExtractError, RenderEngine, RenderSession, RenderedPage};

#[derive(Debug, Clone)]
pub struct ChromeEngine {
    executable: Option<PathBuf>,
    // Upper bound for a single CDP request, navigation included
    request_timeout: Duration,
}

impl ChromeEngine {
    pub fn new(executable: Option<PathBuf>, request_timeout: Duration) -> Self {
        Self {
            executable,
            request_timeout,
        }
    }
}

#[async_trait]
impl RenderEngine for ChromeEngine {
    fn name(&self) -> &'static str {
        "chrome"
    }

    async fn open_session(&self) -> Result<Box<dyn RenderSession>, ExtractError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .request_timeout(self.request_timeout);
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(ExtractError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ExtractError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("browser handler stopped: {}", e);
                    break;
                }
            }
        });

        Ok(Box::new(ChromeSession {
            browser: Some(browser),
            handler_task,
            request_timeout: self.request_timeout,
        }))
    }
}

struct ChromeSession {
    browser: Option<Browser>,
    handler_task: JoinHandle<()>,
    request_timeout: Duration,
}

#[async_trait]
impl RenderSession for ChromeSession {
    async fn render(&mut self, url: &str) -> Result<RenderedPage, ExtractError> {
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| ExtractError::EngineCrash("browser already closed".to_string()))?;

        // new_page navigates and returns once the frame has loaded its
        // document; we do not wait for network idle.
        let page = browser
            .new_page(url)
            .await
            .map_err(|e| categorize_error(url, self.request_timeout, e))?;

        let html = page
            .content()
            .await
            .map_err(|e| categorize_error(url, self.request_timeout, e))?;
        let final_url = page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| url.to_string());

        Ok(RenderedPage {
            url: final_url,
            html,
        })
    }

    async fn close(&mut self) -> Result<(), ExtractError> {
        let Some(mut browser) = self.browser.take() else {
            return Ok(());
        };

        let closed = browser.close().await;
        // Reap the child process even when the close command failed
        if let Err(e) = browser.wait().await {
            tracing::warn!("failed to reap browser process: {}", e);
        }
        self.handler_task.abort();

        closed
            .map(|_| ())
            .map_err(|e| ExtractError::EngineCrash(e.to_string()))
    }
}

fn categorize_error(url: &str, timeout: Duration, error: CdpError) -> ExtractError {
    match error {
        CdpError::Timeout => ExtractError::Timeout(timeout),
        CdpError::Ws(e) => ExtractError::EngineCrash(e.to_string()),
        CdpError::Io(e) => ExtractError::EngineCrash(e.to_string()),
        other => ExtractError::Navigation {
            url: url.to_string(),
            reason: other.to_string(),
        },
    }
}
