// src/extract/engine.rs
// =============================================================================
// This module defines the "rendering engine" seam of the extractor.
//
// A rendering engine hands out sessions. A session loads exactly one page and
// gives back the DOM as HTML text. Every extraction attempt opens its own
// session and closes it afterwards, so nothing (cookies, connections, browser
// tabs) leaks from one attempt into the next.
//
// Engines shipped here:
// - HttpEngine: plain GET with a fresh reqwest client per session
// - ChromeEngine (feature "chrome"): headless Chromium, see chrome.rs
//
// Rust concepts:
// - Traits: RenderEngine / RenderSession are the interface, engines implement it
// - async-trait: lets us put async fns in traits and use them as trait objects
// - thiserror: derives Display/Error for our error enum
// =============================================================================

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

// Everything that can go wrong while loading the page as a whole.
//
// Per-record problems (a listing missing a field) are NOT errors - those
// records are skipped by the parser. Only whole-page failures end up here,
// and all of them are considered transient by the retrying fetcher.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The engine could not start a session (browser failed to launch, etc.)
    #[error("failed to start rendering session: {0}")]
    Launch(String),

    /// The target URL itself is not a valid absolute URL
    #[error("invalid target url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// DNS, connection, TLS or HTTP-status failure while navigating
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// The page did not become DOM-ready within the wait timeout
    #[error("timed out after {0:?} waiting for the page to render")]
    Timeout(Duration),

    /// The engine process/connection died mid-render
    #[error("rendering engine crashed: {0}")]
    EngineCrash(String),
}

// A page after rendering: where we ended up (after redirects) and its DOM.
//
// The final URL matters because relative listing links must be resolved
// against the page they were found on.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub url: String,
    pub html: String,
}

// Starts isolated rendering sessions.
#[async_trait]
pub trait RenderEngine: Send + Sync {
    /// Short name used in logs ("http", "chrome", ...)
    fn name(&self) -> &'static str;

    /// Allocates a brand-new session. Callers own it and must close it.
    async fn open_session(&self) -> Result<Box<dyn RenderSession>, ExtractError>;
}

// One isolated page-loading context (a client, a browser process, a tab).
#[async_trait]
pub trait RenderSession: Send {
    /// Navigates to `url` and returns the DOM once it is ready.
    ///
    /// "Ready" means the DOM exists - we do not wait for network idle.
    async fn render(&mut self, url: &str) -> Result<RenderedPage, ExtractError>;

    /// Releases the session's resources. Must be safe to call after a
    /// failed render.
    async fn close(&mut self) -> Result<(), ExtractError>;
}

// Renders pages with a plain HTTP GET.
//
// The response body IS the DOM here: scripts are not executed. That is good
// enough for pages whose listing markup is server-rendered, and it needs no
// browser binary on the host.
#[derive(Debug, Clone)]
pub struct HttpEngine {
    request_timeout: Duration,
}

impl HttpEngine {
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }
}

#[async_trait]
impl RenderEngine for HttpEngine {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn open_session(&self) -> Result<Box<dyn RenderSession>, ExtractError> {
        // A new client per session: its own connection pool, nothing shared
        // with earlier attempts.
        let client = Client::builder()
            .timeout(self.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(concat!("job-digest/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ExtractError::Launch(e.to_string()))?;

        Ok(Box::new(HttpSession {
            client: Some(client),
            timeout: self.request_timeout,
        }))
    }
}

struct HttpSession {
    // None once the session has been closed
    client: Option<Client>,
    timeout: Duration,
}

#[async_trait]
impl RenderSession for HttpSession {
    async fn render(&mut self, url: &str) -> Result<RenderedPage, ExtractError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| ExtractError::EngineCrash("session already closed".to_string()))?;

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| categorize_error(url, self.timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::Navigation {
                url: url.to_string(),
                reason: format!("HTTP {}", status.as_u16()),
            });
        }

        let final_url = response.url().to_string();
        let html = response
            .text()
            .await
            .map_err(|e| categorize_error(url, self.timeout, e))?;

        Ok(RenderedPage {
            url: final_url,
            html,
        })
    }

    async fn close(&mut self) -> Result<(), ExtractError> {
        // Dropping the client tears down its connection pool
        self.client.take();
        Ok(())
    }
}

// Maps reqwest failures onto our taxonomy.
//
// Same idea as categorizing link-check failures: timeouts are their own
// bucket, everything else that happens on the way to the page is navigation.
fn categorize_error(url: &str, timeout: Duration, error: reqwest::Error) -> ExtractError {
    if error.is_timeout() {
        return ExtractError::Timeout(timeout);
    }

    let reason = if error.is_connect() {
        format!("connection failed: {}", error)
    } else if error.is_redirect() {
        "too many redirects".to_string()
    } else {
        error.to_string()
    };

    ExtractError::Navigation {
        url: url.to_string(),
        reason,
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why Box<dyn RenderSession>?
//    - Each engine has its own session type (HttpSession, ChromeSession)
//    - Returning a boxed trait object lets callers treat them all the same
//      without knowing which engine is configured
//
// 2. Why is close() separate from Drop?
//    - Drop cannot be async, but shutting down a browser means sending it a
//      command and waiting for the process to exit
//    - So the extractor calls close().await itself, on every path
// -----------------------------------------------------------------------------
