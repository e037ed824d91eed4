// src/extract/page.rs
// =============================================================================
// PageExtractor: one complete extraction attempt.
//
//   open session -> render target (bounded wait) -> close session -> parse
//
// The session is closed on every path, including render failures and
// timeouts, before the result is handed back.
// =============================================================================

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::engine::{ExtractError, RenderEngine, RenderedPage};
use super::listing::{parse_listings, ListingRecord};
use crate::stats::RunStats;

// Anything that can produce the listings for a URL.
//
// The retrying fetcher only knows about this trait, which keeps it testable
// with scripted fakes.
#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch_listings(&self, url: &str) -> Result<Vec<ListingRecord>, ExtractError>;
}

pub struct PageExtractor {
    engine: Arc<dyn RenderEngine>,
    wait_timeout: Duration,
    stats: Arc<RunStats>,
}

impl PageExtractor {
    pub fn new(
        engine: Arc<dyn RenderEngine>,
        wait_timeout: Duration,
        stats: Arc<RunStats>,
    ) -> Self {
        Self {
            engine,
            wait_timeout,
            stats,
        }
    }

    // Runs one extraction attempt against `url`.
    //
    // Returns the records in DOM order. Zero records is a success.
    pub async fn extract(&self, url: &str) -> Result<Vec<ListingRecord>, ExtractError> {
        // Validate before spending a session on it
        Url::parse(url).map_err(|e| ExtractError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let mut session = self.engine.open_session().await?;
        tracing::debug!(engine = self.engine.name(), "rendering session opened");

        let rendered = match tokio::time::timeout(self.wait_timeout, session.render(url)).await {
            Ok(result) => result,
            Err(_) => Err(ExtractError::Timeout(self.wait_timeout)),
        };

        // Teardown runs whatever happened above
        if let Err(e) = session.close().await {
            tracing::warn!(engine = self.engine.name(), "failed to close rendering session: {}", e);
        }

        let page = rendered?;
        self.parse(&page)
    }

    fn parse(&self, page: &RenderedPage) -> Result<Vec<ListingRecord>, ExtractError> {
        let page_url = Url::parse(&page.url).map_err(|e| ExtractError::InvalidUrl {
            url: page.url.clone(),
            reason: e.to_string(),
        })?;

        let parsed = parse_listings(&page.html, &page_url);
        if parsed.skipped > 0 {
            self.stats.record_skipped(parsed.skipped);
        }
        tracing::info!(
            records = parsed.records.len(),
            skipped = parsed.skipped,
            "extracted listings from {}",
            page.url
        );

        Ok(parsed.records)
    }
}

#[async_trait]
impl ListingSource for PageExtractor {
    async fn fetch_listings(&self, url: &str) -> Result<Vec<ListingRecord>, ExtractError> {
        self.extract(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::engine::RenderSession;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Copy)]
    enum Behaviour {
        Page(&'static str),
        Fail,
        Hang,
    }

    // Engine that counts sessions opened and closed
    struct FakeEngine {
        behaviour: Behaviour,
        opened: Arc<AtomicUsize>,
        closed: Arc<AtomicUsize>,
    }

    impl FakeEngine {
        fn new(behaviour: Behaviour) -> Self {
            Self {
                behaviour,
                opened: Arc::new(AtomicUsize::new(0)),
                closed: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    struct FakeSession {
        behaviour: Behaviour,
        closed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RenderEngine for FakeEngine {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn open_session(&self) -> Result<Box<dyn RenderSession>, ExtractError> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeSession {
                behaviour: self.behaviour,
                closed: self.closed.clone(),
            }))
        }
    }

    #[async_trait]
    impl RenderSession for FakeSession {
        async fn render(&mut self, url: &str) -> Result<RenderedPage, ExtractError> {
            match self.behaviour {
                Behaviour::Page(html) => Ok(RenderedPage {
                    url: url.to_string(),
                    html: html.to_string(),
                }),
                Behaviour::Fail => Err(ExtractError::EngineCrash("boom".to_string())),
                Behaviour::Hang => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
            }
        }

        async fn close(&mut self) -> Result<(), ExtractError> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    const PAGE: &str = r#"
        <div class="latest-job-post"><a href="/job/1">
          <h4 data-original-title="A">A</h4><span class="badge">Part Time</span>
          <p data-temp="x">Posted 2 hours ago</p><dl><dd class="col">$5/hr</dd></dl>
        </a></div>
        <div class="latest-job-post"><a href="/job/2">
          <h4 data-original-title="B">B</h4><span class="badge">Full Time</span>
        </a></div>"#;

    fn extractor(engine: &Arc<FakeEngine>, stats: Arc<RunStats>) -> PageExtractor {
        PageExtractor::new(engine.clone(), Duration::from_secs(5), stats)
    }

    #[tokio::test]
    async fn test_session_closed_after_success() {
        let engine = Arc::new(FakeEngine::new(Behaviour::Page(PAGE)));
        let stats = Arc::new(RunStats::default());

        let records = extractor(&engine, stats.clone())
            .extract("https://example.com/jobs")
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].url, "https://example.com/job/1");
        assert_eq!(stats.snapshot().records_skipped, 1);
        assert_eq!(engine.opened.load(Ordering::SeqCst), 1);
        assert_eq!(engine.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_session_closed_after_failure() {
        let engine = Arc::new(FakeEngine::new(Behaviour::Fail));

        let result = extractor(&engine, Arc::default())
            .extract("https://example.com/jobs")
            .await;

        assert!(matches!(result, Err(ExtractError::EngineCrash(_))));
        assert_eq!(engine.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_render_times_out_and_closes() {
        let engine = Arc::new(FakeEngine::new(Behaviour::Hang));

        let result = extractor(&engine, Arc::default())
            .extract("https://example.com/jobs")
            .await;

        assert!(matches!(result, Err(ExtractError::Timeout(_))));
        assert_eq!(engine.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_url_opens_no_session() {
        let engine = Arc::new(FakeEngine::new(Behaviour::Page(PAGE)));

        let result = extractor(&engine, Arc::default()).extract("not a url").await;

        assert!(matches!(result, Err(ExtractError::InvalidUrl { .. })));
        assert_eq!(engine.opened.load(Ordering::SeqCst), 0);
    }
}
