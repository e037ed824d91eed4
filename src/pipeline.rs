// src/pipeline.rs
// =============================================================================
// One "run": fetch listings (with retries) -> build digest -> notify.
//
// A run never returns an error. Exhausted retries end it quietly; delivery
// problems are logged by the notifier's background task. Whatever happens,
// the scheduler keeps going.
// =============================================================================

use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::digest::DigestFormatter;
use crate::notify::Notifier;
use crate::retry::RetryingFetcher;
use crate::stats::RunStats;

pub struct Pipeline {
    target_url: String,
    fetcher: RetryingFetcher,
    formatter: DigestFormatter,
    notifier: Notifier,
    stats: Arc<RunStats>,
}

// How a run ended
#[derive(Debug)]
pub enum RunOutcome {
    /// A digest was handed to the notifier; `delivery` finishes once the
    /// outcome of the send has been logged
    Notified { listings: usize, delivery: JoinHandle<()> },
    /// Every extraction attempt failed; nothing was sent
    Exhausted,
}

impl Pipeline {
    pub fn new(
        target_url: impl Into<String>,
        fetcher: RetryingFetcher,
        formatter: DigestFormatter,
        notifier: Notifier,
        stats: Arc<RunStats>,
    ) -> Self {
        Self {
            target_url: target_url.into(),
            fetcher,
            formatter,
            notifier,
            stats,
        }
    }

    pub async fn run_once(&self, firing: u64) -> RunOutcome {
        self.stats.record_run_started();
        tracing::info!(firing, "run started for {}", self.target_url);

        let outcome = match self.fetcher.fetch(&self.target_url).await {
            Some(records) => {
                if let Ok(json) = serde_json::to_string(&records) {
                    tracing::debug!(firing, "listings: {}", json);
                }

                let digest = self.formatter.format(&records, Utc::now());
                tracing::info!(
                    firing,
                    listings = records.len(),
                    generated_at = %digest.generated_at,
                    subject = %digest.subject,
                    "digest built"
                );

                let delivery = self.notifier.notify(&digest);
                self.stats.record_notified();
                RunOutcome::Notified {
                    listings: records.len(),
                    delivery,
                }
            }
            None => RunOutcome::Exhausted,
        };

        let stats = self.stats.snapshot();
        tracing::info!(
            firing,
            runs_started = stats.runs_started,
            runs_notified = stats.runs_notified,
            runs_exhausted = stats.runs_exhausted,
            failed_attempts = stats.failed_attempts,
            records_skipped = stats.records_skipped,
            "run finished"
        );

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{ExtractError, ListingRecord, ListingSource};
    use crate::notify::{Mailbox, RecordingTransport};
    use crate::retry::RetryPolicy;
    use async_trait::async_trait;
    use chrono::FixedOffset;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // Source that fails a fixed number of times, then returns `records`
    struct FlakySource {
        failures: usize,
        records: Vec<ListingRecord>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ListingSource for FlakySource {
        async fn fetch_listings(&self, _url: &str) -> Result<Vec<ListingRecord>, ExtractError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(ExtractError::Navigation {
                    url: "https://example.com/jobs".to_string(),
                    reason: "HTTP 502".to_string(),
                })
            } else {
                Ok(self.records.clone())
            }
        }
    }

    fn record(title: &str) -> ListingRecord {
        ListingRecord {
            title: title.to_string(),
            employment_type: "Gig".to_string(),
            url: format!("https://example.com/job/{}", title),
            compensation: "$10/hr".to_string(),
            posted_meta: "Posted today".to_string(),
        }
    }

    fn pipeline(
        source: Arc<FlakySource>,
        transport: Arc<RecordingTransport>,
        stats: Arc<RunStats>,
    ) -> Pipeline {
        let offset = FixedOffset::east_opt(8 * 3600).unwrap();
        Pipeline::new(
            "https://example.com/jobs",
            RetryingFetcher::new(source, RetryPolicy::default(), stats.clone()),
            DigestFormatter::new("Jobs", offset, true),
            Notifier::new(
                transport,
                Mailbox::new("bot@example.com", None),
                vec![Mailbox::new("jane@example.com", None)],
                "Latest postings.",
            ),
            stats,
        )
    }

    fn source(failures: usize, records: Vec<ListingRecord>) -> Arc<FlakySource> {
        Arc::new(FlakySource {
            failures,
            records,
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_exhausted_run_sends_nothing() {
        let source = source(usize::MAX, vec![]);
        let transport = RecordingTransport::with_status(200);
        let stats = Arc::new(RunStats::default());

        let outcome = pipeline(source.clone(), transport.clone(), stats.clone())
            .run_once(1)
            .await;

        assert!(matches!(outcome, RunOutcome::Exhausted));
        assert_eq!(source.calls.load(Ordering::SeqCst), 6);
        assert!(transport.sent.lock().unwrap().is_empty());
        assert_eq!(stats.snapshot().runs_exhausted, 1);
        assert_eq!(stats.snapshot().runs_notified, 0);
    }

    #[tokio::test]
    async fn test_empty_extraction_still_notifies() {
        let source = source(0, vec![]);
        let transport = RecordingTransport::with_status(200);

        let outcome = pipeline(source, transport.clone(), Arc::default()).run_once(1).await;

        let RunOutcome::Notified { listings, delivery } = outcome else {
            panic!("expected a notification");
        };
        delivery.await.unwrap();

        assert_eq!(listings, 0);
        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].html_part.is_empty());
        assert!(sent[0].subject.starts_with("Jobs - "));
    }

    #[tokio::test]
    async fn test_recovered_run_sends_records_in_order() {
        let source = source(2, vec![record("A"), record("B"), record("C")]);
        let transport = RecordingTransport::with_status(200);

        let outcome = pipeline(source.clone(), transport.clone(), Arc::default())
            .run_once(7)
            .await;

        let RunOutcome::Notified { listings, delivery } = outcome else {
            panic!("expected a notification");
        };
        delivery.await.unwrap();

        assert_eq!(listings, 3);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        let html = transport.sent.lock().unwrap()[0].html_part.clone();
        let a = html.find("https://example.com/job/A").unwrap();
        let b = html.find("https://example.com/job/B").unwrap();
        let c = html.find("https://example.com/job/C").unwrap();
        assert!(a < b && b < c);
    }

    #[tokio::test]
    async fn test_rejected_delivery_does_not_fail_the_run() {
        let source = source(0, vec![record("A")]);
        let transport = RecordingTransport::with_status(500);
        let stats = Arc::new(RunStats::default());

        let outcome = pipeline(source, transport.clone(), stats.clone()).run_once(1).await;

        let RunOutcome::Notified { delivery, .. } = outcome else {
            panic!("expected a notification");
        };
        delivery.await.unwrap();
        assert_eq!(transport.sent.lock().unwrap().len(), 1);
        assert_eq!(stats.snapshot().runs_notified, 1);
    }
}
