// src/retry.rs
// =============================================================================
// RetryingFetcher: bounded retries around a ListingSource.
//
// How a run's extraction works:
// 1. Start a fresh RunAttempt (attempt 0)
// 2. Call the source - every call opens a brand-new rendering session
// 3. Success (even with zero records) -> done
// 4. Failure -> count it, wait according to the backoff, try again
// 5. After max_attempts failures -> give up and return None
//
// Giving up is deliberately quiet: the caller just sees "no listings this
// time", the failure is logged and counted in RunStats.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use crate::extract::{ListingRecord, ListingSource};
use crate::stats::RunStats;

// How long to wait between a failed attempt and the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Retry immediately
    None,
    /// Always wait the same amount
    Fixed(Duration),
    /// base, 2*base, 4*base, ... capped at max
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    // Delay before retrying after `failures` failed attempts (1-based).
    pub fn delay_after(&self, failures: u32) -> Duration {
        match *self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { base, max } => {
                let exponent = failures.saturating_sub(1).min(31);
                base.saturating_mul(1u32 << exponent).min(max)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts = max_retries + 1
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff: Backoff::None,
        }
    }
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

// Bookkeeping for a single run. Created fresh on every scheduled firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunAttempt {
    pub attempt_number: u32,
    pub max_attempts: u32,
}

impl RunAttempt {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempt_number: 0,
            max_attempts,
        }
    }

    pub fn exhausted(&self) -> bool {
        self.attempt_number >= self.max_attempts
    }
}

pub struct RetryingFetcher {
    source: Arc<dyn ListingSource>,
    policy: RetryPolicy,
    stats: Arc<RunStats>,
}

impl RetryingFetcher {
    pub fn new(source: Arc<dyn ListingSource>, policy: RetryPolicy, stats: Arc<RunStats>) -> Self {
        Self {
            source,
            policy,
            stats,
        }
    }

    // Fetches the listings at `url`, retrying transient failures.
    //
    // Returns:
    //   Some(records) from the first attempt that succeeded
    //   None if every attempt failed
    pub async fn fetch(&self, url: &str) -> Option<Vec<ListingRecord>> {
        let mut attempt = RunAttempt::new(self.policy.max_attempts());

        while !attempt.exhausted() {
            match self.source.fetch_listings(url).await {
                Ok(records) => {
                    if attempt.attempt_number > 0 {
                        tracing::info!(
                            failures = attempt.attempt_number,
                            "extraction recovered after retrying"
                        );
                    }
                    return Some(records);
                }
                Err(e) => {
                    attempt.attempt_number += 1;
                    self.stats.record_failed_attempt();
                    tracing::warn!(
                        attempt = attempt.attempt_number,
                        max_attempts = attempt.max_attempts,
                        "extraction attempt failed: {}",
                        e
                    );

                    if !attempt.exhausted() {
                        let delay = self.policy.backoff.delay_after(attempt.attempt_number);
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }
        }

        self.stats.record_exhausted();
        tracing::error!(
            attempts = attempt.attempt_number,
            "giving up on {} for this run, no digest will be sent",
            url
        );
        None
    }
}
