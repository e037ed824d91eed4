// src/scheduler.rs
// =============================================================================
// Fires a job once right away and then every `interval`, forever.
//
// Every firing runs as its own tokio task. If a run is still going when the
// next firing comes due, the two simply overlap - each has its own retry
// bookkeeping and its own rendering sessions, so they share nothing mutable.
//
// There is no stop method: the scheduler ends when the process does.
// =============================================================================

use futures::future::BoxFuture;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

pub struct Scheduler {
    interval: Duration,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    // Runs forever. `job` receives the firing number, starting at 1.
    pub async fn run<F>(self, job: F)
    where
        F: Fn(u64) -> BoxFuture<'static, ()>,
    {
        let mut ticker = tokio::time::interval(self.interval);
        // After a stall (e.g. host suspend) fire once, then keep the cadence
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut firing: u64 = 0;
        loop {
            // The first tick completes immediately
            ticker.tick().await;
            firing += 1;

            tracing::debug!(firing, "scheduler firing");
            tokio::spawn(job(firing));
        }
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why tokio::time::interval instead of sleep in a loop?
//    - sleep(interval) after each run would drift by however long the
//      spawn took; an Interval keeps a fixed cadence from its start instant
//    - Its first tick() completes immediately, which gives us the
//      "run once at startup" behaviour for free
//
// 2. What is BoxFuture?
//    - futures::future::BoxFuture<'static, ()> is Pin<Box<dyn Future + Send>>
//    - Each call of the job closure returns a different future type; boxing
//      gives them one common type that tokio::spawn accepts
//    - .boxed() (from FutureExt) does the boxing
//
// 3. How do the tests control time?
//    - #[tokio::test(start_paused = true)] freezes the tokio clock
//    - tokio::time::advance() moves it forward by hand, so "one hour later"
//      takes microseconds of real time
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    // Lets spawned tasks run without moving the paused clock
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn counting_job(counter: Arc<AtomicU64>) -> impl Fn(u64) -> BoxFuture<'static, ()> {
        move |_firing| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_at_start_then_every_interval() {
        let interval = Duration::from_secs(3600);
        let fired = Arc::new(AtomicU64::new(0));
        tokio::spawn(Scheduler::new(interval).run(counting_job(fired.clone())));

        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        tokio::time::advance(interval - Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 2);

        tokio::time::advance(interval - Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 2);

        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_runs_overlap() {
        let interval = Duration::from_secs(10);
        let running = Arc::new(AtomicU64::new(0));
        let peak = Arc::new(AtomicU64::new(0));

        let job = {
            let running = running.clone();
            let peak = peak.clone();
            move |_firing: u64| {
                let running = running.clone();
                let peak = peak.clone();
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    // Each run takes three intervals
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                }
                .boxed()
            }
        };
        tokio::spawn(Scheduler::new(interval).run(job));

        settle().await;
        for _ in 0..3 {
            tokio::time::advance(interval).await;
            settle().await;
        }

        assert!(peak.load(Ordering::SeqCst) >= 3);
    }
}
