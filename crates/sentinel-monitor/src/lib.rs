//! Invalidation monitor: a process-long component that polls the current
//! portfolio hash on a timer and, when it changes, flushes every cache
//! keyed by the previous hash. A single struct owns its config and fails
//! fast in `new()` (panics on an invalid config rather than deferring the
//! failure to first use); the timer thread and single check-and-invalidate
//! mutex are built from plain `std::thread`/`std::sync` — no async
//! runtime, matching the rest of the workspace.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use sentinel_core::PortfolioHash;
use sentinel_persistence::{EvaluationStore, RecommendationStore, SequenceStore};

/// Timing knobs for one monitor instance (default: one-minute cadence,
/// three retries ten seconds apart).
#[derive(Clone, Debug)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            retry_attempts: 3,
            retry_delay: Duration::from_secs(10),
        }
    }
}

impl MonitorConfig {
    fn validate(&self) -> Result<(), String> {
        if self.poll_interval.is_zero() {
            return Err("poll_interval must be positive".into());
        }
        if self.retry_attempts == 0 {
            return Err("retry_attempts must be at least 1".into());
        }
        Ok(())
    }
}

/// What happened on one check-and-invalidate cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvalidationOutcome {
    /// No prior hash was on record; it was stored and nothing was purged.
    FirstRun,
    /// The hash matched the one on record; nothing to do.
    Unchanged,
    /// The hash changed and every cache was purged successfully.
    Invalidated,
    /// The hash changed but purging failed on every retry attempt; the
    /// prior hash is kept on record so the next poll retries from scratch.
    RetriesExhausted,
}

/// A process-long portfolio-hash watcher. Owns the timer thread and the
/// single mutex that serializes check-and-invalidate cycles so only one
/// invalidation check executes at a time.
pub struct InvalidationMonitor {
    config: MonitorConfig,
    hash_source: Box<dyn Fn() -> PortfolioHash + Send + Sync>,
    sequences: Arc<dyn SequenceStore>,
    evaluations: Arc<dyn EvaluationStore>,
    recommendations: Arc<dyn RecommendationStore>,
    last_hash: Mutex<Option<PortfolioHash>>,
    check_lock: Mutex<()>,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl InvalidationMonitor {
    /// Build a monitor. `hash_source` is called once per poll to obtain the
    /// current portfolio hash — computing it requires live position/cash/
    /// universe data the monitor has no access to on its own, so the
    /// caller supplies it as a closure over its own collaborators.
    ///
    /// # Panics
    ///
    /// Panics if `config` fails validation (zero interval, zero retry
    /// budget). Fail-fast at construction, not at the first poll.
    #[track_caller]
    pub fn new(
        config: MonitorConfig,
        hash_source: impl Fn() -> PortfolioHash + Send + Sync + 'static,
        sequences: Arc<dyn SequenceStore>,
        evaluations: Arc<dyn EvaluationStore>,
        recommendations: Arc<dyn RecommendationStore>,
    ) -> Self {
        if let Err(msg) = config.validate() {
            panic!("invalid MonitorConfig: {msg}");
        }
        Self {
            config,
            hash_source: Box::new(hash_source),
            sequences,
            evaluations,
            recommendations,
            last_hash: Mutex::new(None),
            check_lock: Mutex::new(()),
            running: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
        }
    }

    /// Run one check-and-invalidate cycle synchronously. `start()` calls
    /// this once per `poll_interval` on its own thread; exposed directly so
    /// callers and tests can drive it deterministically without sleeping.
    pub fn check_once(&self) -> InvalidationOutcome {
        let _serialize = self.check_lock.lock().expect("check_lock poisoned");
        let current = (self.hash_source)();

        let previous = self.last_hash.lock().expect("last_hash poisoned").clone();
        match previous {
            None => {
                *self.last_hash.lock().expect("last_hash poisoned") = Some(current);
                InvalidationOutcome::FirstRun
            }
            Some(prev) if prev == current => InvalidationOutcome::Unchanged,
            Some(prev) => match self.invalidate_with_retry(&prev) {
                Ok(()) => {
                    *self.last_hash.lock().expect("last_hash poisoned") = Some(current);
                    InvalidationOutcome::Invalidated
                }
                Err(()) => {
                    log::error!(
                        "portfolio invalidation failed after {} attempt(s); keeping prior hash, will retry next poll",
                        self.config.retry_attempts
                    );
                    InvalidationOutcome::RetriesExhausted
                }
            },
        }
    }

    fn invalidate_with_retry(&self, hash: &PortfolioHash) -> Result<(), ()> {
        for attempt in 1..=self.config.retry_attempts {
            match self.purge_all(hash) {
                Ok(()) => return Ok(()),
                Err(err) => {
                    log::warn!("invalidation attempt {attempt}/{} failed: {err}", self.config.retry_attempts);
                    if attempt < self.config.retry_attempts {
                        std::thread::sleep(self.config.retry_delay);
                    }
                }
            }
        }
        Err(())
    }

    fn purge_all(&self, hash: &PortfolioHash) -> Result<(), sentinel_persistence::Error> {
        self.sequences.purge(&hash.0)?;
        self.evaluations.purge(&hash.0)?;
        self.recommendations.purge(&hash.0)?;
        Ok(())
    }

    /// Start the timer thread. Idempotent: calling `start()` on an already
    /// running monitor is a no-op.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let monitor = Arc::clone(self);
        let running = Arc::clone(&self.running);
        let interval = self.config.poll_interval;
        let join_handle = std::thread::spawn(move || {
            while running.load(Ordering::SeqCst) {
                monitor.check_once();
                std::thread::sleep(interval);
            }
        });
        *self.handle.lock().expect("handle mutex poisoned") = Some(join_handle);
    }

    /// Stop the timer thread. Idempotent: calling `stop()` on an already
    /// stopped (or never-started) monitor is a no-op.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.handle.lock().expect("handle mutex poisoned").take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_persistence::InMemoryStore;

    fn monitor_with_hash(hash: impl Fn() -> PortfolioHash + Send + Sync + 'static) -> (Arc<InMemoryStore>, InvalidationMonitor) {
        let store = Arc::new(InMemoryStore::new());
        let monitor = InvalidationMonitor::new(
            MonitorConfig {
                poll_interval: Duration::from_secs(60),
                retry_attempts: 3,
                retry_delay: Duration::from_millis(1),
            },
            hash,
            store.clone(),
            store.clone(),
            store.clone(),
        );
        (store, monitor)
    }

    #[test]
    #[should_panic(expected = "invalid MonitorConfig")]
    fn zero_interval_panics_at_construction() {
        let store = Arc::new(InMemoryStore::new());
        InvalidationMonitor::new(
            MonitorConfig {
                poll_interval: Duration::ZERO,
                retry_attempts: 3,
                retry_delay: Duration::from_secs(1),
            },
            || PortfolioHash("h".into()),
            store.clone(),
            store.clone(),
            store,
        );
    }

    #[test]
    fn first_run_stores_and_does_not_invalidate() {
        let (_store, monitor) = monitor_with_hash(|| PortfolioHash("h1".into()));
        assert_eq!(monitor.check_once(), InvalidationOutcome::FirstRun);
    }

    #[test]
    fn unchanged_hash_is_a_no_op() {
        let (_store, monitor) = monitor_with_hash(|| PortfolioHash("h1".into()));
        monitor.check_once();
        assert_eq!(monitor.check_once(), InvalidationOutcome::Unchanged);
    }

    #[test]
    fn changed_hash_purges_every_store() {
        use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
        let call = Arc::new(AtomicUsize::new(0));
        let call_clone = call.clone();
        let store = Arc::new(InMemoryStore::new());
        let monitor = InvalidationMonitor::new(
            MonitorConfig {
                poll_interval: Duration::from_secs(60),
                retry_attempts: 3,
                retry_delay: Duration::from_millis(1),
            },
            move || {
                let n = call_clone.fetch_add(1, AtomicOrdering::SeqCst);
                PortfolioHash(if n == 0 { "h1".into() } else { "h2".into() })
            },
            store.clone(),
            store.clone(),
            store.clone(),
        );

        use sentinel_persistence::RecommendationStore;
        let plan = sentinel_core::HolisticPlan::empty(0.5);
        RecommendationStore::put(&*store, "h1", &plan).unwrap();

        assert_eq!(monitor.check_once(), InvalidationOutcome::FirstRun);
        assert!(store.latest("h1").unwrap().is_some());
        assert_eq!(monitor.check_once(), InvalidationOutcome::Invalidated);
        assert!(store.latest("h1").unwrap().is_none(), "stale h1 cache should be purged once the hash moves to h2");
    }

    #[test]
    fn exhausted_retries_keep_the_old_hash() {
        use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
        let call = Arc::new(AtomicUsize::new(0));
        let call_clone = call.clone();
        let store = Arc::new(InMemoryStore::new());
        store.fail_next(10);
        let monitor = InvalidationMonitor::new(
            MonitorConfig {
                poll_interval: Duration::from_secs(60),
                retry_attempts: 2,
                retry_delay: Duration::from_millis(1),
            },
            move || {
                let n = call_clone.fetch_add(1, AtomicOrdering::SeqCst);
                PortfolioHash(if n == 0 { "h1".into() } else { "h2".into() })
            },
            store.clone(),
            store.clone(),
            store.clone(),
        );

        store.fail_next(0);
        assert_eq!(monitor.check_once(), InvalidationOutcome::FirstRun);
        store.fail_next(10);
        assert_eq!(monitor.check_once(), InvalidationOutcome::RetriesExhausted);
        // Next poll still sees the stale hash and retries from scratch.
        store.fail_next(0);
        assert_eq!(monitor.check_once(), InvalidationOutcome::Invalidated);
    }

    #[test]
    fn start_stop_are_idempotent() {
        let (_store, monitor) = monitor_with_hash(|| PortfolioHash("h1".into()));
        let monitor = Arc::new(monitor);
        monitor.start();
        monitor.start();
        monitor.stop();
        monitor.stop();
    }
}
