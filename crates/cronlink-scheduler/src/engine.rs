use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cronlink_core::schedule;
use dashmap::DashMap;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::{
    error::{Result, SchedulerError},
    types::EntryId,
};

/// Work attached to a cron entry. Runs on its own Tokio task each time the
/// entry comes due.
#[async_trait]
pub trait CronJob: Send + Sync {
    async fn run(&self);
}

struct CronEntry {
    expression: String,
    schedule: schedule::Schedule,
    next_run: DateTime<Utc>,
    job: Arc<dyn CronJob>,
}

struct Inner {
    entries: DashMap<EntryId, CronEntry>,
    next_id: AtomicU64,
    started: AtomicBool,
    poll_interval: Duration,
}

/// In-memory cron engine: a table of entries plus a dispatcher that polls
/// it at ±1 s precision.
///
/// Cheap to clone; clones share the same table. Adding and removing entries
/// is safe while the dispatcher is running.
#[derive(Clone)]
pub struct CronEngine {
    inner: Arc<Inner>,
}

impl Default for CronEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CronEngine {
    pub fn new() -> Self {
        Self::with_poll_interval(Duration::from_secs(1))
    }

    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: DashMap::new(),
                next_id: AtomicU64::new(0),
                started: AtomicBool::new(false),
                poll_interval,
            }),
        }
    }

    /// Register `job` to run on `expression`. Returns the entry handle.
    pub fn add(&self, expression: &str, job: Arc<dyn CronJob>) -> Result<EntryId> {
        let parsed = schedule::parse(expression)?;
        let next_run = parsed
            .next_after(Utc::now())
            .ok_or_else(|| SchedulerError::Exhausted(expression.to_string()))?;
        let id = EntryId(self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1);

        self.inner.entries.insert(
            id,
            CronEntry {
                expression: expression.to_string(),
                schedule: parsed,
                next_run,
                job,
            },
        );
        debug!(entry = %id, %expression, %next_run, "cron entry added");
        Ok(id)
    }

    /// Remove an entry. Returns false when the handle is unknown.
    pub fn remove(&self, id: EntryId) -> bool {
        match self.inner.entries.remove(&id) {
            Some((_, entry)) => {
                debug!(entry = %id, expression = %entry.expression, "cron entry removed");
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    pub fn next_run(&self, id: EntryId) -> Option<DateTime<Utc>> {
        self.inner.entries.get(&id).map(|e| e.next_run)
    }

    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst)
    }

    /// Spawn the dispatcher loop. Calling this more than once has no effect.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let engine = self.clone();
        tokio::spawn(async move { engine.run().await });
    }

    async fn run(self) {
        info!(poll_ms = self.inner.poll_interval.as_millis() as u64, "cron engine started");
        let mut interval = tokio::time::interval(self.inner.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            self.fire_due(Utc::now());
        }
    }

    /// Fire every entry whose `next_run` is at or before `now`.
    ///
    /// Each due entry advances to its first occurrence after `now` (missed
    /// occurrences are not replayed) and its job is spawned on a separate
    /// task, so a slow or panicking job never stalls the dispatcher.
    /// Returns the number of jobs spawned.
    pub fn fire_due(&self, now: DateTime<Utc>) -> usize {
        let mut due: Vec<(EntryId, Arc<dyn CronJob>)> = Vec::new();
        let mut exhausted: Vec<EntryId> = Vec::new();

        // Collect under the shard locks, spawn after they are released.
        for mut entry in self.inner.entries.iter_mut() {
            if entry.next_run > now {
                continue;
            }
            let id = *entry.key();
            due.push((id, Arc::clone(&entry.job)));
            match entry.schedule.next_after(now) {
                Some(next) => entry.next_run = next,
                None => exhausted.push(id),
            }
        }

        for id in exhausted {
            warn!(entry = %id, "cron entry has no upcoming run, removing");
            self.inner.entries.remove(&id);
        }

        let fired = due.len();
        for (id, job) in due {
            debug!(entry = %id, "cron entry due");
            tokio::spawn(async move { job.run().await });
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    struct CountingJob {
        runs: AtomicUsize,
        notify: Notify,
    }

    impl CountingJob {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                runs: AtomicUsize::new(0),
                notify: Notify::new(),
            })
        }
    }

    #[async_trait]
    impl CronJob for CountingJob {
        async fn run(&self) {
            self.runs.fetch_add(1, Ordering::SeqCst);
            self.notify.notify_one();
        }
    }

    #[test]
    fn add_computes_next_run_in_the_future() {
        let engine = CronEngine::new();
        let before = Utc::now();
        let id = engine.add("* * * * *", CountingJob::new()).unwrap();
        assert!(engine.next_run(id).unwrap() > before);
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn add_rejects_invalid_expression() {
        let engine = CronEngine::new();
        let err = engine.add("every tuesday", CountingJob::new()).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidSchedule(_)));
        assert!(engine.is_empty());
    }

    #[test]
    fn handles_are_unique() {
        let engine = CronEngine::new();
        let a = engine.add("@hourly", CountingJob::new()).unwrap();
        let b = engine.add("@hourly", CountingJob::new()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn removing_unknown_or_removed_entry_is_noop() {
        let engine = CronEngine::new();
        let id = engine.add("@daily", CountingJob::new()).unwrap();
        assert!(engine.remove(id));
        assert!(!engine.remove(id));
        assert!(!engine.remove(EntryId(4242)));
        assert!(engine.is_empty());
    }

    #[tokio::test]
    async fn fire_due_runs_due_entries_and_advances() {
        let engine = CronEngine::new();
        let job = CountingJob::new();
        let id = engine.add("* * * * *", job.clone()).unwrap();

        // Nothing is due yet.
        assert_eq!(engine.fire_due(Utc::now() - chrono::Duration::minutes(5)), 0);

        let later = Utc::now() + chrono::Duration::minutes(3);
        assert_eq!(engine.fire_due(later), 1);
        job.notify.notified().await;
        assert_eq!(job.runs.load(Ordering::SeqCst), 1);

        // Missed minutes are skipped: the next run lands after `later`.
        assert!(engine.next_run(id).unwrap() > later);
        assert_eq!(engine.fire_due(later), 0);
    }

    #[tokio::test]
    async fn removed_entry_does_not_fire() {
        let engine = CronEngine::new();
        let job = CountingJob::new();
        let id = engine.add("* * * * *", job.clone()).unwrap();
        engine.remove(id);

        assert_eq!(engine.fire_due(Utc::now() + chrono::Duration::hours(1)), 0);
        assert_eq!(job.runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fire_due_uses_fixed_delay_for_every_entries() {
        let engine = CronEngine::new();
        let job = CountingJob::new();
        let id = engine.add("@every 30s", job.clone()).unwrap();

        let later = Utc::now() + chrono::Duration::minutes(1);
        assert_eq!(engine.fire_due(later), 1);
        job.notify.notified().await;

        let next = engine.next_run(id).unwrap();
        assert!(next > later);
        assert!(next <= later + chrono::Duration::seconds(30));
    }

    #[tokio::test]
    async fn started_dispatcher_fires_due_entries() {
        let engine = CronEngine::with_poll_interval(Duration::from_millis(10));
        let job = CountingJob::new();
        engine.add("@every 1s", job.clone()).unwrap();
        engine.start();

        tokio::time::timeout(Duration::from_secs(5), job.notify.notified())
            .await
            .expect("dispatcher should fire the entry within its interval");
        assert!(job.runs.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let engine = CronEngine::with_poll_interval(Duration::from_millis(10));
        assert!(!engine.is_started());
        engine.start();
        engine.start();
        assert!(engine.is_started());
    }
}
