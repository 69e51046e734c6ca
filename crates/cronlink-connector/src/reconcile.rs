//! The poll-diff-apply loop.
//!
//! Every tick lists namespaces, lists and translates each namespace's
//! functions, diffs the result against the running set, and applies
//! removals before additions through the [`JobScheduler`]. The running set
//! is threaded through [`Reconciler::tick`] by value and rebuilt each tick.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use cronlink_core::{
    translate, CandidateIdentity, ConnectorError, FunctionRegistry, RegistryError,
    ScheduleCandidate,
};
use cronlink_scheduler::{EntryId, JobScheduler};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// A scheduled candidate and the handle needed to unschedule it.
#[derive(Debug, Clone)]
pub struct RunningEntry {
    pub candidate: ScheduleCandidate,
    pub entry: EntryId,
}

pub type RunningSet = Vec<RunningEntry>;

/// What one namespace needs changed.
#[derive(Debug, Default)]
pub struct Delta {
    pub to_add: Vec<ScheduleCandidate>,
    pub to_remove: Vec<RunningEntry>,
}

/// Compare the desired candidates of `namespace` with the running set.
///
/// Only running entries in `namespace` are considered for removal; entries of
/// other namespaces are left alone until their own namespace is listed.
pub fn diff(desired: &[ScheduleCandidate], running: &[RunningEntry], namespace: &str) -> Delta {
    let running_ids: HashSet<CandidateIdentity> = running
        .iter()
        .filter(|e| e.candidate.namespace == namespace)
        .map(|e| e.candidate.identity())
        .collect();
    let desired_ids: HashSet<CandidateIdentity> =
        desired.iter().map(ScheduleCandidate::identity).collect();

    let to_add = desired
        .iter()
        .filter(|c| !running_ids.contains(&c.identity()))
        .cloned()
        .collect();
    let to_remove = running
        .iter()
        .filter(|e| e.candidate.namespace == namespace)
        .filter(|e| !desired_ids.contains(&e.candidate.identity()))
        .cloned()
        .collect();

    Delta { to_add, to_remove }
}

/// Drives the scheduler from registry snapshots.
pub struct Reconciler<R, S> {
    registry: R,
    scheduler: S,
    topic: String,
    listing_timeout: Duration,
}

impl<R: FunctionRegistry, S: JobScheduler> Reconciler<R, S> {
    pub fn new(registry: R, scheduler: S, topic: impl Into<String>, listing_timeout: Duration) -> Self {
        Self {
            registry,
            scheduler,
            topic: topic.into(),
            listing_timeout,
        }
    }

    /// Tick every `interval`, forever. The first tick runs immediately.
    pub async fn run(&self, interval: Duration) {
        info!(
            interval_secs = interval.as_secs(),
            topic = %self.topic,
            "reconciliation loop started"
        );
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut running = RunningSet::new();
        loop {
            timer.tick().await;
            running = self.tick(running).await;
        }
    }

    /// One reconciliation pass. Never fails: errors are logged and scoped to
    /// the tick (namespace listing) or the namespace (function listing).
    pub async fn tick(&self, running: RunningSet) -> RunningSet {
        let namespaces = match self.bounded(self.registry.list_namespaces()).await {
            Ok(namespaces) => namespaces,
            Err(e) => {
                warn!(error = %e, code = e.code(), "couldn't list namespaces, skipping tick");
                return running;
            }
        };

        let mut running = running;
        for namespace in namespaces {
            running = self.reconcile_namespace(&namespace, running).await;
        }
        debug!(scheduled = running.len(), "tick complete");
        running
    }

    async fn reconcile_namespace(&self, namespace: &str, running: RunningSet) -> RunningSet {
        let functions = match self.bounded(self.registry.list_functions(namespace)).await {
            Ok(functions) => functions,
            Err(e) => {
                warn!(%namespace, error = %e, code = e.code(), "couldn't list functions, namespace skipped");
                return running;
            }
        };

        let desired: Vec<ScheduleCandidate> = functions
            .iter()
            .filter_map(|f| match translate(f, namespace, &self.topic) {
                Ok(candidate) => Some(candidate),
                Err(reason) => {
                    debug!(%namespace, %reason, "function not scheduled");
                    None
                }
            })
            .collect();

        let delta = diff(&desired, &running, namespace);

        for entry in &delta.to_remove {
            self.scheduler.unregister(entry.entry);
            info!(function = %entry.candidate, entry = %entry.entry, "deleted function");
        }

        let mut added = Vec::with_capacity(delta.to_add.len());
        for candidate in delta.to_add {
            match self.scheduler.register(&candidate) {
                Ok(entry) => {
                    info!(function = %candidate, %entry, "added new function");
                    added.push(RunningEntry { candidate, entry });
                }
                // Not in the running set, so the next tick retries it.
                Err(e) => warn!(function = %candidate, error = %e, "couldn't schedule function"),
            }
        }

        let removed: HashSet<EntryId> = delta.to_remove.iter().map(|e| e.entry).collect();
        running
            .into_iter()
            .filter(|e| !removed.contains(&e.entry))
            .chain(added)
            .collect()
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, ConnectorError>
    where
        F: Future<Output = Result<T, RegistryError>>,
    {
        match tokio::time::timeout(self.listing_timeout, call).await {
            Ok(result) => result.map_err(ConnectorError::from),
            Err(_) => Err(ConnectorError::Timeout {
                ms: self.listing_timeout.as_millis() as u64,
            }),
        }
    }
}
