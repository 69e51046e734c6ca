use std::sync::Arc;

use async_trait::async_trait;
use cronlink_core::{FunctionInvoker, ScheduleCandidate};
use tracing::{debug, info};

use crate::{
    engine::{CronEngine, CronJob},
    error::Result,
    types::EntryId,
};

/// The scheduling operations the reconciliation loop relies on.
pub trait JobScheduler: Send + Sync {
    /// Schedule `candidate`; the returned handle is the only way to remove it.
    fn register(&self, candidate: &ScheduleCandidate) -> Result<EntryId>;

    /// Remove a previously registered entry. Unknown handles are ignored.
    fn unregister(&self, id: EntryId);
}

/// Binds schedule candidates to the cron engine.
///
/// Holds no table of its own: the engine keeps the entries and the caller
/// keeps the handles.
pub struct SchedulerAdapter {
    engine: CronEngine,
    invoker: Arc<dyn FunctionInvoker>,
}

impl SchedulerAdapter {
    pub fn new(invoker: Arc<dyn FunctionInvoker>) -> Self {
        Self::with_engine(CronEngine::new(), invoker)
    }

    pub fn with_engine(engine: CronEngine, invoker: Arc<dyn FunctionInvoker>) -> Self {
        Self { engine, invoker }
    }

    /// Begin firing registered entries. Idempotent.
    pub fn start(&self) {
        self.engine.start();
    }

    pub fn engine(&self) -> &CronEngine {
        &self.engine
    }
}

impl JobScheduler for SchedulerAdapter {
    fn register(&self, candidate: &ScheduleCandidate) -> Result<EntryId> {
        let job = Arc::new(ScheduledInvocation {
            candidate: candidate.clone(),
            invoker: Arc::clone(&self.invoker),
        });
        self.engine.add(&candidate.schedule, job)
    }

    fn unregister(&self, id: EntryId) {
        if !self.engine.remove(id) {
            debug!(entry = %id, "cron entry already gone");
        }
    }
}

/// A snapshot of a candidate taken at registration time, paired with the
/// invoker that runs it. Later ticks never touch this copy.
struct ScheduledInvocation {
    candidate: ScheduleCandidate,
    invoker: Arc<dyn FunctionInvoker>,
}

#[async_trait]
impl CronJob for ScheduledInvocation {
    async fn run(&self) {
        info!(function = %self.candidate, "executing function");
        // Outcome is reported through the invoker's result channel.
        let result = self.invoker.invoke(&self.candidate).await;
        debug!(
            function = %self.candidate.qualified_name(),
            status = ?result.status,
            "invocation finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use chrono::Utc;
    use cronlink_core::{FunctionDescriptor, InvocationResult};
    use tokio::sync::Notify;

    #[derive(Default)]
    struct RecordingInvoker {
        calls: Mutex<Vec<String>>,
        notify: Notify,
    }

    #[async_trait]
    impl FunctionInvoker for RecordingInvoker {
        async fn invoke(&self, candidate: &ScheduleCandidate) -> InvocationResult {
            self.calls.lock().unwrap().push(candidate.qualified_name());
            self.notify.notify_one();
            InvocationResult {
                function: candidate.name.clone(),
                namespace: candidate.namespace.clone(),
                topic: None,
                status: Some(200),
                duration: Duration::from_millis(1),
                error: None,
                body: None,
                headers: None,
            }
        }
    }

    fn candidate(name: &str, schedule: &str) -> ScheduleCandidate {
        ScheduleCandidate {
            name: name.to_string(),
            namespace: "fn".to_string(),
            schedule: schedule.to_string(),
            is_async: false,
            descriptor: FunctionDescriptor::default(),
        }
    }

    #[tokio::test]
    async fn fired_entry_invokes_registered_snapshot() {
        let invoker = Arc::new(RecordingInvoker::default());
        let adapter = SchedulerAdapter::new(invoker.clone());

        let mut source = candidate("report", "* * * * *");
        adapter.register(&source).unwrap();
        source.name = "mutated".to_string();

        let fired = adapter
            .engine()
            .fire_due(Utc::now() + chrono::Duration::minutes(2));
        assert_eq!(fired, 1);
        invoker.notify.notified().await;

        assert_eq!(*invoker.calls.lock().unwrap(), vec!["report.fn".to_string()]);
    }

    #[test]
    fn register_rejects_bad_schedule() {
        let adapter = SchedulerAdapter::new(Arc::new(RecordingInvoker::default()));
        assert!(adapter.register(&candidate("bad", "not cron")).is_err());
        assert!(adapter.engine().is_empty());
    }

    #[test]
    fn unregister_tolerates_stale_handles() {
        let adapter = SchedulerAdapter::new(Arc::new(RecordingInvoker::default()));
        let id = adapter.register(&candidate("a", "@daily")).unwrap();
        adapter.unregister(id);
        adapter.unregister(id);
        adapter.unregister(EntryId(999));
        assert!(adapter.engine().is_empty());
    }
}
