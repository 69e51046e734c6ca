use async_trait::async_trait;

use crate::types::{InvocationResult, ScheduleCandidate};

/// Executes a scheduled function.
///
/// Implementations never fail: transport and body errors are folded into the
/// returned [`InvocationResult`], which is also published to whatever result
/// channel the implementation reports to.
#[async_trait]
pub trait FunctionInvoker: Send + Sync {
    async fn invoke(&self, candidate: &ScheduleCandidate) -> InvocationResult;
}
