use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Annotation carrying the connector topic a function subscribes to.
pub const TOPIC_ANNOTATION: &str = "topic";
/// Annotation carrying the cron expression.
pub const SCHEDULE_ANNOTATION: &str = "schedule";
/// Optional annotation selecting the async invocation route.
pub const ASYNC_ANNOTATION: &str = "async";

/// HTTP status reported for invocations that never reached the gateway.
pub const SERVICE_UNAVAILABLE: u16 = 503;

/// One function as returned by the registry listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub annotations: Option<HashMap<String, String>>,
}

impl FunctionDescriptor {
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations
            .as_ref()
            .and_then(|a| a.get(key))
            .map(String::as_str)
    }
}

/// A function eligible for time-based invocation, rebuilt on every tick.
#[derive(Debug, Clone)]
pub struct ScheduleCandidate {
    pub name: String,
    pub namespace: String,
    /// Validated cron expression, exactly as annotated.
    pub schedule: String,
    pub is_async: bool,
    /// Raw registry entry, kept to recover fields needed at invocation time.
    pub descriptor: FunctionDescriptor,
}

impl ScheduleCandidate {
    /// The fields that decide whether two candidates are "the same" across ticks.
    ///
    /// Any change, including a schedule edit, yields a different identity.
    pub fn identity(&self) -> CandidateIdentity {
        CandidateIdentity {
            name: self.name.clone(),
            namespace: self.namespace.clone(),
            schedule: self.schedule.clone(),
            is_async: self.is_async,
        }
    }

    /// `name.namespace`, or bare `name` in the default namespace.
    pub fn qualified_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.name, self.namespace)
        }
    }

    pub fn topic(&self) -> Option<&str> {
        self.descriptor.annotation(TOPIC_ANNOTATION)
    }
}

impl fmt::Display for ScheduleCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.qualified_name(), self.schedule)?;
        if self.is_async {
            write!(f, " async")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CandidateIdentity {
    pub name: String,
    pub namespace: String,
    pub schedule: String,
    pub is_async: bool,
}

/// Outcome of one invocation attempt, pushed onto the result channel.
#[derive(Debug, Clone)]
pub struct InvocationResult {
    pub function: String,
    pub namespace: String,
    pub topic: Option<String>,
    /// `None` when the request never produced an HTTP response.
    pub status: Option<u16>,
    pub duration: Duration,
    pub error: Option<String>,
    pub body: Option<Vec<u8>>,
    pub headers: Option<BTreeMap<String, String>>,
}

impl InvocationResult {
    /// Status to report for this attempt; transport failures count as 503.
    pub fn effective_status(&self) -> u16 {
        self.status.unwrap_or(SERVICE_UNAVAILABLE)
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && matches!(self.status, Some(s) if (200..300).contains(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(namespace: &str, schedule: &str, is_async: bool) -> ScheduleCandidate {
        ScheduleCandidate {
            name: "nightly".to_string(),
            namespace: namespace.to_string(),
            schedule: schedule.to_string(),
            is_async,
            descriptor: FunctionDescriptor::default(),
        }
    }

    #[test]
    fn qualified_name_omits_default_namespace() {
        assert_eq!(candidate("", "* * * * *", false).qualified_name(), "nightly");
        assert_eq!(
            candidate("openfaas-fn", "* * * * *", false).qualified_name(),
            "nightly.openfaas-fn"
        );
    }

    #[test]
    fn identity_covers_schedule_and_async() {
        let base = candidate("fn", "* * * * *", false);
        assert_eq!(base.identity(), candidate("fn", "* * * * *", false).identity());
        assert_ne!(base.identity(), candidate("fn", "*/5 * * * *", false).identity());
        assert_ne!(base.identity(), candidate("fn", "* * * * *", true).identity());
    }

    #[test]
    fn descriptor_without_annotations_deserializes() {
        let d: FunctionDescriptor =
            serde_json::from_str(r#"{"name":"a","replicas":1}"#).unwrap();
        assert_eq!(d.name, "a");
        assert!(d.annotations.is_none());
        assert!(d.annotation(TOPIC_ANNOTATION).is_none());
    }

    #[test]
    fn transport_failure_reports_service_unavailable() {
        let result = InvocationResult {
            function: "a".to_string(),
            namespace: "fn".to_string(),
            topic: None,
            status: None,
            duration: Duration::from_millis(3),
            error: Some("connection refused".to_string()),
            body: None,
            headers: None,
        };
        assert_eq!(result.effective_status(), SERVICE_UNAVAILABLE);
        assert!(!result.is_success());
    }
}
