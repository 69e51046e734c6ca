use crate::error::Ineligible;
use crate::schedule;
use crate::types::{
    FunctionDescriptor, ScheduleCandidate, ASYNC_ANNOTATION, SCHEDULE_ANNOTATION,
    TOPIC_ANNOTATION,
};

/// Turn one registry descriptor into a schedule candidate.
///
/// Rules are checked in order and the first failure wins: annotations must
/// exist, `topic` must equal `required_topic`, `schedule` must be a valid cron
/// expression, and `async` must be absent or a boolean literal.
pub fn translate(
    descriptor: &FunctionDescriptor,
    namespace: &str,
    required_topic: &str,
) -> Result<ScheduleCandidate, Ineligible> {
    let name = &descriptor.name;

    if descriptor.annotations.is_none() {
        return Err(Ineligible::NoAnnotations { name: name.clone() });
    }

    let topic = descriptor.annotation(TOPIC_ANNOTATION);
    if topic != Some(required_topic) {
        return Err(Ineligible::WrongTopic {
            name: name.clone(),
            topic: topic.map(str::to_string),
        });
    }

    let expression = descriptor.annotation(SCHEDULE_ANNOTATION).unwrap_or_default();
    if let Err(source) = schedule::parse(expression) {
        return Err(Ineligible::InvalidSchedule {
            name: name.clone(),
            schedule: expression.to_string(),
            source,
        });
    }

    let is_async = match descriptor.annotation(ASYNC_ANNOTATION) {
        None => false,
        Some(value) => parse_bool(value).ok_or_else(|| Ineligible::InvalidAsync {
            name: name.clone(),
            value: value.to_string(),
        })?,
    };

    Ok(ScheduleCandidate {
        name: name.clone(),
        namespace: namespace.to_string(),
        schedule: expression.to_string(),
        is_async,
        descriptor: descriptor.clone(),
    })
}

/// `1`, `t`, `true` and their capitalised forms; likewise for false.
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}
