//! Cron expression validation.
//!
//! Functions annotate themselves with standard 5-field cron (`min hour dom
//! month dow`), one of the `@daily`-style descriptors, or `@every <duration>`.
//! The `cron` crate wants a leading seconds field and numbers weekdays from 1,
//! so expressions are normalised before parsing. Everything runs in UTC.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Timelike, Utc};

use crate::error::ScheduleError;

const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const EVERY_PREFIX: &str = "@every ";

/// A parsed, runnable schedule.
#[derive(Debug, Clone)]
pub enum Schedule {
    Cron(cron::Schedule),
    /// Day-of-month and day-of-week are both restricted; a day matching
    /// either one fires.
    DayOrWeekday {
        by_day: cron::Schedule,
        by_weekday: cron::Schedule,
    },
    /// Fixed delay in whole seconds, at least one.
    Every(Duration),
}

impl Schedule {
    /// First occurrence strictly after `from`.
    pub fn next_after(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Schedule::Cron(schedule) => schedule.after(&from).next(),
            Schedule::DayOrWeekday { by_day, by_weekday } => {
                match (by_day.after(&from).next(), by_weekday.after(&from).next()) {
                    (Some(a), Some(b)) => Some(a.min(b)),
                    (a, b) => a.or(b),
                }
            }
            Schedule::Every(interval) => {
                let delay = chrono::Duration::from_std(*interval).ok()?;
                from.with_nanosecond(0)?.checked_add_signed(delay)
            }
        }
    }
}

/// Returns true when `expr` can be scheduled. Never fails loudly.
pub fn is_valid(expr: &str) -> bool {
    parse(expr).is_ok()
}

/// Parse a 5-field expression or descriptor into a runnable schedule.
pub fn parse(expr: &str) -> Result<Schedule, ScheduleError> {
    let expr = expr.trim();
    if expr.is_empty() {
        return Err(ScheduleError::Empty);
    }

    if expr.starts_with('@') {
        return parse_descriptor(expr);
    }

    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(ScheduleError::FieldCount {
            found: fields.len(),
        });
    }

    let (dom, dow) = (any_value(fields[2]), any_value(fields[4]));
    let build = |dom: &str, dow: &str| {
        compile(
            expr,
            &format!(
                "0 {} {} {} {} {}",
                fields[0],
                fields[1],
                dom,
                fields[3],
                weekday_names(dow)
            ),
        )
    };

    if is_unrestricted(dom) || is_unrestricted(dow) {
        Ok(Schedule::Cron(build(dom, dow)?))
    } else {
        Ok(Schedule::DayOrWeekday {
            by_day: build(dom, "*")?,
            by_weekday: build("*", dow)?,
        })
    }
}

fn parse_descriptor(expr: &str) -> Result<Schedule, ScheduleError> {
    let lower = expr.to_ascii_lowercase();
    if lower.starts_with(EVERY_PREFIX) {
        let interval =
            parse_interval(expr[EVERY_PREFIX.len()..].trim()).map_err(|reason| {
                ScheduleError::Parse {
                    expression: expr.to_string(),
                    reason,
                }
            })?;
        return Ok(Schedule::Every(Duration::from_secs(interval.as_secs().max(1))));
    }

    let expanded = match lower.as_str() {
        "@yearly" | "@annually" => "0 0 0 1 1 *",
        "@monthly" => "0 0 0 1 * *",
        "@weekly" => "0 0 0 * * Sun",
        "@daily" | "@midnight" => "0 0 0 * * *",
        "@hourly" => "0 0 * * * *",
        _ => return Err(ScheduleError::Descriptor(expr.to_string())),
    };
    Ok(Schedule::Cron(compile(expr, expanded)?))
}

fn compile(expr: &str, normalised: &str) -> Result<cron::Schedule, ScheduleError> {
    cron::Schedule::from_str(normalised).map_err(|e| ScheduleError::Parse {
        expression: expr.to_string(),
        reason: e.to_string(),
    })
}

fn any_value(field: &str) -> &str {
    if field == "?" {
        "*"
    } else {
        field
    }
}

/// A day field counts as unrestricted when one of its list items is a bare
/// `*` (a step other than 1 makes it restricted).
fn is_unrestricted(field: &str) -> bool {
    field.split(',').any(|part| match part.split_once('/') {
        Some((range, step)) => range == "*" && step == "1",
        None => part == "*",
    })
}

/// Parse a duration such as `90s`, `5m`, `1h30m` or `1.5h`.
fn parse_interval(text: &str) -> Result<Duration, String> {
    if text.is_empty() {
        return Err("missing duration".to_string());
    }
    if text == "0" {
        return Ok(Duration::ZERO);
    }

    let mut rest = text;
    let mut secs = 0f64;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let value: f64 = rest[..num_len]
            .parse()
            .map_err(|_| format!("invalid duration {text:?}"))?;
        rest = &rest[num_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_len] {
            "ns" => 1e-9,
            "us" | "µs" | "μs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            "" => return Err(format!("missing unit in duration {text:?}")),
            unit => return Err(format!("unknown unit {unit:?} in duration {text:?}")),
        };
        secs += value * scale;
        rest = &rest[unit_len..];
    }

    Duration::try_from_secs_f64(secs).map_err(|e| format!("{text:?}: {e}"))
}

/// Rewrite POSIX weekday numerals (0 and 7 are Sunday) as names.
///
/// Step values after `/` stay numeric.
fn weekday_names(field: &str) -> String {
    field
        .split(',')
        .map(|part| {
            let (range, step) = match part.split_once('/') {
                Some((range, step)) => (range, Some(step)),
                None => (part, None),
            };
            let range = range
                .split('-')
                .map(|value| match value.parse::<usize>() {
                    Ok(n) if n <= 7 => WEEKDAYS[n % 7].to_string(),
                    _ => value.to_string(),
                })
                .collect::<Vec<_>>()
                .join("-");
            match step {
                Some(step) => format!("{range}/{step}"),
                None => range,
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}
