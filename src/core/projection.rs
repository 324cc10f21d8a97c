//! Display fields derived from a run's raw timestamps and states. Every
//! function here is pure: the current time is always passed in.

use chrono::{DateTime, Utc};

use crate::core::model::{Condition, ConditionStatus, ContainerState, TaskRun};
use crate::interfaces::results::SummaryStatus;

pub const UNSET: &str = "---";

const SECOND: i64 = 1_000;
const MINUTE: i64 = 60 * SECOND;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;
const MONTH: i64 = 30 * DAY;
const YEAR: i64 = 12 * MONTH;
const LONG_TIME: i64 = 37 * YEAR;

enum Phrase {
    Now,
    Fixed(&'static str),
    Count(&'static str, i64),
}

/// Upper bound (exclusive, milliseconds) and wording for each age bucket.
const MAGNITUDES: &[(i64, Phrase)] = &[
    (SECOND, Phrase::Now),
    (2 * SECOND, Phrase::Fixed("1 second")),
    (MINUTE, Phrase::Count("seconds", SECOND)),
    (2 * MINUTE, Phrase::Fixed("1 minute")),
    (HOUR, Phrase::Count("minutes", MINUTE)),
    (2 * HOUR, Phrase::Fixed("1 hour")),
    (DAY, Phrase::Count("hours", HOUR)),
    (2 * DAY, Phrase::Fixed("1 day")),
    (WEEK, Phrase::Count("days", DAY)),
    (2 * WEEK, Phrase::Fixed("1 week")),
    (MONTH, Phrase::Count("weeks", WEEK)),
    (2 * MONTH, Phrase::Fixed("1 month")),
    (YEAR, Phrase::Count("months", MONTH)),
    (18 * MONTH, Phrase::Fixed("1 year")),
    (2 * YEAR, Phrase::Fixed("2 years")),
    (LONG_TIME, Phrase::Count("years", YEAR)),
    (i64::MAX, Phrase::Fixed("a long while")),
];

/// Coarse relative time of `start` against `now`, e.g. `3 minutes ago`.
pub fn age(start: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(start) = start else {
        return UNSET.to_string();
    };

    let (diff, label) = if start > now {
        ((start - now).num_milliseconds(), "from now")
    } else {
        ((now - start).num_milliseconds(), "ago")
    };

    let idx = MAGNITUDES
        .iter()
        .position(|(bound, _)| *bound > diff)
        .unwrap_or(MAGNITUDES.len() - 1);

    match MAGNITUDES[idx].1 {
        Phrase::Now => "now".to_string(),
        Phrase::Fixed(text) => format!("{} {}", text, label),
        Phrase::Count(unit, div) => format!("{} {} {}", diff / div, unit, label),
    }
}

/// Elapsed time between `start` and `end`, e.g. `2m0s`.
pub fn duration(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> String {
    match (start, end) {
        (Some(start), Some(end)) => {
            let millis = (end - start).num_milliseconds().unsigned_abs();
            format_seconds((millis + 500) / 1000)
        }
        _ => UNSET.to_string(),
    }
}

/// Formats a configured duration such as a timeout exactly, e.g. `1h0m0s`,
/// `1.5s` or `250ms`. Sub-second values use the largest unit below a second.
pub fn format_duration(d: std::time::Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < 1_000 {
        return format!("{}ns", nanos);
    }
    if nanos < 1_000_000 {
        return format!("{}µs", decimal(nanos, 1_000));
    }
    if nanos < 1_000_000_000 {
        return format!("{}ms", decimal(nanos, 1_000_000));
    }

    let total = d.as_secs();
    let sub_minute = u128::from(total % 60) * 1_000_000_000 + u128::from(d.subsec_nanos());
    let seconds = decimal(sub_minute, 1_000_000_000);
    let (hours, minutes) = (total / 3600, (total % 3600) / 60);
    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// `value / scale` with the fraction's trailing zeros removed.
fn decimal(value: u128, scale: u128) -> String {
    let whole = value / scale;
    let rem = value % scale;
    if rem == 0 {
        return whole.to_string();
    }
    let width = scale.to_string().len() - 1;
    let fraction = format!("{:0width$}", rem, width = width);
    format!("{}.{}", whole, fraction.trim_end_matches('0'))
}

fn format_seconds(total: u64) -> String {
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Run-level label taken from the first (authoritative) condition.
pub fn condition_label(conditions: &[Condition]) -> &'static str {
    match conditions.first().map(|c| c.status) {
        Some(ConditionStatus::True) => "Succeeded",
        Some(ConditionStatus::False) => "Failed",
        Some(ConditionStatus::Unknown) => "Running",
        Some(ConditionStatus::Other) | None => "Unknown",
    }
}

/// Message of the first condition, but only when it reports a failure.
pub fn failure_message(run: &TaskRun) -> &str {
    match run.status.conditions.first() {
        Some(c) if c.status == ConditionStatus::False => &c.message,
        _ => "",
    }
}

/// Label for a single step or sidecar.
pub fn component_label(state: Option<&ContainerState>) -> &str {
    match state {
        Some(ContainerState::Waiting { reason, .. }) => reason,
        Some(ContainerState::Running { .. }) => "Running",
        Some(ContainerState::Terminated { reason, .. }) => reason,
        None => UNSET,
    }
}

pub fn summary_label(status: SummaryStatus) -> &'static str {
    match status {
        SummaryStatus::Success => "Succeeded",
        SummaryStatus::Failure => "Failed",
        SummaryStatus::Timeout => "Timed Out",
        SummaryStatus::Cancelled => "Cancelled",
        SummaryStatus::Unknown => "Unknown",
    }
}

/// Namespace segment of a result name (`<namespace>/results/<id>`).
pub fn namespace_of(result_name: &str) -> &str {
    result_name.split('/').next().unwrap_or_default()
}
