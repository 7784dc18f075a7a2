//! Schedule, time zone and recurrence validation for calendar events.

use crate::service::error::{ServiceError, ServiceResult};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rrule::RRuleSet;

/// Checks start/end ordering and, for new events, that start is after `now`.
pub fn validate_schedule(
    start: i64,
    end: Option<i64>,
    now: i64,
    require_future_start: bool,
) -> ServiceResult<()> {
    if require_future_start && start <= now {
        return Err(ServiceError::StartNotInFuture);
    }
    if end.is_some_and(|end| end <= start) {
        return Err(ServiceError::EndNotAfterStart);
    }
    Ok(())
}

/// Resolves an IANA time zone identifier such as `Asia/Ho_Chi_Minh`.
pub fn validate_time_zone(id: &str) -> ServiceResult<Tz> {
    id.parse::<Tz>()
        .map_err(|_| ServiceError::InvalidTimeZone(id.to_string()))
}

/// Parses an RRULE against the event start used as DTSTART.
///
/// Accepts the rule with or without a leading `RRULE:` label. A UTC `UNTIL`
/// is checked against a UTC DTSTART; otherwise DTSTART is the floating
/// wall-clock start in `zone`, matching date-only and floating `UNTIL`.
pub fn validate_recurrence_rule(rule: &str, start: i64, zone: Tz) -> ServiceResult<()> {
    let body = rule.trim();
    let body = body.strip_prefix("RRULE:").unwrap_or(body);
    if body.contains(['\r', '\n', ':']) {
        return Err(ServiceError::InvalidRecurrenceRule(
            "expected a single RRULE value".to_string(),
        ));
    }
    let utc = DateTime::<Utc>::from_timestamp_millis(start)
        .ok_or_else(|| ServiceError::InvalidRecurrenceRule("start out of range".to_string()))?;
    let dtstart = if has_utc_until(body) {
        utc.format("%Y%m%dT%H%M%SZ").to_string()
    } else {
        utc.with_timezone(&zone).format("%Y%m%dT%H%M%S").to_string()
    };
    format!("DTSTART:{dtstart}\nRRULE:{body}")
        .parse::<RRuleSet>()
        .map(|_| ())
        .map_err(|err| ServiceError::InvalidRecurrenceRule(err.to_string()))
}

fn has_utc_until(body: &str) -> bool {
    body.split(';').any(|part| {
        part.split_once('=').is_some_and(|(key, value)| {
            key.trim().eq_ignore_ascii_case("UNTIL") && value.trim().ends_with(['Z', 'z'])
        })
    })
}
