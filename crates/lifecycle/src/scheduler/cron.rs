//! Cron normalization and due-check helpers for the monitor cadence.

use chrono::{DateTime, Utc};
use cron::Schedule as CronSchedule;

/// Normalize a 5-field cron expression to 6-field by prepending "0 " for seconds.
///
/// The `cron` crate requires 6 fields: `sec min hour day-of-month month day-of-week`.
/// Configuration uses standard 5-field cron: `min hour day-of-month month day-of-week`.
pub(crate) fn normalize_cron(cron_5field: &str) -> String {
    let trimmed = cron_5field.trim();
    let field_count = trimmed.split_whitespace().count();
    if field_count == 5 {
        format!("0 {}", trimmed)
    } else {
        // Already 6-field or non-standard; pass through as-is.
        trimmed.to_string()
    }
}

/// Check if a cron cadence is due at `now`.
///
/// Due when a scheduled tick falls between `last_run` (exclusive) and `now`
/// (inclusive). With no `last_run`, any tick within the past day counts.
pub(crate) fn is_cron_due(
    schedule: &CronSchedule,
    now: DateTime<Utc>,
    last_run: Option<DateTime<Utc>>,
) -> bool {
    let check_from = last_run.unwrap_or(now - chrono::Duration::days(1));

    if let Some(next) = schedule.after(&check_from).next() {
        next <= now
    } else {
        false
    }
}
