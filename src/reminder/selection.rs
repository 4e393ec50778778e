//! Overdue-reminder selection. Pure functions over the collection and a clock
//! reading, kept apart from the controller that acts on the result.

use chrono::{DateTime, Utc};

use crate::models::CaptureRecord;

/// The overdue record to alarm next: earliest `reminder_at`, then earliest
/// capture, then lowest id.
pub fn select_due(records: &[CaptureRecord], now: DateTime<Utc>) -> Option<&CaptureRecord> {
    records
        .iter()
        .filter(|record| record.is_overdue(now))
        .min_by(|a, b| {
            a.reminder_at()
                .cmp(&b.reminder_at())
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        })
}

pub fn overdue_count(records: &[CaptureRecord], now: DateTime<Utc>) -> usize {
    records.iter().filter(|record| record.is_overdue(now)).count()
}

/// Earliest reminder that has not fired yet.
pub fn next_pending(records: &[CaptureRecord], now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    records
        .iter()
        .filter(|record| record.is_pending(now))
        .filter_map(CaptureRecord::reminder_at)
        .min()
}
