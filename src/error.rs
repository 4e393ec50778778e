//! Rejections raised at the edit boundary.
//!
//! Everything else in the crate reports failures through `anyhow`; these are
//! the cases a caller is expected to show back to the user verbatim.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    /// The reminder input could not be parsed as a point in time
    #[error(
        "invalid reminder time '{input}': expected RFC 3339, YYYY-MM-DD HH:MM or +<n><s|m|h|d>"
    )]
    InvalidTimestamp { input: String },

    /// Reminders must lie strictly in the future when they are set
    #[error("reminder time {at} is not in the future")]
    ReminderInPast { at: DateTime<Utc> },

    /// Urgency only applies to a pending reminder
    #[error("record '{id}' has no reminder to mark urgent")]
    NoReminder { id: String },

    #[error("payload is not a recognized image format")]
    UnsupportedImage,

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("no record with id '{0}'")]
    NotFound(String),
}
