//! Capture record model.
//!
//! The reminder fields are private so the acknowledgement and urgency
//! invariants can only be changed through the setters below.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::payload::Payload;
use crate::error::EditError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRecord {
    pub id: String,
    #[serde(rename = "imageData")]
    pub image: Payload,
    #[serde(rename = "timestamp", with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(rename = "voiceNoteUrl", default, skip_serializing_if = "Option::is_none")]
    pub voice_note: Option<Payload>,
    #[serde(
        rename = "reminderTime",
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    reminder_at: Option<DateTime<Utc>>,
    #[serde(default)]
    reminder_acknowledged: bool,
    #[serde(default)]
    is_urgent: bool,
}

/// One user edit. A batch of edits is applied atomically by [`CaptureRecord::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordEdit {
    SetTitle(String),
    SetSummary(String),
    SetNote(String),
    ClearNote,
    SetVoiceNote(Payload),
    ClearVoiceNote,
    SetReminder(DateTime<Utc>),
    ClearReminder,
    SetUrgent(bool),
    ToggleUrgent,
}

impl CaptureRecord {
    pub fn new(image: Payload, title: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            image,
            created_at,
            title: title.into(),
            summary: None,
            note: None,
            voice_note: None,
            reminder_at: None,
            reminder_acknowledged: false,
            is_urgent: false,
        }
    }

    pub fn reminder_at(&self) -> Option<DateTime<Utc>> {
        self.reminder_at
    }

    pub fn reminder_acknowledged(&self) -> bool {
        self.reminder_acknowledged
    }

    pub fn is_urgent(&self) -> bool {
        self.is_urgent
    }

    /// Schedules (or reschedules) the reminder. Always clears acknowledgement.
    pub fn set_reminder(&mut self, at: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), EditError> {
        if at <= now {
            return Err(EditError::ReminderInPast { at });
        }
        self.reminder_at = Some(at);
        self.reminder_acknowledged = false;
        Ok(())
    }

    pub fn clear_reminder(&mut self) {
        self.reminder_at = None;
        self.reminder_acknowledged = false;
        self.is_urgent = false;
    }

    pub fn set_urgent(&mut self, urgent: bool) -> Result<(), EditError> {
        if urgent && self.reminder_at.is_none() {
            return Err(EditError::NoReminder {
                id: self.id.clone(),
            });
        }
        self.is_urgent = urgent;
        Ok(())
    }

    pub fn acknowledge(&mut self) {
        if self.reminder_at.is_some() {
            self.reminder_acknowledged = true;
        }
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        matches!(self.reminder_at, Some(at) if at <= now) && !self.reminder_acknowledged
    }

    /// Reminder exists and has not fired yet.
    pub fn is_pending(&self, now: DateTime<Utc>) -> bool {
        matches!(self.reminder_at, Some(at) if at > now) && !self.reminder_acknowledged
    }

    /// Repairs state that older stored payloads may carry.
    pub fn normalize(&mut self) {
        if self.reminder_at.is_none() {
            self.reminder_acknowledged = false;
            self.is_urgent = false;
        }
        if self.note.as_deref().is_some_and(|note| note.trim().is_empty()) {
            self.note = None;
        }
        if self.summary.as_deref().is_some_and(|s| s.trim().is_empty()) {
            self.summary = None;
        }
    }

    /// Applies `edits` in order. On error `self` is left exactly as it was.
    pub fn apply(&mut self, edits: &[RecordEdit], now: DateTime<Utc>) -> Result<(), EditError> {
        let mut next = self.clone();
        for edit in edits {
            next.apply_one(edit, now)?;
        }
        *self = next;
        Ok(())
    }

    fn apply_one(&mut self, edit: &RecordEdit, now: DateTime<Utc>) -> Result<(), EditError> {
        match edit {
            RecordEdit::SetTitle(title) => {
                let title = title.trim();
                // An empty title keeps the current label
                if !title.is_empty() {
                    self.title = title.to_string();
                }
            }
            RecordEdit::SetSummary(summary) => {
                let summary = summary.trim();
                self.summary = (!summary.is_empty()).then(|| summary.to_string());
            }
            RecordEdit::SetNote(note) => {
                self.note = (!note.trim().is_empty()).then(|| note.clone());
            }
            RecordEdit::ClearNote => self.note = None,
            RecordEdit::SetVoiceNote(payload) => self.voice_note = Some(payload.clone()),
            RecordEdit::ClearVoiceNote => self.voice_note = None,
            RecordEdit::SetReminder(at) => self.set_reminder(*at, now)?,
            RecordEdit::ClearReminder => self.clear_reminder(),
            RecordEdit::SetUrgent(urgent) => self.set_urgent(*urgent)?,
            RecordEdit::ToggleUrgent => self.set_urgent(!self.is_urgent)?,
        }
        Ok(())
    }
}
