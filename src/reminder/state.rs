use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::CaptureRecord;

/// Display snapshot of the record that is currently alarming.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveAlarm {
    pub record_id: String,
    pub title: String,
    pub is_urgent: bool,
    /// The reminder this alarm was raised for.
    pub reminder_at: DateTime<Utc>,
    pub raised_at: DateTime<Utc>,
}

impl ActiveAlarm {
    pub fn from_record(record: &CaptureRecord, raised_at: DateTime<Utc>) -> Option<Self> {
        Some(Self {
            record_id: record.id.clone(),
            title: record.title.clone(),
            is_urgent: record.is_urgent(),
            reminder_at: record.reminder_at()?,
            raised_at,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum AlarmState {
    #[default]
    Idle,
    Alarming(ActiveAlarm),
}

impl AlarmState {
    pub fn is_idle(&self) -> bool {
        matches!(self, AlarmState::Idle)
    }

    pub fn active(&self) -> Option<&ActiveAlarm> {
        match self {
            AlarmState::Idle => None,
            AlarmState::Alarming(alarm) => Some(alarm),
        }
    }

    /// Enters `Alarming`. Refused while another alarm is active.
    pub fn raise(&mut self, alarm: ActiveAlarm) -> bool {
        if !self.is_idle() {
            return false;
        }
        *self = AlarmState::Alarming(alarm);
        true
    }

    pub fn clear(&mut self) -> Option<ActiveAlarm> {
        match std::mem::take(self) {
            AlarmState::Idle => None,
            AlarmState::Alarming(alarm) => Some(alarm),
        }
    }
}
