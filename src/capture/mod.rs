//! Turning an imported image plus user metadata into a stored record.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Timelike, Utc};
use log::warn;

use crate::error::EditError;
use crate::models::{audio_mime_for_extension, CaptureRecord, Payload};

/// Everything the capture screen collects before saving.
#[derive(Debug, Clone)]
pub struct CaptureDraft {
    pub image: Payload,
    pub title: Option<String>,
    pub note: Option<String>,
    pub voice_note: Option<Payload>,
    pub reminder_at: Option<DateTime<Utc>>,
    pub is_urgent: bool,
}

impl CaptureDraft {
    /// Rejects bytes that do not look like an image.
    pub fn from_image_bytes(bytes: Vec<u8>) -> Result<Self, EditError> {
        let format = image::guess_format(&bytes).map_err(|_| EditError::UnsupportedImage)?;
        Ok(Self {
            image: Payload::new(format.to_mime_type(), bytes),
            title: None,
            note: None,
            voice_note: None,
            reminder_at: None,
            is_urgent: false,
        })
    }

    pub fn from_image_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read image {}", path.display()))?;
        Ok(Self::from_image_bytes(bytes)?)
    }
}

/// Reads a recorded voice memo from disk.
pub fn load_voice_note(path: &Path) -> Result<Payload> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read voice note {}", path.display()))?;
    let mime = audio_mime_for_extension(path.extension().and_then(|ext| ext.to_str()));
    Ok(Payload::new(mime, bytes))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAnalysis {
    pub title: String,
    pub summary: String,
}

/// Remote service that suggests a title and summary for a screenshot.
pub trait ImageAnalyzer: Send + Sync {
    fn analyze(&self, image: &Payload) -> Result<ImageAnalysis>;
}

/// Runs the analyzer if there is one. Failures are logged and yield `None`
/// so the capture can still be saved.
pub fn analyze_or_default(
    analyzer: Option<&dyn ImageAnalyzer>,
    image: &Payload,
) -> Option<ImageAnalysis> {
    let analyzer = analyzer?;
    match analyzer.analyze(image) {
        Ok(analysis) => Some(analysis),
        Err(err) => {
            warn!("Image analysis failed, using default title: {err:#}");
            None
        }
    }
}

/// `CAPTURE_HHMM` in local time.
pub fn default_title<Tz: TimeZone>(now: &DateTime<Tz>) -> String {
    format!("CAPTURE_{:02}{:02}", now.hour(), now.minute())
}

/// Builds the record. Title precedence: user title, analysis title, default.
pub fn finalize(
    draft: CaptureDraft,
    analysis: Option<ImageAnalysis>,
    now: DateTime<Utc>,
) -> Result<CaptureRecord, EditError> {
    let user_title = draft
        .title
        .as_deref()
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(str::to_string);
    let analysis_title = analysis
        .as_ref()
        .map(|a| a.title.trim().to_string())
        .filter(|title| !title.is_empty());
    let title = user_title
        .or(analysis_title)
        .unwrap_or_else(|| default_title(&now.with_timezone(&Local)));

    let mut record = CaptureRecord::new(draft.image, title, now);
    record.summary = analysis
        .map(|a| a.summary.trim().to_string())
        .filter(|summary| !summary.is_empty());
    record.note = draft.note.filter(|note| !note.trim().is_empty());
    record.voice_note = draft.voice_note;

    if let Some(at) = draft.reminder_at {
        record.set_reminder(at, now)?;
    }
    if draft.is_urgent {
        record.set_urgent(true)?;
    }
    Ok(record)
}

const LOCAL_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

/// Parses user reminder input and checks that it lies in the future.
///
/// Accepts RFC 3339, local `YYYY-MM-DDTHH:MM` / `YYYY-MM-DD HH:MM`, or a
/// relative offset like `+90s`, `+10m`, `+2h`, `+1d`.
pub fn parse_reminder_input(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, EditError> {
    let trimmed = input.trim();
    let invalid = || EditError::InvalidTimestamp {
        input: input.to_string(),
    };

    let at = if let Some(relative) = trimmed.strip_prefix('+') {
        let offset = parse_offset(relative).ok_or_else(invalid)?;
        now.checked_add_signed(offset).ok_or_else(invalid)?
    } else if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        parsed.with_timezone(&Utc)
    } else {
        let naive = LOCAL_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
            .ok_or_else(invalid)?;
        Local
            .from_local_datetime(&naive)
            .earliest()
            .ok_or_else(invalid)?
            .with_timezone(&Utc)
    };

    if at <= now {
        return Err(EditError::ReminderInPast { at });
    }
    Ok(at)
}

fn parse_offset(value: &str) -> Option<Duration> {
    let unit = value.chars().last()?;
    let amount: i64 = value[..value.len() - unit.len_utf8()].parse().ok()?;
    if amount <= 0 {
        return None;
    }
    match unit {
        's' => Duration::try_seconds(amount),
        'm' => Duration::try_minutes(amount),
        'h' => Duration::try_hours(amount),
        'd' => Duration::try_days(amount),
        _ => None,
    }
}
