//! Binary attachments (screenshot image, voice memo).
//!
//! Persisted as `data:<mime>;base64,<data>` strings so the stored collection
//! stays a plain JSON document.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::EditError;

pub const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl Payload {
    pub fn new(mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime: mime.into(),
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }

    /// Accepts a full data URL or a bare base64 string.
    pub fn from_data_url(value: &str) -> Result<Self, EditError> {
        let (mime, encoded) = match value.strip_prefix("data:") {
            Some(rest) => {
                let (header, data) = rest
                    .split_once(',')
                    .ok_or_else(|| EditError::MalformedPayload("data URL without ','".into()))?;
                let mime = header
                    .strip_suffix(";base64")
                    .ok_or_else(|| EditError::MalformedPayload("data URL is not base64".into()))?;
                let mime = if mime.is_empty() { OCTET_STREAM } else { mime };
                (mime, data)
            }
            None => (OCTET_STREAM, value),
        };

        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|err| EditError::MalformedPayload(err.to_string()))?;

        Ok(Self::new(mime, bytes))
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_data_url())
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Payload::from_data_url(&raw).map_err(de::Error::custom)
    }
}

/// MIME type for a voice memo, guessed from its file extension.
pub fn audio_mime_for_extension(extension: Option<&str>) -> &'static str {
    match extension.map(|ext| ext.to_ascii_lowercase()).as_deref() {
        Some("webm") => "audio/webm",
        Some("ogg") | Some("oga") => "audio/ogg",
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("m4a") | Some("mp4") => "audio/mp4",
        Some("flac") => "audio/flac",
        _ => OCTET_STREAM,
    }
}
