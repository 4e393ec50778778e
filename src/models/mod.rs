pub mod payload;
pub mod record;
pub mod theme;

pub use payload::{audio_mime_for_extension, Payload};
pub use record::{CaptureRecord, RecordEdit};
pub use theme::Theme;
