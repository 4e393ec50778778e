use super::{TonePattern, TonePlayer};

/// Stand-in used when the crate is built without the `sound` feature.
/// Every playback attempt reports the capability as missing.
pub struct AudioEngineHandle;

impl AudioEngineHandle {
    pub fn new() -> Self {
        Self
    }

    pub fn is_available(&self) -> bool {
        false
    }
}

impl Default for AudioEngineHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl TonePlayer for AudioEngineHandle {
    fn play(&self, _pattern: TonePattern, _volume: f32) -> Result<(), String> {
        Err("built without sound support".to_string())
    }

    fn stop(&self) {}
}
