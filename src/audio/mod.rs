pub mod tone;

#[cfg(feature = "sound")]
mod engine;
#[cfg(not(feature = "sound"))]
mod silent;

#[cfg(feature = "sound")]
pub use engine::AudioEngineHandle;
#[cfg(not(feature = "sound"))]
pub use silent::AudioEngineHandle;

pub use tone::{ToneBurst, TonePattern};

/// Something that can sound an alarm pattern. Playback is fire-and-forget:
/// `play` returns once the pattern is queued.
pub trait TonePlayer: Send + Sync {
    fn play(&self, pattern: TonePattern, volume: f32) -> Result<(), String>;

    fn stop(&self);
}
