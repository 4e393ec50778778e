use std::time::Duration;

const SAMPLE_RATE: u32 = 44100;
const RELEASE: Duration = Duration::from_millis(10);

/// A repeated beep: `repetitions` bursts of `on`, each followed by `gap` of silence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TonePattern {
    pub frequency_hz: f32,
    pub repetitions: u32,
    pub on: Duration,
    pub gap: Duration,
    pub gain: f32,
}

impl TonePattern {
    pub fn normal() -> Self {
        Self {
            frequency_hz: 880.0,
            repetitions: 3,
            on: Duration::from_millis(100),
            gap: Duration::from_millis(100),
            gain: 0.1,
        }
    }

    /// Higher and faster than [`TonePattern::normal`].
    pub fn urgent() -> Self {
        Self {
            frequency_hz: 1046.5,
            repetitions: 8,
            on: Duration::from_millis(80),
            gap: Duration::from_millis(80),
            gain: 0.1,
        }
    }

    pub fn for_urgency(is_urgent: bool) -> Self {
        if is_urgent {
            Self::urgent()
        } else {
            Self::normal()
        }
    }

    pub fn total_duration(&self) -> Duration {
        (self.on + self.gap) * self.repetitions
    }
}

/// Finite square-wave source rendering a [`TonePattern`].
pub struct ToneBurst {
    pattern: TonePattern,
    sample_rate: u32,
    num_sample: usize,
    on_samples: usize,
    release_samples: usize,
    period_samples: usize,
    total_samples: usize,
}

impl ToneBurst {
    pub fn new(pattern: TonePattern) -> Self {
        let sample_rate = SAMPLE_RATE;
        let to_samples = |d: Duration| (d.as_secs_f64() * sample_rate as f64).round() as usize;
        let on_samples = to_samples(pattern.on);
        let period_samples = on_samples + to_samples(pattern.gap);

        Self {
            pattern,
            sample_rate,
            num_sample: 0,
            on_samples,
            release_samples: to_samples(RELEASE).min(on_samples),
            period_samples,
            total_samples: period_samples * pattern.repetitions as usize,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn total_samples(&self) -> usize {
        self.total_samples
    }

    fn envelope(&self, position: usize) -> f32 {
        // Ramp down over the release window to avoid clicks
        let release_start = self.on_samples - self.release_samples;
        if position < release_start || self.release_samples == 0 {
            1.0
        } else {
            (self.on_samples - position) as f32 / self.release_samples as f32
        }
    }
}

impl Iterator for ToneBurst {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.num_sample >= self.total_samples || self.period_samples == 0 {
            return None;
        }

        let index = self.num_sample;
        self.num_sample += 1;

        let position = index % self.period_samples;
        if position >= self.on_samples {
            return Some(0.0);
        }

        let t = index as f32 / self.sample_rate as f32;
        let phase = (self.pattern.frequency_hz * t).fract();
        let square = if phase < 0.5 { 1.0 } else { -1.0 };

        Some(square * self.pattern.gain * self.envelope(position))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total_samples.saturating_sub(self.num_sample);
        (remaining, Some(remaining))
    }
}

#[cfg(feature = "sound")]
impl rodio::Source for ToneBurst {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.total_samples.saturating_sub(self.num_sample))
    }

    fn channels(&self) -> u16 {
        1 // Mono
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(self.pattern.total_duration())
    }
}
