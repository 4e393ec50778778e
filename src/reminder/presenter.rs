use std::sync::{Arc, RwLock};

use chrono::Local;
use log::{debug, warn};

use crate::audio::{TonePattern, TonePlayer};
use crate::notify::{alarm_title, NotificationSink};
use crate::settings::AlarmSoundSettings;

use super::ActiveAlarm;

/// Which side effects were handed off for one presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Presentation {
    /// The player accepted the tone. Playback itself may still fail later.
    pub tone_queued: bool,
    pub notified: bool,
}

/// Turns an active alarm into sound and an OS notification. Both channels
/// are best effort; failures are logged and never propagate.
pub struct AlarmPresenter {
    tones: Arc<dyn TonePlayer>,
    notifier: Option<Arc<dyn NotificationSink>>,
    sound: RwLock<AlarmSoundSettings>,
}

impl AlarmPresenter {
    pub fn new(
        tones: Arc<dyn TonePlayer>,
        notifier: Option<Arc<dyn NotificationSink>>,
        sound: AlarmSoundSettings,
    ) -> Self {
        Self {
            tones,
            notifier,
            sound: RwLock::new(sound),
        }
    }

    pub fn set_sound(&self, settings: AlarmSoundSettings) {
        *self.sound.write().unwrap_or_else(|p| p.into_inner()) = settings;
    }

    pub fn sound(&self) -> AlarmSoundSettings {
        self.sound.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// First presentation of a newly raised alarm.
    pub fn present(&self, alarm: &ActiveAlarm) -> Presentation {
        let tone_queued = self.play_tone(alarm);
        let notified = self.send_notification(alarm);
        Presentation { tone_queued, notified }
    }

    /// Re-sounds an alarm that is still waiting for dismissal.
    pub fn repeat(&self, alarm: &ActiveAlarm) -> Presentation {
        Presentation {
            tone_queued: self.play_tone(alarm),
            notified: false,
        }
    }

    pub fn silence(&self) {
        self.tones.stop();
    }

    fn play_tone(&self, alarm: &ActiveAlarm) -> bool {
        let sound = self.sound();
        if !sound.enabled {
            return false;
        }
        match self
            .tones
            .play(TonePattern::for_urgency(alarm.is_urgent), sound.volume)
        {
            Ok(()) => true,
            Err(err) => {
                debug!("Alarm tone unavailable: {err}");
                false
            }
        }
    }

    fn send_notification(&self, alarm: &ActiveAlarm) -> bool {
        let Some(notifier) = &self.notifier else {
            return false;
        };
        let title = alarm_title(&alarm.title, alarm.is_urgent);
        let body = format!(
            "Reminder set for {}",
            alarm.reminder_at.with_timezone(&Local).format("%H:%M")
        );
        match notifier.notify(&title, &body) {
            Ok(()) => true,
            Err(err) => {
                warn!("Alarm notification failed: {err:#}");
                false
            }
        }
    }
}

/// Lines of the full-screen alarm banner.
pub fn banner_lines(alarm: &ActiveAlarm) -> Vec<String> {
    let mut lines = Vec::with_capacity(3);
    if alarm.is_urgent {
        lines.push("!!! URGENT !!!".to_string());
    }
    lines.push("WAKE UP!".to_string());
    lines.push(alarm.title.clone());
    lines
}
