use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::db::Database;
use crate::models::Theme;

pub const THEME_KEY: &str = "screenmind_theme";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlarmSoundSettings {
    pub enabled: bool,
    pub volume: f32,
}

impl Default for AlarmSoundSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct UserSettings {
    #[serde(default)]
    alarm_sound: AlarmSoundSettings,
}

/// JSON-file backed user preferences.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring unreadable settings in {}: {err}", path.display());
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn alarm_sound(&self) -> AlarmSoundSettings {
        self.read().alarm_sound.clone()
    }

    pub fn update_alarm_sound(&self, mut settings: AlarmSoundSettings) -> Result<()> {
        settings.volume = settings.volume.clamp(0.0, 1.0);
        let mut guard = self.write();
        guard.alarm_sound = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Stored theme preference, dark when unset or unrecognized.
pub async fn load_theme(db: &Database) -> Theme {
    match db.get_value(THEME_KEY).await {
        Ok(Some(raw)) => Theme::parse(&raw).unwrap_or_default(),
        Ok(None) => Theme::default(),
        Err(err) => {
            warn!("Failed to read theme preference: {err:?}");
            Theme::default()
        }
    }
}

pub async fn save_theme(db: &Database, theme: Theme) -> Result<()> {
    db.set_value(THEME_KEY, theme.as_str().to_string()).await
}
