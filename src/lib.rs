pub mod audio;
pub mod capture;
pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod notify;
pub mod reminder;
pub mod settings;
pub mod store;
mod utils;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use audio::AudioEngineHandle;
use capture::ImageAnalyzer;
use cli::Cli;
use config::Config;
use db::Database;
use notify::{DesktopNotifier, NotificationSink};
use reminder::{AlarmPresenter, ReminderController};
use settings::SettingsStore;
use store::RecordStore;

pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub controller: ReminderController,
    pub settings: SettingsStore,
    /// Optional title/summary suggester for new captures.
    pub analyzer: Option<Arc<dyn ImageAnalyzer>>,
}

impl AppState {
    pub async fn open(config: Config) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir).with_context(|| {
            format!("failed to create data dir {}", config.data_dir.display())
        })?;

        let database = Database::new(config.database_path())?;
        let settings_store = SettingsStore::new(config.settings_path())?;
        let store = RecordStore::load(database.clone()).await;

        let mut sound = settings_store.alarm_sound();
        sound.enabled &= config.sound;

        let audio = AudioEngineHandle::new();
        if config.sound && !audio.is_available() {
            info!("Alarm tones unavailable; alarms will be silent");
        }

        let notifier = if config.notifications {
            DesktopNotifier::detect().map(|n| Arc::new(n) as Arc<dyn NotificationSink>)
        } else {
            None
        };

        let presenter = AlarmPresenter::new(Arc::new(audio), notifier, sound);
        let controller = ReminderController::new(store, Arc::new(presenter))
            .with_tick_interval(config.tick_interval);

        Ok(Self {
            config,
            db: database,
            controller,
            settings: settings_store,
            analyzer: None,
        })
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // Watch mode is long-running and narrates the scheduler; one-shot
    // commands stay quiet. RUST_LOG overrides either default.
    let default_level = match cli.command {
        cli::Command::Watch => log::LevelFilter::Info,
        _ => log::LevelFilter::Warn,
    };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();

    let config = Config::resolve(&cli.global)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(async move {
        let state = AppState::open(config).await?;
        commands::dispatch(&state, cli.command).await
    })
}
