use std::{env, path::PathBuf, time::Duration};

use anyhow::{anyhow, Result};

use crate::cli::GlobalArgs;
use crate::reminder::controller::DEFAULT_TICK_INTERVAL;

const DATA_DIR_ENV: &str = "SCREENMIND_DATA_DIR";
const DEBUG_ENV: &str = "SCREENMIND_DEBUG";

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub tick_interval: Duration,
    pub sound: bool,
    pub notifications: bool,
}

impl Config {
    /// Command-line flags win over environment variables, which win over defaults.
    pub fn resolve(args: &GlobalArgs) -> Result<Self> {
        let data_dir = match args
            .data_dir
            .clone()
            .or_else(|| env::var_os(DATA_DIR_ENV).map(PathBuf::from))
        {
            Some(dir) => dir,
            None => dirs::data_dir()
                .map(|dir| dir.join("screenmind"))
                .ok_or_else(|| anyhow!("no data directory available; pass --data-dir"))?,
        };

        let debug_mode = env::var(DEBUG_ENV)
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let tick_interval = match args.tick_secs {
            Some(0) => return Err(anyhow!("--tick-secs must be greater than zero")),
            Some(secs) => Duration::from_secs(secs),
            None if debug_mode => Duration::from_secs(1),
            None => DEFAULT_TICK_INTERVAL,
        };

        Ok(Self {
            data_dir,
            tick_interval,
            sound: !args.no_sound,
            notifications: !args.no_notify,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("screenmind.sqlite3")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }
}
