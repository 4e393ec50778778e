//! Best-effort desktop notifications.

use std::env;
use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use tokio::process::Command;

pub trait NotificationSink: Send + Sync {
    fn notify(&self, title: &str, body: &str) -> Result<()>;
}

/// Notification headline for an alarm, e.g. `⏰ ALARM: Boarding pass`.
pub fn alarm_title(record_title: &str, is_urgent: bool) -> String {
    let marker = if is_urgent { "🚨 URGENT" } else { "⏰" };
    format!("{marker} ALARM: {record_title}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    NotifySend,
    Osascript,
}

/// Sends notifications through the platform's command-line helper.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    backend: Backend,
    program: PathBuf,
}

impl DesktopNotifier {
    /// Looks for a usable helper on `PATH`; `None` disables the channel.
    pub fn detect() -> Option<Self> {
        let backend = if cfg!(target_os = "macos") {
            Backend::Osascript
        } else {
            Backend::NotifySend
        };
        let name = match backend {
            Backend::NotifySend => "notify-send",
            Backend::Osascript => "osascript",
        };

        match find_on_path(name) {
            Some(program) => {
                debug!("Desktop notifications via {}", program.display());
                Some(Self { backend, program })
            }
            None => {
                debug!("{name} not found; desktop notifications disabled");
                None
            }
        }
    }
}

impl NotificationSink for DesktopNotifier {
    /// Returns once the helper is spawned. A runtime task reaps it on exit.
    fn notify(&self, title: &str, body: &str) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| anyhow!("desktop notifications need a tokio runtime"))?;

        let mut command = Command::new(&self.program);
        match self.backend {
            Backend::NotifySend => {
                command.arg("--app-name=screenmind").arg(title).arg(body);
            }
            Backend::Osascript => {
                let script = format!(
                    "display notification {} with title {}",
                    applescript_string(body),
                    applescript_string(title)
                );
                command.arg("-e").arg(script);
            }
        }

        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to spawn {}", self.program.display()))?;

        let program = self.program.clone();
        runtime.spawn(async move {
            match child.wait().await {
                Ok(status) if !status.success() => {
                    warn!("{} exited with {status}", program.display())
                }
                Ok(_) => {}
                Err(err) => warn!("Failed to wait on {}: {err}", program.display()),
            }
        });
        Ok(())
    }
}

fn find_on_path(program: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

fn applescript_string(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}
