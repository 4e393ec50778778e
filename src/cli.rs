use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "screenmind",
    version,
    about = "Screenshots with notes, voice memos and reminder alarms"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Directory holding the database and settings
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Reminder poll interval in seconds
    #[arg(long, global = true)]
    pub tick_secs: Option<u64>,

    /// Never play alarm tones
    #[arg(long, global = true)]
    pub no_sound: bool,

    /// Never send desktop notifications
    #[arg(long, global = true)]
    pub no_notify: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Save an image as a new capture
    Add(AddArgs),
    /// List captures, newest first
    List,
    /// Show one capture
    Show { id: String },
    /// Change a capture's metadata or reminder
    Edit(EditArgs),
    /// Delete a capture
    Delete { id: String },
    /// Write a capture's image (or voice note) to a file
    Export {
        id: String,
        path: PathBuf,
        /// Export the voice note instead of the image
        #[arg(long)]
        voice: bool,
    },
    /// Show or change the color theme
    Theme {
        #[command(subcommand)]
        action: Option<ThemeAction>,
    },
    /// Configure alarm sound
    Sound(SoundArgs),
    /// Print the alarm state as JSON
    Status,
    /// Run the reminder scheduler in the foreground
    Watch,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Image file to import
    pub image: PathBuf,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub note: Option<String>,
    /// Recorded voice memo to attach
    #[arg(long)]
    pub voice: Option<PathBuf>,
    /// RFC 3339, "YYYY-MM-DD HH:MM" (local) or +<n><s|m|h|d>
    #[arg(long)]
    pub remind_at: Option<String>,
    #[arg(long, requires = "remind_at")]
    pub urgent: bool,
}

#[derive(Args, Debug, Default)]
pub struct EditArgs {
    pub id: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub summary: Option<String>,
    #[arg(long, conflicts_with = "clear_note")]
    pub note: Option<String>,
    #[arg(long)]
    pub clear_note: bool,
    #[arg(long, conflicts_with = "clear_voice")]
    pub voice: Option<PathBuf>,
    #[arg(long)]
    pub clear_voice: bool,
    #[arg(long, conflicts_with = "clear_reminder")]
    pub remind_at: Option<String>,
    #[arg(long)]
    pub clear_reminder: bool,
    #[arg(long, conflicts_with_all = ["not_urgent", "toggle_urgent"])]
    pub urgent: bool,
    #[arg(long, conflicts_with = "toggle_urgent")]
    pub not_urgent: bool,
    #[arg(long)]
    pub toggle_urgent: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ThemeAction {
    /// Print the current theme
    Show,
    /// Set the theme explicitly
    Set { theme: String },
    /// Switch between dark and light
    Toggle,
}

#[derive(Args, Debug)]
pub struct SoundArgs {
    #[arg(long, conflicts_with = "disable")]
    pub enable: bool,
    #[arg(long)]
    pub disable: bool,
    /// Alarm volume between 0.0 and 1.0
    #[arg(long)]
    pub volume: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn urgent_edit_flags_conflict() {
        let result = Cli::try_parse_from(["screenmind", "edit", "abc", "--urgent", "--not-urgent"]);
        assert!(result.is_err());
    }

    #[test]
    fn add_urgent_needs_reminder() {
        assert!(Cli::try_parse_from(["screenmind", "add", "shot.png", "--urgent"]).is_err());
        assert!(Cli::try_parse_from([
            "screenmind",
            "add",
            "shot.png",
            "--urgent",
            "--remind-at",
            "+5m"
        ])
        .is_ok());
    }
}
