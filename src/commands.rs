use std::future::Future;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Local, Utc};
use log::{info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use crate::{
    capture::{self, CaptureDraft},
    cli::{AddArgs, Command, EditArgs, SoundArgs, ThemeAction},
    models::{CaptureRecord, RecordEdit, Theme},
    reminder::{banner_lines, ActiveAlarm, AlarmEvent, ReminderController},
    settings::{load_theme, save_theme},
    AppState,
};

pub async fn dispatch(state: &AppState, command: Command) -> Result<()> {
    match command {
        Command::Add(args) => add(state, args).await,
        Command::List => list(state).await,
        Command::Show { id } => show(state, &id).await,
        Command::Edit(args) => edit(state, args).await,
        Command::Delete { id } => delete(state, &id).await,
        Command::Export { id, path, voice } => export(state, &id, &path, voice).await,
        Command::Theme { action } => theme(state, action.unwrap_or(ThemeAction::Show)).await,
        Command::Sound(args) => sound(state, args),
        Command::Status => status(state).await,
        Command::Watch => watch(state).await,
    }
}

async fn add(state: &AppState, args: AddArgs) -> Result<()> {
    let now = Utc::now();
    let mut draft = CaptureDraft::from_image_file(&args.image)?;
    draft.title = args.title;
    draft.note = args.note;
    draft.voice_note = args
        .voice
        .as_deref()
        .map(capture::load_voice_note)
        .transpose()?;
    draft.reminder_at = args
        .remind_at
        .as_deref()
        .map(|input| capture::parse_reminder_input(input, now))
        .transpose()?;
    draft.is_urgent = args.urgent;

    let analysis = capture::analyze_or_default(state.analyzer.as_deref(), &draft.image);
    let record = capture::finalize(draft, analysis, now)?;
    let record = state.controller.capture(record).await?;
    println!("{}", record.id);
    Ok(())
}

async fn list(state: &AppState) -> Result<()> {
    let records = state.controller.list().await;
    if records.is_empty() {
        println!("No captures yet.");
        return Ok(());
    }

    let now = Utc::now();
    println!("ARCHIVE ({})", records.len());
    for record in &records {
        let mut line = format!(
            "{}  {}  {}",
            record.id,
            local_time(record.created_at),
            record.title
        );
        if let Some(reminder) = reminder_label(record, now) {
            line.push_str("  ");
            line.push_str(&reminder);
        }
        println!("{line}");
    }
    Ok(())
}

async fn show(state: &AppState, id: &str) -> Result<()> {
    let record = state.controller.require(id).await?;
    print_record(&record, Utc::now());
    Ok(())
}

fn edits_from_args(args: &EditArgs, now: DateTime<Utc>) -> Result<Vec<RecordEdit>> {
    let mut edits = Vec::new();
    if let Some(title) = &args.title {
        edits.push(RecordEdit::SetTitle(title.clone()));
    }
    if let Some(summary) = &args.summary {
        edits.push(RecordEdit::SetSummary(summary.clone()));
    }
    if let Some(note) = &args.note {
        edits.push(RecordEdit::SetNote(note.clone()));
    }
    if args.clear_note {
        edits.push(RecordEdit::ClearNote);
    }
    if let Some(path) = &args.voice {
        edits.push(RecordEdit::SetVoiceNote(capture::load_voice_note(path)?));
    }
    if args.clear_voice {
        edits.push(RecordEdit::ClearVoiceNote);
    }
    if let Some(input) = &args.remind_at {
        edits.push(RecordEdit::SetReminder(capture::parse_reminder_input(input, now)?));
    }
    if args.clear_reminder {
        edits.push(RecordEdit::ClearReminder);
    }
    if args.urgent {
        edits.push(RecordEdit::SetUrgent(true));
    }
    if args.not_urgent {
        edits.push(RecordEdit::SetUrgent(false));
    }
    if args.toggle_urgent {
        edits.push(RecordEdit::ToggleUrgent);
    }
    Ok(edits)
}

async fn edit(state: &AppState, args: EditArgs) -> Result<()> {
    let now = Utc::now();
    let edits = edits_from_args(&args, now)?;
    if edits.is_empty() {
        bail!("nothing to change; see `screenmind edit --help`");
    }
    let record = state.controller.edit(&args.id, &edits, now).await?;
    print_record(&record, now);
    Ok(())
}

async fn delete(state: &AppState, id: &str) -> Result<()> {
    if state.controller.delete(id).await? {
        println!("Deleted {id}");
    } else {
        println!("No capture with id {id}");
    }
    Ok(())
}

async fn export(state: &AppState, id: &str, path: &std::path::Path, voice: bool) -> Result<()> {
    let record = state.controller.require(id).await?;
    let payload = if voice {
        record
            .voice_note
            .ok_or_else(|| anyhow!("capture {id} has no voice note"))?
    } else {
        record.image
    };
    tokio::fs::write(path, &payload.bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote {} bytes ({}) to {}", payload.len(), payload.mime, path.display());
    Ok(())
}

async fn theme(state: &AppState, action: ThemeAction) -> Result<()> {
    let current = load_theme(&state.db).await;
    let next = match action {
        ThemeAction::Show => {
            println!("{}", current.as_str());
            return Ok(());
        }
        ThemeAction::Set { theme } => Theme::parse(&theme)
            .ok_or_else(|| anyhow!("unknown theme '{theme}'; use dark or light"))?,
        ThemeAction::Toggle => current.toggled(),
    };
    save_theme(&state.db, next).await?;
    println!("{}", next.as_str());
    Ok(())
}

fn sound(state: &AppState, args: SoundArgs) -> Result<()> {
    let mut settings = state.settings.alarm_sound();
    if args.enable {
        settings.enabled = true;
    }
    if args.disable {
        settings.enabled = false;
    }
    if let Some(volume) = args.volume {
        if !(0.0..=1.0).contains(&volume) {
            bail!("volume must be between 0.0 and 1.0");
        }
        settings.volume = volume;
    }
    state.settings.update_alarm_sound(settings.clone())?;
    state.controller.presenter().set_sound(settings.clone());
    println!(
        "Alarm sound {} (volume {:.2})",
        if settings.enabled { "on" } else { "off" },
        settings.volume
    );
    Ok(())
}

async fn status(state: &AppState) -> Result<()> {
    let status = state.controller.status(Utc::now()).await;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

async fn watch(state: &AppState) -> Result<()> {
    println!("Watching reminders. Enter d = dismiss, v = view details, q = quit.");
    let input = BufReader::new(tokio::io::stdin());
    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };
    watch_loop(&state.controller, input, shutdown).await
}

/// Runs the scheduler until `q`, or until `shutdown` resolves. Closed input
/// only stops command handling; alarms keep firing.
async fn watch_loop<R, S>(controller: &ReminderController, input: R, shutdown: S) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    S: Future<Output = ()>,
{
    let mut events = controller.subscribe();
    controller.start().await?;
    tokio::pin!(shutdown);

    let mut lines = input.lines();
    let mut input_open = true;
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(AlarmEvent::Raised(alarm)) => print_banner(&alarm),
                Ok(AlarmEvent::Withdrawn(alarm)) => {
                    println!("Alarm for '{}' withdrawn", alarm.title)
                }
                Ok(AlarmEvent::Repeated(_)) | Ok(AlarmEvent::Dismissed(_)) => {}
                Err(RecvError::Lagged(skipped)) => warn!("Missed {skipped} alarm events"),
                Err(RecvError::Closed) => break,
            },
            line = lines.next_line(), if input_open => {
                let Some(line) = line.context("failed to read stdin")? else {
                    info!("Input closed; press ctrl-c to stop watching");
                    input_open = false;
                    continue;
                };
                match line.trim() {
                    "d" | "dismiss" => match controller.dismiss().await? {
                        Some(alarm) => println!("Dismissed '{}'", alarm.title),
                        None => println!("No active alarm"),
                    },
                    "v" | "view" => match controller.view_details().await? {
                        Some(record) => print_record(&record, Utc::now()),
                        None => println!("No active alarm"),
                    },
                    "q" | "quit" => break,
                    "" => {}
                    other => println!("Unknown command '{other}'"),
                }
            }
            _ = &mut shutdown => break,
        }
    }

    controller.stop().await
}

fn print_banner(alarm: &ActiveAlarm) {
    let lines = banner_lines(alarm);
    let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) + 4;
    let border = "#".repeat(width);
    println!("\n{border}");
    for line in lines {
        println!("# {line:<inner$} #", inner = width - 4);
    }
    println!("{border}\n[d] dismiss   [v] view details");
}

fn print_record(record: &CaptureRecord, now: DateTime<Utc>) {
    println!("{}", record.title);
    println!("  id:       {}", record.id);
    println!("  captured: {}", local_time(record.created_at));
    println!("  image:    {} ({} bytes)", record.image.mime, record.image.len());
    if let Some(summary) = &record.summary {
        println!("  summary:  {summary}");
    }
    if let Some(note) = &record.note {
        println!("  note:     {note}");
    }
    if let Some(voice) = &record.voice_note {
        println!("  voice:    {} ({} bytes)", voice.mime, voice.len());
    }
    if let Some(reminder) = reminder_label(record, now) {
        println!("  reminder: {reminder}");
    }
}

fn reminder_label(record: &CaptureRecord, now: DateTime<Utc>) -> Option<String> {
    let at = record.reminder_at()?;
    let state = if record.reminder_acknowledged() {
        "done"
    } else if record.is_overdue(now) {
        "overdue"
    } else {
        "pending"
    };
    let urgency = if record.is_urgent() { " URGENT" } else { "" };
    Some(format!("{} [{state}{urgency}]", local_time(at)))
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}
