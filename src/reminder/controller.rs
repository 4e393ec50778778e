use std::{sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use log::{error, info};
use serde::Serialize;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::{
    error::EditError,
    models::{CaptureRecord, RecordEdit},
    store::RecordStore,
};

use super::{
    presenter::AlarmPresenter,
    scheduler::scheduler_loop,
    selection::{next_pending, overdue_count, select_due},
    ActiveAlarm, AlarmState,
};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AlarmEvent {
    Raised(ActiveAlarm),
    Repeated(ActiveAlarm),
    Dismissed(ActiveAlarm),
    /// The alarming record was deleted or rescheduled before dismissal.
    Withdrawn(ActiveAlarm),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Idle,
    Raised(ActiveAlarm),
    StillAlarming(ActiveAlarm),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderStatus {
    pub state: AlarmState,
    pub records: usize,
    pub overdue: usize,
    pub next_reminder_at: Option<DateTime<Utc>>,
}

struct Shared {
    store: RecordStore,
    alarm: AlarmState,
}

struct Ticker {
    handle: JoinHandle<()>,
    cancel_token: CancellationToken,
}

/// Owns the record collection and the single active-alarm slot.
///
/// Tick selection, edits, deletes and dismissal all serialize on one lock.
/// Presentation side effects run after the lock is released.
#[derive(Clone)]
pub struct ReminderController {
    shared: Arc<Mutex<Shared>>,
    presenter: Arc<AlarmPresenter>,
    events: broadcast::Sender<AlarmEvent>,
    ticker: Arc<Mutex<Option<Ticker>>>,
    tick_interval: Duration,
}

impl ReminderController {
    pub fn new(store: RecordStore, presenter: Arc<AlarmPresenter>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            shared: Arc::new(Mutex::new(Shared {
                store,
                alarm: AlarmState::default(),
            })),
            presenter,
            events,
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub fn presenter(&self) -> &AlarmPresenter {
        &self.presenter
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AlarmEvent> {
        self.events.subscribe()
    }

    pub async fn start(&self) -> Result<()> {
        let mut ticker = self.ticker.lock().await;
        if ticker.is_some() {
            bail!("reminder scheduler already running");
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(scheduler_loop(
            self.clone(),
            self.tick_interval,
            cancel_token.clone(),
        ));

        info!(
            "Reminder scheduler started (tick every {}s)",
            self.tick_interval.as_secs_f32()
        );
        *ticker = Some(Ticker {
            handle,
            cancel_token,
        });
        Ok(())
    }

    /// Stops future ticks. Safe to call when not running.
    pub async fn stop(&self) -> Result<()> {
        let Some(ticker) = self.ticker.lock().await.take() else {
            return Ok(());
        };
        ticker.cancel_token.cancel();
        ticker
            .handle
            .await
            .context("reminder scheduler task failed to join")
    }

    pub async fn is_running(&self) -> bool {
        self.ticker.lock().await.is_some()
    }

    pub async fn tick(&self) -> TickOutcome {
        self.tick_at(Utc::now()).await
    }

    /// One scheduler step at `now`. Re-reads storage first so reminders
    /// written by other processes are picked up.
    pub async fn tick_at(&self, now: DateTime<Utc>) -> TickOutcome {
        let (outcome, withdrawn) = {
            let mut shared = self.shared.lock().await;
            shared.store.refresh().await;

            let stale = shared
                .alarm
                .active()
                .is_some_and(|alarm| !alarm_is_current(&shared.store, alarm));
            let withdrawn = if stale { shared.alarm.clear() } else { None };

            let outcome = if let Some(active) = shared.alarm.active() {
                TickOutcome::StillAlarming(active.clone())
            } else {
                match select_due(shared.store.records(), now)
                    .and_then(|record| ActiveAlarm::from_record(record, now))
                {
                    Some(alarm) => {
                        shared.alarm.raise(alarm.clone());
                        TickOutcome::Raised(alarm)
                    }
                    None => TickOutcome::Idle,
                }
            };
            (outcome, withdrawn)
        };

        if let Some(alarm) = withdrawn {
            self.withdraw(alarm);
        }

        match &outcome {
            TickOutcome::Raised(alarm) => {
                let shown = self.presenter.present(alarm);
                info!(
                    "Alarm raised for '{}' (urgent: {}, tone queued: {}, notification: {})",
                    alarm.title, alarm.is_urgent, shown.tone_queued, shown.notified
                );
                let _ = self.events.send(AlarmEvent::Raised(alarm.clone()));
            }
            TickOutcome::StillAlarming(alarm) => {
                self.presenter.repeat(alarm);
                let _ = self.events.send(AlarmEvent::Repeated(alarm.clone()));
            }
            TickOutcome::Idle => {}
        }

        outcome
    }

    pub async fn active_alarm(&self) -> Option<ActiveAlarm> {
        self.shared.lock().await.alarm.active().cloned()
    }

    /// Acknowledges the active alarm's reminder and returns to idle.
    /// Does not pick the next overdue record; that waits for the next tick.
    pub async fn dismiss(&self) -> Result<Option<ActiveAlarm>> {
        let (alarm, persisted) = {
            let mut shared = self.shared.lock().await;
            let Some(alarm) = shared.alarm.clear() else {
                return Ok(None);
            };

            shared.store.refresh().await;
            let persisted = if alarm_is_current(&shared.store, &alarm) {
                shared
                    .store
                    .update(&alarm.record_id, |record| {
                        record.acknowledge();
                        Ok(())
                    })
                    .await
                    .map(|_| ())
            } else {
                Ok(())
            };
            (alarm, persisted)
        };

        self.presenter.silence();
        info!("Alarm dismissed for '{}'", alarm.title);
        let _ = self.events.send(AlarmEvent::Dismissed(alarm.clone()));

        if let Err(err) = &persisted {
            error!("Failed to persist acknowledgement: {err:?}");
        }
        persisted?;
        Ok(Some(alarm))
    }

    /// Dismisses the active alarm and returns its record for display.
    pub async fn view_details(&self) -> Result<Option<CaptureRecord>> {
        let Some(alarm) = self.dismiss().await? else {
            return Ok(None);
        };
        Ok(self.get(&alarm.record_id).await)
    }

    pub async fn capture(&self, record: CaptureRecord) -> Result<CaptureRecord> {
        let mut shared = self.shared.lock().await;
        if shared.store.get(&record.id).is_some() {
            bail!("record '{}' already exists", record.id);
        }
        shared.store.upsert(record.clone()).await?;
        info!("Captured '{}' ({})", record.title, record.id);
        Ok(record)
    }

    /// Applies a batch of edits atomically. A rejected batch leaves the record
    /// unchanged and is reported as an [`EditError`].
    pub async fn edit(
        &self,
        id: &str,
        edits: &[RecordEdit],
        now: DateTime<Utc>,
    ) -> Result<CaptureRecord> {
        let (updated, withdrawn) = {
            let mut shared = self.shared.lock().await;
            let updated = shared
                .store
                .update(id, |record| record.apply(edits, now))
                .await?;

            let rescheduled = shared.alarm.active().is_some_and(|alarm| {
                alarm.record_id == updated.id && updated.reminder_at() != Some(alarm.reminder_at)
            });
            let withdrawn = if rescheduled {
                shared.alarm.clear()
            } else {
                None
            };
            (updated, withdrawn)
        };

        if let Some(alarm) = withdrawn {
            self.withdraw(alarm);
        }
        Ok(updated)
    }

    /// Deletes a record; clears it as the active alarm if it was one.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let (removed, withdrawn) = {
            let mut shared = self.shared.lock().await;
            let withdrawn = if shared
                .alarm
                .active()
                .is_some_and(|alarm| alarm.record_id == id)
            {
                shared.alarm.clear()
            } else {
                None
            };
            (shared.store.remove(id).await, withdrawn)
        };

        if let Some(alarm) = withdrawn {
            self.withdraw(alarm);
        }
        removed
    }

    pub async fn get(&self, id: &str) -> Option<CaptureRecord> {
        self.shared.lock().await.store.get(id).cloned()
    }

    pub async fn require(&self, id: &str) -> Result<CaptureRecord> {
        self.get(id)
            .await
            .ok_or_else(|| EditError::NotFound(id.to_string()).into())
    }

    /// Newest capture first.
    pub async fn list(&self) -> Vec<CaptureRecord> {
        self.shared.lock().await.store.sorted_newest_first()
    }

    pub async fn status(&self, now: DateTime<Utc>) -> ReminderStatus {
        let shared = self.shared.lock().await;
        let records = shared.store.records();
        ReminderStatus {
            state: shared.alarm.clone(),
            records: records.len(),
            overdue: overdue_count(records, now),
            next_reminder_at: next_pending(records, now),
        }
    }

    fn withdraw(&self, alarm: ActiveAlarm) {
        self.presenter.silence();
        info!("Alarm for '{}' withdrawn", alarm.title);
        let _ = self.events.send(AlarmEvent::Withdrawn(alarm));
    }
}

/// The alarm's record still exists with the same, unacknowledged reminder.
fn alarm_is_current(store: &RecordStore, alarm: &ActiveAlarm) -> bool {
    store.get(&alarm.record_id).is_some_and(|record| {
        record.reminder_at() == Some(alarm.reminder_at) && !record.reminder_acknowledged()
    })
}
