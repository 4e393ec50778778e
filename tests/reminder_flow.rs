use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use screenmind_lib::{
    audio::{TonePattern, TonePlayer},
    db::Database,
    models::{CaptureRecord, Payload, RecordEdit},
    notify::NotificationSink,
    reminder::{AlarmEvent, AlarmPresenter, AlarmState, ReminderController, TickOutcome},
    settings::AlarmSoundSettings,
    store::{RecordStore, MAX_PERSISTED_RECORDS, RECORDS_KEY},
};

#[derive(Default)]
struct RecordingPlayer {
    patterns: Mutex<Vec<TonePattern>>,
    stops: Mutex<usize>,
}

impl TonePlayer for RecordingPlayer {
    fn play(&self, pattern: TonePattern, _volume: f32) -> Result<(), String> {
        self.patterns.lock().unwrap().push(pattern);
        Ok(())
    }

    fn stop(&self) {
        *self.stops.lock().unwrap() += 1;
    }
}

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl NotificationSink for RecordingNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
        Ok(())
    }
}

struct Harness {
    db: Database,
    controller: ReminderController,
    player: Arc<RecordingPlayer>,
    notifier: Arc<RecordingNotifier>,
    dir: tempfile::TempDir,
}

async fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(dir.path().join("screenmind.sqlite3")).unwrap();
    let player = Arc::new(RecordingPlayer::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let presenter = AlarmPresenter::new(
        player.clone(),
        Some(notifier.clone() as Arc<dyn NotificationSink>),
        AlarmSoundSettings::default(),
    );
    let store = RecordStore::load(db.clone()).await;
    Harness {
        db,
        controller: ReminderController::new(store, Arc::new(presenter)),
        player,
        notifier,
        dir,
    }
}

fn image() -> Payload {
    Payload::new("image/png", b"\x89PNG\r\n\x1a\n".to_vec())
}

fn with_reminder(title: &str, created: DateTime<Utc>, due: DateTime<Utc>) -> CaptureRecord {
    let mut record = CaptureRecord::new(image(), title, created);
    record.set_reminder(due, created).unwrap();
    record
}

#[tokio::test]
async fn overdue_reminders_alarm_one_at_a_time() {
    let h = harness().await;
    let t0 = Utc::now();
    let a = with_reminder("A", t0, t0 + Duration::minutes(1));
    let b = with_reminder("B", t0, t0 + Duration::minutes(2));
    h.controller.capture(b.clone()).await.unwrap();
    h.controller.capture(a.clone()).await.unwrap();

    let now = t0 + Duration::minutes(5);
    let TickOutcome::Raised(first) = h.controller.tick_at(now).await else {
        panic!("expected A to alarm");
    };
    assert_eq!(first.record_id, a.id);

    // B stays queued while A is unacknowledged
    assert!(matches!(
        h.controller.tick_at(now).await,
        TickOutcome::StillAlarming(ref alarm) if alarm.record_id == a.id
    ));

    let dismissed = h.controller.dismiss().await.unwrap().unwrap();
    assert_eq!(dismissed.record_id, a.id);
    assert!(h.controller.active_alarm().await.is_none());
    assert!(h.controller.get(&a.id).await.unwrap().reminder_acknowledged());

    let TickOutcome::Raised(second) = h.controller.tick_at(now).await else {
        panic!("expected B to alarm");
    };
    assert_eq!(second.record_id, b.id);

    h.controller.dismiss().await.unwrap();
    assert_eq!(h.controller.tick_at(now).await, TickOutcome::Idle);
}

#[tokio::test]
async fn urgent_alarm_uses_urgent_tone_and_notification() {
    let h = harness().await;
    let t0 = Utc::now();
    let mut record = with_reminder("Boarding", t0, t0 + Duration::seconds(30));
    record.set_urgent(true).unwrap();
    h.controller.capture(record).await.unwrap();

    h.controller.tick_at(t0 + Duration::minutes(1)).await;

    assert_eq!(
        h.player.patterns.lock().unwrap().as_slice(),
        &[TonePattern::urgent()]
    );
    let sent = h.notifier.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "🚨 URGENT ALARM: Boarding");
}

#[tokio::test]
async fn view_details_dismisses_and_returns_the_record() {
    let h = harness().await;
    let mut events = h.controller.subscribe();
    let t0 = Utc::now();
    let record = with_reminder("Receipt", t0, t0 + Duration::seconds(1));
    h.controller.capture(record.clone()).await.unwrap();
    h.controller.tick_at(t0 + Duration::seconds(5)).await;

    let shown = h.controller.view_details().await.unwrap().unwrap();
    assert_eq!(shown.id, record.id);
    assert!(shown.reminder_acknowledged());
    assert_eq!(*h.player.stops.lock().unwrap(), 1);

    assert!(matches!(events.recv().await, Ok(AlarmEvent::Raised(_))));
    assert!(matches!(events.recv().await, Ok(AlarmEvent::Dismissed(_))));
    assert!(h.controller.view_details().await.unwrap().is_none());
}

#[tokio::test]
async fn rescheduled_reminder_alarms_again_after_acknowledgement() {
    let h = harness().await;
    let t0 = Utc::now();
    let record = with_reminder("Call back", t0, t0 + Duration::seconds(1));
    h.controller.capture(record.clone()).await.unwrap();

    let t1 = t0 + Duration::minutes(1);
    h.controller.tick_at(t1).await;
    h.controller.dismiss().await.unwrap();
    assert_eq!(h.controller.tick_at(t1).await, TickOutcome::Idle);

    h.controller
        .edit(
            &record.id,
            &[RecordEdit::SetReminder(t1 + Duration::minutes(10))],
            t1,
        )
        .await
        .unwrap();
    assert_eq!(h.controller.tick_at(t1).await, TickOutcome::Idle);
    assert!(matches!(
        h.controller.tick_at(t1 + Duration::minutes(11)).await,
        TickOutcome::Raised(_)
    ));
}

#[tokio::test]
async fn past_reminder_edit_leaves_record_unchanged() {
    let h = harness().await;
    let now = Utc::now().trunc_subsecs(3);
    let record = with_reminder("Invoice", now, now + Duration::hours(1));
    h.controller.capture(record.clone()).await.unwrap();

    let result = h
        .controller
        .edit(
            &record.id,
            &[
                RecordEdit::SetTitle("Renamed".into()),
                RecordEdit::SetReminder(now - Duration::minutes(5)),
            ],
            now,
        )
        .await;
    assert!(result.is_err());

    let stored = h.controller.get(&record.id).await.unwrap();
    assert_eq!(stored, record);
}

#[tokio::test]
async fn only_the_newest_twenty_records_survive_a_restart() {
    let h = harness().await;
    let t0 = Utc::now();
    for i in 0..25 {
        let record = CaptureRecord::new(image(), format!("capture {i}"), t0 + Duration::seconds(i));
        h.controller.capture(record).await.unwrap();
    }
    assert_eq!(h.controller.list().await.len(), 25);

    let reopened = Database::new(h.dir.path().join("screenmind.sqlite3")).unwrap();
    let reloaded = RecordStore::load(reopened).await;
    assert_eq!(reloaded.len(), MAX_PERSISTED_RECORDS);
    let titles: Vec<_> = reloaded
        .sorted_newest_first()
        .into_iter()
        .map(|r| r.title)
        .collect();
    assert_eq!(titles.first().map(String::as_str), Some("capture 24"));
    assert_eq!(titles.last().map(String::as_str), Some("capture 5"));
}

#[tokio::test]
async fn records_round_trip_through_the_database() {
    let h = harness().await;
    // Timestamps are persisted with millisecond precision
    let now = Utc::now().trunc_subsecs(3);
    let mut record = with_reminder("Parking", now, now + Duration::hours(2));
    record.note = Some("level 3, bay 12".into());
    record.voice_note = Some(Payload::new("audio/webm", vec![1, 2, 3, 4]));
    record.set_urgent(true).unwrap();
    h.controller.capture(record.clone()).await.unwrap();

    let reloaded = RecordStore::load(h.db.clone()).await;
    assert_eq!(reloaded.get(&record.id), Some(&record));
}

#[tokio::test]
async fn malformed_storage_starts_empty() {
    let h = harness().await;
    h.db
        .set_value(RECORDS_KEY, "{ definitely not a list".to_string())
        .await
        .unwrap();

    let store = RecordStore::load(h.db.clone()).await;
    assert!(store.is_empty());

    let controller = ReminderController::new(
        store,
        Arc::new(AlarmPresenter::new(
            h.player.clone(),
            None,
            AlarmSoundSettings::default(),
        )),
    );
    let status = controller.status(Utc::now()).await;
    assert_eq!(status.records, 0);
    assert_eq!(status.state, AlarmState::Idle);
}

async fn second_controller(h: &Harness) -> ReminderController {
    let db = Database::new(h.dir.path().join("screenmind.sqlite3")).unwrap();
    let presenter = AlarmPresenter::new(
        Arc::new(RecordingPlayer::default()),
        None,
        AlarmSoundSettings::default(),
    );
    ReminderController::new(RecordStore::load(db).await, Arc::new(presenter))
}

#[tokio::test]
async fn watcher_sees_records_added_by_another_process() {
    let h = harness().await;
    let other = second_controller(&h).await;
    let t0 = Utc::now();

    let mine = with_reminder("from watch", t0, t0 + Duration::seconds(1));
    h.controller.capture(mine.clone()).await.unwrap();
    let theirs = with_reminder("from add", t0, t0 + Duration::seconds(2));
    other.capture(theirs.clone()).await.unwrap();

    let now = t0 + Duration::minutes(1);
    let TickOutcome::Raised(first) = h.controller.tick_at(now).await else {
        panic!("expected the first reminder to alarm");
    };
    assert_eq!(first.record_id, mine.id);
    h.controller.dismiss().await.unwrap();

    let TickOutcome::Raised(second) = h.controller.tick_at(now).await else {
        panic!("expected the reminder written by the other controller to alarm");
    };
    assert_eq!(second.record_id, theirs.id);
    h.controller.dismiss().await.unwrap();

    let reloaded = RecordStore::load(h.db.clone()).await;
    assert_eq!(reloaded.len(), 2);
    assert!(reloaded.get(&mine.id).unwrap().reminder_acknowledged());
    assert!(reloaded.get(&theirs.id).unwrap().reminder_acknowledged());
}

#[tokio::test]
async fn alarm_is_withdrawn_when_another_process_deletes_its_record() {
    let h = harness().await;
    let other = second_controller(&h).await;
    let mut events = h.controller.subscribe();
    let t0 = Utc::now();

    let record = with_reminder("Gone soon", t0, t0 + Duration::seconds(1));
    h.controller.capture(record.clone()).await.unwrap();
    let now = t0 + Duration::minutes(1);
    assert!(matches!(h.controller.tick_at(now).await, TickOutcome::Raised(_)));

    assert!(other.delete(&record.id).await.unwrap());
    assert_eq!(h.controller.tick_at(now).await, TickOutcome::Idle);
    assert!(h.controller.active_alarm().await.is_none());

    assert!(matches!(events.recv().await, Ok(AlarmEvent::Raised(_))));
    assert!(matches!(events.recv().await, Ok(AlarmEvent::Withdrawn(_))));
    assert!(RecordStore::load(h.db.clone()).await.is_empty());
}
