//! Record store: the canonical in-memory capture collection, mirrored to the
//! key-value database as one JSON document.

use anyhow::{Context, Result};
use log::{error, info, warn};

use crate::db::Database;
use crate::error::EditError;
use crate::models::CaptureRecord;

pub const RECORDS_KEY: &str = "screenmind_data";

/// Durable storage only keeps this many records, newest by capture time.
pub const MAX_PERSISTED_RECORDS: usize = 20;

pub struct RecordStore {
    db: Database,
    records: Vec<CaptureRecord>,
}

impl RecordStore {
    /// Restores the collection. Unreadable or malformed data yields an empty
    /// store; this never fails startup.
    pub async fn load(db: Database) -> Self {
        let records = match read_stored(&db).await {
            Ok(Some(records)) => {
                info!("Loaded {} capture records", records.len());
                records
            }
            Ok(None) => Vec::new(),
            Err(err) => {
                error!("Stored capture records are unusable, starting empty: {err:#}");
                Vec::new()
            }
        };

        Self { db, records }
    }

    /// Re-reads durable storage so writes from other processes are seen.
    ///
    /// Stored records replace the in-memory set. Records only held in memory
    /// survive when storage is full and they are older than everything stored,
    /// i.e. they were cut by bounded persistence rather than deleted. An
    /// unreadable or malformed payload keeps the in-memory set.
    pub async fn refresh(&mut self) {
        let stored = match read_stored(&self.db).await {
            Ok(Some(stored)) => stored,
            Ok(None) => return,
            Err(err) => {
                warn!("Keeping in-memory capture records, storage is unusable: {err:#}");
                return;
            }
        };

        let oldest_stored = stored.iter().map(|record| record.created_at).min();
        let storage_full = stored.len() >= MAX_PERSISTED_RECORDS;
        let truncated: Vec<CaptureRecord> = std::mem::take(&mut self.records)
            .into_iter()
            .filter(|record| {
                storage_full
                    && oldest_stored.is_some_and(|oldest| record.created_at < oldest)
                    && !stored.iter().any(|s| s.id == record.id)
            })
            .collect();

        self.records = stored;
        self.records.extend(truncated);
    }

    pub fn records(&self) -> &[CaptureRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&CaptureRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    /// List view order: newest capture first.
    pub fn sorted_newest_first(&self) -> Vec<CaptureRecord> {
        let mut sorted = self.records.clone();
        sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sorted
    }

    pub async fn save(&self) -> Result<()> {
        let bounded = bounded_snapshot(&self.records, MAX_PERSISTED_RECORDS);
        if bounded.len() < self.records.len() {
            warn!(
                "Persisting {} of {} records; older captures are dropped from storage",
                bounded.len(),
                self.records.len()
            );
        }
        let serialized =
            serde_json::to_string(&bounded).context("failed to serialize capture records")?;
        self.db
            .set_value(RECORDS_KEY, serialized)
            .await
            .context("failed to persist capture records")
    }

    /// Inserts a new record at the front, or replaces the record with the same id.
    pub async fn upsert(&mut self, record: CaptureRecord) -> Result<()> {
        self.refresh().await;
        self.put(record);
        self.save().await
    }

    /// Returns whether a record was removed. Unknown ids are not an error.
    pub async fn remove(&mut self, id: &str) -> Result<bool> {
        self.refresh().await;
        let before = self.records.len();
        self.records.retain(|record| record.id != id);
        if self.records.len() == before {
            return Ok(false);
        }
        self.save().await?;
        Ok(true)
    }

    /// Runs `edit` against a copy of the record and stores it only on success.
    pub async fn update<F>(&mut self, id: &str, edit: F) -> Result<CaptureRecord>
    where
        F: FnOnce(&mut CaptureRecord) -> Result<(), EditError>,
    {
        self.refresh().await;
        let mut updated = self
            .get(id)
            .cloned()
            .ok_or_else(|| EditError::NotFound(id.to_string()))?;
        edit(&mut updated)?;
        self.put(updated.clone());
        self.save().await?;
        Ok(updated)
    }

    fn put(&mut self, record: CaptureRecord) {
        match self.records.iter_mut().find(|existing| existing.id == record.id) {
            Some(existing) => *existing = record,
            None => self.records.insert(0, record),
        }
    }
}

async fn read_stored(db: &Database) -> Result<Option<Vec<CaptureRecord>>> {
    let Some(raw) = db.get_value(RECORDS_KEY).await? else {
        return Ok(None);
    };
    let mut records: Vec<CaptureRecord> =
        serde_json::from_str(&raw).context("stored capture records are malformed")?;
    records.iter_mut().for_each(CaptureRecord::normalize);
    dedupe_ids(&mut records);
    Ok(Some(records))
}

/// The records that fit in durable storage, in collection order.
pub fn bounded_snapshot(records: &[CaptureRecord], limit: usize) -> Vec<&CaptureRecord> {
    if records.len() <= limit {
        return records.iter().collect();
    }

    let mut by_recency: Vec<usize> = (0..records.len()).collect();
    by_recency.sort_by(|&a, &b| records[b].created_at.cmp(&records[a].created_at));
    let mut keep = vec![false; records.len()];
    for &index in by_recency.iter().take(limit) {
        keep[index] = true;
    }

    records
        .iter()
        .zip(keep)
        .filter_map(|(record, keep)| keep.then_some(record))
        .collect()
}

fn dedupe_ids(records: &mut Vec<CaptureRecord>) {
    let mut seen = std::collections::HashSet::new();
    records.retain(|record| {
        let fresh = seen.insert(record.id.clone());
        if !fresh {
            warn!("Dropping stored record with duplicate id {}", record.id);
        }
        fresh
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Payload, RecordEdit};
    use chrono::{DateTime, Duration, SubsecRound, Utc};

    fn record_at(created_at: DateTime<Utc>, title: &str) -> CaptureRecord {
        CaptureRecord::new(Payload::new("image/png", vec![7; 4]), title, created_at)
    }

    #[tokio::test]
    async fn malformed_payload_loads_empty() {
        let db = Database::in_memory().unwrap();
        db.set_value(RECORDS_KEY, "{not json".into()).await.unwrap();

        let store = RecordStore::load(db).await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn round_trip_preserves_order_and_fields() {
        let db = Database::in_memory().unwrap();
        let base = Utc::now();
        let mut store = RecordStore::load(db.clone()).await;

        for i in 0..5 {
            let mut rec = record_at(base + Duration::seconds(i), &format!("r{i}"));
            rec.note = Some(format!("note {i}"));
            if i % 2 == 0 {
                rec.set_reminder(base + Duration::hours(1), base).unwrap();
                rec.set_urgent(i == 2).unwrap();
            }
            store.upsert(rec).await.unwrap();
        }

        let reloaded = RecordStore::load(db).await;
        assert_eq!(reloaded.records().len(), 5);
        // Timestamps are stored at millisecond precision
        for (a, b) in store.records().iter().zip(reloaded.records()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.title, b.title);
            assert_eq!(a.note, b.note);
            assert_eq!(a.image, b.image);
            assert_eq!(a.is_urgent(), b.is_urgent());
            assert_eq!(
                a.created_at.timestamp_millis(),
                b.created_at.timestamp_millis()
            );
            assert_eq!(
                a.reminder_at().map(|t| t.timestamp_millis()),
                b.reminder_at().map(|t| t.timestamp_millis())
            );
        }
    }

    #[tokio::test]
    async fn storage_keeps_twenty_most_recent() {
        let db = Database::in_memory().unwrap();
        let base = Utc::now();
        let mut store = RecordStore::load(db.clone()).await;

        for i in 0..25 {
            store
                .upsert(record_at(base + Duration::seconds(i), &format!("r{i}")))
                .await
                .unwrap();
        }
        assert_eq!(store.len(), 25);

        let reloaded = RecordStore::load(db).await;
        assert_eq!(reloaded.len(), MAX_PERSISTED_RECORDS);
        let titles: Vec<_> = reloaded
            .sorted_newest_first()
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(titles.first().map(String::as_str), Some("r24"));
        assert_eq!(titles.last().map(String::as_str), Some("r5"));
    }

    #[tokio::test]
    async fn upsert_replaces_in_place_and_remove_is_idempotent() {
        let db = Database::in_memory().unwrap();
        let now = Utc::now();
        let mut store = RecordStore::load(db).await;

        let first = record_at(now, "first");
        let second = record_at(now + Duration::seconds(1), "second");
        store.upsert(first.clone()).await.unwrap();
        store.upsert(second.clone()).await.unwrap();

        let mut renamed = first.clone();
        renamed.title = "renamed".into();
        store.upsert(renamed).await.unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.records()[1].title, "renamed");

        assert!(store.remove(&first.id).await.unwrap());
        assert!(!store.remove(&first.id).await.unwrap());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn failed_update_leaves_record_untouched() {
        let db = Database::in_memory().unwrap();
        let now = Utc::now().trunc_subsecs(3);
        let mut store = RecordStore::load(db).await;
        let rec = record_at(now, "keep");
        let id = rec.id.clone();
        store.upsert(rec.clone()).await.unwrap();

        let err = store
            .update(&id, |r| {
                r.apply(&[RecordEdit::SetReminder(now - Duration::minutes(1))], now)
            })
            .await
            .unwrap_err();
        assert!(err.downcast_ref::<EditError>().is_some());
        assert_eq!(store.get(&id), Some(&rec));

        let missing = store.update("nope", |_| Ok(())).await.unwrap_err();
        assert_eq!(
            missing.downcast_ref::<EditError>(),
            Some(&EditError::NotFound("nope".into()))
        );
    }

    #[tokio::test]
    async fn refresh_sees_writes_from_another_store() {
        let db = Database::in_memory().unwrap();
        let now = Utc::now();
        let mut ours = RecordStore::load(db.clone()).await;
        let kept = record_at(now, "ours");
        ours.upsert(kept.clone()).await.unwrap();

        let mut theirs = RecordStore::load(db.clone()).await;
        let added = record_at(now + Duration::seconds(1), "theirs");
        theirs.upsert(added.clone()).await.unwrap();
        assert!(theirs.remove(&kept.id).await.unwrap());

        ours.refresh().await;
        assert_eq!(ours.len(), 1);
        assert!(ours.get(&added.id).is_some());
        assert!(ours.get(&kept.id).is_none());
    }

    #[tokio::test]
    async fn refresh_keeps_memory_when_storage_is_malformed() {
        let db = Database::in_memory().unwrap();
        let mut store = RecordStore::load(db.clone()).await;
        store.upsert(record_at(Utc::now(), "a")).await.unwrap();

        db.set_value(RECORDS_KEY, "[{\"broken\"".into()).await.unwrap();
        store.refresh().await;
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn upsert_does_not_drop_records_written_elsewhere() {
        let db = Database::in_memory().unwrap();
        let now = Utc::now();
        let mut first = RecordStore::load(db.clone()).await;
        let mut second = RecordStore::load(db.clone()).await;

        second.upsert(record_at(now, "from second")).await.unwrap();
        first.upsert(record_at(now, "from first")).await.unwrap();

        let reloaded = RecordStore::load(db).await;
        assert_eq!(reloaded.len(), 2);
    }

    #[test]
    fn bounded_snapshot_keeps_collection_order() {
        let base = Utc::now();
        // Collection order deliberately differs from recency order
        let records = vec![
            record_at(base + Duration::seconds(2), "b"),
            record_at(base, "oldest"),
            record_at(base + Duration::seconds(3), "c"),
        ];
        let kept: Vec<_> = bounded_snapshot(&records, 2)
            .into_iter()
            .map(|r| r.title.as_str())
            .collect();
        assert_eq!(kept, vec!["b", "c"]);
    }
}
