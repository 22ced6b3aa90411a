//! Persistent storage for moves, events and alerts using redb.
//!
//! # Table design
//!
//! | Table            | Key                                   | Value            |
//! |------------------|---------------------------------------|------------------|
//! | `moves`          | move uuid (16 bytes)                  | JSON `Move`      |
//! | `move_sequences` | sequence number (u64)                 | move uuid        |
//! | `events`         | move uuid ++ ts_ms BE ++ event uuid   | JSON `Event`     |
//! | `event_index`    | event uuid                            | `events` key     |
//! | `alerts`         | move uuid ++ alert uuid               | JSON `Alert`     |
//! | `alert_index`    | alert uuid                            | move uuid        |
//! | `meta`           | name                                  | u64 counter      |
//!
//! The move uuid prefix groups a move's events together and the big-endian
//! timestamp orders them within the group, so a reverse range scan over the
//! prefix yields a move's history newest first.
//!
//! Every mutation goes through [`MoveStore::commit`], which compares the
//! stored move version against the caller's expected version and writes the
//! move row, its events and its alerts in a single write transaction.

use std::ops::Bound;
use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableTable, TableDefinition, WriteTransaction};
use uuid::Uuid;

use crate::alert::Alert;
use crate::error::{Result, TrackError};
use crate::event::{Event, EventFilter, EventPage};
use crate::moves::Move;

// ---------------------------------------------------------------------------
// Table definitions
// ---------------------------------------------------------------------------

const MOVES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("moves");
const SEQUENCES: TableDefinition<u64, &[u8]> = TableDefinition::new("move_sequences");
const EVENTS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("events");
const EVENT_INDEX: TableDefinition<&[u8], &[u8]> = TableDefinition::new("event_index");
const ALERTS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("alerts");
const ALERT_INDEX: TableDefinition<&[u8], &[u8]> = TableDefinition::new("alert_index");
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

const NEXT_SEQUENCE: &str = "next_sequence";

// ---------------------------------------------------------------------------
// Key helpers
// ---------------------------------------------------------------------------

fn event_key(move_id: Uuid, ts: DateTime<Utc>, id: Uuid) -> [u8; 40] {
    let mut key = [0u8; 40];
    let ms = ts.timestamp_millis().max(0) as u64;
    key[..16].copy_from_slice(move_id.as_bytes());
    key[16..24].copy_from_slice(&ms.to_be_bytes());
    key[24..].copy_from_slice(id.as_bytes());
    key
}

/// First or last possible event key for `move_id`, depending on `fill`.
fn event_bound(move_id: Uuid, fill: u8) -> [u8; 40] {
    let mut key = [fill; 40];
    key[..16].copy_from_slice(move_id.as_bytes());
    key
}

fn alert_key(move_id: Uuid, id: Uuid) -> [u8; 32] {
    let mut key = [0u8; 32];
    key[..16].copy_from_slice(move_id.as_bytes());
    key[16..].copy_from_slice(id.as_bytes());
    key
}

fn uuid_from(bytes: &[u8]) -> Result<Uuid> {
    Uuid::from_slice(bytes).map_err(TrackError::store)
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// Everything one state transition writes, applied atomically.
#[derive(Debug, Clone)]
pub struct Commit {
    pub record: Move,
    /// Version the caller read; the commit fails if the stored one differs.
    pub expected_version: u64,
    pub events: Vec<Event>,
    /// Alerts to insert or overwrite.
    pub alerts: Vec<Alert>,
}

impl Commit {
    pub fn new(record: Move, expected_version: u64) -> Self {
        Self {
            record,
            expected_version,
            events: Vec::new(),
            alerts: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// MoveStore
// ---------------------------------------------------------------------------

pub trait MoveStore: Send + Sync {
    /// Allocate the next sequence number, let `build` produce the move and its
    /// events, and persist them in one transaction. The stored move has
    /// version 1.
    fn create(&self, build: &mut dyn FnMut(u64) -> (Move, Vec<Event>)) -> Result<Move>;

    fn load(&self, id: Uuid) -> Result<Move>;

    fn load_by_sequence(&self, sequence: u64) -> Result<Move>;

    /// All moves in sequence order.
    fn list(&self) -> Result<Vec<Move>>;

    /// Compare-and-swap commit. Returns the stored move with its new version.
    fn commit(&self, commit: Commit) -> Result<Move>;

    fn load_alert(&self, id: Uuid) -> Result<Alert>;

    /// A move's alerts, oldest first.
    fn alerts_for(&self, move_id: Uuid) -> Result<Vec<Alert>>;

    /// One page of a move's events, newest first, strictly older than the
    /// event `before` when given.
    fn events_page(
        &self,
        move_id: Uuid,
        filter: &EventFilter,
        before: Option<Uuid>,
        limit: usize,
    ) -> Result<EventPage>;
}

// ---------------------------------------------------------------------------
// RedbStore
// ---------------------------------------------------------------------------

pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open or create the database at `path`, creating every table up front
    /// so read transactions never see a missing table.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path).map_err(TrackError::store)?;
        let wt = db.begin_write().map_err(TrackError::store)?;
        wt.open_table(MOVES).map_err(TrackError::store)?;
        wt.open_table(SEQUENCES).map_err(TrackError::store)?;
        wt.open_table(EVENTS).map_err(TrackError::store)?;
        wt.open_table(EVENT_INDEX).map_err(TrackError::store)?;
        wt.open_table(ALERTS).map_err(TrackError::store)?;
        wt.open_table(ALERT_INDEX).map_err(TrackError::store)?;
        wt.open_table(META).map_err(TrackError::store)?;
        wt.commit().map_err(TrackError::store)?;
        Ok(Self { db })
    }

    fn put_move(wt: &WriteTransaction, mv: &Move) -> Result<()> {
        let value = serde_json::to_vec(mv)?;
        let mut table = wt.open_table(MOVES).map_err(TrackError::store)?;
        table
            .insert(mv.id.as_bytes().as_slice(), value.as_slice())
            .map_err(TrackError::store)?;
        Ok(())
    }

    fn put_events(wt: &WriteTransaction, events: &[Event]) -> Result<()> {
        let mut table = wt.open_table(EVENTS).map_err(TrackError::store)?;
        let mut index = wt.open_table(EVENT_INDEX).map_err(TrackError::store)?;
        for event in events {
            let key = event_key(event.move_id, event.timestamp, event.id);
            let value = serde_json::to_vec(event)?;
            table
                .insert(key.as_slice(), value.as_slice())
                .map_err(TrackError::store)?;
            index
                .insert(event.id.as_bytes().as_slice(), key.as_slice())
                .map_err(TrackError::store)?;
        }
        Ok(())
    }

    fn put_alerts(wt: &WriteTransaction, alerts: &[Alert]) -> Result<()> {
        let mut table = wt.open_table(ALERTS).map_err(TrackError::store)?;
        let mut index = wt.open_table(ALERT_INDEX).map_err(TrackError::store)?;
        for alert in alerts {
            let key = alert_key(alert.move_id, alert.id);
            let value = serde_json::to_vec(alert)?;
            table
                .insert(key.as_slice(), value.as_slice())
                .map_err(TrackError::store)?;
            index
                .insert(alert.id.as_bytes().as_slice(), alert.move_id.as_bytes().as_slice())
                .map_err(TrackError::store)?;
        }
        Ok(())
    }
}

impl MoveStore for RedbStore {
    fn create(&self, build: &mut dyn FnMut(u64) -> (Move, Vec<Event>)) -> Result<Move> {
        let wt = self.db.begin_write().map_err(TrackError::store)?;
        let record = {
            let mut meta = wt.open_table(META).map_err(TrackError::store)?;
            let sequence = meta
                .get(NEXT_SEQUENCE)
                .map_err(TrackError::store)?
                .map(|g| g.value())
                .unwrap_or(1);
            meta.insert(NEXT_SEQUENCE, sequence + 1)
                .map_err(TrackError::store)?;

            let (mut record, events) = build(sequence);
            record.sequence = sequence;
            record.version = 1;

            let mut sequences = wt.open_table(SEQUENCES).map_err(TrackError::store)?;
            sequences
                .insert(sequence, record.id.as_bytes().as_slice())
                .map_err(TrackError::store)?;
            Self::put_move(&wt, &record)?;
            Self::put_events(&wt, &events)?;
            record
        };
        wt.commit().map_err(TrackError::store)?;
        Ok(record)
    }

    fn load(&self, id: Uuid) -> Result<Move> {
        let rt = self.db.begin_read().map_err(TrackError::store)?;
        let table = rt.open_table(MOVES).map_err(TrackError::store)?;
        let guard = table
            .get(id.as_bytes().as_slice())
            .map_err(TrackError::store)?
            .ok_or_else(|| TrackError::MoveNotFound(id.to_string()))?;
        Ok(serde_json::from_slice(guard.value())?)
    }

    fn load_by_sequence(&self, sequence: u64) -> Result<Move> {
        let id = {
            let rt = self.db.begin_read().map_err(TrackError::store)?;
            let table = rt.open_table(SEQUENCES).map_err(TrackError::store)?;
            let guard = table
                .get(sequence)
                .map_err(TrackError::store)?
                .ok_or_else(|| TrackError::MoveNotFound(crate::paths::format_sequence(sequence)))?;
            uuid_from(guard.value())?
        };
        self.load(id)
    }

    fn list(&self) -> Result<Vec<Move>> {
        let rt = self.db.begin_read().map_err(TrackError::store)?;
        let table = rt.open_table(MOVES).map_err(TrackError::store)?;
        let mut result = Vec::new();
        for entry in table.iter().map_err(TrackError::store)? {
            let (_, v) = entry.map_err(TrackError::store)?;
            let mv: Move = serde_json::from_slice(v.value())?;
            result.push(mv);
        }
        result.sort_by_key(|m| m.sequence);
        Ok(result)
    }

    fn commit(&self, commit: Commit) -> Result<Move> {
        let Commit {
            mut record,
            expected_version,
            events,
            alerts,
        } = commit;

        let wt = self.db.begin_write().map_err(TrackError::store)?;
        {
            let table = wt.open_table(MOVES).map_err(TrackError::store)?;
            let stored: Move = {
                let guard = table
                    .get(record.id.as_bytes().as_slice())
                    .map_err(TrackError::store)?
                    .ok_or_else(|| TrackError::MoveNotFound(record.id.to_string()))?;
                serde_json::from_slice(guard.value())?
            };
            if stored.version != expected_version {
                // Dropping `wt` without commit aborts the transaction.
                return Err(TrackError::ConcurrentModification {
                    move_id: record.id.to_string(),
                });
            }
        }

        record.version = expected_version + 1;
        Self::put_move(&wt, &record)?;
        Self::put_events(&wt, &events)?;
        Self::put_alerts(&wt, &alerts)?;
        wt.commit().map_err(TrackError::store)?;
        Ok(record)
    }

    fn load_alert(&self, id: Uuid) -> Result<Alert> {
        let rt = self.db.begin_read().map_err(TrackError::store)?;
        let index = rt.open_table(ALERT_INDEX).map_err(TrackError::store)?;
        let move_id = {
            let guard = index
                .get(id.as_bytes().as_slice())
                .map_err(TrackError::store)?
                .ok_or_else(|| TrackError::AlertNotFound(id.to_string()))?;
            uuid_from(guard.value())?
        };
        let table = rt.open_table(ALERTS).map_err(TrackError::store)?;
        let key = alert_key(move_id, id);
        let guard = table
            .get(key.as_slice())
            .map_err(TrackError::store)?
            .ok_or_else(|| TrackError::AlertNotFound(id.to_string()))?;
        Ok(serde_json::from_slice(guard.value())?)
    }

    fn alerts_for(&self, move_id: Uuid) -> Result<Vec<Alert>> {
        let rt = self.db.begin_read().map_err(TrackError::store)?;
        let table = rt.open_table(ALERTS).map_err(TrackError::store)?;
        let lo = alert_key(move_id, Uuid::nil());
        let hi = alert_key(move_id, Uuid::from_bytes([0xff; 16]));
        let mut result = Vec::new();
        for entry in table
            .range(lo.as_slice()..=hi.as_slice())
            .map_err(TrackError::store)?
        {
            let (_, v) = entry.map_err(TrackError::store)?;
            let alert: Alert = serde_json::from_slice(v.value())?;
            result.push(alert);
        }
        result.sort_by(|a, b| a.raised_at.cmp(&b.raised_at));
        Ok(result)
    }

    fn events_page(
        &self,
        move_id: Uuid,
        filter: &EventFilter,
        before: Option<Uuid>,
        limit: usize,
    ) -> Result<EventPage> {
        let rt = self.db.begin_read().map_err(TrackError::store)?;
        let lo = event_bound(move_id, 0x00);
        let hi = event_bound(move_id, 0xff);

        let cursor_key: Option<[u8; 40]> = match before {
            Some(cursor) => {
                let index = rt.open_table(EVENT_INDEX).map_err(TrackError::store)?;
                let guard = index
                    .get(cursor.as_bytes().as_slice())
                    .map_err(TrackError::store)?
                    .ok_or_else(|| TrackError::Validation(format!("unknown event cursor {cursor}")))?;
                let key = <[u8; 40]>::try_from(guard.value()).map_err(TrackError::store)?;
                if key[..16] != move_id.as_bytes()[..] {
                    return Err(TrackError::Validation(format!(
                        "event cursor {cursor} belongs to another move"
                    )));
                }
                Some(key)
            }
            None => None,
        };
        let upper = match &cursor_key {
            Some(key) => Bound::Excluded(key.as_slice()),
            None => Bound::Included(hi.as_slice()),
        };

        let table = rt.open_table(EVENTS).map_err(TrackError::store)?;
        let mut events = Vec::new();
        let mut more = false;
        for entry in table
            .range::<&[u8]>((Bound::Included(lo.as_slice()), upper))
            .map_err(TrackError::store)?
            .rev()
        {
            let (_, v) = entry.map_err(TrackError::store)?;
            let event: Event = serde_json::from_slice(v.value())?;
            if !filter.matches(&event) {
                continue;
            }
            if events.len() == limit {
                more = true;
                break;
            }
            events.push(event);
        }

        let next_cursor = if more {
            events.last().map(|e| e.id)
        } else {
            None
        };
        Ok(EventPage {
            events,
            next_cursor,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EventCategory, EventKind, MilestoneKind, MoveType, Priority};
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn open_tmp() -> (TempDir, RedbStore) {
        let dir = TempDir::new().unwrap();
        let store = RedbStore::open(&dir.path().join("tracker.redb")).unwrap();
        (dir, store)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
    }

    fn draft(sequence: u64) -> Move {
        Move {
            id: Uuid::new_v4(),
            sequence,
            move_type: MoveType::Domestic,
            current: MilestoneKind::Inspection,
            priority: Priority::Medium,
            client: None,
            created_at: t0(),
            estimated_completion: None,
            closed_at: None,
            milestones: Vec::new(),
            version: 0,
        }
    }

    fn create(store: &RedbStore) -> Move {
        store
            .create(&mut |seq| {
                let mv = draft(seq);
                let ev = Event::new(mv.id, EventKind::MoveCreated, EventCategory::System, "created", t0());
                (mv, vec![ev])
            })
            .unwrap()
    }

    #[test]
    fn create_allocates_sequences_and_version() {
        let (_dir, store) = open_tmp();
        let a = create(&store);
        let b = create(&store);
        assert_eq!(a.sequence, 1);
        assert_eq!(b.sequence, 2);
        assert_eq!(a.version, 1);
        assert_eq!(store.load_by_sequence(2).unwrap().id, b.id);
        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[test]
    fn load_unknown_is_not_found() {
        let (_dir, store) = open_tmp();
        assert!(matches!(
            store.load(Uuid::new_v4()),
            Err(TrackError::MoveNotFound(_))
        ));
        assert!(matches!(
            store.load_by_sequence(99),
            Err(TrackError::MoveNotFound(_))
        ));
    }

    #[test]
    fn commit_bumps_version_and_rejects_stale() {
        let (_dir, store) = open_tmp();
        let mv = create(&store);

        let mut edited = mv.clone();
        edited.priority = Priority::Urgent;
        let stored = store.commit(Commit::new(edited.clone(), 1)).unwrap();
        assert_eq!(stored.version, 2);

        let stale = store.commit(Commit::new(edited, 1)).unwrap_err();
        assert!(matches!(stale, TrackError::ConcurrentModification { .. }));
        assert_eq!(store.load(mv.id).unwrap().version, 2);
    }

    #[test]
    fn failed_commit_writes_no_events() {
        let (_dir, store) = open_tmp();
        let mv = create(&store);
        let mut commit = Commit::new(mv.clone(), 7);
        commit.events.push(Event::new(
            mv.id,
            EventKind::MilestoneEdited,
            EventCategory::User,
            "edit",
            t0(),
        ));
        assert!(store.commit(commit).is_err());
        let page = store.events_page(mv.id, &EventFilter::default(), None, 10).unwrap();
        assert_eq!(page.events.len(), 1);
    }

    #[test]
    fn events_are_paged_newest_first() {
        let (_dir, store) = open_tmp();
        let mv = create(&store);
        let mut version = mv.version;
        for i in 1..=5 {
            let mut commit = Commit::new(mv.clone(), version);
            commit.events.push(Event::new(
                mv.id,
                EventKind::MilestoneEdited,
                EventCategory::User,
                format!("edit {i}"),
                t0() + Duration::minutes(i),
            ));
            version = store.commit(commit).unwrap().version;
        }

        let filter = EventFilter::default();
        let first = store.events_page(mv.id, &filter, None, 4).unwrap();
        let names: Vec<_> = first.events.iter().map(|e| e.description.as_str()).collect();
        assert_eq!(names, ["edit 5", "edit 4", "edit 3", "edit 2"]);
        let cursor = first.next_cursor.unwrap();

        let second = store.events_page(mv.id, &filter, Some(cursor), 4).unwrap();
        let names: Vec<_> = second.events.iter().map(|e| e.description.as_str()).collect();
        assert_eq!(names, ["edit 1", "created"]);
        assert!(second.next_cursor.is_none());
    }

    #[test]
    fn events_are_scoped_to_move() {
        let (_dir, store) = open_tmp();
        let a = create(&store);
        let b = create(&store);
        let page = store.events_page(a.id, &EventFilter::default(), None, 10).unwrap();
        assert_eq!(page.events.len(), 1);
        assert_eq!(page.events[0].move_id, a.id);

        let foreign = page.events[0].id;
        assert!(matches!(
            store.events_page(b.id, &EventFilter::default(), Some(foreign), 10),
            Err(TrackError::Validation(_))
        ));
    }

    #[test]
    fn alerts_roundtrip_through_index() {
        let (_dir, store) = open_tmp();
        let mv = create(&store);
        let alert = Alert {
            id: Uuid::new_v4(),
            move_id: mv.id,
            kind: MilestoneKind::Inspection,
            severity: crate::types::Severity::Warning,
            title: "Inspection overdue".into(),
            message: "late".into(),
            raised_at: t0(),
            acknowledged_at: None,
            acknowledged_by: None,
            resolved: false,
            resolved_at: None,
            resolved_by: None,
        };
        let mut commit = Commit::new(mv.clone(), mv.version);
        commit.alerts.push(alert.clone());
        store.commit(commit).unwrap();

        assert_eq!(store.load_alert(alert.id).unwrap(), alert);
        assert_eq!(store.alerts_for(mv.id).unwrap().len(), 1);
        assert!(matches!(
            store.load_alert(Uuid::new_v4()),
            Err(TrackError::AlertNotFound(_))
        ));
    }

    #[test]
    fn reopen_keeps_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tracker.redb");
        let id = {
            let store = RedbStore::open(&path).unwrap();
            create(&store).id
        };
        let store = RedbStore::open(&path).unwrap();
        assert_eq!(store.load(id).unwrap().sequence, 1);
        assert_eq!(create(&store).sequence, 2);
    }
}
