//! Audit events and the lazy history reader.
//!
//! Events are appended by the store in the same write transaction as the
//! mutation they document. They are never updated or removed.

use crate::error::Result;
use crate::types::{EventCategory, EventKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub move_id: Uuid,
    pub kind: EventKind,
    pub category: EventCategory,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(
        move_id: Uuid,
        kind: EventKind,
        category: EventCategory,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            move_id,
            kind,
            category,
            description: description.into(),
            before: None,
            after: None,
            actor: None,
            timestamp: now,
        }
    }

    pub fn with_snapshots(mut self, before: Option<serde_json::Value>, after: serde_json::Value) -> Self {
        self.before = before;
        self.after = Some(after);
        self
    }

    pub fn with_actor(mut self, actor: Option<&str>) -> Self {
        self.actor = actor.map(str::to_string);
        self
    }
}

// ---------------------------------------------------------------------------
// EventFilter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFilter {
    /// Empty means every kind.
    pub kinds: Vec<EventKind>,
    pub category: Option<EventCategory>,
    /// Only events at or after this instant.
    pub since: Option<DateTime<Utc>>,
}

impl EventFilter {
    pub fn matches(&self, e: &Event) -> bool {
        (self.kinds.is_empty() || self.kinds.contains(&e.kind))
            && self.category.map_or(true, |c| c == e.category)
            && self.since.map_or(true, |s| e.timestamp >= s)
    }
}

/// One page of events, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct EventPage {
    pub events: Vec<Event>,
    /// Pass as `before` to fetch the next (older) page. Absent on the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<Uuid>,
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Source of event pages for [`History`]; implemented by the store.
pub trait EventSource: Send + Sync {
    fn events_page(
        &self,
        move_id: Uuid,
        filter: &EventFilter,
        before: Option<Uuid>,
        limit: usize,
    ) -> Result<EventPage>;
}

/// Lazy, restartable view of a move's history, newest first.
///
/// Nothing is read until iteration starts. Each call to [`History::iter`]
/// starts over from the newest event.
pub struct History<'a> {
    source: &'a dyn EventSource,
    move_id: Uuid,
    filter: EventFilter,
    page_size: usize,
}

impl<'a> History<'a> {
    pub const DEFAULT_PAGE_SIZE: usize = 50;

    pub fn new(source: &'a dyn EventSource, move_id: Uuid, filter: EventFilter) -> Self {
        Self {
            source,
            move_id,
            filter,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }

    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = size.max(1);
        self
    }

    pub fn iter(&self) -> HistoryIter<'_> {
        HistoryIter {
            history: self,
            buffer: VecDeque::new(),
            cursor: None,
            exhausted: false,
        }
    }

    /// Drain the full history into memory.
    pub fn collect_all(&self) -> Result<Vec<Event>> {
        self.iter().collect()
    }
}

pub struct HistoryIter<'h> {
    history: &'h History<'h>,
    buffer: VecDeque<Event>,
    cursor: Option<Uuid>,
    exhausted: bool,
}

impl Iterator for HistoryIter<'_> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(e) = self.buffer.pop_front() {
            return Some(Ok(e));
        }
        if self.exhausted {
            return None;
        }
        let h = self.history;
        match h
            .source
            .events_page(h.move_id, &h.filter, self.cursor, h.page_size)
        {
            Ok(page) => {
                self.cursor = page.next_cursor;
                self.exhausted = page.next_cursor.is_none();
                self.buffer.extend(page.events);
                self.buffer.pop_front().map(Ok)
            }
            Err(e) => {
                self.exhausted = true;
                Some(Err(e))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
