use std::convert::Infallible;
use std::str::FromStr;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use chrono::{DateTime, Utc};
use movetrack_core::event::EventFilter;
use movetrack_core::types::{EventCategory, EventKind};
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 50;

#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    pub limit: Option<usize>,
    pub before: Option<Uuid>,
    /// Comma-separated event kinds.
    pub kind: Option<String>,
    pub category: Option<String>,
    pub since: Option<DateTime<Utc>>,
}

impl EventsQuery {
    fn filter(&self) -> Result<EventFilter, movetrack_core::TrackError> {
        let kinds = match &self.kind {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(EventKind::from_str)
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };
        let category = self
            .category
            .as_deref()
            .map(EventCategory::from_str)
            .transpose()?;
        Ok(EventFilter {
            kinds,
            category,
            since: self.since,
        })
    }
}

/// GET /moves/{id}/events: audit history, newest first, cursor-paginated.
pub async fn list_events(
    State(app): State<AppState>,
    Path(id): Path<String>,
    q: Result<Query<EventsQuery>, QueryRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Query(q) = q.map_err(AppError::rejected)?;
    let tracker = app.tracker.clone();
    let result = tokio::task::spawn_blocking(move || {
        let id = tracker.resolve(&id)?;
        let filter = q.filter()?;
        let page = tracker.events_page(id, &filter, q.before, q.limit.unwrap_or(DEFAULT_LIMIT))?;
        Ok::<_, movetrack_core::TrackError>(serde_json::json!(page))
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}

/// GET /stream: SSE stream that emits `update` after every mutation.
pub async fn sse_stream(State(app): State<AppState>) -> impl axum::response::IntoResponse {
    let rx = app.event_tx.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| {
        msg.ok()
            .map(|_| Ok::<Event, Infallible>(Event::default().event("update").data("update")))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
