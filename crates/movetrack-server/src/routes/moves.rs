use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use movetrack_core::moves::NewMove;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

/// POST /moves: create a move at the first milestone of its sequence.
pub async fn create_move(
    State(app): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<NewMove>, JsonRejection>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let Json(body) = body.map_err(AppError::rejected)?;
    let tracker = app.tracker.clone();
    let actor = super::actor(&headers);
    let result = tokio::task::spawn_blocking(move || {
        let mv = tracker.create_move(body, actor.as_deref())?;
        Ok::<_, movetrack_core::TrackError>(serde_json::json!(mv.summary(tracker.catalog())))
    })
    .await
    .map_err(AppError::join)??;

    app.notify_update();
    Ok((StatusCode::CREATED, Json(result)))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub include_closed: bool,
}

/// GET /moves: open moves (all with `include_closed=true`), by sequence.
pub async fn list_moves(
    State(app): State<AppState>,
    q: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Query(q) = q.map_err(AppError::rejected)?;
    let tracker = app.tracker.clone();
    let result = tokio::task::spawn_blocking(move || {
        let moves = tracker.list_moves(q.include_closed)?;
        Ok::<_, movetrack_core::TrackError>(serde_json::json!(moves))
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}

/// GET /moves/{id}: move detail with its materialized milestones.
pub async fn get_move(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let tracker = app.tracker.clone();
    let result = tokio::task::spawn_blocking(move || {
        let id = tracker.resolve(&id)?;
        let detail = tracker.move_detail(id)?;
        Ok::<_, movetrack_core::TrackError>(serde_json::json!(detail))
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}

/// GET /moves/{id}/timeline: every milestone of the sequence with SLA readings.
pub async fn get_timeline(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let tracker = app.tracker.clone();
    let result = tokio::task::spawn_blocking(move || {
        let id = tracker.resolve(&id)?;
        let timeline = tracker.timeline(id)?;
        Ok::<_, movetrack_core::TrackError>(serde_json::json!(timeline))
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}

/// GET /moves/{id}/sla: compliance and per-milestone SLA readings.
pub async fn get_sla(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let tracker = app.tracker.clone();
    let result = tokio::task::spawn_blocking(move || {
        let id = tracker.resolve(&id)?;
        let report = tracker.sla_report_at(id, chrono::Utc::now())?;
        Ok::<_, movetrack_core::TrackError>(serde_json::json!(report))
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}
