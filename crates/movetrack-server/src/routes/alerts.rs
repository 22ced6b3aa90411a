use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AlertsQuery {
    #[serde(default)]
    pub active: bool,
}

/// GET /moves/{id}/alerts: alerts for a move, only unresolved with `active=true`.
pub async fn list_alerts(
    State(app): State<AppState>,
    Path(id): Path<String>,
    q: Result<Query<AlertsQuery>, QueryRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Query(q) = q.map_err(AppError::rejected)?;
    let tracker = app.tracker.clone();
    let result = tokio::task::spawn_blocking(move || {
        let id = tracker.resolve(&id)?;
        let alerts = tracker.alerts(id, q.active)?;
        Ok::<_, movetrack_core::TrackError>(serde_json::json!(alerts))
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}

/// POST /moves/{id}/alerts/evaluate: raise an alert if the current milestone is delayed.
pub async fn evaluate_alerts(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let tracker = app.tracker.clone();
    let result = tokio::task::spawn_blocking(move || {
        let id = tracker.resolve(&id)?;
        let raised = tracker.evaluate(id)?;
        Ok::<_, movetrack_core::TrackError>(serde_json::json!({ "raised": raised }))
    })
    .await
    .map_err(AppError::join)??;

    if !result["raised"].is_null() {
        app.notify_update();
    }
    Ok(Json(result))
}

/// POST /alerts/{id}/resolve
pub async fn resolve_alert(
    State(app): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let Path(id) = id.map_err(AppError::rejected)?;
    let tracker = app.tracker.clone();
    let actor = super::actor(&headers);
    let result = tokio::task::spawn_blocking(move || {
        let alert = tracker.resolve_alert(id, actor.as_deref())?;
        Ok::<_, movetrack_core::TrackError>(serde_json::json!(alert))
    })
    .await
    .map_err(AppError::join)??;

    app.notify_update();
    Ok(Json(result))
}

/// POST /alerts/{id}/acknowledge
pub async fn acknowledge_alert(
    State(app): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let Path(id) = id.map_err(AppError::rejected)?;
    let tracker = app.tracker.clone();
    let actor = super::actor(&headers);
    let result = tokio::task::spawn_blocking(move || {
        let alert = tracker.acknowledge_alert(id, actor.as_deref())?;
        Ok::<_, movetrack_core::TrackError>(serde_json::json!(alert))
    })
    .await
    .map_err(AppError::join)??;

    app.notify_update();
    Ok(Json(result))
}

/// POST /alerts/sweep: evaluate every open move.
pub async fn sweep(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let tracker = app.tracker.clone();
    let result = tokio::task::spawn_blocking(move || {
        let report = tracker.sweep()?;
        Ok::<_, movetrack_core::TrackError>(serde_json::json!(report))
    })
    .await
    .map_err(AppError::join)??;

    app.notify_update();
    Ok(Json(result))
}
