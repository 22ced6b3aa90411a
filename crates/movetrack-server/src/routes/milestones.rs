use std::str::FromStr;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use movetrack_core::milestone::PlanUpdate;
use movetrack_core::types::MilestoneKind;

use crate::error::AppError;
use crate::state::AppState;

/// POST /moves/{id}/milestones/{kind}/plan: edit planned date, SLA days,
/// responsible party or notes.
pub async fn plan_milestone(
    State(app): State<AppState>,
    Path((id, kind)): Path<(String, String)>,
    headers: HeaderMap,
    body: Result<Json<PlanUpdate>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(body) = body.map_err(AppError::rejected)?;
    let tracker = app.tracker.clone();
    let actor = super::actor(&headers);
    let result = tokio::task::spawn_blocking(move || {
        let id = tracker.resolve(&id)?;
        let kind = MilestoneKind::from_str(&kind)?;
        let milestone = tracker.edit_plan(id, kind, body, actor.as_deref())?;
        Ok::<_, movetrack_core::TrackError>(serde_json::json!(milestone))
    })
    .await
    .map_err(AppError::join)??;

    app.notify_update();
    Ok(Json(result))
}

/// POST /moves/{id}/milestones/{kind}/complete: complete the current milestone.
pub async fn complete_milestone(
    State(app): State<AppState>,
    Path((id, kind)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let tracker = app.tracker.clone();
    let actor = super::actor(&headers);
    let result = tokio::task::spawn_blocking(move || {
        let id = tracker.resolve(&id)?;
        let kind = MilestoneKind::from_str(&kind)?;
        let completion = tracker.complete(id, kind, actor.as_deref())?;
        Ok::<_, movetrack_core::TrackError>(serde_json::json!(completion))
    })
    .await
    .map_err(AppError::join)??;

    app.notify_update();
    Ok(Json(result))
}
