use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use movetrack_core::error::TrackError;

// ---------------------------------------------------------------------------
// AppError
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// Construct a 400 Bad Request error with the given message.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(TrackError::Validation(msg.into()).into())
    }

    /// Map an extractor rejection (malformed body, path or query) into a
    /// 400 validation error so it carries the same JSON envelope.
    pub(crate) fn rejected(rejection: impl std::fmt::Display) -> Self {
        Self::bad_request(rejection.to_string())
    }

    pub(crate) fn join(e: tokio::task::JoinError) -> Self {
        Self(anyhow::anyhow!("task join error: {e}"))
    }
}

fn status_for(e: &TrackError) -> StatusCode {
    match e {
        TrackError::NotInitialized | TrackError::Validation(_) => StatusCode::BAD_REQUEST,
        TrackError::MoveNotFound(_)
        | TrackError::AlertNotFound(_)
        | TrackError::InvalidKind(_)
        | TrackError::KindNotInSequence { .. } => StatusCode::NOT_FOUND,
        TrackError::DocumentsMissing { .. }
        | TrackError::InvalidTransition { .. }
        | TrackError::ConcurrentModification { .. }
        | TrackError::AlreadyResolved(_) => StatusCode::CONFLICT,
        TrackError::CollaboratorUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        TrackError::CollaboratorResponse { .. } => StatusCode::BAD_GATEWAY,
        TrackError::Store(_) | TrackError::Io(_) | TrackError::Yaml(_) | TrackError::Json(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let Some(e) = self.0.downcast_ref::<TrackError>() else {
            tracing::error!(error = %self.0, "request failed");
            let body = serde_json::json!({ "error": self.0.to_string(), "code": "internal" });
            return (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response();
        };

        let status = status_for(e);
        if status.is_server_error() {
            tracing::error!(error = %e, "request failed");
        }

        let mut body = serde_json::json!({
            "error": e.to_string(),
            "code": e.code(),
            "retryable": e.is_retryable(),
        });
        match e {
            TrackError::DocumentsMissing { kind, missing } => {
                body["kind"] = serde_json::json!(kind);
                body["missing"] = serde_json::json!(missing);
            }
            TrackError::InvalidTransition { kind, current, .. } => {
                body["kind"] = serde_json::json!(kind);
                body["current"] = serde_json::json!(current);
            }
            _ => {}
        }
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
