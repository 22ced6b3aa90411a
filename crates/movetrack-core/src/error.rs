use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackError {
    #[error("not initialized: run 'movetrack init'")]
    NotInitialized,

    #[error("move not found: {0}")]
    MoveNotFound(String),

    #[error("alert not found: {0}")]
    AlertNotFound(String),

    #[error("invalid milestone kind: {0}")]
    InvalidKind(String),

    #[error("milestone '{kind}' is not part of the {move_type} sequence")]
    KindNotInSequence { kind: String, move_type: String },

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("cannot complete '{kind}': missing mandatory documents: {}", join_set(.missing))]
    DocumentsMissing {
        kind: String,
        missing: BTreeSet<String>,
    },

    #[error("invalid transition for '{kind}' (current: {current}): {reason}")]
    InvalidTransition {
        kind: String,
        current: String,
        reason: String,
    },

    #[error("move {move_id} was modified concurrently; re-read and retry")]
    ConcurrentModification { move_id: String },

    #[error("alert already resolved: {0}")]
    AlreadyResolved(String),

    #[error("{collaborator} unavailable: {reason}")]
    CollaboratorUnavailable {
        collaborator: String,
        reason: String,
    },

    /// The collaborator answered, but with a payload that cannot be used.
    /// Retrying the same request returns the same payload.
    #[error("{collaborator} returned an invalid response: {reason}")]
    CollaboratorResponse {
        collaborator: String,
        reason: String,
    },

    #[error("store error: {0}")]
    Store(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl TrackError {
    /// True when the caller may re-read state and try the same request again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TrackError::ConcurrentModification { .. } | TrackError::CollaboratorUnavailable { .. }
        )
    }

    /// Stable machine-readable code used in API responses.
    pub fn code(&self) -> &'static str {
        match self {
            TrackError::NotInitialized => "not_initialized",
            TrackError::MoveNotFound(_) => "move_not_found",
            TrackError::AlertNotFound(_) => "alert_not_found",
            TrackError::InvalidKind(_) => "invalid_kind",
            TrackError::KindNotInSequence { .. } => "kind_not_in_sequence",
            TrackError::Validation(_) => "validation_error",
            TrackError::DocumentsMissing { .. } => "documents_missing",
            TrackError::InvalidTransition { .. } => "invalid_transition",
            TrackError::ConcurrentModification { .. } => "concurrent_modification",
            TrackError::AlreadyResolved(_) => "already_resolved",
            TrackError::CollaboratorUnavailable { .. } => "collaborator_unavailable",
            TrackError::CollaboratorResponse { .. } => "collaborator_invalid_response",
            TrackError::Store(_) | TrackError::Io(_) | TrackError::Yaml(_) | TrackError::Json(_) => {
                "internal"
            }
        }
    }

    pub(crate) fn store(e: impl std::fmt::Display) -> Self {
        TrackError::Store(e.to_string())
    }
}

fn join_set(set: &BTreeSet<String>) -> String {
    set.iter().cloned().collect::<Vec<_>>().join(", ")
}

pub type Result<T> = std::result::Result<T, TrackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_missing_lists_every_type() {
        let err = TrackError::DocumentsMissing {
            kind: "packing".into(),
            missing: ["Packing list final", "Inventory"]
                .into_iter()
                .map(String::from)
                .collect(),
        };
        let msg = err.to_string();
        assert!(msg.contains("packing"));
        assert!(msg.contains("Inventory, Packing list final"));
    }

    #[test]
    fn retryable_errors() {
        assert!(TrackError::ConcurrentModification {
            move_id: "m".into()
        }
        .is_retryable());
        assert!(TrackError::CollaboratorUnavailable {
            collaborator: "document store".into(),
            reason: "timeout".into()
        }
        .is_retryable());
        assert!(!TrackError::AlreadyResolved("a".into()).is_retryable());
        assert!(!TrackError::CollaboratorResponse {
            collaborator: "document store".into(),
            reason: "expected a list".into()
        }
        .is_retryable());
    }
}
