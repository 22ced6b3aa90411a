pub mod alerts;
pub mod events;
pub mod milestones;
pub mod moves;

use axum::http::HeaderMap;

/// Header carrying the acting user's identity.
pub const ACTOR_HEADER: &str = "x-actor";

/// Actor identity from the `x-actor` header, if present and non-blank.
pub(crate) fn actor(headers: &HeaderMap) -> Option<String> {
    headers
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
