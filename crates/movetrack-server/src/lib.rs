pub mod error;
pub mod routes;
pub mod state;

use std::path::Path;

use axum::routing::{get, post};
use axum::Router;
use movetrack_core::tracker::Tracker;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(tracker: Tracker) -> Router {
    let app_state = state::AppState::new(tracker);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Change feed (SSE)
        .route("/stream", get(routes::events::sse_stream))
        // Moves
        .route("/moves", get(routes::moves::list_moves))
        .route("/moves", post(routes::moves::create_move))
        .route("/moves/{id}", get(routes::moves::get_move))
        .route("/moves/{id}/timeline", get(routes::moves::get_timeline))
        .route("/moves/{id}/sla", get(routes::moves::get_sla))
        // Milestones
        .route(
            "/moves/{id}/milestones/{kind}/plan",
            post(routes::milestones::plan_milestone),
        )
        .route(
            "/moves/{id}/milestones/{kind}/complete",
            post(routes::milestones::complete_milestone),
        )
        // Events
        .route("/moves/{id}/events", get(routes::events::list_events))
        // Alerts
        .route("/moves/{id}/alerts", get(routes::alerts::list_alerts))
        .route(
            "/moves/{id}/alerts/evaluate",
            post(routes::alerts::evaluate_alerts),
        )
        .route("/alerts/sweep", post(routes::alerts::sweep))
        .route("/alerts/{id}/resolve", post(routes::alerts::resolve_alert))
        .route(
            "/alerts/{id}/acknowledge",
            post(routes::alerts::acknowledge_alert),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the tracker API server for the project at `root`.
pub async fn serve(root: &Path, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(root, listener).await
}

/// Start the tracker API server on a pre-bound listener.
///
/// Unlike `serve`, this accepts a `TcpListener` that was already bound so the
/// caller can read the actual port before starting (useful when `port = 0` and
/// the OS picks a free port).
pub async fn serve_on(root: &Path, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let root = root.to_path_buf();
    let tracker = tokio::task::spawn_blocking(move || Tracker::open(&root)).await??;
    let app = build_router(tracker);

    tracing::info!("movetrack API listening on http://localhost:{actual_port}");

    axum::serve(listener, app).await?;
    Ok(())
}
