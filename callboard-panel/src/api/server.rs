//! HTTP server setup and routing
//!
//! Axum router exposing the board's collaborator surface: playback state
//! reads and gated writes, authority claims, explicit sync, the call feed
//! boundary, and the SSE event stream.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use callboard_common::events::EventBus;

use crate::authority::AuthorityArbiter;
use crate::calls::CallFeed;
use crate::panel::Panel;
use crate::state::PlaybackStore;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<PlaybackStore>,
    pub arbiter: Arc<AuthorityArbiter>,
    pub panel: Arc<Panel>,
    pub calls: Arc<CallFeed>,
    pub events: EventBus,
}

/// Build the application router.
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        // Health endpoint
        .route("/health", get(super::handlers::health))
        // Playback state
        .route(
            "/playback/state",
            get(super::handlers::get_state).post(super::handlers::update_state),
        )
        .route(
            "/playback/state/force",
            post(super::handlers::force_update_state),
        )
        .route("/playback/source", get(super::handlers::get_source))
        // Write authority
        .route(
            "/playback/authority",
            get(super::handlers::get_authority).post(super::handlers::claim_authority),
        )
        // Explicit drift correction
        .route("/playback/sync", post(super::handlers::sync))
        // Call feed boundary
        .route("/calls/announce", post(super::handlers::announce_call))
        .route("/calls/clear", post(super::handlers::clear_call))
        // SSE event stream
        .route("/events", get(super::sse::event_stream))
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}
