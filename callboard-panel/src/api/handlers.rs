//! HTTP request handlers
//!
//! REST endpoints for the board's collaborator surface. Write outcomes map
//! onto status codes: an applied gated write is 200, a superseded one is
//! 409 with the live epoch so the caller can observe its displacement.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use callboard_common::api::{
    AnnounceRequest, AuthorityResponse, ClaimAuthorityRequest, ForceUpdateRequest, StatusMessage,
    SyncRequest, UpdateStateRequest, WriteOutcomeResponse,
};

use crate::api::server::AppContext;
use crate::calls::CallAnnouncement;
use crate::media::{self, EngineConfig};
use crate::state::{PlaybackStatus, StatusPatch, WriteOutcome};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "callboard_panel".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /playback/state - Current playback status snapshot
pub async fn get_state(State(ctx): State<AppContext>) -> Json<PlaybackStatus> {
    Json(ctx.store.snapshot())
}

/// POST /playback/state - Gated status write
pub async fn update_state(
    State(ctx): State<AppContext>,
    Json(req): Json<UpdateStateRequest>,
) -> (StatusCode, Json<WriteOutcomeResponse>) {
    let patch = StatusPatch {
        position_secs: req.position_secs,
        engine_state: req.engine_state,
        playing: req.playing,
    };
    match ctx.store.update(patch, &req.producer, req.epoch) {
        WriteOutcome::Applied { revision } => (
            StatusCode::OK,
            Json(WriteOutcomeResponse {
                outcome: "applied".to_string(),
                revision: Some(revision),
                current_epoch: None,
            }),
        ),
        WriteOutcome::Superseded { current_epoch } => (
            StatusCode::CONFLICT,
            Json(WriteOutcomeResponse {
                outcome: "superseded".to_string(),
                revision: None,
                current_epoch: Some(current_epoch),
            }),
        ),
    }
}

/// POST /playback/state/force - Unconditional status write
pub async fn force_update_state(
    State(ctx): State<AppContext>,
    Json(req): Json<ForceUpdateRequest>,
) -> Json<PlaybackStatus> {
    let patch = StatusPatch {
        position_secs: req.position_secs,
        engine_state: req.engine_state,
        playing: req.playing,
    };
    Json(ctx.store.force_update(patch))
}

/// GET /playback/source - Effective engine configuration
pub async fn get_source(State(ctx): State<AppContext>) -> Json<EngineConfig> {
    Json(media::resolve(ctx.panel.source()))
}

/// GET /playback/authority - Current authority holder and epoch
pub async fn get_authority(State(ctx): State<AppContext>) -> Json<AuthorityResponse> {
    let (producer, epoch) = ctx.arbiter.current();
    Json(AuthorityResponse { producer, epoch })
}

/// POST /playback/authority - Compare-and-swap authority claim
pub async fn claim_authority(
    State(ctx): State<AppContext>,
    Json(req): Json<ClaimAuthorityRequest>,
) -> (StatusCode, Json<AuthorityResponse>) {
    match ctx.arbiter.claim(&req.producer, req.observed_epoch) {
        Ok(grant) => (
            StatusCode::OK,
            Json(AuthorityResponse {
                producer: Some(grant.producer),
                epoch: grant.epoch,
            }),
        ),
        Err(_) => {
            let (producer, epoch) = ctx.arbiter.current();
            (
                StatusCode::CONFLICT,
                Json(AuthorityResponse { producer, epoch }),
            )
        }
    }
}

/// POST /playback/sync - Route an explicit correction to the main surface
pub async fn sync(
    State(ctx): State<AppContext>,
    Json(req): Json<SyncRequest>,
) -> (StatusCode, Json<StatusMessage>) {
    match ctx.panel.main_surface().await {
        Some(surface) => {
            surface.sync_to(req.position_secs, req.state);
            (
                StatusCode::ACCEPTED,
                Json(StatusMessage {
                    status: "syncing".to_string(),
                }),
            )
        }
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(StatusMessage {
                status: "no visible surface".to_string(),
            }),
        ),
    }
}

/// POST /calls/announce - Queue collaborator pushes an announcement
pub async fn announce_call(
    State(ctx): State<AppContext>,
    Json(req): Json<AnnounceRequest>,
) -> (StatusCode, Json<StatusMessage>) {
    ctx.calls.announce(CallAnnouncement {
        ticket: req.ticket,
        station: req.station,
    });
    (
        StatusCode::ACCEPTED,
        Json(StatusMessage {
            status: "announcing".to_string(),
        }),
    )
}

/// POST /calls/clear - Queue collaborator ends the announcement
pub async fn clear_call(State(ctx): State<AppContext>) -> (StatusCode, Json<StatusMessage>) {
    ctx.calls.clear();
    (
        StatusCode::ACCEPTED,
        Json(StatusMessage {
            status: "idle".to_string(),
        }),
    )
}
