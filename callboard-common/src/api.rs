//! Shared API request/response types
//!
//! Types used by the panel's HTTP handlers and by clients driving the
//! board remotely (collaborating kiosk services, test harnesses).

use serde::{Deserialize, Serialize};

use crate::events::EngineState;

/// Gated playback status write.
///
/// `producer`/`epoch` identify the caller's authority grant; a stale pair
/// yields a `superseded` outcome without altering the store.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpdateStateRequest {
    pub producer: String,
    pub epoch: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_secs: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_state: Option<EngineState>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub playing: Option<bool>,
}

/// Unconditional playback status write (authority bypass).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ForceUpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_secs: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_state: Option<EngineState>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub playing: Option<bool>,
}

/// Outcome of a gated write.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WriteOutcomeResponse {
    /// "applied" or "superseded"
    pub outcome: String,

    /// Store revision after an applied write
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<u64>,

    /// Live authority epoch reported back on a superseded write
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_epoch: Option<u64>,
}

/// Current write authority holder.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthorityResponse {
    pub producer: Option<String>,
    pub epoch: u64,
}

/// Compare-and-swap authority claim.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClaimAuthorityRequest {
    pub producer: String,
    /// Epoch the caller last observed; the claim fails if it is stale.
    pub observed_epoch: u64,
}

/// Explicit drift-correction request routed to the main surface.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncRequest {
    pub position_secs: f64,
    /// Desired transport state: `playing` starts playback (main surface
    /// only), `paused` pauses, anything else leaves the transport alone.
    pub state: EngineState,
}

/// Call announcement pushed by the queue collaborator.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnnounceRequest {
    pub ticket: String,
    pub station: String,
}

/// Generic acknowledgement body.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatusMessage {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_request_omits_empty_fields() {
        let req = UpdateStateRequest {
            producer: "main-1".into(),
            epoch: 4,
            position_secs: Some(12.0),
            engine_state: None,
            playing: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["position_secs"], 12.0);
        assert!(json.get("engine_state").is_none());
        assert!(json.get("playing").is_none());
    }

    #[test]
    fn sync_request_state_parses_from_lowercase() {
        let req: SyncRequest =
            serde_json::from_str(r#"{"position_secs": 42.0, "state": "paused"}"#).unwrap();
        assert_eq!(req.state, EngineState::Paused);
    }
}
