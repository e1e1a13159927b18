//! Status Snapshots
//!
//! The operator-facing health view the external control plane serves:
//! per-player last frame time, per-output last send time, per-source
//! connection state, and effect-chain fault counts.

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct ChainFault {
    pub effect: String,
    pub faults: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerStatus {
    pub name: String,
    pub playing: bool,
    pub tick_count: u64,
    /// Milliseconds since the last produced canvas frame; `None` before
    /// the first tick.
    pub ms_since_last_frame: Option<u64>,
    pub active_clip: Option<Uuid>,
    pub chain_faults: Vec<ChainFault>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputStatus {
    pub id: String,
    pub enabled: bool,
    pub dropped_frames: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtNetOutputStatus {
    pub id: String,
    pub active: bool,
    pub ms_since_last_send: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceStatus {
    pub clip_id: Uuid,
    pub plugin_id: String,
    /// "ok", "reconnecting", or "exhausted".
    pub state: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub players: Vec<PlayerStatus>,
    pub outputs: Vec<OutputStatus>,
    pub artnet_outputs: Vec<ArtNetOutputStatus>,
    pub sources: Vec<SourceStatus>,
}

impl StatusSnapshot {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
