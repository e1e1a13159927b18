//! Session State
//!
//! A JSON document capturing, per player, the output and slice
//! definitions and the playlist, plus the Art-Net objects and outputs.
//! Saved on shutdown; reload-on-start is opt-in (the default is a clean
//! slate, restorable from snapshots).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::artnet::models::{ArtNetObject, ArtNetOutput};
use crate::outputs::slice::Slice;
use crate::outputs::OutputDef;
use crate::playlist::Playlist;

#[derive(Serialize, Deserialize, Default)]
pub struct PlayerSession {
    pub outputs: Vec<OutputDef>,
    pub slices: Vec<Slice>,
    pub enabled_outputs: Vec<String>,
    pub playlist: Playlist,
}

#[derive(Serialize, Deserialize)]
pub struct SessionState {
    pub saved_at: DateTime<Utc>,
    pub players: HashMap<String, PlayerSession>,
    pub artnet_objects: Vec<ArtNetObject>,
    pub artnet_outputs: Vec<ArtNetOutput>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            saved_at: Utc::now(),
            players: HashMap::new(),
            artnet_objects: Vec::new(),
            artnet_outputs: Vec::new(),
        }
    }
}

impl SessionState {
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("failed to create {}: {}", parent.display(), e))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("failed to serialize session: {}", e))?;
        std::fs::write(path, json)
            .map_err(|e| format!("failed to write {}: {}", path.display(), e))?;
        info!("[session] saved to {}", path.display());
        Ok(())
    }

    pub fn load_from(path: &Path) -> Result<SessionState, String> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        serde_json::from_str(&raw).map_err(|e| format!("failed to parse {}: {}", path.display(), e))
    }

    /// Load if present and reload was requested; otherwise a clean slate.
    pub fn load_or_default(path: &Path, reload: bool) -> SessionState {
        if !reload {
            return SessionState::default();
        }
        match Self::load_from(path) {
            Ok(session) => {
                info!(
                    "[session] restored from {} (saved {})",
                    path.display(),
                    session.saved_at
                );
                session
            }
            Err(e) => {
                warn!("[session] {} — starting clean", e);
                SessionState::default()
            }
        }
    }

    /// Timestamped snapshot next to the main session file.
    pub fn snapshot_path(session_path: &Path) -> PathBuf {
        let stamp = Utc::now().format("%Y%m%d-%H%M%S");
        let stem = session_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("session");
        session_path.with_file_name(format!("{}-{}.json", stem, stamp))
    }
}

pub fn default_session_path() -> PathBuf {
    crate::config::get().data_dir().join("session.json")
}
