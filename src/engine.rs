//! Engine
//!
//! Wires the whole pipeline together: clip registry, event hub, the two
//! players ("video" for preview surfaces, "artnet" for the routing
//! bridge), session restore/persist, and the ordered shutdown sequence.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{error, info, warn};

use crate::artnet::RoutingBridge;
use crate::clip::{ClipRegistry, SourceState};
use crate::config::AppConfig;
use crate::events::EventHub;
use crate::outputs::OutputManager;
use crate::player::{Player, PlayerSinks};
use crate::session::{default_session_path, SessionState};
use crate::status::{
    ArtNetOutputStatus, ChainFault, OutputStatus, PlayerStatus, SourceStatus, StatusSnapshot,
};

/// Per-step shutdown budget; an overrun force-exits the process.
const SHUTDOWN_STEP_TIMEOUT: Duration = Duration::from_secs(4);

pub struct Engine {
    pub registry: Arc<ClipRegistry>,
    pub video_player: Player,
    pub artnet_player: Player,
    pub bridge: RoutingBridge,
    hub: Option<EventHub>,
    session_path: PathBuf,
}

impl Engine {
    /// Build from configuration. The preview canvas follows the
    /// resolution preset; the Art-Net canvas renders small since only
    /// fixture points are sampled from it.
    pub fn build(config: &AppConfig) -> Engine {
        let registry = Arc::new(ClipRegistry::new());
        let hub = EventHub::spawn();

        let (canvas_w, canvas_h) = config.video.player_resolution.canvas_size();
        let fps = config.video.default_fps;

        let video_player = Player::new(
            "video",
            registry.clone(),
            hub.bus(),
            PlayerSinks::Preview(OutputManager::new("video")),
            canvas_w,
            canvas_h,
            fps,
        );

        let bridge = RoutingBridge::new(canvas_w, canvas_h, false);
        let artnet_player = Player::new(
            "artnet",
            registry.clone(),
            hub.bus(),
            PlayerSinks::ArtNet(bridge.clone()),
            canvas_w,
            canvas_h,
            fps,
        );

        Engine {
            registry,
            video_player,
            artnet_player,
            bridge,
            hub: Some(hub),
            session_path: default_session_path(),
        }
    }

    pub fn set_session_path(&mut self, path: PathBuf) {
        self.session_path = path;
    }

    /// Restore persisted Art-Net objects/outputs, preview outputs,
    /// slices, and playlists.
    pub fn restore_session(&self, session: &SessionState) {
        for object in &session.artnet_objects {
            if let Err(e) = self.bridge.upsert_object(object.clone()) {
                warn!("[engine] skipping persisted object '{}': {}", object.id, e);
            }
        }
        for output in &session.artnet_outputs {
            self.bridge.upsert_output(output.clone());
        }

        if let Some(player_session) = session.players.get("video") {
            self.video_player.with_sinks(|sinks| {
                if let PlayerSinks::Preview(manager) = sinks {
                    for slice in &player_session.slices {
                        manager.add_slice(slice.clone());
                    }
                    for def in &player_session.outputs {
                        let mut def = def.clone();
                        def.enabled = player_session.enabled_outputs.contains(&def.id);
                        if let Err(e) = manager.register_output(def.clone()) {
                            warn!("[engine] skipping persisted output '{}': {}", def.id, e);
                        }
                    }
                }
            });
            self.video_player.with_playlist(|playlist| {
                *playlist = serde_clone(&player_session.playlist);
            });
        }
    }

    /// Capture the persistable state.
    pub fn capture_session(&self) -> SessionState {
        let mut session = SessionState::default();
        session.artnet_objects = self.bridge.objects();
        session.artnet_outputs = self.bridge.outputs();

        let mut player_session = crate::session::PlayerSession::default();
        self.video_player.with_sinks(|sinks| {
            if let PlayerSinks::Preview(manager) = sinks {
                player_session.outputs = manager.output_defs();
                player_session.slices = manager.slices().to_vec();
                player_session.enabled_outputs = player_session
                    .outputs
                    .iter()
                    .filter(|d| d.enabled)
                    .map(|d| d.id.clone())
                    .collect();
            }
        });
        self.video_player.with_playlist(|playlist| {
            player_session.playlist = serde_clone(playlist);
        });
        session.players.insert("video".into(), player_session);
        session
    }

    pub fn start(&self) {
        self.bridge.start();
        self.video_player.start();
        self.artnet_player.start();
        info!("[engine] players running");
    }

    pub fn status(&self) -> StatusSnapshot {
        let players = [&self.video_player, &self.artnet_player]
            .iter()
            .map(|player| PlayerStatus {
                name: player.name().to_string(),
                playing: player.is_playing(),
                tick_count: player.tick_count(),
                ms_since_last_frame: player
                    .last_frame_at()
                    .map(|at| at.elapsed().as_millis() as u64),
                active_clip: player.with_playlist(|p| p.active_clip()),
                chain_faults: player.with_chain(|chain| {
                    chain
                        .fault_counts()
                        .into_iter()
                        .map(|(effect, faults)| ChainFault {
                            effect: effect.to_string(),
                            faults,
                        })
                        .collect()
                }),
            })
            .collect();

        let outputs = self.video_player.with_sinks(|sinks| match sinks {
            PlayerSinks::Preview(manager) => manager
                .output_defs()
                .into_iter()
                .map(|def| OutputStatus {
                    dropped_frames: manager.dropped_frames(&def.id),
                    id: def.id,
                    enabled: def.enabled,
                })
                .collect(),
            _ => Vec::new(),
        });

        let artnet_outputs = self
            .bridge
            .outputs()
            .into_iter()
            .map(|output| ArtNetOutputStatus {
                ms_since_last_send: self
                    .bridge
                    .last_send_instant(&output.id)
                    .map(|at| at.elapsed().as_millis() as u64),
                id: output.id,
                active: output.active,
            })
            .collect();

        let sources = self
            .registry
            .ids()
            .into_iter()
            .filter_map(|id| {
                let shared = self.registry.get(&id)?;
                let clip = shared.lock().expect("clip poisoned");
                Some(SourceStatus {
                    clip_id: id,
                    plugin_id: clip.plugin_id.clone(),
                    state: match clip.state() {
                        SourceState::Ok => "ok",
                        SourceState::Reconnecting => "reconnecting",
                        SourceState::Exhausted => "exhausted",
                    }
                    .to_string(),
                })
            })
            .collect();

        StatusSnapshot {
            players,
            outputs,
            artnet_outputs,
            sources,
        }
    }

    /// Ordered shutdown: output surfaces → players → Art-Net blackout →
    /// control-plane hook (external) → session persist. Each step is
    /// bounded; an overrun force-exits.
    pub fn shutdown(mut self, persist_session: bool) {
        info!("[engine] shutdown started");

        let video = self.video_player.clone();
        run_step("close output surfaces", move || {
            video.with_sinks(|sinks| {
                if let PlayerSinks::Preview(manager) = sinks {
                    manager.cleanup();
                }
            });
        });

        let video = self.video_player.clone();
        let artnet = self.artnet_player.clone();
        run_step("stop players", move || {
            video.stop();
            artnet.stop();
        });

        let bridge = self.bridge.clone();
        run_step("artnet blackout", move || {
            bridge.blackout();
            bridge.stop();
        });

        if persist_session {
            let session = self.capture_session();
            let path = self.session_path.clone();
            run_step("persist session", move || {
                if let Err(e) = session.save_to(&path) {
                    error!("[engine] session save failed: {}", e);
                }
            });
        }

        if let Some(hub) = self.hub.take() {
            hub.shutdown();
        }
        info!("[engine] shutdown complete");
    }
}

/// Run one cleanup step with the step budget; force-exit on overrun.
fn run_step<F: FnOnce() + Send + 'static>(name: &str, step: F) {
    let started = Instant::now();
    let handle = thread::Builder::new()
        .name(format!("shutdown-{}", name.replace(' ', "-")))
        .spawn(step)
        .expect("failed to spawn shutdown step");

    while !handle.is_finished() {
        if started.elapsed() > SHUTDOWN_STEP_TIMEOUT {
            error!("[engine] shutdown step '{}' overran its budget, force exit", name);
            std::process::exit(1);
        }
        thread::sleep(Duration::from_millis(20));
    }
    let _ = handle.join();
    info!("[engine] shutdown step '{}' done ({:?})", name, started.elapsed());
}

// Playlist is plain data; round-tripping through serde is the cheapest
// deep clone while it owns no handles.
fn serde_clone<T: serde::Serialize + serde::de::DeserializeOwned>(value: &T) -> T {
    serde_json::from_value(serde_json::to_value(value).expect("serializable"))
        .expect("deserializable")
}
