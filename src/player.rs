//! Player
//!
//! A stateful pipeline: canvas, layer stack, player-level effect chain,
//! output sinks, and one playback thread pacing to the master source's
//! fps. Two players exist per process — "video" (preview surfaces) and
//! "artnet" (Art-Net routing) — differing only in sinks and canvas
//! resolution.
//!
//! The playback thread is the sole frame producer; control-side methods
//! lock the shared state between ticks, so a parameter update applied
//! before a tick is visible on that tick and one arriving mid-tick lands
//! on the next.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use log::{info, warn};
use uuid::Uuid;

use crate::artnet::RoutingBridge;
use crate::chain::EffectChain;
use crate::clip::ClipRegistry;
use crate::compositor::{composite, validate_stack, Layer};
use crate::events::{EngineEvent, EventBus};
use crate::frame::Frame;
use crate::outputs::OutputManager;
use crate::playlist::{ActiveTransition, Advance, Playlist};
use crate::plugin::{EffectContext, ParamValue};

pub enum PlayerSinks {
    Preview(OutputManager),
    ArtNet(RoutingBridge),
}

pub struct PlayerInner {
    pub layers: Vec<Layer>,
    pub chain: EffectChain,
    pub playlist: Playlist,
    pub sinks: PlayerSinks,
    transition: Option<ActiveTransition>,
    canvas_width: u32,
    canvas_height: u32,
    fps: f32,
    tick_count: u64,
    playing: bool,
    last_frame_at: Option<Instant>,
    last_canvas: Option<Arc<Frame>>,
}

#[derive(Clone)]
pub struct Player {
    name: String,
    registry: Arc<ClipRegistry>,
    bus: EventBus,
    inner: Arc<Mutex<PlayerInner>>,
    running: Arc<AtomicBool>,
    handle: Arc<Mutex<Option<thread::JoinHandle<()>>>>,
}

impl Player {
    pub fn new(
        name: &str,
        registry: Arc<ClipRegistry>,
        bus: EventBus,
        sinks: PlayerSinks,
        canvas_width: u32,
        canvas_height: u32,
        fps: f32,
    ) -> Self {
        Self {
            name: name.to_string(),
            registry,
            bus,
            inner: Arc::new(Mutex::new(PlayerInner {
                layers: vec![Layer::master(None)],
                chain: EffectChain::new(),
                playlist: Playlist::new(),
                sinks,
                transition: None,
                canvas_width,
                canvas_height,
                fps: if fps > 0.0 { fps } else { 30.0 },
                tick_count: 0,
                playing: false,
                last_frame_at: None,
                last_canvas: None,
            })),
            running: Arc::new(AtomicBool::new(false)),
            handle: Arc::new(Mutex::new(None)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // -- layer management (control side; the playback thread is the sole
    // frame producer, this mutex is the tick boundary) --

    pub fn add_layer(&self, clip: Option<Uuid>) -> Result<u32, String> {
        let mut guard = self.lock_inner();
        let layer_id = guard.layers.len() as u32;
        let mut layers = guard.layers.clone();
        layers.push(Layer::slave(layer_id, clip));
        validate_stack(&layers)?;
        guard.layers = layers;
        Ok(layer_id)
    }

    pub fn remove_layer(&self, index: usize) -> Result<(), String> {
        let mut guard = self.lock_inner();
        if index == 0 {
            return Err("cannot remove the master layer".into());
        }
        if index >= guard.layers.len() {
            return Err(format!("layer index {} out of range", index));
        }
        let mut layers = guard.layers.clone();
        layers.remove(index);
        validate_stack(&layers)?;
        guard.layers = layers;
        Ok(())
    }

    /// Hot-swap a layer's clip reference; legal mid-playback.
    pub fn set_layer_clip(&self, index: usize, clip: Option<Uuid>) -> Result<(), String> {
        if let Some(id) = &clip {
            if !self.registry.contains(id) {
                return Err(format!("unknown clip {}", id));
            }
        }
        let mut guard = self.lock_inner();
        let layer = guard
            .layers
            .get_mut(index)
            .ok_or_else(|| format!("layer index {} out of range", index))?;
        layer.clip = clip;
        drop(guard);
        if index == 0 {
            if let Some(id) = clip {
                self.attach_transport_events(&id);
            }
        }
        Ok(())
    }

    pub fn update_layer<F: FnOnce(&mut Layer)>(&self, index: usize, mutate: F) -> Result<(), String> {
        let mut guard = self.lock_inner();
        let mut layers = guard.layers.clone();
        let layer = layers
            .get_mut(index)
            .ok_or_else(|| format!("layer index {} out of range", index))?;
        mutate(layer);
        validate_stack(&layers)?;
        guard.layers = layers;
        Ok(())
    }

    // -- playlist --

    pub fn with_playlist<T, F: FnOnce(&mut Playlist) -> T>(&self, f: F) -> T {
        let mut guard = self.lock_inner();
        f(&mut guard.playlist)
    }

    /// Activate a clip on the master layer, wiring its transport to the
    /// event bus.
    pub fn activate_clip(&self, clip_id: Uuid) -> Result<(), String> {
        if !self.registry.contains(&clip_id) {
            return Err(format!("unknown clip {}", clip_id));
        }
        {
            let mut guard = self.lock_inner();
            guard.layers[0].clip = Some(clip_id);
        }
        self.attach_transport_events(&clip_id);
        self.bus.publish(EngineEvent::ClipActivated {
            player: self.name.clone(),
            clip_id,
        });
        Ok(())
    }

    fn attach_transport_events(&self, clip_id: &Uuid) {
        if let Some(shared) = self.registry.get(clip_id) {
            let mut clip = shared.lock().expect("clip poisoned");
            let name = self.name.clone();
            let bus = self.bus.clone();
            let id = *clip_id;
            if let Some(transport) = clip.chain.transport_mut() {
                transport.attach_events(bus, &name, id);
            }
        }
    }

    // -- effect parameters (applied between ticks via the inner lock) --

    pub fn update_clip_effect_param(
        &self,
        clip_id: &Uuid,
        effect_index: usize,
        name: &str,
        value: ParamValue,
    ) -> Result<bool, String> {
        let shared = self
            .registry
            .get(clip_id)
            .ok_or_else(|| format!("unknown clip {}", clip_id))?;
        let mut clip = shared.lock().expect("clip poisoned");
        clip.chain.update_param(effect_index, name, value)
    }

    pub fn update_player_effect_param(
        &self,
        effect_index: usize,
        name: &str,
        value: ParamValue,
    ) -> Result<bool, String> {
        let mut guard = self.lock_inner();
        guard.chain.update_param(effect_index, name, value)
    }

    pub fn with_chain<T, F: FnOnce(&mut EffectChain) -> T>(&self, f: F) -> T {
        let mut guard = self.lock_inner();
        f(&mut guard.chain)
    }

    pub fn with_sinks<T, F: FnOnce(&mut PlayerSinks) -> T>(&self, f: F) -> T {
        let mut guard = self.lock_inner();
        f(&mut guard.sinks)
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        let guard = self.lock_inner();
        (guard.canvas_width, guard.canvas_height)
    }

    pub fn last_canvas(&self) -> Option<Arc<Frame>> {
        self.lock_inner().last_canvas.clone()
    }

    pub fn last_frame_at(&self) -> Option<Instant> {
        self.lock_inner().last_frame_at
    }

    pub fn tick_count(&self) -> u64 {
        self.lock_inner().tick_count
    }

    pub fn is_playing(&self) -> bool {
        self.lock_inner().playing
    }

    pub fn play(&self) {
        self.lock_inner().playing = true;
    }

    pub fn pause(&self) {
        self.lock_inner().playing = false;
    }

    fn lock_inner(&self) -> std::sync::MutexGuard<'_, PlayerInner> {
        self.inner.lock().expect("player inner poisoned")
    }

    // -- playback thread --

    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        self.lock_inner().playing = true;

        let registry = self.registry.clone();
        let inner = self.inner.clone();
        let running = self.running.clone();
        let name = self.name.clone();

        let handle = thread::Builder::new()
            .name(format!("player-{}", name))
            .spawn(move || {
                info!("[player:{}] playback thread started", name);
                while running.load(Ordering::SeqCst) {
                    let tick_start = Instant::now();
                    let fps = {
                        let mut guard = inner.lock().expect("player inner poisoned");
                        if !guard.playing {
                            drop(guard);
                            thread::sleep(Duration::from_millis(50));
                            continue;
                        }
                        Self::tick(&registry, &mut guard, &name);
                        guard.fps
                    };

                    // Pace to the master cadence: sleep 1/fps minus the
                    // time this tick took.
                    let frame_time = Duration::from_secs_f64(1.0 / fps.max(1.0) as f64);
                    let elapsed = tick_start.elapsed();
                    if elapsed < frame_time {
                        thread::sleep(frame_time - elapsed);
                    }
                }
                info!("[player:{}] playback thread stopped", name);
            })
            .expect("failed to spawn playback thread");

        *self.handle.lock().expect("player handle poisoned") = Some(handle);
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self
            .handle
            .lock()
            .expect("player handle poisoned")
            .take()
        {
            let _ = handle.join();
        }
        let mut guard = self.lock_inner();
        guard.playing = false;
        if let PlayerSinks::Preview(manager) = &mut guard.sinks {
            manager.cleanup();
        }
    }

    /// One canvas frame. Also runnable without the playback thread
    /// (tests drive it directly through `tick_once`).
    fn tick(registry: &ClipRegistry, inner: &mut PlayerInner, name: &str) {
        // Playlist advance is observed before the tick begins, so a clip
        // swap lands cleanly on a frame boundary.
        Self::maybe_advance(registry, inner, name);

        // Master source fps drives the cadence.
        if let Some(master_clip) = inner.layers[0].clip {
            if let Some(shared) = registry.get(&master_clip) {
                let clip = shared.lock().expect("clip poisoned");
                let fps = clip.fps();
                if fps > 0.0 {
                    inner.fps = fps;
                }
            }
        }

        let ctx = EffectContext::new(
            inner.tick_count as f64 / inner.fps as f64,
            inner.tick_count,
            inner.fps,
            inner.canvas_width,
            inner.canvas_height,
        );

        let mut result = composite(
            registry,
            &inner.layers,
            inner.canvas_width,
            inner.canvas_height,
            &ctx,
        );

        // Transition window: blend the outgoing clip over the composite.
        if let Some(transition) = &mut inner.transition {
            let tick_seconds = 1.0 / inner.fps as f64;
            result.canvas = transition.blend_tick(registry, result.canvas, &ctx, tick_seconds);
            if transition.finished() {
                inner.transition = None;
            }
        }

        // Player-level chain runs after compositing.
        result.canvas = inner.chain.apply(result.canvas, &ctx);

        let current_clip = inner.playlist.active_clip().or(inner.layers[0].clip);
        match &mut inner.sinks {
            PlayerSinks::Preview(manager) => {
                manager.update_frame(&result, registry, current_clip);
            }
            PlayerSinks::ArtNet(bridge) => {
                bridge.process_frame(&result.canvas);
            }
        }

        inner.last_canvas = Some(Arc::new(result.canvas));
        inner.last_frame_at = Some(Instant::now());
        inner.tick_count += 1;
    }

    fn maybe_advance(registry: &ClipRegistry, inner: &mut PlayerInner, name: &str) {
        if !inner.playlist.auto_advance {
            return;
        }
        let master_clip = match inner.layers[0].clip {
            Some(id) => id,
            None => {
                // Nothing on the master yet: adopt the playlist's active item.
                if let Some(clip) = inner.playlist.active_clip() {
                    inner.layers[0].clip = Some(clip);
                }
                return;
            }
        };

        let should_advance = registry
            .get(&master_clip)
            .map(|shared| shared.lock().expect("clip poisoned").ready_to_advance())
            .unwrap_or(false);
        if !should_advance {
            return;
        }

        let advance = match inner.playlist.advance() {
            Some(a) => a,
            None => return,
        };
        Self::apply_advance(registry, inner, name, advance);
    }

    fn apply_advance(registry: &ClipRegistry, inner: &mut PlayerInner, name: &str, advance: Advance) {
        info!(
            "[player:{}] advancing {} -> {}",
            name,
            advance
                .outgoing
                .map(|o| o.to_string())
                .unwrap_or_else(|| "(none)".into()),
            advance.incoming
        );
        inner.layers[0].clip = Some(advance.incoming);

        if let (Some(request), Some(outgoing)) = (&advance.transition, advance.outgoing) {
            match ActiveTransition::start(request, outgoing) {
                Ok(transition) => inner.transition = Some(transition),
                Err(e) => warn!("[player:{}] transition start failed: {}", name, e),
            }
        }

        // The incoming clip's transport starts a fresh loop cycle; the
        // outgoing clip keeps its state for the crossfade window.
        if let Some(shared) = registry.get(&advance.incoming) {
            let mut clip = shared.lock().expect("clip poisoned");
            if let Some(transport) = clip.chain.transport_mut() {
                transport.reset_loop_state();
            }
        }
    }

    /// Drive one tick synchronously (test and headless-pump path).
    pub fn tick_once(&self) {
        let mut guard = self.lock_inner();
        Self::tick(&self.registry, &mut guard, &self.name);
    }

    /// Manual advance (UI "next" button): bypasses auto-advance checks.
    pub fn advance_now(&self) -> Result<(), String> {
        let mut guard = self.lock_inner();
        let advance = guard
            .playlist
            .advance()
            .ok_or_else(|| "nothing to advance to".to_string())?;
        Self::apply_advance(&self.registry, &mut guard, &self.name, advance);
        Ok(())
    }
}
