//! Clips and the Clip Registry
//!
//! A clip is one source plugin instance plus its ordered effect chain,
//! addressable by UUID. The process-wide registry owns the clips; layers
//! and playlist items hold only the UUID. The registry is a
//! reader-many/writer-one map of individually locked clips, so a
//! `get_frame` holds a registry read guard for the duration of the call
//! while structural changes take the write side.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use log::warn;
use uuid::Uuid;

use crate::chain::EffectChain;
use crate::frame::Frame;
use crate::generators::GeneratorSource;
use crate::plugin::{create_effect, create_generator, EffectContext, FrameSource, ParamMap, ParamValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    Ok,
    Reconnecting,
    Exhausted,
}

pub struct Clip {
    pub clip_id: Uuid,
    pub plugin_id: String,
    source: Box<dyn FrameSource>,
    pub chain: EffectChain,
    last_source_frame: Option<Frame>,
    last_output_frame: Option<Frame>,
    state: SourceState,
}

impl Clip {
    pub fn new(plugin_id: &str, source: Box<dyn FrameSource>) -> Self {
        Self {
            clip_id: Uuid::new_v4(),
            plugin_id: plugin_id.to_string(),
            source,
            chain: EffectChain::new(),
            last_source_frame: None,
            last_output_frame: None,
            state: SourceState::Ok,
        }
    }

    /// Build a clip around a generator plugin with a transport effect
    /// heading the chain, the way every UI-created clip starts out.
    pub fn from_generator(
        plugin_id: &str,
        config: &ParamMap,
        width: u32,
        height: u32,
        fps: f32,
    ) -> Result<Self, String> {
        let generator = create_generator(plugin_id, config)?;
        let source = GeneratorSource::new(generator, width, height, fps);
        let mut clip = Clip::new(plugin_id, Box::new(source));
        clip.chain
            .push(create_effect("transport", &ParamMap::new())?);
        Ok(clip)
    }

    pub fn duration_s(&self) -> Option<f64> {
        self.source.duration_s()
    }

    pub fn total_frames(&self) -> u64 {
        self.source.total_frames()
    }

    pub fn fps(&self) -> f32 {
        self.source.fps()
    }

    pub fn state(&self) -> SourceState {
        self.state
    }

    pub fn source_mut(&mut self) -> &mut dyn FrameSource {
        self.source.as_mut()
    }

    /// Replace the source, keeping the effect chain. Transport re-binds
    /// (and preserves a still-valid trim) on the next tick.
    pub fn swap_source(&mut self, plugin_id: &str, source: Box<dyn FrameSource>) {
        self.plugin_id = plugin_id.to_string();
        self.source = source;
        self.last_source_frame = None;
        self.state = SourceState::Ok;
    }

    /// One tick: transport pre-fetch seek, source fetch (with
    /// last-good-frame substitution on fault), then the clip chain.
    pub fn tick(&mut self, ctx: &EffectContext) -> Frame {
        if let Some(transport) = self.chain.transport_mut() {
            transport.advance(self.source.as_mut());
        }

        let raw = match self.source.next_frame() {
            Ok(Some(frame)) => {
                self.state = SourceState::Ok;
                self.last_source_frame = Some(frame.clone());
                frame
            }
            Ok(None) => {
                // EOF: hold the final frame for the playlist to react.
                self.state = SourceState::Exhausted;
                self.held_frame(ctx)
            }
            Err(e) => {
                if self.state != SourceState::Reconnecting {
                    warn!("[clip {}] source fault: {} — re-emitting last frame", self.clip_id, e);
                }
                self.state = SourceState::Reconnecting;
                self.held_frame(ctx)
            }
        };

        let output = self.chain.apply(raw, ctx);
        self.last_output_frame = Some(output.clone());
        output
    }

    fn held_frame(&self, ctx: &EffectContext) -> Frame {
        self.last_source_frame
            .clone()
            .unwrap_or_else(|| Frame::new(ctx.canvas_width, ctx.canvas_height))
    }

    /// Post-effect frame of the most recent tick (output routing reads
    /// this without driving the clip).
    pub fn last_output(&self) -> Option<&Frame> {
        self.last_output_frame.as_ref()
    }

    /// Route a parameter update: the source plugin first, then effects by
    /// chain index via `update_effect_param`.
    pub fn update_source_param(&mut self, name: &str, value: ParamValue) -> bool {
        match self.source.plugin_mut() {
            Some(plugin) => plugin.update_param(name, value),
            None => false,
        }
    }

    /// The playlist advances past this clip when its transport finished
    /// the configured loop count, or the source hit EOF.
    pub fn ready_to_advance(&mut self) -> bool {
        if self.state == SourceState::Exhausted {
            return true;
        }
        self.chain
            .transport_mut()
            .map(|t| t.exhausted())
            .unwrap_or(false)
    }

    pub fn cleanup(&mut self) {
        self.chain.cleanup();
        if let Some(plugin) = self.source.plugin_mut() {
            plugin.cleanup();
        }
    }
}

pub type SharedClip = Arc<Mutex<Clip>>;

#[derive(Default)]
pub struct ClipRegistry {
    clips: RwLock<HashMap<Uuid, SharedClip>>,
}

impl ClipRegistry {
    pub fn new() -> Self {
        Self {
            clips: RwLock::new(HashMap::new()),
        }
    }

    pub fn insert(&self, clip: Clip) -> Uuid {
        let id = clip.clip_id;
        self.clips
            .write()
            .expect("clip registry poisoned")
            .insert(id, Arc::new(Mutex::new(clip)));
        id
    }

    pub fn get(&self, id: &Uuid) -> Option<SharedClip> {
        self.clips
            .read()
            .expect("clip registry poisoned")
            .get(id)
            .cloned()
    }

    pub fn remove(&self, id: &Uuid) -> Result<(), String> {
        let clip = self
            .clips
            .write()
            .expect("clip registry poisoned")
            .remove(id)
            .ok_or_else(|| format!("unknown clip {}", id))?;
        clip.lock().expect("clip poisoned").cleanup();
        Ok(())
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.clips
            .read()
            .expect("clip registry poisoned")
            .contains_key(id)
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.clips
            .read()
            .expect("clip registry poisoned")
            .keys()
            .copied()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.clips.read().expect("clip registry poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tick a clip while holding the registry read guard, per the
    /// shared-resource policy.
    pub fn tick_clip(&self, id: &Uuid, ctx: &EffectContext) -> Option<Frame> {
        let guard = self.clips.read().expect("clip registry poisoned");
        let clip = guard.get(id)?;
        let mut clip = clip.lock().expect("clip poisoned");
        Some(clip.tick(ctx))
    }

    /// Post-effect frame of the most recent tick without advancing.
    pub fn clip_output(&self, id: &Uuid) -> Option<Frame> {
        let guard = self.clips.read().expect("clip registry poisoned");
        let clip = guard.get(id)?;
        let clip = clip.lock().expect("clip poisoned");
        clip.last_output().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> EffectContext {
        EffectContext::new(0.0, 0, 30.0, 16, 16)
    }

    fn solid_clip(color: &str) -> Clip {
        let mut config = ParamMap::new();
        config.insert("color".into(), ParamValue::Color(color.into()));
        Clip::from_generator("solid_color", &config, 16, 16, 30.0).unwrap()
    }

    #[test]
    fn registry_owns_clips_by_uuid() {
        let registry = ClipRegistry::new();
        let id = registry.insert(solid_clip("#102030"));
        assert!(registry.contains(&id));

        let frame = registry.tick_clip(&id, &ctx()).unwrap();
        assert_eq!(frame.get(0, 0), [16, 32, 48]);

        registry.remove(&id).unwrap();
        assert!(!registry.contains(&id));
        assert!(registry.remove(&id).is_err());
    }

    #[test]
    fn clip_effects_apply_after_source() {
        let mut clip = solid_clip("#ffffff");
        clip.chain
            .push(create_effect("invert", &ParamMap::new()).unwrap());
        let frame = clip.tick(&ctx());
        assert_eq!(frame.get(0, 0), [0, 0, 0]);
        // Post-effect frame retained for output routing.
        assert_eq!(clip.last_output().unwrap().get(0, 0), [0, 0, 0]);
    }

    #[test]
    fn default_clip_hosts_a_transport() {
        let mut clip = solid_clip("#ffffff");
        assert!(clip.chain.transport_mut().is_some());
        assert!(!clip.ready_to_advance());
    }

    #[test]
    fn source_swap_keeps_chain() {
        let mut clip = solid_clip("#ffffff");
        clip.chain
            .push(create_effect("invert", &ParamMap::new()).unwrap());
        let generator = create_generator("checkerboard", &ParamMap::new()).unwrap();
        clip.swap_source(
            "checkerboard",
            Box::new(GeneratorSource::new(generator, 16, 16, 30.0)),
        );
        assert_eq!(clip.plugin_id, "checkerboard");
        assert_eq!(clip.chain.len(), 2);
    }
}
