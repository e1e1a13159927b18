//! Preview Output Routing
//!
//! Delivers canvas-derived frames to display and virtual surfaces. Each
//! output declares a source expression (`canvas`, `clip:<uuid>`,
//! `clip:current`, `layer:<i>`, `layer:<i>:inclusive`), an optional
//! slice or composition, and an FPS target; each runs in its own worker
//! with a single-slot drop-on-full queue.

pub mod sink;
pub mod slice;

use std::collections::HashMap;
use std::sync::Arc;

use log::warn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clip::ClipRegistry;
use crate::compositor::CompositeResult;
use crate::frame::Frame;
use sink::{DisplaySink, OutputSink, OutputWorker, VirtualSink};
use slice::{Composition, Slice};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceExpr {
    Canvas,
    Clip(Uuid),
    CurrentClip,
    Layer(usize),
    LayerInclusive(usize),
}

impl SourceExpr {
    pub fn parse(s: &str) -> Result<SourceExpr, String> {
        if s == "canvas" {
            return Ok(SourceExpr::Canvas);
        }
        if s == "clip:current" {
            return Ok(SourceExpr::CurrentClip);
        }
        if let Some(rest) = s.strip_prefix("clip:") {
            let id = Uuid::parse_str(rest).map_err(|e| format!("bad clip id '{}': {}", rest, e))?;
            return Ok(SourceExpr::Clip(id));
        }
        if let Some(rest) = s.strip_prefix("layer:") {
            if let Some(index) = rest.strip_suffix(":inclusive") {
                let index: usize = index
                    .parse()
                    .map_err(|e| format!("bad layer index '{}': {}", index, e))?;
                return Ok(SourceExpr::LayerInclusive(index));
            }
            let index: usize = rest
                .parse()
                .map_err(|e| format!("bad layer index '{}': {}", rest, e))?;
            return Ok(SourceExpr::Layer(index));
        }
        Err(format!("unknown source expression '{}'", s))
    }

    pub fn to_expr(&self) -> String {
        match self {
            SourceExpr::Canvas => "canvas".to_string(),
            SourceExpr::Clip(id) => format!("clip:{}", id),
            SourceExpr::CurrentClip => "clip:current".to_string(),
            SourceExpr::Layer(i) => format!("layer:{}", i),
            SourceExpr::LayerInclusive(i) => format!("layer:{}:inclusive", i),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    Virtual,
    Display { command: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputDef {
    pub id: String,
    /// Source expression string, parsed on use.
    pub source: String,
    /// Slice or composition id; full canvas when unset.
    pub slice: Option<String>,
    pub fps: u32,
    pub enabled: bool,
    pub kind: SinkKind,
}

struct OutputEntry {
    def: OutputDef,
    worker: Option<OutputWorker>,
    preview: Option<VirtualSink>,
}

pub struct OutputManager {
    player_name: String,
    outputs: HashMap<String, OutputEntry>,
    slices: Vec<Slice>,
    compositions: Vec<Composition>,
}

impl OutputManager {
    pub fn new(player_name: &str) -> Self {
        Self {
            player_name: player_name.to_string(),
            outputs: HashMap::new(),
            slices: Vec::new(),
            compositions: Vec::new(),
        }
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    /// Register an output and start its worker. An output surface that
    /// fails to initialize disables the output; the rest proceeds.
    pub fn register_output(&mut self, def: OutputDef) -> Result<(), String> {
        SourceExpr::parse(&def.source)?;

        let (sink, preview): (Box<dyn OutputSink>, Option<VirtualSink>) = match &def.kind {
            SinkKind::Virtual => {
                let sink = VirtualSink::new();
                (Box::new(sink.clone()), Some(sink))
            }
            SinkKind::Display { command } => (Box::new(DisplaySink::new(command)), None),
        };

        let worker = if def.enabled {
            Some(OutputWorker::spawn(&def.id, sink, def.fps))
        } else {
            None
        };

        self.outputs.insert(
            def.id.clone(),
            OutputEntry {
                def,
                worker,
                preview,
            },
        );
        Ok(())
    }

    pub fn unregister_output(&mut self, output_id: &str) -> Result<(), String> {
        let entry = self
            .outputs
            .remove(output_id)
            .ok_or_else(|| format!("unknown output '{}'", output_id))?;
        if let Some(worker) = entry.worker {
            worker.stop();
        }
        Ok(())
    }

    pub fn enable_output(&mut self, output_id: &str) -> Result<(), String> {
        let entry = self
            .outputs
            .get_mut(output_id)
            .ok_or_else(|| format!("unknown output '{}'", output_id))?;
        if entry.worker.as_ref().map(|w| w.is_alive()).unwrap_or(false) {
            return Ok(());
        }
        let def = entry.def.clone();
        let (sink, preview): (Box<dyn OutputSink>, Option<VirtualSink>) = match &def.kind {
            SinkKind::Virtual => {
                let sink = VirtualSink::new();
                (Box::new(sink.clone()), Some(sink))
            }
            SinkKind::Display { command } => (Box::new(DisplaySink::new(command)), None),
        };
        entry.worker = Some(OutputWorker::spawn(&def.id, sink, def.fps));
        entry.preview = preview;
        entry.def.enabled = true;
        Ok(())
    }

    pub fn disable_output(&mut self, output_id: &str) -> Result<(), String> {
        let entry = self
            .outputs
            .get_mut(output_id)
            .ok_or_else(|| format!("unknown output '{}'", output_id))?;
        entry.def.enabled = false;
        if let Some(worker) = entry.worker.take() {
            worker.stop();
        }
        Ok(())
    }

    // -- slices --

    pub fn add_slice(&mut self, slice: Slice) {
        self.slices.retain(|s| s.id != slice.id);
        self.slices.push(slice);
    }

    pub fn remove_slice(&mut self, slice_id: &str) -> Result<(), String> {
        let before = self.slices.len();
        self.slices.retain(|s| s.id != slice_id);
        if self.slices.len() == before {
            return Err(format!("unknown slice '{}'", slice_id));
        }
        Ok(())
    }

    pub fn add_composition(&mut self, composition: Composition) {
        self.compositions.retain(|c| c.id != composition.id);
        self.compositions.push(composition);
    }

    pub fn slices(&self) -> &[Slice] {
        &self.slices
    }

    /// Dispatch one tick's frames. Dead workers (disabled after a retry
    /// cycle) are reaped here so status reflects them.
    pub fn update_frame(
        &mut self,
        composite: &CompositeResult,
        registry: &ClipRegistry,
        current_clip: Option<Uuid>,
    ) {
        let ids: Vec<String> = self.outputs.keys().cloned().collect();
        for id in ids {
            let (source, slice_sel, alive) = {
                let entry = self.outputs.get(&id).expect("entry exists");
                if !entry.def.enabled {
                    continue;
                }
                let alive = entry.worker.as_ref().map(|w| w.is_alive()).unwrap_or(false);
                (entry.def.source.clone(), entry.def.slice.clone(), alive)
            };

            if !alive {
                let entry = self.outputs.get_mut(&id).expect("entry exists");
                if entry.worker.is_some() {
                    warn!("[outputs:{}] '{}' worker gone, disabling", self.player_name, id);
                    entry.def.enabled = false;
                    if let Some(worker) = entry.worker.take() {
                        worker.stop();
                    }
                }
                continue;
            }

            let frame = match self.resolve_source(&source, composite, registry, current_clip) {
                Some(frame) => frame,
                None => continue,
            };
            let frame = self.apply_slice_selector(frame, slice_sel.as_deref());

            let entry = self.outputs.get_mut(&id).expect("entry exists");
            if let Some(worker) = &entry.worker {
                worker.offer(Arc::new(frame));
            }
        }
    }

    fn resolve_source(
        &self,
        source: &str,
        composite: &CompositeResult,
        registry: &ClipRegistry,
        current_clip: Option<Uuid>,
    ) -> Option<Frame> {
        match SourceExpr::parse(source).ok()? {
            SourceExpr::Canvas => Some(composite.canvas.clone()),
            SourceExpr::Clip(id) => registry.clip_output(&id),
            SourceExpr::CurrentClip => registry.clip_output(&current_clip?),
            SourceExpr::Layer(i) => composite.layer_frames.get(i)?.clone(),
            SourceExpr::LayerInclusive(i) => composite.inclusive_frames.get(i).cloned(),
        }
    }

    fn apply_slice_selector(&self, frame: Frame, selector: Option<&str>) -> Frame {
        let selector = match selector {
            Some(s) => s,
            None => return frame,
        };
        if let Some(slice) = self.slices.iter().find(|s| s.id == selector) {
            return slice.extract(&frame);
        }
        if let Some(composition) = self.compositions.iter().find(|c| c.id == selector) {
            return composition.render(&frame, &self.slices);
        }
        warn!("[outputs:{}] unknown slice '{}', passing full frame", self.player_name, selector);
        frame
    }

    /// The virtual sink's latest frame (preview fetch path).
    pub fn latest_virtual_frame(&self, output_id: &str) -> Option<Arc<Frame>> {
        self.outputs
            .get(output_id)?
            .preview
            .as_ref()?
            .latest()
    }

    pub fn output_defs(&self) -> Vec<OutputDef> {
        self.outputs.values().map(|e| e.def.clone()).collect()
    }

    pub fn dropped_frames(&self, output_id: &str) -> u64 {
        self.outputs
            .get(output_id)
            .and_then(|e| e.worker.as_ref())
            .map(|w| w.dropped_frames())
            .unwrap_or(0)
    }

    pub fn cleanup(&mut self) {
        for (_, entry) in self.outputs.drain() {
            if let Some(worker) = entry.worker {
                worker.stop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::Clip;
    use crate::compositor::{composite, Layer};
    use crate::plugin::{EffectContext, ParamMap, ParamValue};
    use std::thread;
    use std::time::Duration;

    fn ctx() -> EffectContext {
        EffectContext::new(0.0, 0, 30.0, 16, 16)
    }

    fn setup() -> (ClipRegistry, Uuid, CompositeResult) {
        let registry = ClipRegistry::new();
        let mut config = ParamMap::new();
        config.insert("color".into(), ParamValue::Color("#646464".into()));
        let clip =
            registry.insert(Clip::from_generator("solid_color", &config, 16, 16, 30.0).unwrap());
        let layers = vec![Layer::master(Some(clip))];
        let result = composite(&registry, &layers, 16, 16, &ctx());
        (registry, clip, result)
    }

    #[test]
    fn source_expressions_parse() {
        assert_eq!(SourceExpr::parse("canvas").unwrap(), SourceExpr::Canvas);
        assert_eq!(
            SourceExpr::parse("clip:current").unwrap(),
            SourceExpr::CurrentClip
        );
        assert_eq!(SourceExpr::parse("layer:2").unwrap(), SourceExpr::Layer(2));
        assert_eq!(
            SourceExpr::parse("layer:1:inclusive").unwrap(),
            SourceExpr::LayerInclusive(1)
        );
        let id = Uuid::new_v4();
        assert_eq!(
            SourceExpr::parse(&format!("clip:{}", id)).unwrap(),
            SourceExpr::Clip(id)
        );
        assert!(SourceExpr::parse("window:0").is_err());
        assert!(SourceExpr::parse("clip:zzz").is_err());
    }

    #[test]
    fn canvas_output_reaches_virtual_sink() {
        let (registry, clip, result) = setup();
        let mut manager = OutputManager::new("video");
        manager
            .register_output(OutputDef {
                id: "preview".into(),
                source: "canvas".into(),
                slice: None,
                fps: 0,
                enabled: true,
                kind: SinkKind::Virtual,
            })
            .unwrap();

        manager.update_frame(&result, &registry, Some(clip));
        let mut latest = None;
        for _ in 0..100 {
            latest = manager.latest_virtual_frame("preview");
            if latest.is_some() {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(latest.unwrap().get(0, 0), [100, 100, 100]);
        manager.cleanup();
    }

    #[test]
    fn sliced_output_crops_the_canvas() {
        let (registry, clip, result) = setup();
        let mut manager = OutputManager::new("video");
        manager.add_slice(Slice::rect("corner", 0.0, 0.0, 4.0, 4.0));
        manager
            .register_output(OutputDef {
                id: "sliced".into(),
                source: "canvas".into(),
                slice: Some("corner".into()),
                fps: 0,
                enabled: true,
                kind: SinkKind::Virtual,
            })
            .unwrap();

        manager.update_frame(&result, &registry, Some(clip));
        let mut latest = None;
        for _ in 0..100 {
            latest = manager.latest_virtual_frame("sliced");
            if latest.is_some() {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        let frame = latest.unwrap();
        assert_eq!((frame.width, frame.height), (4, 4));
        manager.cleanup();
    }

    #[test]
    fn bad_source_expression_is_rejected_at_registration() {
        let mut manager = OutputManager::new("video");
        let result = manager.register_output(OutputDef {
            id: "x".into(),
            source: "nonsense".into(),
            slice: None,
            fps: 30,
            enabled: true,
            kind: SinkKind::Virtual,
        });
        assert!(result.is_err());
    }

    #[test]
    fn disabled_output_receives_nothing() {
        let (registry, clip, result) = setup();
        let mut manager = OutputManager::new("video");
        manager
            .register_output(OutputDef {
                id: "off".into(),
                source: "canvas".into(),
                slice: None,
                fps: 0,
                enabled: false,
                kind: SinkKind::Virtual,
            })
            .unwrap();
        manager.update_frame(&result, &registry, Some(clip));
        thread::sleep(Duration::from_millis(30));
        assert!(manager.latest_virtual_frame("off").is_none());
        manager.cleanup();
    }
}
