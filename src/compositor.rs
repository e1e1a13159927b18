//! Layer Compositor
//!
//! Blends the layer stack into the canvas frame, bottom to top. Layer 0
//! is the master whose source drives the tick cadence; slave layers
//! advance their own sources in lockstep. A disabled layer is skipped
//! entirely and does not consume a tick from its source.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::blend::{blend_frame, BlendMode};
use crate::clip::ClipRegistry;
use crate::frame::Frame;
use crate::plugin::EffectContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerRole {
    Master,
    Slave,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub layer_id: u32,
    pub clip: Option<Uuid>,
    pub blend_mode: BlendMode,
    pub opacity_percent: f32,
    pub enabled: bool,
    pub role: LayerRole,
}

impl Layer {
    pub fn master(clip: Option<Uuid>) -> Self {
        Self {
            layer_id: 0,
            clip,
            blend_mode: BlendMode::Normal,
            opacity_percent: 100.0,
            enabled: true,
            role: LayerRole::Master,
        }
    }

    pub fn slave(layer_id: u32, clip: Option<Uuid>) -> Self {
        Self {
            layer_id,
            clip,
            blend_mode: BlendMode::Normal,
            opacity_percent: 100.0,
            enabled: true,
            role: LayerRole::Slave,
        }
    }
}

/// Exactly one master, at index 0. Checked on every structural mutation.
pub fn validate_stack(layers: &[Layer]) -> Result<(), String> {
    if layers.is_empty() {
        return Err("layer stack is empty".into());
    }
    if layers[0].role != LayerRole::Master {
        return Err("layer 0 must be the master".into());
    }
    let masters = layers.iter().filter(|l| l.role == LayerRole::Master).count();
    if masters != 1 {
        return Err(format!("expected exactly one master layer, found {}", masters));
    }
    Ok(())
}

/// Result of one compositor pass: the canvas plus each layer's isolated
/// frame (output routing needs `layer:<i>` and `layer:<i>:inclusive`).
pub struct CompositeResult {
    pub canvas: Frame,
    pub layer_frames: Vec<Option<Frame>>,
    pub inclusive_frames: Vec<Frame>,
}

/// One compositor pass: fetch each enabled layer's clip frame (source →
/// clip chain, via the registry), nearest-resize to the canvas, blend
/// with the layer's mode and opacity into a black canvas.
pub fn composite(
    registry: &ClipRegistry,
    layers: &[Layer],
    canvas_width: u32,
    canvas_height: u32,
    ctx: &EffectContext,
) -> CompositeResult {
    let mut canvas = Frame::new(canvas_width, canvas_height);
    let mut layer_frames: Vec<Option<Frame>> = Vec::with_capacity(layers.len());
    let mut inclusive_frames: Vec<Frame> = Vec::with_capacity(layers.len());

    for layer in layers {
        if !layer.enabled {
            layer_frames.push(None);
            inclusive_frames.push(canvas.clone());
            continue;
        }

        let frame = layer
            .clip
            .as_ref()
            .and_then(|id| registry.tick_clip(id, ctx));

        match frame {
            Some(mut frame) => {
                if frame.width != canvas_width || frame.height != canvas_height {
                    frame = frame.resize_nearest(canvas_width, canvas_height);
                }
                let opacity = (layer.opacity_percent / 100.0).clamp(0.0, 1.0);
                blend_frame(&mut canvas, &frame, layer.blend_mode, opacity, 1.0);
                layer_frames.push(Some(frame));
            }
            None => layer_frames.push(None),
        }
        inclusive_frames.push(canvas.clone());
    }

    CompositeResult {
        canvas,
        layer_frames,
        inclusive_frames,
    }
}
