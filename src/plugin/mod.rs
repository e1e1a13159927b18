//! Plugin Runtime
//!
//! A uniform capability contract for frame operators. Each plugin kind has
//! a trait with the per-tick operation it implements; concrete plugins are
//! constructed by the factory table in `registry` — no reflection, no
//! runtime discovery. Parameter schemas are const data next to each
//! factory.

pub mod params;
pub mod registry;

use serde::{Deserialize, Serialize};

use crate::frame::Frame;
pub use params::{
    parse_hex_color, seed_params, ParamKind, ParamMap, ParamSpec, ParamValue, RangedValue,
};
pub use registry::{
    create_effect, create_generator, create_transition, metadata_json, plugin_ids, schema_json,
};

/// Plugin kinds, serialized lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginKind {
    Generator,
    Effect,
    Source,
    Transition,
}

/// Static description of a plugin, declared alongside its factory.
#[derive(Debug, Clone, Serialize)]
pub struct PluginMeta {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub author: &'static str,
    pub version: &'static str,
    #[serde(rename = "type")]
    pub kind: PluginKind,
}

/// Per-tick context handed to effects.
#[derive(Debug, Clone, Copy)]
pub struct EffectContext {
    pub time: f64,
    pub frame_number: u64,
    pub fps: f32,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

impl EffectContext {
    pub fn new(time: f64, frame_number: u64, fps: f32, canvas_width: u32, canvas_height: u32) -> Self {
        Self {
            time,
            frame_number,
            fps,
            canvas_width,
            canvas_height,
        }
    }
}

/// Behaviour common to every plugin instance.
pub trait Plugin: Send {
    fn meta(&self) -> &'static PluginMeta;

    fn param_schema(&self) -> &'static [ParamSpec];

    /// Apply one parameter update. Returns false when the plugin does not
    /// recognize the name. Callers apply updates between ticks, so a
    /// `process` call sees either the full old state or the full new one.
    fn update_param(&mut self, name: &str, value: ParamValue) -> bool;

    /// Current parameter values, ranged values included.
    fn params(&self) -> ParamMap;

    fn cleanup(&mut self) {}
}

/// Generators produce frames from nothing but time.
pub trait Generator: Plugin {
    fn generate(
        &mut self,
        width: u32,
        height: u32,
        frame_number: u64,
        time: f64,
        fps: f32,
    ) -> Result<Frame, String>;

    /// Advertised duration; `None` is effectively infinite (live-style
    /// sources) and blocks playlist auto-advance by duration.
    fn duration_s(&self) -> Option<f64> {
        Some(10.0)
    }
}

/// Effects transform a frame of fixed dimensions into another.
pub trait Effect: Plugin {
    fn process(&mut self, frame: Frame, ctx: &EffectContext) -> Result<Frame, String>;

    /// Downcast hook; the chain executor uses it to find the transport
    /// effect without reflection.
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}

/// Frame sources own a frame cursor that transport seeks on.
pub trait FrameSource: Send {
    /// Next frame at the current cursor, or `None` at EOF.
    fn next_frame(&mut self) -> Result<Option<Frame>, String>;

    fn total_frames(&self) -> u64;

    fn fps(&self) -> f32;

    fn current_frame(&self) -> u64;

    /// Move the cursor. The transport writes here before the source
    /// yields this tick's pixels.
    fn seek(&mut self, frame: u64);

    /// The underlying plugin, when the source wraps one (parameter
    /// updates route through here).
    fn plugin_mut(&mut self) -> Option<&mut dyn Plugin> {
        None
    }

    fn duration_s(&self) -> Option<f64> {
        let fps = self.fps();
        if fps > 0.0 {
            Some(self.total_frames() as f64 / fps as f64)
        } else {
            None
        }
    }
}

/// Transitions blend two frames along a progress curve.
pub trait Transition: Plugin {
    fn blend(&mut self, a: &Frame, b: &Frame, progress: f32) -> Result<Frame, String>;

    fn transition_duration_s(&self) -> f64;
}
