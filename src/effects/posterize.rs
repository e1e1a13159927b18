//! Reduce each channel to a fixed number of levels.

use crate::frame::Frame;
use crate::plugin::{
    seed_params, Effect, EffectContext, ParamMap, ParamSpec, ParamValue, Plugin, PluginKind,
    PluginMeta,
};

pub const META: PluginMeta = PluginMeta {
    id: "posterize",
    name: "Posterize",
    description: "Quantize colors to N levels per channel",
    author: "Prism Team",
    version: "1.0.0",
    kind: PluginKind::Effect,
};

pub const SCHEMA: &[ParamSpec] = &[ParamSpec::int(
    "levels",
    "Levels",
    4,
    2,
    16,
    "Levels per channel",
)];

pub struct Posterize {
    levels: u8,
}

impl Posterize {
    pub fn new(config: &ParamMap) -> Self {
        let params = seed_params(SCHEMA, config);
        Self {
            levels: params["levels"].as_i64().unwrap_or(4).clamp(2, 16) as u8,
        }
    }
}

impl Plugin for Posterize {
    fn meta(&self) -> &'static PluginMeta {
        &META
    }

    fn param_schema(&self) -> &'static [ParamSpec] {
        SCHEMA
    }

    fn update_param(&mut self, name: &str, value: ParamValue) -> bool {
        if name == "levels" {
            self.levels = value.as_i64().unwrap_or(self.levels as i64).clamp(2, 16) as u8;
            return true;
        }
        false
    }

    fn params(&self) -> ParamMap {
        let mut map = ParamMap::new();
        map.insert("levels".into(), ParamValue::Int(self.levels as i64));
        map
    }
}

impl Effect for Posterize {
    fn process(&mut self, mut frame: Frame, _ctx: &EffectContext) -> Result<Frame, String> {
        let steps = (self.levels - 1) as f32;
        for byte in frame.pixels.iter_mut() {
            let v = *byte as f32 / 255.0;
            *byte = ((v * steps).round() / steps * 255.0).round() as u8;
        }
        Ok(frame)
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
