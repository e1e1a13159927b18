//! Color inversion.

use crate::frame::Frame;
use crate::plugin::{
    seed_params, Effect, EffectContext, ParamMap, ParamSpec, ParamValue, Plugin, PluginKind,
    PluginMeta,
};

pub const META: PluginMeta = PluginMeta {
    id: "invert",
    name: "Invert",
    description: "Invert frame colors",
    author: "Prism Team",
    version: "1.0.0",
    kind: PluginKind::Effect,
};

pub const SCHEMA: &[ParamSpec] = &[ParamSpec::float(
    "strength",
    "Strength",
    1.0,
    0.0,
    1.0,
    0.05,
    "Inversion amount (0 = original, 1 = fully inverted)",
)];

pub struct Invert {
    strength: f32,
}

impl Invert {
    pub fn new(config: &ParamMap) -> Self {
        let params = seed_params(SCHEMA, config);
        Self {
            strength: params["strength"].as_f32().unwrap_or(1.0).clamp(0.0, 1.0),
        }
    }
}

impl Plugin for Invert {
    fn meta(&self) -> &'static PluginMeta {
        &META
    }

    fn param_schema(&self) -> &'static [ParamSpec] {
        SCHEMA
    }

    fn update_param(&mut self, name: &str, value: ParamValue) -> bool {
        if name == "strength" {
            self.strength = value.as_f32().unwrap_or(self.strength).clamp(0.0, 1.0);
            return true;
        }
        false
    }

    fn params(&self) -> ParamMap {
        let mut map = ParamMap::new();
        map.insert("strength".into(), ParamValue::Float(self.strength as f64));
        map
    }
}

impl Effect for Invert {
    fn process(&mut self, mut frame: Frame, _ctx: &EffectContext) -> Result<Frame, String> {
        let s = self.strength;
        for byte in frame.pixels.iter_mut() {
            let inverted = 255 - *byte;
            *byte = (*byte as f32 * (1.0 - s) + inverted as f32 * s).round() as u8;
        }
        Ok(frame)
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_strength_inverts() {
        let mut fx = Invert::new(&ParamMap::new());
        let ctx = EffectContext::new(0.0, 0, 30.0, 2, 2);
        let out = fx.process(Frame::solid(2, 2, [0, 100, 255]), &ctx).unwrap();
        assert_eq!(out.get(0, 0), [255, 155, 0]);
    }

    #[test]
    fn zero_strength_is_identity() {
        let mut fx = Invert::new(&ParamMap::new());
        fx.update_param("strength", ParamValue::Float(0.0));
        let ctx = EffectContext::new(0.0, 0, 30.0, 2, 2);
        let frame = Frame::solid(2, 2, [12, 34, 56]);
        assert_eq!(fx.process(frame.clone(), &ctx).unwrap(), frame);
    }
}
