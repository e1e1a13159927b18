//! Tint toward a color, weighted by luminance.

use crate::color::luminance;
use crate::frame::Frame;
use crate::plugin::{
    parse_hex_color, seed_params, Effect, EffectContext, ParamMap, ParamSpec, ParamValue, Plugin,
    PluginKind, PluginMeta,
};

pub const META: PluginMeta = PluginMeta {
    id: "tint",
    name: "Tint",
    description: "Tint the frame toward a color, preserving luminance",
    author: "Prism Team",
    version: "1.0.0",
    kind: PluginKind::Effect,
};

pub const SCHEMA: &[ParamSpec] = &[
    ParamSpec::color("color", "Color", "#ff8000", "Tint color"),
    ParamSpec::float("strength", "Strength", 0.5, 0.0, 1.0, 0.05, "Tint amount"),
];

pub struct Tint {
    color: String,
    rgb: [u8; 3],
    strength: f32,
}

impl Tint {
    pub fn new(config: &ParamMap) -> Self {
        let params = seed_params(SCHEMA, config);
        let color = params["color"].as_str().unwrap_or("#ff8000").to_string();
        Self {
            rgb: parse_hex_color(&color).unwrap_or([255, 128, 0]),
            color,
            strength: params["strength"].as_f32().unwrap_or(0.5).clamp(0.0, 1.0),
        }
    }
}

impl Plugin for Tint {
    fn meta(&self) -> &'static PluginMeta {
        &META
    }

    fn param_schema(&self) -> &'static [ParamSpec] {
        SCHEMA
    }

    fn update_param(&mut self, name: &str, value: ParamValue) -> bool {
        match name {
            "color" => match value.as_str().and_then(parse_hex_color) {
                Some(rgb) => {
                    self.rgb = rgb;
                    self.color = value.as_str().unwrap_or_default().to_string();
                    true
                }
                None => false,
            },
            "strength" => {
                self.strength = value.as_f32().unwrap_or(self.strength).clamp(0.0, 1.0);
                true
            }
            _ => false,
        }
    }

    fn params(&self) -> ParamMap {
        let mut map = ParamMap::new();
        map.insert("color".into(), ParamValue::Color(self.color.clone()));
        map.insert("strength".into(), ParamValue::Float(self.strength as f64));
        map
    }
}

impl Effect for Tint {
    fn process(&mut self, mut frame: Frame, _ctx: &EffectContext) -> Result<Frame, String> {
        let s = self.strength;
        let tint = self.rgb;
        for px in frame.pixels.chunks_exact_mut(3) {
            let lum = luminance([px[0], px[1], px[2]]);
            for c in 0..3 {
                let tinted = tint[c] as f32 * lum;
                px[c] = (px[c] as f32 * (1.0 - s) + tinted * s).round() as u8;
            }
        }
        Ok(frame)
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
