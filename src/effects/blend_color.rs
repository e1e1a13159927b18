//! Blend the frame against a solid color with any blend mode.

use crate::blend::{blend_pixel, BlendMode};
use crate::frame::Frame;
use crate::plugin::{
    parse_hex_color, seed_params, Effect, EffectContext, ParamMap, ParamSpec, ParamValue, Plugin,
    PluginKind, PluginMeta,
};

pub const META: PluginMeta = PluginMeta {
    id: "blend_color",
    name: "Blend Color",
    description: "Blend the frame with a solid color (multiply, screen, overlay, ...)",
    author: "Prism Team",
    version: "1.0.0",
    kind: PluginKind::Effect,
};

pub const SCHEMA: &[ParamSpec] = &[
    ParamSpec::select(
        "mode",
        "Mode",
        "normal",
        &[
            "normal",
            "multiply",
            "screen",
            "overlay",
            "add",
            "subtract",
            "darken",
            "lighten",
            "color_dodge",
            "color_burn",
            "hard_light",
            "soft_light",
            "difference",
            "exclusion",
            "mask",
        ],
        "Blend mode to use",
    ),
    ParamSpec::color("color", "Color", "#ffffff", "Blend color"),
    ParamSpec::range("opacity", "Opacity", 100.0, 0.0, 100.0, "Blend opacity (0-100%)"),
    ParamSpec::range(
        "mix",
        "Mix",
        100.0,
        0.0,
        100.0,
        "Mix between original and effect (0-100%)",
    ),
];

pub struct BlendColor {
    mode: BlendMode,
    color: String,
    rgb: [u8; 3],
    opacity: f32,
    mix: f32,
}

impl BlendColor {
    pub fn new(config: &ParamMap) -> Self {
        let params = seed_params(SCHEMA, config);
        let color = params["color"].as_str().unwrap_or("#ffffff").to_string();
        Self {
            mode: params["mode"]
                .as_str()
                .and_then(BlendMode::parse)
                .unwrap_or(BlendMode::Normal),
            rgb: parse_hex_color(&color).unwrap_or([255, 255, 255]),
            color,
            opacity: params["opacity"].as_f32().unwrap_or(100.0) / 100.0,
            mix: params["mix"].as_f32().unwrap_or(100.0) / 100.0,
        }
    }
}

impl Plugin for BlendColor {
    fn meta(&self) -> &'static PluginMeta {
        &META
    }

    fn param_schema(&self) -> &'static [ParamSpec] {
        SCHEMA
    }

    fn update_param(&mut self, name: &str, value: ParamValue) -> bool {
        match name {
            "mode" => match value.as_str().and_then(BlendMode::parse) {
                Some(mode) => {
                    self.mode = mode;
                    true
                }
                None => false,
            },
            "color" => match value.as_str().and_then(parse_hex_color) {
                Some(rgb) => {
                    self.rgb = rgb;
                    self.color = value.as_str().unwrap_or("#ffffff").to_string();
                    true
                }
                None => false,
            },
            "opacity" => {
                self.opacity = value.as_f32().unwrap_or(self.opacity * 100.0).clamp(0.0, 100.0)
                    / 100.0;
                true
            }
            "mix" => {
                self.mix =
                    value.as_f32().unwrap_or(self.mix * 100.0).clamp(0.0, 100.0) / 100.0;
                true
            }
            _ => false,
        }
    }

    fn params(&self) -> ParamMap {
        let mut map = ParamMap::new();
        map.insert("mode".into(), ParamValue::Select(self.mode.name().to_string()));
        map.insert("color".into(), ParamValue::Color(self.color.clone()));
        map.insert("opacity".into(), ParamValue::Float((self.opacity * 100.0) as f64));
        map.insert("mix".into(), ParamValue::Float((self.mix * 100.0) as f64));
        map
    }
}

impl Effect for BlendColor {
    fn process(&mut self, mut frame: Frame, _ctx: &EffectContext) -> Result<Frame, String> {
        let rgb = self.rgb;
        let mode = self.mode;
        let opacity = self.opacity;
        let mix = self.mix;
        for px in frame.pixels.chunks_exact_mut(3) {
            let out = blend_pixel([px[0], px[1], px[2]], rgb, mode, opacity, mix);
            px.copy_from_slice(&out);
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

    fn ctx() -> EffectContext {
        EffectContext::new(0.0, 0, 30.0, 4, 4)
    }

    #[test]
    fn multiply_with_white_is_identity() {
        let mut config = ParamMap::new();
        config.insert("mode".into(), ParamValue::Select("multiply".into()));
        let mut fx = BlendColor::new(&config);
        let frame = Frame::solid(4, 4, [13, 77, 201]);
        let out = fx.process(frame.clone(), &ctx()).unwrap();
        assert_eq!(out, frame);
    }

    #[test]
    fn opacity_halves_the_effect() {
        let mut config = ParamMap::new();
        config.insert("mode".into(), ParamValue::Select("normal".into()));
        config.insert("color".into(), ParamValue::Color("#000000".into()));
        config.insert("opacity".into(), ParamValue::Float(50.0));
        let mut fx = BlendColor::new(&config);
        let out = fx.process(Frame::solid(2, 2, [200, 200, 200]), &ctx()).unwrap();
        assert_eq!(out.get(0, 0), [100, 100, 100]);
    }

    #[test]
    fn bad_mode_is_rejected() {
        let mut fx = BlendColor::new(&ParamMap::new());
        assert!(!fx.update_param("mode", ParamValue::Select("divide".into())));
    }
}
