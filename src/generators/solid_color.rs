//! Single solid color, mostly used for blackout and test fixtures.

use crate::frame::Frame;
use crate::plugin::{
    parse_hex_color, seed_params, Generator, ParamMap, ParamSpec, ParamValue, Plugin, PluginKind,
    PluginMeta,
};

pub const META: PluginMeta = PluginMeta {
    id: "solid_color",
    name: "Solid Color",
    description: "Constant single-color frame",
    author: "Prism Team",
    version: "1.0.0",
    kind: PluginKind::Generator,
};

pub const SCHEMA: &[ParamSpec] = &[
    ParamSpec::color("color", "Color", "#ffffff", "Fill color"),
    ParamSpec::int(
        "duration",
        "Duration (seconds)",
        10,
        1,
        600,
        "Playback duration in seconds (for playlist auto-advance)",
    ),
];

pub struct SolidColor {
    color: String,
    rgb: [u8; 3],
    duration: u32,
}

impl SolidColor {
    pub fn new(config: &ParamMap) -> Self {
        let params = seed_params(SCHEMA, config);
        let color = params["color"].as_str().unwrap_or("#ffffff").to_string();
        let rgb = parse_hex_color(&color).unwrap_or([255, 255, 255]);
        Self {
            color,
            rgb,
            duration: params["duration"].as_i64().unwrap_or(10).clamp(1, 600) as u32,
        }
    }
}

impl Plugin for SolidColor {
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
                    self.color = value.as_str().unwrap_or("#ffffff").to_string();
                    true
                }
                None => false,
            },
            "duration" => {
                self.duration =
                    value.as_i64().unwrap_or(self.duration as i64).clamp(1, 600) as u32;
                true
            }
            _ => false,
        }
    }

    fn params(&self) -> ParamMap {
        let mut map = ParamMap::new();
        map.insert("color".into(), ParamValue::Color(self.color.clone()));
        map.insert("duration".into(), ParamValue::Int(self.duration as i64));
        map
    }
}

impl Generator for SolidColor {
    fn generate(
        &mut self,
        width: u32,
        height: u32,
        _frame_number: u64,
        _time: f64,
        _fps: f32,
    ) -> Result<Frame, String> {
        Ok(Frame::solid(width, height, self.rgb))
    }

    fn duration_s(&self) -> Option<f64> {
        Some(self.duration as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_with_configured_color() {
        let mut config = ParamMap::new();
        config.insert("color".into(), ParamValue::Color("#0a141e".into()));
        let mut gen = SolidColor::new(&config);
        let frame = gen.generate(8, 8, 0, 0.0, 30.0).unwrap();
        assert_eq!(frame.get(4, 4), [10, 20, 30]);
    }

    #[test]
    fn rejects_bad_hex() {
        let mut gen = SolidColor::new(&ParamMap::new());
        assert!(!gen.update_param("color", ParamValue::Color("red".into())));
        assert_eq!(gen.rgb, [255, 255, 255]);
    }
}
