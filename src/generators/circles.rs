//! Expanding concentric circles.

use crate::color::hsv_to_rgb;
use crate::frame::Frame;
use crate::plugin::{
    seed_params, Generator, ParamMap, ParamSpec, ParamValue, Plugin, PluginKind, PluginMeta,
};

pub const META: PluginMeta = PluginMeta {
    id: "circles",
    name: "Circles",
    description: "Concentric rings expanding from the center",
    author: "Prism Team",
    version: "1.0.0",
    kind: PluginKind::Generator,
};

pub const SCHEMA: &[ParamSpec] = &[
    ParamSpec::float("speed", "Speed", 1.0, 0.0, 5.0, 0.1, "Expansion speed"),
    ParamSpec::float(
        "ring_width",
        "Ring Width",
        30.0,
        5.0,
        200.0,
        1.0,
        "Width of one ring in pixels",
    ),
    ParamSpec::bool("rainbow", "Rainbow", true, "Color rings by hue instead of white"),
    ParamSpec::int(
        "duration",
        "Duration (seconds)",
        10,
        1,
        600,
        "Playback duration in seconds (for playlist auto-advance)",
    ),
];

pub struct Circles {
    speed: f32,
    ring_width: f32,
    rainbow: bool,
    duration: u32,
}

impl Circles {
    pub fn new(config: &ParamMap) -> Self {
        let params = seed_params(SCHEMA, config);
        Self {
            speed: params["speed"].as_f32().unwrap_or(1.0),
            ring_width: params["ring_width"].as_f32().unwrap_or(30.0).max(1.0),
            rainbow: params["rainbow"].as_bool().unwrap_or(true),
            duration: params["duration"].as_i64().unwrap_or(10).clamp(1, 600) as u32,
        }
    }
}

impl Plugin for Circles {
    fn meta(&self) -> &'static PluginMeta {
        &META
    }

    fn param_schema(&self) -> &'static [ParamSpec] {
        SCHEMA
    }

    fn update_param(&mut self, name: &str, value: ParamValue) -> bool {
        match name {
            "speed" => {
                self.speed = value.as_f32().unwrap_or(self.speed).clamp(0.0, 5.0);
                true
            }
            "ring_width" => {
                self.ring_width = value.as_f32().unwrap_or(self.ring_width).clamp(5.0, 200.0);
                true
            }
            "rainbow" => {
                self.rainbow = value.as_bool().unwrap_or(self.rainbow);
                true
            }
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
        map.insert("speed".into(), ParamValue::Float(self.speed as f64));
        map.insert("ring_width".into(), ParamValue::Float(self.ring_width as f64));
        map.insert("rainbow".into(), ParamValue::Bool(self.rainbow));
        map.insert("duration".into(), ParamValue::Int(self.duration as i64));
        map
    }
}

impl Generator for Circles {
    fn generate(
        &mut self,
        width: u32,
        height: u32,
        _frame_number: u64,
        time: f64,
        _fps: f32,
    ) -> Result<Frame, String> {
        let mut frame = Frame::new(width, height);
        let cx = width as f32 / 2.0;
        let cy = height as f32 / 2.0;
        let phase = time as f32 * self.speed * self.ring_width;

        for y in 0..height {
            let dy = y as f32 - cy;
            for x in 0..width {
                let dx = x as f32 - cx;
                let dist = (dx * dx + dy * dy).sqrt();
                let ring = ((dist - phase) / self.ring_width).rem_euclid(1.0);
                let rgb = if self.rainbow {
                    hsv_to_rgb(ring, 1.0, 1.0)
                } else {
                    // Hard-edged monochrome rings.
                    let v = if ring < 0.5 { 255 } else { 0 };
                    [v, v, v]
                };
                frame.put(x, y, rgb);
            }
        }

        Ok(frame)
    }

    fn duration_s(&self) -> Option<f64> {
        Some(self.duration as f64)
    }
}
