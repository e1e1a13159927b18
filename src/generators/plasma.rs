//! Classic plasma demo effect: four overlaid sine waves mapped to hue.

use rayon::prelude::*;

use crate::color::hsv_to_rgb;
use crate::frame::Frame;
use crate::plugin::{
    seed_params, Generator, ParamMap, ParamSpec, ParamValue, Plugin, PluginKind, PluginMeta,
};

pub const META: PluginMeta = PluginMeta {
    id: "plasma",
    name: "Plasma",
    description: "Classic plasma effect from overlaid sine waves",
    author: "Prism Team",
    version: "1.0.0",
    kind: PluginKind::Generator,
};

pub const SCHEMA: &[ParamSpec] = &[
    ParamSpec::float("speed", "Speed", 0.5, 0.0, 5.0, 0.1, "Animation speed"),
    ParamSpec::float(
        "scale",
        "Scale",
        1.0,
        0.1,
        5.0,
        0.1,
        "Pattern scale (higher = larger features)",
    ),
    ParamSpec::float(
        "hue_shift",
        "Hue Shift",
        0.1,
        0.0,
        1.0,
        0.01,
        "Color rotation speed",
    ),
    ParamSpec::int(
        "duration",
        "Duration (seconds)",
        10,
        1,
        600,
        "Playback duration in seconds (for playlist auto-advance)",
    ),
];

pub struct Plasma {
    speed: f32,
    scale: f32,
    hue_shift: f32,
    duration: u32,
}

impl Plasma {
    pub fn new(config: &ParamMap) -> Self {
        let params = seed_params(SCHEMA, config);
        Self {
            speed: params["speed"].as_f32().unwrap_or(0.5),
            scale: params["scale"].as_f32().unwrap_or(1.0).max(0.1),
            hue_shift: params["hue_shift"].as_f32().unwrap_or(0.1),
            duration: params["duration"].as_i64().unwrap_or(10).clamp(1, 600) as u32,
        }
    }
}

impl Plugin for Plasma {
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
            "scale" => {
                self.scale = value.as_f32().unwrap_or(self.scale).clamp(0.1, 5.0);
                true
            }
            "hue_shift" => {
                self.hue_shift = value.as_f32().unwrap_or(self.hue_shift).clamp(0.0, 1.0);
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
        map.insert("scale".into(), ParamValue::Float(self.scale as f64));
        map.insert("hue_shift".into(), ParamValue::Float(self.hue_shift as f64));
        map.insert("duration".into(), ParamValue::Int(self.duration as i64));
        map
    }
}

impl Generator for Plasma {
    fn generate(
        &mut self,
        width: u32,
        height: u32,
        _frame_number: u64,
        time: f64,
        _fps: f32,
    ) -> Result<Frame, String> {
        let mut frame = Frame::new(width, height);
        let t = time as f32 * self.speed;
        let hue_offset = (time as f32 * self.hue_shift).rem_euclid(1.0);
        let scale = self.scale;
        let w = width as usize;

        frame
            .pixels
            .par_chunks_exact_mut(w * 3)
            .enumerate()
            .for_each(|(row, line)| {
                let y = row as f32 / scale;
                for (col, px) in line.chunks_exact_mut(3).enumerate() {
                    let x = col as f32 / scale;
                    let v1 = (x / 16.0 + t).sin();
                    let v2 = (y / 8.0 + t).sin();
                    let v3 = ((x + y) / 16.0 + t).sin();
                    let v4 = ((x * x + y * y).sqrt() / 8.0 + t).sin();
                    let plasma = ((v1 + v2 + v3 + v4) / 4.0 + 1.0) / 2.0;
                    let hue = (plasma + hue_offset).rem_euclid(1.0);
                    px.copy_from_slice(&hsv_to_rgb(hue, 1.0, 1.0));
                }
            });

        Ok(frame)
    }

    fn duration_s(&self) -> Option<f64> {
        Some(self.duration as f64)
    }
}
