//! Scrolling rainbow gradient.

use crate::color::hsv_to_rgb;
use crate::frame::Frame;
use crate::plugin::{
    seed_params, Generator, ParamMap, ParamSpec, ParamValue, Plugin, PluginKind, PluginMeta,
};

pub const META: PluginMeta = PluginMeta {
    id: "rainbow_wave",
    name: "Rainbow Wave",
    description: "Scrolling rainbow gradient, horizontal or vertical",
    author: "Prism Team",
    version: "1.0.0",
    kind: PluginKind::Generator,
};

pub const SCHEMA: &[ParamSpec] = &[
    ParamSpec::float("speed", "Speed", 0.2, 0.0, 5.0, 0.05, "Scroll speed"),
    ParamSpec::float(
        "wave_length",
        "Wave Length",
        100.0,
        10.0,
        1000.0,
        10.0,
        "Pixels per full hue cycle",
    ),
    ParamSpec::bool("vertical", "Vertical", false, "Scroll vertically instead of horizontally"),
    ParamSpec::int(
        "duration",
        "Duration (seconds)",
        10,
        1,
        600,
        "Playback duration in seconds (for playlist auto-advance)",
    ),
];

pub struct RainbowWave {
    speed: f32,
    wave_length: f32,
    vertical: bool,
    duration: u32,
}

impl RainbowWave {
    pub fn new(config: &ParamMap) -> Self {
        let params = seed_params(SCHEMA, config);
        Self {
            speed: params["speed"].as_f32().unwrap_or(0.2),
            wave_length: params["wave_length"].as_f32().unwrap_or(100.0).max(1.0),
            vertical: params["vertical"].as_bool().unwrap_or(false),
            duration: params["duration"].as_i64().unwrap_or(10).clamp(1, 600) as u32,
        }
    }
}

impl Plugin for RainbowWave {
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
            "wave_length" => {
                self.wave_length = value
                    .as_f32()
                    .unwrap_or(self.wave_length)
                    .clamp(10.0, 1000.0);
                true
            }
            "vertical" => {
                self.vertical = value.as_bool().unwrap_or(self.vertical);
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
        map.insert("wave_length".into(), ParamValue::Float(self.wave_length as f64));
        map.insert("vertical".into(), ParamValue::Bool(self.vertical));
        map.insert("duration".into(), ParamValue::Int(self.duration as i64));
        map
    }
}

impl Generator for RainbowWave {
    fn generate(
        &mut self,
        width: u32,
        height: u32,
        _frame_number: u64,
        time: f64,
        _fps: f32,
    ) -> Result<Frame, String> {
        let mut frame = Frame::new(width, height);
        let offset = (time as f32 * self.speed).rem_euclid(1.0);

        if self.vertical {
            // One row of hues, replicated across each column.
            for y in 0..height {
                let hue = (y as f32 / self.wave_length + offset).rem_euclid(1.0);
                let rgb = hsv_to_rgb(hue, 1.0, 1.0);
                for x in 0..width {
                    frame.put(x, y, rgb);
                }
            }
        } else {
            let row: Vec<[u8; 3]> = (0..width)
                .map(|x| {
                    let hue = (x as f32 / self.wave_length + offset).rem_euclid(1.0);
                    hsv_to_rgb(hue, 1.0, 1.0)
                })
                .collect();
            for y in 0..height {
                for (x, rgb) in row.iter().enumerate() {
                    frame.put(x as u32, y, *rgb);
                }
            }
        }

        Ok(frame)
    }

    fn duration_s(&self) -> Option<f64> {
        Some(self.duration as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizontal_rows_are_uniform() {
        let mut gen = RainbowWave::new(&ParamMap::new());
        let frame = gen.generate(32, 8, 0, 0.0, 30.0).unwrap();
        for y in 1..8 {
            assert_eq!(frame.get(5, y), frame.get(5, 0));
        }
        // Hue varies along x.
        assert_ne!(frame.get(0, 0), frame.get(31, 0));
    }

    #[test]
    fn vertical_columns_are_uniform() {
        let mut gen = RainbowWave::new(&ParamMap::new());
        gen.update_param("vertical", ParamValue::Bool(true));
        let frame = gen.generate(8, 32, 0, 0.0, 30.0).unwrap();
        for x in 1..8 {
            assert_eq!(frame.get(x, 5), frame.get(0, 5));
        }
    }
}
