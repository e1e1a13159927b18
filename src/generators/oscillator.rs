//! Waveform visualization (sine, square, sawtooth, triangle).

use crate::color::hsv_to_rgb;
use crate::frame::Frame;
use crate::plugin::{
    seed_params, Generator, ParamMap, ParamSpec, ParamValue, Plugin, PluginKind, PluginMeta,
};

pub const META: PluginMeta = PluginMeta {
    id: "oscillator",
    name: "Oscillator",
    description: "Waveform generator (sine, square, sawtooth, triangle)",
    author: "Prism Team",
    version: "1.0.0",
    kind: PluginKind::Generator,
};

pub const SCHEMA: &[ParamSpec] = &[
    ParamSpec::select(
        "waveform",
        "Waveform",
        "sine",
        &["sine", "square", "sawtooth", "triangle"],
        "Waveform type",
    ),
    ParamSpec::float("frequency", "Frequency", 1.0, 0.1, 10.0, 0.1, "Wave frequency"),
    ParamSpec::float("amplitude", "Amplitude", 0.8, 0.1, 1.0, 0.1, "Wave amplitude"),
    ParamSpec::int("line_count", "Line Count", 3, 1, 10, "Number of waveform lines"),
    ParamSpec::int("line_width", "Line Width", 2, 1, 10, "Line thickness"),
    ParamSpec::bool("animated", "Animated", true, "Animate waveform over time"),
    ParamSpec::int(
        "duration",
        "Duration (seconds)",
        10,
        1,
        600,
        "Playback duration in seconds (for playlist auto-advance)",
    ),
];

pub struct Oscillator {
    waveform: String,
    frequency: f32,
    amplitude: f32,
    line_count: u32,
    line_width: u32,
    animated: bool,
    duration: u32,
}

impl Oscillator {
    pub fn new(config: &ParamMap) -> Self {
        let params = seed_params(SCHEMA, config);
        Self {
            waveform: params["waveform"].as_str().unwrap_or("sine").to_string(),
            frequency: params["frequency"].as_f32().unwrap_or(1.0).clamp(0.1, 10.0),
            amplitude: params["amplitude"].as_f32().unwrap_or(0.8).clamp(0.1, 1.0),
            line_count: params["line_count"].as_i64().unwrap_or(3).clamp(1, 10) as u32,
            line_width: params["line_width"].as_i64().unwrap_or(2).clamp(1, 10) as u32,
            animated: params["animated"].as_bool().unwrap_or(true),
            duration: params["duration"].as_i64().unwrap_or(10).clamp(1, 600) as u32,
        }
    }

    fn wave(&self, x: f32) -> f32 {
        use std::f32::consts::TAU;
        match self.waveform.as_str() {
            "sine" => (x * TAU).sin(),
            "square" => (x * TAU).sin().signum(),
            "sawtooth" => 2.0 * x.rem_euclid(1.0) - 1.0,
            "triangle" => 2.0 * (2.0 * x.rem_euclid(1.0) - 1.0).abs() - 1.0,
            _ => 0.0,
        }
    }
}

impl Plugin for Oscillator {
    fn meta(&self) -> &'static PluginMeta {
        &META
    }

    fn param_schema(&self) -> &'static [ParamSpec] {
        SCHEMA
    }

    fn update_param(&mut self, name: &str, value: ParamValue) -> bool {
        match name {
            "waveform" => {
                if let Some(s) = value.as_str() {
                    if ["sine", "square", "sawtooth", "triangle"].contains(&s) {
                        self.waveform = s.to_string();
                        return true;
                    }
                }
                false
            }
            "frequency" => {
                self.frequency = value.as_f32().unwrap_or(self.frequency).clamp(0.1, 10.0);
                true
            }
            "amplitude" => {
                self.amplitude = value.as_f32().unwrap_or(self.amplitude).clamp(0.1, 1.0);
                true
            }
            "line_count" => {
                self.line_count =
                    value.as_i64().unwrap_or(self.line_count as i64).clamp(1, 10) as u32;
                true
            }
            "line_width" => {
                self.line_width =
                    value.as_i64().unwrap_or(self.line_width as i64).clamp(1, 10) as u32;
                true
            }
            "animated" => {
                self.animated = value.as_bool().unwrap_or(self.animated);
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
        map.insert("waveform".into(), ParamValue::Select(self.waveform.clone()));
        map.insert("frequency".into(), ParamValue::Float(self.frequency as f64));
        map.insert("amplitude".into(), ParamValue::Float(self.amplitude as f64));
        map.insert("line_count".into(), ParamValue::Int(self.line_count as i64));
        map.insert("line_width".into(), ParamValue::Int(self.line_width as i64));
        map.insert("animated".into(), ParamValue::Bool(self.animated));
        map.insert("duration".into(), ParamValue::Int(self.duration as i64));
        map
    }
}

impl Generator for Oscillator {
    fn generate(
        &mut self,
        width: u32,
        height: u32,
        _frame_number: u64,
        time: f64,
        _fps: f32,
    ) -> Result<Frame, String> {
        let mut frame = Frame::new(width, height);
        if width < 2 {
            return Ok(frame);
        }

        for line_idx in 0..self.line_count {
            let line_y = ((line_idx as f32 + 0.5) * height as f32 / self.line_count as f32) as i32;
            let phase = if self.animated {
                time as f32 * self.frequency
            } else {
                0.0
            } + line_idx as f32 * 0.2;

            let hue = line_idx as f32 / (self.line_count.max(2) - 1) as f32 * 0.5;
            let rgb = hsv_to_rgb(hue, 1.0, 1.0);

            let y_offset = self.amplitude * height as f32 / (2.0 * self.line_count as f32);
            let half = (self.line_width / 2) as i32;

            let mut prev_y = None;
            for x in 0..width {
                let xf = x as f32 / (width - 1) as f32;
                let wave = self.wave(xf * self.frequency + phase);
                let y = (line_y + (wave * y_offset) as i32).clamp(0, height as i32 - 1);

                // Vertical span between consecutive samples keeps steep lines solid.
                let (lo, hi) = match prev_y {
                    Some(p) if p != y => (y.min(p), y.max(p)),
                    _ => (y, y),
                };
                prev_y = Some(y);

                for yy in (lo - half).max(0)..=(hi + half).min(height as i32 - 1) {
                    frame.put(x, yy as u32, rgb);
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
    fn draws_some_pixels() {
        let mut gen = Oscillator::new(&ParamMap::new());
        let frame = gen.generate(64, 64, 0, 0.0, 30.0).unwrap();
        let lit = frame.pixels.iter().filter(|&&b| b > 0).count();
        assert!(lit > 0);
    }

    #[test]
    fn square_wave_hits_extremes() {
        let gen = Oscillator {
            waveform: "square".into(),
            frequency: 1.0,
            amplitude: 1.0,
            line_count: 1,
            line_width: 1,
            animated: false,
            duration: 10,
        };
        assert_eq!(gen.wave(0.25), 1.0);
        assert_eq!(gen.wave(0.75), -1.0);
    }
}
