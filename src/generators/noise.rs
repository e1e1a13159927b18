//! Noise pattern generator.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::color::hsv_to_rgb;
use crate::frame::Frame;
use crate::plugin::{
    seed_params, Generator, ParamMap, ParamSpec, ParamValue, Plugin, PluginKind, PluginMeta,
};

pub const META: PluginMeta = PluginMeta {
    id: "noise",
    name: "Noise",
    description: "Noise pattern generator",
    author: "Prism Team",
    version: "1.0.0",
    kind: PluginKind::Generator,
};

pub const SCHEMA: &[ParamSpec] = &[
    ParamSpec::select(
        "noise_type",
        "Noise Type",
        "white",
        &["white", "smooth", "colored"],
        "Type of noise pattern",
    ),
    ParamSpec::float("scale", "Scale", 1.0, 0.1, 10.0, 0.1, "Noise feature scale"),
    ParamSpec::bool("animated", "Animated", true, "Animate noise over time"),
    ParamSpec::int(
        "duration",
        "Duration (seconds)",
        10,
        1,
        600,
        "Playback duration in seconds (for playlist auto-advance)",
    ),
];

pub struct NoiseField {
    noise_type: String,
    scale: f32,
    animated: bool,
    duration: u32,
}

impl NoiseField {
    pub fn new(config: &ParamMap) -> Self {
        let params = seed_params(SCHEMA, config);
        Self {
            noise_type: params["noise_type"].as_str().unwrap_or("white").to_string(),
            scale: params["scale"].as_f32().unwrap_or(1.0).clamp(0.1, 10.0),
            animated: params["animated"].as_bool().unwrap_or(true),
            duration: params["duration"].as_i64().unwrap_or(10).clamp(1, 600) as u32,
        }
    }

    // The seed derives from time, so a given tick is reproducible and a
    // paused transport holds a stable frame.
    fn rng_for(&self, time: f64) -> StdRng {
        let seed = if self.animated {
            (time * 30.0) as u64
        } else {
            0
        };
        StdRng::seed_from_u64(seed)
    }
}

impl Plugin for NoiseField {
    fn meta(&self) -> &'static PluginMeta {
        &META
    }

    fn param_schema(&self) -> &'static [ParamSpec] {
        SCHEMA
    }

    fn update_param(&mut self, name: &str, value: ParamValue) -> bool {
        match name {
            "noise_type" => {
                if let Some(s) = value.as_str() {
                    if ["white", "smooth", "colored"].contains(&s) {
                        self.noise_type = s.to_string();
                        return true;
                    }
                }
                false
            }
            "scale" => {
                self.scale = value.as_f32().unwrap_or(self.scale).clamp(0.1, 10.0);
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
        map.insert("noise_type".into(), ParamValue::Select(self.noise_type.clone()));
        map.insert("scale".into(), ParamValue::Float(self.scale as f64));
        map.insert("animated".into(), ParamValue::Bool(self.animated));
        map.insert("duration".into(), ParamValue::Int(self.duration as i64));
        map
    }
}

impl Generator for NoiseField {
    fn generate(
        &mut self,
        width: u32,
        height: u32,
        _frame_number: u64,
        time: f64,
        _fps: f32,
    ) -> Result<Frame, String> {
        let mut frame = Frame::new(width, height);
        let mut rng = self.rng_for(time);

        match self.noise_type.as_str() {
            "white" => {
                for px in frame.pixels.chunks_exact_mut(3) {
                    let v: u8 = rng.gen();
                    px[0] = v;
                    px[1] = v;
                    px[2] = v;
                }
            }
            "colored" => {
                for px in frame.pixels.chunks_exact_mut(3) {
                    let hue: f32 = rng.gen();
                    px.copy_from_slice(&hsv_to_rgb(hue, 1.0, rng.gen::<f32>()));
                }
            }
            "smooth" => {
                // Value noise: a coarse random grid, bilinearly upsampled.
                let cell = (8.0 * self.scale).max(1.0) as u32;
                let grid_w = width / cell + 2;
                let grid_h = height / cell + 2;
                let grid: Vec<f32> = (0..grid_w * grid_h).map(|_| rng.gen()).collect();
                for y in 0..height {
                    let gy = y as f32 / cell as f32;
                    let y0 = gy as u32;
                    let fy = gy - y0 as f32;
                    for x in 0..width {
                        let gx = x as f32 / cell as f32;
                        let x0 = gx as u32;
                        let fx = gx - x0 as f32;
                        let idx = |cx: u32, cy: u32| grid[(cy * grid_w + cx) as usize];
                        let top = idx(x0, y0) * (1.0 - fx) + idx(x0 + 1, y0) * fx;
                        let bottom = idx(x0, y0 + 1) * (1.0 - fx) + idx(x0 + 1, y0 + 1) * fx;
                        let v = (top * (1.0 - fy) + bottom * fy).clamp(0.0, 1.0);
                        let byte = (v * 255.0) as u8;
                        frame.put(x, y, [byte, byte, byte]);
                    }
                }
            }
            _ => {}
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
    fn same_time_same_frame() {
        let mut gen = NoiseField::new(&ParamMap::new());
        let a = gen.generate(16, 16, 0, 2.0, 30.0).unwrap();
        let b = gen.generate(16, 16, 0, 2.0, 30.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn static_when_not_animated() {
        let mut gen = NoiseField::new(&ParamMap::new());
        gen.update_param("animated", ParamValue::Bool(false));
        let a = gen.generate(16, 16, 0, 0.0, 30.0).unwrap();
        let b = gen.generate(16, 16, 90, 3.0, 30.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_unknown_noise_type() {
        let mut gen = NoiseField::new(&ParamMap::new());
        assert!(!gen.update_param("noise_type", ParamValue::Text("perlin".into())));
        assert_eq!(gen.params()["noise_type"].as_str(), Some("white"));
    }
}
