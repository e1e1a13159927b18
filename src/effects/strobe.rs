//! Strobe: alternate between visible and black frames.

use crate::frame::Frame;
use crate::plugin::{
    seed_params, Effect, EffectContext, ParamMap, ParamSpec, ParamValue, Plugin, PluginKind,
    PluginMeta,
};

pub const META: PluginMeta = PluginMeta {
    id: "strobe",
    name: "Strobe",
    description: "Strobe light effect with alternating frames",
    author: "Prism Team",
    version: "1.0.0",
    kind: PluginKind::Effect,
};

pub const SCHEMA: &[ParamSpec] = &[
    ParamSpec::int("frequency", "Frequency", 2, 1, 30, "Cycle length in frames"),
    ParamSpec::int("flash_frames", "Flash Duration", 1, 1, 10, "Visible frames per cycle"),
    ParamSpec::float("intensity", "Intensity", 1.0, 0.0, 1.0, 0.1, "Flash brightness"),
];

pub struct Strobe {
    frequency: u64,
    flash_frames: u64,
    intensity: f32,
    frame_counter: u64,
}

impl Strobe {
    pub fn new(config: &ParamMap) -> Self {
        let params = seed_params(SCHEMA, config);
        Self {
            frequency: params["frequency"].as_i64().unwrap_or(2).clamp(1, 30) as u64,
            flash_frames: params["flash_frames"].as_i64().unwrap_or(1).clamp(1, 10) as u64,
            intensity: params["intensity"].as_f32().unwrap_or(1.0).clamp(0.0, 1.0),
            frame_counter: 0,
        }
    }
}

impl Plugin for Strobe {
    fn meta(&self) -> &'static PluginMeta {
        &META
    }

    fn param_schema(&self) -> &'static [ParamSpec] {
        SCHEMA
    }

    fn update_param(&mut self, name: &str, value: ParamValue) -> bool {
        match name {
            "frequency" => {
                self.frequency = value.as_i64().unwrap_or(self.frequency as i64).clamp(1, 30) as u64;
                true
            }
            "flash_frames" => {
                self.flash_frames =
                    value.as_i64().unwrap_or(self.flash_frames as i64).clamp(1, 10) as u64;
                true
            }
            "intensity" => {
                self.intensity = value.as_f32().unwrap_or(self.intensity).clamp(0.0, 1.0);
                true
            }
            _ => false,
        }
    }

    fn params(&self) -> ParamMap {
        let mut map = ParamMap::new();
        map.insert("frequency".into(), ParamValue::Int(self.frequency as i64));
        map.insert("flash_frames".into(), ParamValue::Int(self.flash_frames as i64));
        map.insert("intensity".into(), ParamValue::Float(self.intensity as f64));
        map
    }
}

impl Effect for Strobe {
    fn process(&mut self, mut frame: Frame, _ctx: &EffectContext) -> Result<Frame, String> {
        let cycle_position = self.frame_counter % self.frequency;
        self.frame_counter = self.frame_counter.wrapping_add(1);

        if cycle_position < self.flash_frames {
            if self.intensity < 0.99 {
                for byte in frame.pixels.iter_mut() {
                    *byte = (*byte as f32 * self.intensity) as u8;
                }
            }
            Ok(frame)
        } else {
            Ok(Frame::new(frame.width, frame.height))
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alternates_visible_and_black() {
        let mut fx = Strobe::new(&ParamMap::new());
        let ctx = EffectContext::new(0.0, 0, 30.0, 2, 2);
        let input = Frame::solid(2, 2, [200, 200, 200]);

        let first = fx.process(input.clone(), &ctx).unwrap();
        assert_eq!(first.get(0, 0), [200, 200, 200]);
        let second = fx.process(input.clone(), &ctx).unwrap();
        assert_eq!(second.get(0, 0), [0, 0, 0]);
        let third = fx.process(input, &ctx).unwrap();
        assert_eq!(third.get(0, 0), [200, 200, 200]);
    }
}
