//! Ghost trails from an internal frame-history ring buffer.

use std::collections::VecDeque;

use crate::frame::Frame;
use crate::plugin::{
    seed_params, Effect, EffectContext, ParamMap, ParamSpec, ParamValue, Plugin, PluginKind,
    PluginMeta,
};

pub const META: PluginMeta = PluginMeta {
    id: "trails",
    name: "Trails",
    description: "Ghost trails via exponentially decayed frame blending",
    author: "Prism Team",
    version: "1.0.0",
    kind: PluginKind::Effect,
};

pub const SCHEMA: &[ParamSpec] = &[
    ParamSpec::int("length", "Trail Length", 5, 2, 30, "Frames of trail history"),
    ParamSpec::float(
        "decay",
        "Decay",
        0.7,
        0.1,
        0.99,
        0.05,
        "Weight factor for older frames (higher = longer visible)",
    ),
];

pub struct Trails {
    length: usize,
    decay: f32,
    history: VecDeque<Frame>,
}

impl Trails {
    pub fn new(config: &ParamMap) -> Self {
        let params = seed_params(SCHEMA, config);
        let length = params["length"].as_i64().unwrap_or(5).clamp(2, 30) as usize;
        Self {
            length,
            decay: params["decay"].as_f32().unwrap_or(0.7).clamp(0.1, 0.99),
            history: VecDeque::with_capacity(length),
        }
    }
}

impl Plugin for Trails {
    fn meta(&self) -> &'static PluginMeta {
        &META
    }

    fn param_schema(&self) -> &'static [ParamSpec] {
        SCHEMA
    }

    fn update_param(&mut self, name: &str, value: ParamValue) -> bool {
        match name {
            "length" => {
                self.length = value.as_i64().unwrap_or(self.length as i64).clamp(2, 30) as usize;
                while self.history.len() > self.length {
                    self.history.pop_front();
                }
                true
            }
            "decay" => {
                self.decay = value.as_f32().unwrap_or(self.decay).clamp(0.1, 0.99);
                true
            }
            _ => false,
        }
    }

    fn params(&self) -> ParamMap {
        let mut map = ParamMap::new();
        map.insert("length".into(), ParamValue::Int(self.length as i64));
        map.insert("decay".into(), ParamValue::Float(self.decay as f64));
        map
    }

    fn cleanup(&mut self) {
        self.history.clear();
    }
}

impl Effect for Trails {
    fn process(&mut self, frame: Frame, _ctx: &EffectContext) -> Result<Frame, String> {
        // A resolution change invalidates the accumulated history.
        if self
            .history
            .front()
            .map(|f| !f.same_size(&frame))
            .unwrap_or(false)
        {
            self.history.clear();
        }

        if self.history.len() == self.length {
            self.history.pop_front();
        }
        self.history.push_back(frame.clone());

        if self.history.len() < 2 {
            return Ok(frame);
        }

        let count = self.history.len();
        let mut accum = vec![0.0f32; frame.pixels.len()];
        let mut total_weight = 0.0f32;

        for (i, hist) in self.history.iter().enumerate() {
            let weight = self.decay.powi((count - i - 1) as i32);
            total_weight += weight;
            for (acc, &byte) in accum.iter_mut().zip(hist.pixels.iter()) {
                *acc += byte as f32 * weight;
            }
        }

        let mut out = Frame::new(frame.width, frame.height);
        for (dst, acc) in out.pixels.iter_mut().zip(accum.iter()) {
            *dst = (acc / total_weight).clamp(0.0, 255.0) as u8;
        }
        Ok(out)
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_passes_through() {
        let mut fx = Trails::new(&ParamMap::new());
        let ctx = EffectContext::new(0.0, 0, 30.0, 2, 2);
        let frame = Frame::solid(2, 2, [100, 100, 100]);
        assert_eq!(fx.process(frame.clone(), &ctx).unwrap(), frame);
    }

    #[test]
    fn bright_frame_leaves_a_trail() {
        let mut fx = Trails::new(&ParamMap::new());
        let ctx = EffectContext::new(0.0, 0, 30.0, 2, 2);
        fx.process(Frame::solid(2, 2, [255, 255, 255]), &ctx).unwrap();
        let out = fx.process(Frame::new(2, 2), &ctx).unwrap();
        // Black current frame still shows a ghost of the white one.
        assert!(out.get(0, 0)[0] > 0);
        assert!(out.get(0, 0)[0] < 255);
    }

    #[test]
    fn history_is_bounded_by_length() {
        let mut config = ParamMap::new();
        config.insert("length".into(), ParamValue::Int(2));
        let mut fx = Trails::new(&config);
        let ctx = EffectContext::new(0.0, 0, 30.0, 2, 2);
        for _ in 0..10 {
            fx.process(Frame::new(2, 2), &ctx).unwrap();
        }
        assert_eq!(fx.history.len(), 2);
    }
}
