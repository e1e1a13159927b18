//! Saturation scaling in HSV space.

use crate::color::{hsv_to_rgb, rgb_to_hsv};
use crate::frame::Frame;
use crate::plugin::{
    seed_params, Effect, EffectContext, ParamMap, ParamSpec, ParamValue, Plugin, PluginKind,
    PluginMeta,
};

pub const META: PluginMeta = PluginMeta {
    id: "saturation",
    name: "Saturation",
    description: "Scale color saturation (0 = grayscale, 1 = original)",
    author: "Prism Team",
    version: "1.0.0",
    kind: PluginKind::Effect,
};

pub const SCHEMA: &[ParamSpec] = &[ParamSpec::float(
    "amount",
    "Amount",
    1.0,
    0.0,
    3.0,
    0.05,
    "Saturation factor",
)];

pub struct Saturation {
    amount: f32,
}

impl Saturation {
    pub fn new(config: &ParamMap) -> Self {
        let params = seed_params(SCHEMA, config);
        Self {
            amount: params["amount"].as_f32().unwrap_or(1.0).clamp(0.0, 3.0),
        }
    }
}

impl Plugin for Saturation {
    fn meta(&self) -> &'static PluginMeta {
        &META
    }

    fn param_schema(&self) -> &'static [ParamSpec] {
        SCHEMA
    }

    fn update_param(&mut self, name: &str, value: ParamValue) -> bool {
        if name == "amount" {
            self.amount = value.as_f32().unwrap_or(self.amount).clamp(0.0, 3.0);
            return true;
        }
        false
    }

    fn params(&self) -> ParamMap {
        let mut map = ParamMap::new();
        map.insert("amount".into(), ParamValue::Float(self.amount as f64));
        map
    }
}

impl Effect for Saturation {
    fn process(&mut self, mut frame: Frame, _ctx: &EffectContext) -> Result<Frame, String> {
        if (self.amount - 1.0).abs() < f32::EPSILON {
            return Ok(frame);
        }
        let amount = self.amount;
        for px in frame.pixels.chunks_exact_mut(3) {
            let (h, s, v) = rgb_to_hsv([px[0], px[1], px[2]]);
            px.copy_from_slice(&hsv_to_rgb(h, (s * amount).clamp(0.0, 1.0), v));
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

    #[test]
    fn zero_amount_desaturates() {
        let mut fx = Saturation::new(&ParamMap::new());
        fx.update_param("amount", ParamValue::Float(0.0));
        let ctx = EffectContext::new(0.0, 0, 30.0, 2, 2);
        let out = fx.process(Frame::solid(2, 2, [255, 0, 0]), &ctx).unwrap();
        let [r, g, b] = out.get(0, 0);
        assert_eq!(r, g);
        assert_eq!(g, b);
    }

    #[test]
    fn unity_is_identity() {
        let mut fx = Saturation::new(&ParamMap::new());
        let ctx = EffectContext::new(0.0, 0, 30.0, 2, 2);
        let frame = Frame::solid(2, 2, [120, 45, 200]);
        assert_eq!(fx.process(frame.clone(), &ctx).unwrap(), frame);
    }
}
