//! Color temperature shift (warm/cool).

use crate::frame::Frame;
use crate::plugin::{
    seed_params, Effect, EffectContext, ParamMap, ParamSpec, ParamValue, Plugin, PluginKind,
    PluginMeta,
};

pub const META: PluginMeta = PluginMeta {
    id: "temperature",
    name: "Temperature",
    description: "Warm/cool color temperature shift",
    author: "Prism Team",
    version: "1.0.0",
    kind: PluginKind::Effect,
};

pub const SCHEMA: &[ParamSpec] = &[ParamSpec::float(
    "amount",
    "Amount",
    0.0,
    -100.0,
    100.0,
    1.0,
    "Negative = cooler (blue), positive = warmer (red)",
)];

pub struct Temperature {
    amount: f32,
}

impl Temperature {
    pub fn new(config: &ParamMap) -> Self {
        let params = seed_params(SCHEMA, config);
        Self {
            amount: params["amount"].as_f32().unwrap_or(0.0).clamp(-100.0, 100.0),
        }
    }
}

impl Plugin for Temperature {
    fn meta(&self) -> &'static PluginMeta {
        &META
    }

    fn param_schema(&self) -> &'static [ParamSpec] {
        SCHEMA
    }

    fn update_param(&mut self, name: &str, value: ParamValue) -> bool {
        if name == "amount" {
            self.amount = value.as_f32().unwrap_or(self.amount).clamp(-100.0, 100.0);
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

impl Effect for Temperature {
    fn process(&mut self, mut frame: Frame, _ctx: &EffectContext) -> Result<Frame, String> {
        if self.amount.abs() < f32::EPSILON {
            return Ok(frame);
        }
        // Half-strength shift on red and blue in opposite directions.
        let shift = self.amount * 0.5;
        for px in frame.pixels.chunks_exact_mut(3) {
            px[0] = (px[0] as f32 + shift).clamp(0.0, 255.0) as u8;
            px[2] = (px[2] as f32 - shift).clamp(0.0, 255.0) as u8;
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
    fn warm_shift_raises_red_lowers_blue() {
        let mut fx = Temperature::new(&ParamMap::new());
        fx.update_param("amount", ParamValue::Float(40.0));
        let ctx = EffectContext::new(0.0, 0, 30.0, 2, 2);
        let out = fx.process(Frame::solid(2, 2, [100, 100, 100]), &ctx).unwrap();
        assert_eq!(out.get(0, 0), [120, 100, 80]);
    }
}
