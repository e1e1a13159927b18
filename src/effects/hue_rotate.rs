//! Hue rotation, static or animated.

use crate::color::{hsv_to_rgb, rgb_to_hsv};
use crate::frame::Frame;
use crate::plugin::{
    seed_params, Effect, EffectContext, ParamMap, ParamSpec, ParamValue, Plugin, PluginKind,
    PluginMeta,
};

pub const META: PluginMeta = PluginMeta {
    id: "hue_rotate",
    name: "Hue Rotate",
    description: "Rotate the hue of every pixel",
    author: "Prism Team",
    version: "1.0.0",
    kind: PluginKind::Effect,
};

pub const SCHEMA: &[ParamSpec] = &[
    ParamSpec::float("angle", "Angle", 0.0, 0.0, 360.0, 1.0, "Hue rotation in degrees"),
    ParamSpec::float(
        "speed",
        "Speed",
        0.0,
        0.0,
        2.0,
        0.05,
        "Additional rotation per second (full turns)",
    ),
];

pub struct HueRotate {
    angle: f32,
    speed: f32,
}

impl HueRotate {
    pub fn new(config: &ParamMap) -> Self {
        let params = seed_params(SCHEMA, config);
        Self {
            angle: params["angle"].as_f32().unwrap_or(0.0).clamp(0.0, 360.0),
            speed: params["speed"].as_f32().unwrap_or(0.0).clamp(0.0, 2.0),
        }
    }
}

impl Plugin for HueRotate {
    fn meta(&self) -> &'static PluginMeta {
        &META
    }

    fn param_schema(&self) -> &'static [ParamSpec] {
        SCHEMA
    }

    fn update_param(&mut self, name: &str, value: ParamValue) -> bool {
        match name {
            "angle" => {
                self.angle = value.as_f32().unwrap_or(self.angle).clamp(0.0, 360.0);
                true
            }
            "speed" => {
                self.speed = value.as_f32().unwrap_or(self.speed).clamp(0.0, 2.0);
                true
            }
            _ => false,
        }
    }

    fn params(&self) -> ParamMap {
        let mut map = ParamMap::new();
        map.insert("angle".into(), ParamValue::Float(self.angle as f64));
        map.insert("speed".into(), ParamValue::Float(self.speed as f64));
        map
    }
}

impl Effect for HueRotate {
    fn process(&mut self, mut frame: Frame, ctx: &EffectContext) -> Result<Frame, String> {
        let shift = self.angle / 360.0 + ctx.time as f32 * self.speed;
        if shift.abs() < f32::EPSILON {
            return Ok(frame);
        }
        for px in frame.pixels.chunks_exact_mut(3) {
            let (h, s, v) = rgb_to_hsv([px[0], px[1], px[2]]);
            px.copy_from_slice(&hsv_to_rgb(h + shift, s, v));
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
    fn one_third_turn_maps_red_to_green() {
        let mut fx = HueRotate::new(&ParamMap::new());
        fx.update_param("angle", ParamValue::Float(120.0));
        let ctx = EffectContext::new(0.0, 0, 30.0, 2, 2);
        let out = fx.process(Frame::solid(2, 2, [255, 0, 0]), &ctx).unwrap();
        assert_eq!(out.get(0, 0), [0, 255, 0]);
    }

    #[test]
    fn zero_angle_zero_speed_is_identity() {
        let mut fx = HueRotate::new(&ParamMap::new());
        let ctx = EffectContext::new(5.0, 150, 30.0, 2, 2);
        let frame = Frame::solid(2, 2, [12, 200, 99]);
        assert_eq!(fx.process(frame.clone(), &ctx).unwrap(), frame);
    }
}
