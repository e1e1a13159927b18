//! Brightness and contrast adjustment.

use crate::frame::Frame;
use crate::plugin::{
    seed_params, Effect, EffectContext, ParamMap, ParamSpec, ParamValue, Plugin, PluginKind,
    PluginMeta,
};

pub const META: PluginMeta = PluginMeta {
    id: "brightness_contrast",
    name: "Brightness/Contrast",
    description: "Linear brightness and contrast adjustment",
    author: "Prism Team",
    version: "1.0.0",
    kind: PluginKind::Effect,
};

pub const SCHEMA: &[ParamSpec] = &[
    ParamSpec::float(
        "brightness",
        "Brightness",
        0.0,
        -100.0,
        100.0,
        1.0,
        "Brightness offset (-100 = dark, +100 = bright)",
    ),
    ParamSpec::float(
        "contrast",
        "Contrast",
        1.0,
        0.0,
        3.0,
        0.1,
        "Contrast gain (1.0 = original)",
    ),
];

pub struct BrightnessContrast {
    brightness: f32,
    contrast: f32,
}

impl BrightnessContrast {
    pub fn new(config: &ParamMap) -> Self {
        let params = seed_params(SCHEMA, config);
        Self {
            brightness: params["brightness"].as_f32().unwrap_or(0.0),
            contrast: params["contrast"].as_f32().unwrap_or(1.0),
        }
    }
}

impl Plugin for BrightnessContrast {
    fn meta(&self) -> &'static PluginMeta {
        &META
    }

    fn param_schema(&self) -> &'static [ParamSpec] {
        SCHEMA
    }

    fn update_param(&mut self, name: &str, value: ParamValue) -> bool {
        match name {
            "brightness" => {
                self.brightness = value
                    .as_f32()
                    .unwrap_or(self.brightness)
                    .clamp(-100.0, 100.0);
                true
            }
            "contrast" => {
                self.contrast = value.as_f32().unwrap_or(self.contrast).clamp(0.0, 3.0);
                true
            }
            _ => false,
        }
    }

    fn params(&self) -> ParamMap {
        let mut map = ParamMap::new();
        map.insert("brightness".into(), ParamValue::Float(self.brightness as f64));
        map.insert("contrast".into(), ParamValue::Float(self.contrast as f64));
        map
    }
}

impl Effect for BrightnessContrast {
    fn process(&mut self, mut frame: Frame, _ctx: &EffectContext) -> Result<Frame, String> {
        // output = contrast * input + brightness, saturating.
        for byte in frame.pixels.iter_mut() {
            *byte = (*byte as f32 * self.contrast + self.brightness).clamp(0.0, 255.0) as u8;
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

    fn ctx() -> EffectContext {
        EffectContext::new(0.0, 0, 30.0, 8, 8)
    }

    #[test]
    fn identity_at_defaults() {
        let mut fx = BrightnessContrast::new(&ParamMap::new());
        let frame = Frame::solid(4, 4, [10, 128, 250]);
        let out = fx.process(frame.clone(), &ctx()).unwrap();
        assert_eq!(out, frame);
    }

    #[test]
    fn brightness_shifts_and_saturates() {
        let mut fx = BrightnessContrast::new(&ParamMap::new());
        fx.update_param("brightness", ParamValue::Float(50.0));
        let out = fx.process(Frame::solid(2, 2, [10, 128, 250]), &ctx()).unwrap();
        assert_eq!(out.get(0, 0), [60, 178, 255]);
    }

    #[test]
    fn contrast_scales_from_zero() {
        let mut fx = BrightnessContrast::new(&ParamMap::new());
        fx.update_param("contrast", ParamValue::Float(2.0));
        let out = fx.process(Frame::solid(2, 2, [10, 100, 200]), &ctx()).unwrap();
        assert_eq!(out.get(0, 0), [20, 200, 255]);
    }
}
