//! Horizontal / vertical flip.

use crate::frame::Frame;
use crate::plugin::{
    seed_params, Effect, EffectContext, ParamMap, ParamSpec, ParamValue, Plugin, PluginKind,
    PluginMeta,
};

pub const META: PluginMeta = PluginMeta {
    id: "flip",
    name: "Flip",
    description: "Flip the frame horizontally and/or vertically",
    author: "Prism Team",
    version: "1.0.0",
    kind: PluginKind::Effect,
};

pub const SCHEMA: &[ParamSpec] = &[
    ParamSpec::bool("horizontal", "Horizontal", false, "Flip left-right"),
    ParamSpec::bool("vertical", "Vertical", false, "Flip top-bottom"),
];

pub struct Flip {
    horizontal: bool,
    vertical: bool,
}

impl Flip {
    pub fn new(config: &ParamMap) -> Self {
        let params = seed_params(SCHEMA, config);
        Self {
            horizontal: params["horizontal"].as_bool().unwrap_or(false),
            vertical: params["vertical"].as_bool().unwrap_or(false),
        }
    }
}

impl Plugin for Flip {
    fn meta(&self) -> &'static PluginMeta {
        &META
    }

    fn param_schema(&self) -> &'static [ParamSpec] {
        SCHEMA
    }

    fn update_param(&mut self, name: &str, value: ParamValue) -> bool {
        match name {
            "horizontal" => {
                self.horizontal = value.as_bool().unwrap_or(self.horizontal);
                true
            }
            "vertical" => {
                self.vertical = value.as_bool().unwrap_or(self.vertical);
                true
            }
            _ => false,
        }
    }

    fn params(&self) -> ParamMap {
        let mut map = ParamMap::new();
        map.insert("horizontal".into(), ParamValue::Bool(self.horizontal));
        map.insert("vertical".into(), ParamValue::Bool(self.vertical));
        map
    }
}

impl Effect for Flip {
    fn process(&mut self, frame: Frame, _ctx: &EffectContext) -> Result<Frame, String> {
        if !self.horizontal && !self.vertical {
            return Ok(frame);
        }
        let (w, h) = (frame.width, frame.height);
        let mut out = Frame::new(w, h);
        for y in 0..h {
            let sy = if self.vertical { h - 1 - y } else { y };
            for x in 0..w {
                let sx = if self.horizontal { w - 1 - x } else { x };
                out.put(x, y, frame.get(sx, sy));
            }
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
    fn double_flip_is_identity() {
        let mut fx = Flip::new(&ParamMap::new());
        fx.update_param("horizontal", ParamValue::Bool(true));
        fx.update_param("vertical", ParamValue::Bool(true));
        let ctx = EffectContext::new(0.0, 0, 30.0, 3, 3);

        let mut frame = Frame::new(3, 3);
        frame.put(0, 0, [9, 9, 9]);
        let once = fx.process(frame.clone(), &ctx).unwrap();
        assert_eq!(once.get(2, 2), [9, 9, 9]);
        let twice = fx.process(once, &ctx).unwrap();
        assert_eq!(twice, frame);
    }
}
