//! Mirror one half of the frame onto the other.

use crate::frame::Frame;
use crate::plugin::{
    seed_params, Effect, EffectContext, ParamMap, ParamSpec, ParamValue, Plugin, PluginKind,
    PluginMeta,
};

pub const META: PluginMeta = PluginMeta {
    id: "mirror",
    name: "Mirror",
    description: "Mirror one half of the frame onto the other",
    author: "Prism Team",
    version: "1.0.0",
    kind: PluginKind::Effect,
};

pub const SCHEMA: &[ParamSpec] = &[ParamSpec::select(
    "direction",
    "Direction",
    "left_to_right",
    &["left_to_right", "right_to_left", "top_to_bottom", "bottom_to_top"],
    "Which half is copied where",
)];

pub struct Mirror {
    direction: String,
}

impl Mirror {
    pub fn new(config: &ParamMap) -> Self {
        let params = seed_params(SCHEMA, config);
        Self {
            direction: params["direction"]
                .as_str()
                .unwrap_or("left_to_right")
                .to_string(),
        }
    }
}

impl Plugin for Mirror {
    fn meta(&self) -> &'static PluginMeta {
        &META
    }

    fn param_schema(&self) -> &'static [ParamSpec] {
        SCHEMA
    }

    fn update_param(&mut self, name: &str, value: ParamValue) -> bool {
        if name == "direction" {
            if let Some(s) = value.as_str() {
                if ["left_to_right", "right_to_left", "top_to_bottom", "bottom_to_top"]
                    .contains(&s)
                {
                    self.direction = s.to_string();
                    return true;
                }
            }
        }
        false
    }

    fn params(&self) -> ParamMap {
        let mut map = ParamMap::new();
        map.insert("direction".into(), ParamValue::Select(self.direction.clone()));
        map
    }
}

impl Effect for Mirror {
    fn process(&mut self, mut frame: Frame, _ctx: &EffectContext) -> Result<Frame, String> {
        let (w, h) = (frame.width, frame.height);
        match self.direction.as_str() {
            "left_to_right" => {
                for y in 0..h {
                    for x in 0..w / 2 {
                        let px = frame.get(x, y);
                        frame.put(w - 1 - x, y, px);
                    }
                }
            }
            "right_to_left" => {
                for y in 0..h {
                    for x in 0..w / 2 {
                        let px = frame.get(w - 1 - x, y);
                        frame.put(x, y, px);
                    }
                }
            }
            "top_to_bottom" => {
                for y in 0..h / 2 {
                    for x in 0..w {
                        let px = frame.get(x, y);
                        frame.put(x, h - 1 - y, px);
                    }
                }
            }
            "bottom_to_top" => {
                for y in 0..h / 2 {
                    for x in 0..w {
                        let px = frame.get(x, h - 1 - y);
                        frame.put(x, y, px);
                    }
                }
            }
            _ => {}
        }
        Ok(frame)
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
