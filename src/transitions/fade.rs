//! Crossfade transition.

use crate::frame::Frame;
use crate::plugin::{
    seed_params, ParamMap, ParamSpec, ParamValue, Plugin, PluginKind, PluginMeta, Transition,
};
use crate::transitions::Easing;

pub const META: PluginMeta = PluginMeta {
    id: "fade",
    name: "Fade",
    description: "Crossfade between outgoing and incoming clip",
    author: "Prism Team",
    version: "1.0.0",
    kind: PluginKind::Transition,
};

pub const SCHEMA: &[ParamSpec] = &[
    ParamSpec::float("duration", "Duration (s)", 1.0, 0.1, 10.0, 0.1, "Transition length"),
    ParamSpec::select(
        "easing",
        "Easing",
        "linear",
        &["linear", "ease_in", "ease_out", "ease_in_out"],
        "Progress curve",
    ),
];

pub struct Fade {
    duration: f64,
    easing: Easing,
}

impl Fade {
    pub fn new(config: &ParamMap) -> Self {
        let params = seed_params(SCHEMA, config);
        Self {
            duration: params["duration"].as_f64().unwrap_or(1.0).clamp(0.1, 10.0),
            easing: params["easing"]
                .as_str()
                .and_then(Easing::parse)
                .unwrap_or(Easing::Linear),
        }
    }
}

impl Plugin for Fade {
    fn meta(&self) -> &'static PluginMeta {
        &META
    }

    fn param_schema(&self) -> &'static [ParamSpec] {
        SCHEMA
    }

    fn update_param(&mut self, name: &str, value: ParamValue) -> bool {
        match name {
            "duration" => {
                self.duration = value.as_f64().unwrap_or(self.duration).clamp(0.1, 10.0);
                true
            }
            "easing" => match value.as_str().and_then(Easing::parse) {
                Some(easing) => {
                    self.easing = easing;
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    fn params(&self) -> ParamMap {
        let mut map = ParamMap::new();
        map.insert("duration".into(), ParamValue::Float(self.duration));
        map.insert("easing".into(), ParamValue::Select(self.easing.name().to_string()));
        map
    }
}

impl Transition for Fade {
    fn blend(&mut self, a: &Frame, b: &Frame, progress: f32) -> Result<Frame, String> {
        let b_resized;
        let b = if a.same_size(b) {
            b
        } else {
            b_resized = b.resize_nearest(a.width, a.height);
            &b_resized
        };

        let t = self.easing.apply(progress);
        let mut out = Frame::new(a.width, a.height);
        for ((dst, &pa), &pb) in out
            .pixels
            .iter_mut()
            .zip(a.pixels.iter())
            .zip(b.pixels.iter())
        {
            *dst = (pa as f32 * (1.0 - t) + pb as f32 * t).round() as u8;
        }
        Ok(out)
    }

    fn transition_duration_s(&self) -> f64 {
        self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_endpoints_select_frames() {
        let mut fade = Fade::new(&ParamMap::new());
        let a = Frame::solid(4, 4, [200, 0, 0]);
        let b = Frame::solid(4, 4, [0, 200, 0]);
        assert_eq!(fade.blend(&a, &b, 0.0).unwrap(), a);
        assert_eq!(fade.blend(&a, &b, 1.0).unwrap(), b);
    }

    #[test]
    fn midpoint_is_average_for_linear() {
        let mut fade = Fade::new(&ParamMap::new());
        let a = Frame::solid(2, 2, [100, 100, 100]);
        let b = Frame::solid(2, 2, [200, 200, 200]);
        let mid = fade.blend(&a, &b, 0.5).unwrap();
        assert_eq!(mid.get(0, 0), [150, 150, 150]);
    }

    #[test]
    fn mismatched_sizes_resize_to_outgoing() {
        let mut fade = Fade::new(&ParamMap::new());
        let a = Frame::solid(4, 4, [10, 10, 10]);
        let b = Frame::solid(8, 2, [30, 30, 30]);
        let out = fade.blend(&a, &b, 0.5).unwrap();
        assert_eq!((out.width, out.height), (4, 4));
        assert_eq!(out.get(0, 0), [20, 20, 20]);
    }
}
