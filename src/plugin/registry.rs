//! Plugin Factory Table
//!
//! Concrete plugins are constructed by id through this table. The
//! serialized metadata and parameter schema for each registration are
//! computed once at table construction and reused — the control plane
//! fetches them on every status poll.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::params::{ParamMap, ParamSpec};
use super::{Effect, Generator, PluginMeta, Transition};

enum Factory {
    Generator(fn(&ParamMap) -> Box<dyn Generator>),
    Effect(fn(&ParamMap) -> Box<dyn Effect>),
    Transition(fn(&ParamMap) -> Box<dyn Transition>),
}

pub struct Registration {
    pub meta: &'static PluginMeta,
    pub schema: &'static [ParamSpec],
    meta_json: String,
    schema_json: String,
    factory: Factory,
}

impl Registration {
    fn new(meta: &'static PluginMeta, schema: &'static [ParamSpec], factory: Factory) -> Self {
        for spec in schema {
            debug_assert!(
                spec.is_well_formed(),
                "plugin {}: malformed parameter spec '{}'",
                meta.id,
                spec.name
            );
        }
        let schema_values: Vec<serde_json::Value> = schema.iter().map(|s| s.to_json()).collect();
        Self {
            meta,
            schema,
            meta_json: serde_json::to_string(meta).expect("plugin metadata serializes"),
            schema_json: serde_json::to_string(&schema_values).expect("plugin schema serializes"),
            factory,
        }
    }
}

macro_rules! register {
    ($map:expr, $module:path, $factory:expr) => {{
        use $module as m;
        $map.insert(m::META.id, Registration::new(&m::META, m::SCHEMA, $factory));
    }};
}

static REGISTRY: Lazy<HashMap<&'static str, Registration>> = Lazy::new(|| {
    let mut map = HashMap::new();

    register!(map, crate::generators::checkerboard, Factory::Generator(|c| {
        Box::new(crate::generators::checkerboard::Checkerboard::new(c))
    }));
    register!(map, crate::generators::plasma, Factory::Generator(|c| {
        Box::new(crate::generators::plasma::Plasma::new(c))
    }));
    register!(map, crate::generators::noise, Factory::Generator(|c| {
        Box::new(crate::generators::noise::NoiseField::new(c))
    }));
    register!(map, crate::generators::rainbow_wave, Factory::Generator(|c| {
        Box::new(crate::generators::rainbow_wave::RainbowWave::new(c))
    }));
    register!(map, crate::generators::circles, Factory::Generator(|c| {
        Box::new(crate::generators::circles::Circles::new(c))
    }));
    register!(map, crate::generators::oscillator, Factory::Generator(|c| {
        Box::new(crate::generators::oscillator::Oscillator::new(c))
    }));
    register!(map, crate::generators::solid_color, Factory::Generator(|c| {
        Box::new(crate::generators::solid_color::SolidColor::new(c))
    }));
    register!(map, crate::generators::static_picture, Factory::Generator(|c| {
        Box::new(crate::generators::static_picture::StaticPicture::new(c))
    }));

    register!(map, crate::effects::transport, Factory::Effect(|c| {
        Box::new(crate::effects::transport::TransportEffect::new(c))
    }));
    register!(map, crate::effects::brightness_contrast, Factory::Effect(|c| {
        Box::new(crate::effects::brightness_contrast::BrightnessContrast::new(c))
    }));
    register!(map, crate::effects::blend_color, Factory::Effect(|c| {
        Box::new(crate::effects::blend_color::BlendColor::new(c))
    }));
    register!(map, crate::effects::invert, Factory::Effect(|c| {
        Box::new(crate::effects::invert::Invert::new(c))
    }));
    register!(map, crate::effects::posterize, Factory::Effect(|c| {
        Box::new(crate::effects::posterize::Posterize::new(c))
    }));
    register!(map, crate::effects::saturation, Factory::Effect(|c| {
        Box::new(crate::effects::saturation::Saturation::new(c))
    }));
    register!(map, crate::effects::tint, Factory::Effect(|c| {
        Box::new(crate::effects::tint::Tint::new(c))
    }));
    register!(map, crate::effects::mirror, Factory::Effect(|c| {
        Box::new(crate::effects::mirror::Mirror::new(c))
    }));
    register!(map, crate::effects::flip, Factory::Effect(|c| {
        Box::new(crate::effects::flip::Flip::new(c))
    }));
    register!(map, crate::effects::strobe, Factory::Effect(|c| {
        Box::new(crate::effects::strobe::Strobe::new(c))
    }));
    register!(map, crate::effects::trails, Factory::Effect(|c| {
        Box::new(crate::effects::trails::Trails::new(c))
    }));
    register!(map, crate::effects::hue_rotate, Factory::Effect(|c| {
        Box::new(crate::effects::hue_rotate::HueRotate::new(c))
    }));
    register!(map, crate::effects::temperature, Factory::Effect(|c| {
        Box::new(crate::effects::temperature::Temperature::new(c))
    }));

    register!(map, crate::transitions::fade, Factory::Transition(|c| {
        Box::new(crate::transitions::fade::Fade::new(c))
    }));

    map
});

pub fn create_generator(id: &str, config: &ParamMap) -> Result<Box<dyn Generator>, String> {
    match REGISTRY.get(id).map(|r| &r.factory) {
        Some(Factory::Generator(ctor)) => Ok(ctor(config)),
        Some(_) => Err(format!("plugin '{}' is not a generator", id)),
        None => Err(format!("unknown plugin '{}'", id)),
    }
}

pub fn create_effect(id: &str, config: &ParamMap) -> Result<Box<dyn Effect>, String> {
    match REGISTRY.get(id).map(|r| &r.factory) {
        Some(Factory::Effect(ctor)) => Ok(ctor(config)),
        Some(_) => Err(format!("plugin '{}' is not an effect", id)),
        None => Err(format!("unknown plugin '{}'", id)),
    }
}

pub fn create_transition(id: &str, config: &ParamMap) -> Result<Box<dyn Transition>, String> {
    match REGISTRY.get(id).map(|r| &r.factory) {
        Some(Factory::Transition(ctor)) => Ok(ctor(config)),
        Some(_) => Err(format!("plugin '{}' is not a transition", id)),
        None => Err(format!("unknown plugin '{}'", id)),
    }
}

/// Cached metadata JSON for a plugin id.
pub fn metadata_json(id: &str) -> Option<&'static str> {
    REGISTRY.get(id).map(|r| r.meta_json.as_str())
}

/// Cached parameter-schema JSON for a plugin id.
pub fn schema_json(id: &str) -> Option<&'static str> {
    REGISTRY.get(id).map(|r| r.schema_json.as_str())
}

/// All registered plugin ids, sorted.
pub fn plugin_ids() -> Vec<&'static str> {
    let mut ids: Vec<&'static str> = REGISTRY.keys().copied().collect();
    ids.sort_unstable();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::Plugin;

    #[test]
    fn every_registration_has_a_well_formed_schema() {
        for id in plugin_ids() {
            let reg = REGISTRY.get(id).unwrap();
            assert_eq!(reg.meta.id, id);
            for spec in reg.schema {
                assert!(spec.is_well_formed(), "{}: bad spec '{}'", id, spec.name);
            }
        }
    }

    #[test]
    fn cached_json_is_stable_across_polls() {
        let first = metadata_json("plasma").unwrap();
        let second = metadata_json("plasma").unwrap();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn metadata_serializes_kind_lowercase() {
        let json: serde_json::Value =
            serde_json::from_str(metadata_json("checkerboard").unwrap()).unwrap();
        assert_eq!(json["type"], "generator");
        let json: serde_json::Value =
            serde_json::from_str(metadata_json("transport").unwrap()).unwrap();
        assert_eq!(json["type"], "effect");
    }

    #[test]
    fn factories_reject_cross_kind_construction() {
        let config = ParamMap::new();
        assert!(create_effect("plasma", &config).is_err());
        assert!(create_generator("invert", &config).is_err());
        assert!(create_generator("no_such_plugin", &config).is_err());
    }

    #[test]
    fn constructed_instances_report_schema_defaults() {
        let config = ParamMap::new();
        let generator = create_generator("checkerboard", &config).unwrap();
        let params = generator.params();
        for spec in generator.param_schema() {
            assert!(params.contains_key(spec.name), "missing '{}'", spec.name);
        }
    }
}
