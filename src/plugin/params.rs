//! Parameter values and schemas.
//!
//! Values travel as a tagged union: either a plain scalar or a ranged value
//! carrying `{_value, _rangeMin, _rangeMax}` plus optional display metadata.
//! The ranged form is how a single UI affordance exposes
//! position-within-trim to the transport state machine. Every consumer goes
//! through the `as_*` accessors, which unwrap ranged values transparently.

use std::collections::HashMap;

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// Parameter kinds, serialized lowercase for the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Float,
    Int,
    Bool,
    Select,
    Color,
    String,
    Range,
}

/// A value plus the range it lives in (the trim triple), with optional
/// display metadata the UI needs to render a timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct RangedValue {
    pub value: f64,
    pub range_min: f64,
    pub range_max: f64,
    pub fps: Option<f32>,
    pub total_frames: Option<i64>,
    pub display_format: Option<String>,
}

impl RangedValue {
    pub fn new(value: f64, range_min: f64, range_max: f64) -> Self {
        Self {
            value,
            range_min,
            range_max,
            fps: None,
            total_frames: None,
            display_format: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    Select(String),
    Color(String),
    Text(String),
    Range(RangedValue),
}

impl ParamValue {
    /// Inner value as f64; ranged values unwrap to their current value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            ParamValue::Range(r) => Some(r.value),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        self.as_f64().map(|v| v as f32)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_f64().map(|v| v.round() as i64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            ParamValue::Int(v) => Some(*v != 0),
            ParamValue::Float(v) => Some(*v != 0.0),
            ParamValue::Range(r) => Some(r.value != 0.0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Select(s) | ParamValue::Color(s) | ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_range(&self) -> Option<&RangedValue> {
        match self {
            ParamValue::Range(r) => Some(r),
            _ => None,
        }
    }
}

impl Serialize for ParamValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ParamValue::Float(v) => serializer.serialize_f64(*v),
            ParamValue::Int(v) => serializer.serialize_i64(*v),
            ParamValue::Bool(b) => serializer.serialize_bool(*b),
            ParamValue::Select(s) | ParamValue::Color(s) | ParamValue::Text(s) => {
                serializer.serialize_str(s)
            }
            ParamValue::Range(r) => {
                let mut field_count = 3;
                if r.fps.is_some() {
                    field_count += 1;
                }
                if r.total_frames.is_some() {
                    field_count += 1;
                }
                if r.display_format.is_some() {
                    field_count += 1;
                }
                let mut map = serializer.serialize_map(Some(field_count))?;
                map.serialize_entry("_value", &r.value)?;
                map.serialize_entry("_rangeMin", &r.range_min)?;
                map.serialize_entry("_rangeMax", &r.range_max)?;
                if let Some(fps) = r.fps {
                    map.serialize_entry("_fps", &fps)?;
                }
                if let Some(total) = r.total_frames {
                    map.serialize_entry("_totalFrames", &total)?;
                }
                if let Some(fmt) = &r.display_format {
                    map.serialize_entry("_displayFormat", fmt)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for ParamValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        ParamValue::from_json(&raw).map_err(de::Error::custom)
    }
}

impl ParamValue {
    /// Decode from a JSON value. Strings decode as `Text`; the plugin's
    /// schema decides whether the string is a select tag or a color.
    pub fn from_json(raw: &serde_json::Value) -> Result<ParamValue, String> {
        match raw {
            serde_json::Value::Bool(b) => Ok(ParamValue::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(ParamValue::Int(i))
                } else {
                    Ok(ParamValue::Float(n.as_f64().unwrap_or(0.0)))
                }
            }
            serde_json::Value::String(s) => Ok(ParamValue::Text(s.clone())),
            serde_json::Value::Object(map) => {
                let value = map
                    .get("_value")
                    .and_then(|v| v.as_f64())
                    .ok_or_else(|| "ranged value missing _value".to_string())?;
                let range_min = map.get("_rangeMin").and_then(|v| v.as_f64()).unwrap_or(0.0);
                let range_max = map.get("_rangeMax").and_then(|v| v.as_f64()).unwrap_or(value);
                Ok(ParamValue::Range(RangedValue {
                    value,
                    range_min,
                    range_max,
                    fps: map.get("_fps").and_then(|v| v.as_f64()).map(|v| v as f32),
                    total_frames: map.get("_totalFrames").and_then(|v| v.as_i64()),
                    display_format: map
                        .get("_displayFormat")
                        .and_then(|v| v.as_str())
                        .map(str::to_string),
                }))
            }
            other => Err(format!("unsupported parameter value: {}", other)),
        }
    }
}

/// Current values of a plugin instance, keyed by parameter name.
pub type ParamMap = HashMap<String, ParamValue>;

/// Declared schema for one parameter. Declared as const data next to the
/// plugin's factory; never scraped from anywhere at runtime.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: ParamKind,
    pub default: f64,
    pub default_str: Option<&'static str>,
    pub description: &'static str,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
    pub options: Option<&'static [&'static str]>,
}

impl ParamSpec {
    pub const fn float(
        name: &'static str,
        label: &'static str,
        default: f64,
        min: f64,
        max: f64,
        step: f64,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            label,
            kind: ParamKind::Float,
            default,
            default_str: None,
            description,
            min: Some(min),
            max: Some(max),
            step: Some(step),
            options: None,
        }
    }

    pub const fn int(
        name: &'static str,
        label: &'static str,
        default: i64,
        min: i64,
        max: i64,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            label,
            kind: ParamKind::Int,
            default: default as f64,
            default_str: None,
            description,
            min: Some(min as f64),
            max: Some(max as f64),
            step: Some(1.0),
            options: None,
        }
    }

    pub const fn bool(
        name: &'static str,
        label: &'static str,
        default: bool,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            label,
            kind: ParamKind::Bool,
            default: if default { 1.0 } else { 0.0 },
            default_str: None,
            description,
            min: None,
            max: None,
            step: None,
            options: None,
        }
    }

    pub const fn select(
        name: &'static str,
        label: &'static str,
        default: &'static str,
        options: &'static [&'static str],
        description: &'static str,
    ) -> Self {
        Self {
            name,
            label,
            kind: ParamKind::Select,
            default: 0.0,
            default_str: Some(default),
            description,
            min: None,
            max: None,
            step: None,
            options: Some(options),
        }
    }

    pub const fn color(
        name: &'static str,
        label: &'static str,
        default: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            label,
            kind: ParamKind::Color,
            default: 0.0,
            default_str: Some(default),
            description,
            min: None,
            max: None,
            step: None,
            options: None,
        }
    }

    pub const fn string(
        name: &'static str,
        label: &'static str,
        default: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            label,
            kind: ParamKind::String,
            default: 0.0,
            default_str: Some(default),
            description,
            min: None,
            max: None,
            step: None,
            options: None,
        }
    }

    pub const fn range(
        name: &'static str,
        label: &'static str,
        default: f64,
        min: f64,
        max: f64,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            label,
            kind: ParamKind::Range,
            default,
            default_str: None,
            description,
            min: Some(min),
            max: Some(max),
            step: None,
            options: None,
        }
    }

    /// Default as a `ParamValue` for seeding a fresh instance.
    pub fn default_value(&self) -> ParamValue {
        match self.kind {
            ParamKind::Float => ParamValue::Float(self.default),
            ParamKind::Int => ParamValue::Int(self.default as i64),
            ParamKind::Bool => ParamValue::Bool(self.default != 0.0),
            ParamKind::Select => ParamValue::Select(self.default_str.unwrap_or("").to_string()),
            ParamKind::Color => ParamValue::Color(self.default_str.unwrap_or("#ffffff").to_string()),
            ParamKind::String => ParamValue::Text(self.default_str.unwrap_or("").to_string()),
            ParamKind::Range => ParamValue::Range(RangedValue::new(
                self.default,
                self.min.unwrap_or(0.0),
                self.max.unwrap_or(self.default),
            )),
        }
    }

    /// Schema JSON emitted to callers: `{name, label, type, default,
    /// description}` plus the kind-specific fields.
    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        obj.insert("name".into(), self.name.into());
        obj.insert("label".into(), self.label.into());
        obj.insert(
            "type".into(),
            serde_json::to_value(self.kind).expect("param kind serializes"),
        );
        obj.insert(
            "default".into(),
            serde_json::to_value(self.default_value()).expect("default serializes"),
        );
        obj.insert("description".into(), self.description.into());

        match self.kind {
            ParamKind::Float | ParamKind::Int => {
                obj.insert("min".into(), self.min.unwrap_or(0.0).into());
                obj.insert("max".into(), self.max.unwrap_or(0.0).into());
                obj.insert("step".into(), self.step.unwrap_or(1.0).into());
            }
            ParamKind::Select => {
                let options: Vec<serde_json::Value> = self
                    .options
                    .unwrap_or(&[])
                    .iter()
                    .map(|o| serde_json::Value::from(*o))
                    .collect();
                obj.insert("options".into(), options.into());
            }
            ParamKind::Range => {
                obj.insert("min".into(), self.min.unwrap_or(0.0).into());
                obj.insert("max".into(), self.max.unwrap_or(0.0).into());
            }
            _ => {}
        }

        serde_json::Value::Object(obj)
    }

    /// Structural validity of the declaration itself. Plugin registration
    /// asserts this; a failure is a programmer error, not a runtime branch.
    pub fn is_well_formed(&self) -> bool {
        match self.kind {
            ParamKind::Float | ParamKind::Int | ParamKind::Range => {
                matches!((self.min, self.max), (Some(lo), Some(hi)) if lo <= hi)
            }
            ParamKind::Select => self
                .options
                .map(|opts| !opts.is_empty() && opts.contains(&self.default_str.unwrap_or("")))
                .unwrap_or(false),
            _ => true,
        }
    }
}

/// Seed a `ParamMap` from a schema, overlaying caller-provided config.
/// Unknown config keys are kept verbatim so plugins with dynamic
/// parameters (transport's trim triple) can see them.
pub fn seed_params(schema: &[ParamSpec], config: &ParamMap) -> ParamMap {
    let mut map = ParamMap::new();
    for spec in schema {
        let value = config
            .get(spec.name)
            .cloned()
            .unwrap_or_else(|| spec.default_value());
        map.insert(spec.name.to_string(), value);
    }
    for (key, value) in config {
        map.entry(key.clone()).or_insert_with(|| value.clone());
    }
    map
}

/// Parse a `#rrggbb` hex color into RGB bytes.
pub fn parse_hex_color(s: &str) -> Option<[u8; 3]> {
    let hex = s.trim().strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some([r, g, b])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranged_value_unwraps_transparently() {
        let v = ParamValue::Range(RangedValue::new(42.0, 10.0, 90.0));
        assert_eq!(v.as_f64(), Some(42.0));
        assert_eq!(v.as_i64(), Some(42));
        assert_eq!(v.as_bool(), Some(true));
    }

    #[test]
    fn range_serializes_with_underscore_keys() {
        let mut r = RangedValue::new(30.0, 20.0, 40.0);
        r.fps = Some(30.0);
        r.display_format = Some("time".into());
        let json = serde_json::to_value(ParamValue::Range(r)).unwrap();
        assert_eq!(json["_value"], 30.0);
        assert_eq!(json["_rangeMin"], 20.0);
        assert_eq!(json["_rangeMax"], 40.0);
        assert_eq!(json["_fps"], 30.0);
        assert_eq!(json["_displayFormat"], "time");
    }

    #[test]
    fn range_round_trips_through_json() {
        let original = ParamValue::Range(RangedValue::new(5.0, 0.0, 10.0));
        let json = serde_json::to_string(&original).unwrap();
        let back: ParamValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back.as_range().unwrap().range_max, 10.0);
    }

    #[test]
    fn scalars_round_trip() {
        for v in [
            ParamValue::Float(1.5),
            ParamValue::Int(7),
            ParamValue::Bool(true),
        ] {
            let json = serde_json::to_string(&v).unwrap();
            let back: ParamValue = serde_json::from_str(&json).unwrap();
            assert_eq!(back.as_f64(), v.as_f64());
        }
    }

    #[test]
    fn schema_json_contains_type_specific_fields() {
        let spec = ParamSpec::float("speed", "Speed", 1.0, 0.1, 10.0, 0.1, "Playback speed");
        let json = spec.to_json();
        assert_eq!(json["type"], "float");
        assert_eq!(json["min"], 0.1);
        assert_eq!(json["max"], 10.0);
        assert_eq!(json["step"], 0.1);

        let sel = ParamSpec::select("mode", "Mode", "repeat", &["repeat", "bounce"], "");
        let json = sel.to_json();
        assert_eq!(json["type"], "select");
        assert_eq!(json["options"][0], "repeat");
    }

    #[test]
    fn malformed_specs_are_rejected() {
        let bad = ParamSpec::select("mode", "Mode", "missing", &["a", "b"], "");
        assert!(!bad.is_well_formed());
        let good = ParamSpec::select("mode", "Mode", "a", &["a", "b"], "");
        assert!(good.is_well_formed());
    }

    #[test]
    fn hex_colors_parse() {
        assert_eq!(parse_hex_color("#ff8000"), Some([255, 128, 0]));
        assert_eq!(parse_hex_color("ff8000"), None);
        assert_eq!(parse_hex_color("#xyzxyz"), None);
    }
}
