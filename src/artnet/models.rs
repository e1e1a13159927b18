//! Art-Net routing data model: fixtures (objects) mapped into canvas
//! space, and network output targets. Both persist in session state, so
//! the serde names match the session document's camelCase keys.

use serde::{Deserialize, Serialize};

/// Canvas-space sampling coordinate of one LED.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedType {
    #[serde(rename = "RGB")]
    Rgb,
    #[serde(rename = "RGBW")]
    Rgbw,
    #[serde(rename = "RGBWW")]
    Rgbww,
    #[serde(rename = "RGBWWCW")]
    Rgbwwcw,
}

impl LedType {
    /// Channels per LED after white derivation.
    pub fn channel_count(&self) -> usize {
        match self {
            LedType::Rgb => 3,
            LedType::Rgbw => 4,
            LedType::Rgbww => 5,
            LedType::Rgbwwcw => 6,
        }
    }

    pub fn has_white(&self) -> bool {
        !matches!(self, LedType::Rgb)
    }

    /// Dual-white types split the derived white across warm/cool.
    pub fn dual_white(&self) -> bool {
        matches!(self, LedType::Rgbww | LedType::Rgbwwcw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhiteMode {
    Auto,
    Manual,
}

/// A physical LED strip or matrix: sampling points plus per-fixture
/// color handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtNetObject {
    pub id: String,
    pub name: String,
    pub points: Vec<Point>,
    pub led_type: LedType,
    /// One of the enumerated channel maps, e.g. "GRB" for WS2812B.
    pub channel_order: String,
    pub brightness: i32,
    pub contrast: i32,
    pub red: i32,
    pub green: i32,
    pub blue: i32,
    pub white_mode: WhiteMode,
    pub white_threshold: u8,
    /// Fraction of the derived white subtracted back out of RGB.
    pub white_behavior: f32,
    /// Warm/cool split for dual-white types, 0 = all warm, 1 = all cool.
    pub color_temp: f32,
}

impl ArtNetObject {
    pub fn new(id: &str, name: &str, points: Vec<Point>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            points,
            led_type: LedType::Rgb,
            channel_order: "RGB".to_string(),
            brightness: 0,
            contrast: 0,
            red: 0,
            green: 0,
            blue: 0,
            white_mode: WhiteMode::Auto,
            white_threshold: 0,
            white_behavior: 1.0,
            color_temp: 0.5,
        }
    }
}

/// A network target: one socket, one universe run, its own color
/// correction and pacing. Objects are assigned many-to-many; each output
/// renders its assignments independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtNetOutput {
    pub id: String,
    pub name: String,
    #[serde(rename = "targetIP")]
    pub target_ip: String,
    pub subnet: String,
    pub start_universe: u16,
    pub fps: u32,
    #[serde(rename = "delay")]
    pub delay_ms: u32,
    pub active: bool,
    pub brightness: i32,
    pub contrast: i32,
    pub red: i32,
    pub green: i32,
    pub blue: i32,
    pub delta_enabled: bool,
    pub delta_threshold: u8,
    pub full_frame_interval: u32,
    pub assigned_objects: Vec<String>,
}

impl ArtNetOutput {
    pub fn new(id: &str, name: &str, target_ip: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            target_ip: target_ip.to_string(),
            subnet: "255.255.255.0".to_string(),
            start_universe: 0,
            fps: 30,
            delay_ms: 0,
            active: true,
            brightness: 0,
            contrast: 0,
            red: 0,
            green: 0,
            blue: 0,
            delta_enabled: false,
            delta_threshold: 8,
            full_frame_interval: 30,
            assigned_objects: Vec::new(),
        }
    }

    /// Directed broadcast address from target IP + subnet mask, for the
    /// broadcast toggle. Falls back to the limited broadcast on parse
    /// failure.
    pub fn broadcast_address(&self) -> String {
        let ip: Result<std::net::Ipv4Addr, _> = self.target_ip.parse();
        let mask: Result<std::net::Ipv4Addr, _> = self.subnet.parse();
        match (ip, mask) {
            (Ok(ip), Ok(mask)) => {
                let ip = u32::from(ip);
                let mask = u32::from(mask);
                std::net::Ipv4Addr::from(ip | !mask).to_string()
            }
            _ => "255.255.255.255".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_serializes_session_keys() {
        let output = ArtNetOutput::new("out-1", "Main Wall", "192.168.1.10");
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["targetIP"], "192.168.1.10");
        assert_eq!(json["startUniverse"], 0);
        assert_eq!(json["deltaThreshold"], 8);
        assert_eq!(json["assignedObjects"], serde_json::json!([]));
    }

    #[test]
    fn object_round_trips() {
        let mut object = ArtNetObject::new("obj-1", "Strip", vec![Point::new(0.0, 0.0)]);
        object.led_type = LedType::Rgbw;
        object.channel_order = "GRBW".into();
        let json = serde_json::to_string(&object).unwrap();
        let back: ArtNetObject = serde_json::from_str(&json).unwrap();
        assert_eq!(back.led_type, LedType::Rgbw);
        assert_eq!(back.channel_order, "GRBW");
    }

    #[test]
    fn broadcast_address_respects_mask() {
        let mut output = ArtNetOutput::new("o", "o", "192.168.1.10");
        assert_eq!(output.broadcast_address(), "192.168.1.255");
        output.subnet = "255.255.0.0".into();
        assert_eq!(output.broadcast_address(), "192.168.255.255");
        output.target_ip = "not an ip".into();
        assert_eq!(output.broadcast_address(), "255.255.255.255");
    }

    #[test]
    fn led_channel_counts() {
        assert_eq!(LedType::Rgb.channel_count(), 3);
        assert_eq!(LedType::Rgbw.channel_count(), 4);
        assert_eq!(LedType::Rgbww.channel_count(), 5);
        assert_eq!(LedType::Rgbwwcw.channel_count(), 6);
        assert!(!LedType::Rgb.has_white());
        assert!(LedType::Rgbww.dual_white());
    }
}
