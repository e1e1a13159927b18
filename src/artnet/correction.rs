//! Per-fixture and per-output color correction, plus white-channel
//! derivation for RGBW-family strips.

use super::models::{ArtNetObject, ArtNetOutput, LedType, WhiteMode};

/// Standard contrast bias gain: `(259·(c+255)) / (255·(259−c))`.
fn contrast_gain(contrast: i32) -> f32 {
    let c = contrast.clamp(-255, 255) as f32;
    (259.0 * (c + 255.0)) / (255.0 * (259.0 - c))
}

/// Correction parameters shared by objects and outputs.
#[derive(Debug, Clone, Copy)]
pub struct Correction {
    pub brightness: i32,
    pub contrast: i32,
    pub red: i32,
    pub green: i32,
    pub blue: i32,
}

impl Correction {
    pub fn from_object(object: &ArtNetObject) -> Self {
        Self {
            brightness: object.brightness,
            contrast: object.contrast,
            red: object.red,
            green: object.green,
            blue: object.blue,
        }
    }

    pub fn from_output(output: &ArtNetOutput) -> Self {
        Self {
            brightness: output.brightness,
            contrast: output.contrast,
            red: output.red,
            green: output.green,
            blue: output.blue,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.brightness == 0
            && self.contrast == 0
            && self.red == 0
            && self.green == 0
            && self.blue == 0
    }

    /// Apply to one RGB sample: brightness and per-channel offsets add
    /// first, then contrast scales around the 128 midpoint; clamp last.
    pub fn apply(&self, rgb: [u8; 3]) -> [u8; 3] {
        if self.is_identity() {
            return rgb;
        }
        let gain = contrast_gain(self.contrast);
        let offsets = [self.red, self.green, self.blue];
        let mut out = [0u8; 3];
        for c in 0..3 {
            let shifted = rgb[c] as f32 + self.brightness as f32 + offsets[c] as f32;
            let contrasted = (shifted - 128.0) * gain + 128.0;
            out[c] = contrasted.clamp(0.0, 255.0) as u8;
        }
        out
    }
}

/// Derived per-LED channels after white processing. RGB strips carry 3
/// channels; RGBW 4 (`w`); dual-white 5 (`warm, cool`); the 6-channel
/// family carries the full white plus the warm/cool split.
pub fn derive_white(rgb: [u8; 3], object: &ArtNetObject) -> Vec<u8> {
    if !object.led_type.has_white() {
        return rgb.to_vec();
    }

    let min = rgb[0].min(rgb[1]).min(rgb[2]);
    let w = match object.white_mode {
        WhiteMode::Auto => min,
        WhiteMode::Manual => {
            if min >= object.white_threshold {
                min
            } else {
                0
            }
        }
    };

    // Pull the extracted white back out of the color channels.
    let behavior = object.white_behavior.clamp(0.0, 1.0);
    let subtract = (w as f32 * behavior) as u8;
    let r = rgb[0].saturating_sub(subtract);
    let g = rgb[1].saturating_sub(subtract);
    let b = rgb[2].saturating_sub(subtract);

    match object.led_type {
        LedType::Rgb => vec![r, g, b],
        LedType::Rgbw => vec![r, g, b, w],
        LedType::Rgbww => {
            let temp = object.color_temp.clamp(0.0, 1.0);
            let warm = (w as f32 * (1.0 - temp)).round() as u8;
            let cool = (w as f32 * temp).round() as u8;
            vec![r, g, b, warm, cool]
        }
        LedType::Rgbwwcw => {
            let temp = object.color_temp.clamp(0.0, 1.0);
            let warm = (w as f32 * (1.0 - temp)).round() as u8;
            let cool = (w as f32 * temp).round() as u8;
            vec![r, g, b, w, warm, cool]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artnet::models::Point;

    fn object() -> ArtNetObject {
        ArtNetObject::new("obj", "obj", vec![Point::new(0.0, 0.0)])
    }

    #[test]
    fn identity_correction_is_a_no_op() {
        let correction = Correction {
            brightness: 0,
            contrast: 0,
            red: 0,
            green: 0,
            blue: 0,
        };
        assert_eq!(correction.apply([10, 128, 250]), [10, 128, 250]);
    }

    #[test]
    fn brightness_is_monotonic() {
        let sample = [10u8, 100, 200];
        let mut last = [0u8; 3];
        for brightness in (-255..=255).step_by(15) {
            let correction = Correction {
                brightness,
                contrast: 0,
                red: 0,
                green: 0,
                blue: 0,
            };
            let out = correction.apply(sample);
            if brightness > -255 {
                for c in 0..3 {
                    assert!(out[c] >= last[c], "brightness {} channel {}", brightness, c);
                }
            }
            last = out;
        }
    }

    #[test]
    fn contrast_moves_away_from_midpoint() {
        let correction = |contrast| Correction {
            brightness: 0,
            contrast,
            red: 0,
            green: 0,
            blue: 0,
        };

        // Above 128 rises with contrast, below 128 falls.
        let mut last_high = 128u8;
        let mut last_low = 128u8;
        for contrast in (0..=255).step_by(15) {
            let high = correction(contrast).apply([180, 180, 180])[0];
            let low = correction(contrast).apply([80, 80, 80])[0];
            assert!(high >= last_high, "contrast {}", contrast);
            assert!(low <= last_low, "contrast {}", contrast);
            last_high = high;
            last_low = low;
        }
        // Midpoint itself is a fixed point.
        assert_eq!(correction(200).apply([128, 128, 128]), [128, 128, 128]);
    }

    #[test]
    fn channel_offsets_are_independent() {
        let correction = Correction {
            brightness: 0,
            contrast: 0,
            red: 20,
            green: -30,
            blue: 0,
        };
        assert_eq!(correction.apply([100, 100, 100]), [120, 70, 100]);
    }

    #[test]
    fn auto_white_takes_min_channel() {
        let mut obj = object();
        obj.led_type = LedType::Rgbw;
        // min = 50; behavior 1.0 subtracts it fully.
        assert_eq!(derive_white([200, 120, 50], &obj), vec![150, 70, 0, 50]);
    }

    #[test]
    fn white_behavior_scales_subtraction() {
        let mut obj = object();
        obj.led_type = LedType::Rgbw;
        obj.white_behavior = 0.0;
        assert_eq!(derive_white([200, 120, 50], &obj), vec![200, 120, 50, 50]);
    }

    #[test]
    fn manual_mode_gates_on_threshold() {
        let mut obj = object();
        obj.led_type = LedType::Rgbw;
        obj.white_mode = WhiteMode::Manual;
        obj.white_threshold = 80;
        // min 50 below threshold: no white extracted.
        assert_eq!(derive_white([200, 120, 50], &obj), vec![200, 120, 50, 0]);
        // min 90 above threshold: extracted as usual.
        assert_eq!(derive_white([200, 120, 90], &obj), vec![110, 30, 0, 90]);
    }

    #[test]
    fn dual_white_partitions_by_color_temp() {
        let mut obj = object();
        obj.led_type = LedType::Rgbww;
        obj.color_temp = 0.25;
        let channels = derive_white([100, 100, 100], &obj);
        // w = 100, warm = 75, cool = 25, RGB fully extracted.
        assert_eq!(channels, vec![0, 0, 0, 75, 25]);

        obj.led_type = LedType::Rgbwwcw;
        let channels = derive_white([100, 100, 100], &obj);
        assert_eq!(channels, vec![0, 0, 0, 100, 75, 25]);
    }
}
