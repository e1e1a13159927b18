//! Blend Modes
//!
//! Per-channel blend math shared by the layer compositor and the blend-color
//! effect. All modes operate in 0..1 float space and clamp back to 8 bit.
//! Opacity and mix each interpolate between the base and the blended result;
//! they compose multiplicatively.

use serde::{Deserialize, Serialize};

use crate::frame::Frame;

const DIV_EPSILON: f32 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    Normal,
    Multiply,
    Screen,
    Overlay,
    Add,
    Subtract,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Mask,
}

impl BlendMode {
    pub const ALL: [BlendMode; 15] = [
        BlendMode::Normal,
        BlendMode::Multiply,
        BlendMode::Screen,
        BlendMode::Overlay,
        BlendMode::Add,
        BlendMode::Subtract,
        BlendMode::Darken,
        BlendMode::Lighten,
        BlendMode::ColorDodge,
        BlendMode::ColorBurn,
        BlendMode::HardLight,
        BlendMode::SoftLight,
        BlendMode::Difference,
        BlendMode::Exclusion,
        BlendMode::Mask,
    ];

    pub fn parse(name: &str) -> Option<BlendMode> {
        match name {
            "normal" => Some(BlendMode::Normal),
            "multiply" => Some(BlendMode::Multiply),
            "screen" => Some(BlendMode::Screen),
            "overlay" => Some(BlendMode::Overlay),
            "add" => Some(BlendMode::Add),
            "subtract" => Some(BlendMode::Subtract),
            "darken" => Some(BlendMode::Darken),
            "lighten" => Some(BlendMode::Lighten),
            "color_dodge" => Some(BlendMode::ColorDodge),
            "color_burn" => Some(BlendMode::ColorBurn),
            "hard_light" => Some(BlendMode::HardLight),
            "soft_light" => Some(BlendMode::SoftLight),
            "difference" => Some(BlendMode::Difference),
            "exclusion" => Some(BlendMode::Exclusion),
            "mask" => Some(BlendMode::Mask),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BlendMode::Normal => "normal",
            BlendMode::Multiply => "multiply",
            BlendMode::Screen => "screen",
            BlendMode::Overlay => "overlay",
            BlendMode::Add => "add",
            BlendMode::Subtract => "subtract",
            BlendMode::Darken => "darken",
            BlendMode::Lighten => "lighten",
            BlendMode::ColorDodge => "color_dodge",
            BlendMode::ColorBurn => "color_burn",
            BlendMode::HardLight => "hard_light",
            BlendMode::SoftLight => "soft_light",
            BlendMode::Difference => "difference",
            BlendMode::Exclusion => "exclusion",
            BlendMode::Mask => "mask",
        }
    }
}

/// Blend one channel. `base` and `top` are in 0..1.
#[inline]
pub fn blend_channel(base: f32, top: f32, mode: BlendMode) -> f32 {
    match mode {
        BlendMode::Normal => top,
        BlendMode::Multiply => base * top,
        BlendMode::Screen => 1.0 - (1.0 - base) * (1.0 - top),
        BlendMode::Overlay => {
            if base < 0.5 {
                2.0 * base * top
            } else {
                1.0 - 2.0 * (1.0 - base) * (1.0 - top)
            }
        }
        BlendMode::Add => (base + top).min(1.0),
        BlendMode::Subtract => (base - top).max(0.0),
        BlendMode::Darken => base.min(top),
        BlendMode::Lighten => base.max(top),
        BlendMode::ColorDodge => {
            if top >= 1.0 {
                1.0
            } else {
                (base / (1.0 - top + DIV_EPSILON)).clamp(0.0, 1.0)
            }
        }
        BlendMode::ColorBurn => {
            if top <= 0.0 {
                0.0
            } else {
                (1.0 - (1.0 - base) / (top + DIV_EPSILON)).clamp(0.0, 1.0)
            }
        }
        BlendMode::HardLight => {
            // Overlay with the operands swapped.
            if top < 0.5 {
                2.0 * base * top
            } else {
                1.0 - 2.0 * (1.0 - base) * (1.0 - top)
            }
        }
        BlendMode::SoftLight => {
            // Pegtop formula
            ((1.0 - 2.0 * top) * base * base + 2.0 * top * base).clamp(0.0, 1.0)
        }
        BlendMode::Difference => (base - top).abs(),
        BlendMode::Exclusion => base + top - 2.0 * base * top,
        // Mask is handled per-pixel (needs the overlay's luminance); a lone
        // channel blend degenerates to multiply-by-luminance upstream.
        BlendMode::Mask => top,
    }
}

/// Blend one RGB pixel with opacity and mix. Both are 0..1 factors that
/// interpolate base → blended; they compose as
/// `base·(1 − opacity·mix) + blended·opacity·mix`.
#[inline]
pub fn blend_pixel(base: [u8; 3], top: [u8; 3], mode: BlendMode, opacity: f32, mix: f32) -> [u8; 3] {
    let b = [
        base[0] as f32 / 255.0,
        base[1] as f32 / 255.0,
        base[2] as f32 / 255.0,
    ];
    let t = [
        top[0] as f32 / 255.0,
        top[1] as f32 / 255.0,
        top[2] as f32 / 255.0,
    ];

    let blended = if mode == BlendMode::Mask {
        // Overlay luminance acts as alpha over the base.
        let lum = 0.299 * t[0] + 0.587 * t[1] + 0.114 * t[2];
        [b[0] * lum, b[1] * lum, b[2] * lum]
    } else {
        [
            blend_channel(b[0], t[0], mode),
            blend_channel(b[1], t[1], mode),
            blend_channel(b[2], t[2], mode),
        ]
    };

    let amount = (opacity * mix).clamp(0.0, 1.0);
    let mut out = [0u8; 3];
    for c in 0..3 {
        let v = b[c] * (1.0 - amount) + blended[c] * amount;
        out[c] = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    }
    out
}

/// Blend `top` onto `base` in place. Frames must be the same size; the
/// compositor resizes beforehand.
pub fn blend_frame(base: &mut Frame, top: &Frame, mode: BlendMode, opacity: f32, mix: f32) {
    debug_assert!(base.same_size(top));
    let amount = (opacity * mix).clamp(0.0, 1.0);
    if amount <= 0.0 {
        return;
    }

    use rayon::prelude::*;
    base.pixels
        .par_chunks_exact_mut(3)
        .zip(top.pixels.par_chunks_exact(3))
        .for_each(|(dst, src)| {
            let out = blend_pixel(
                [dst[0], dst[1], dst[2]],
                [src[0], src[1], src[2]],
                mode,
                opacity,
                mix,
            );
            dst.copy_from_slice(&out);
        });
}
