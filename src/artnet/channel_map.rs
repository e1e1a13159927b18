//! LED channel-order remapping.
//!
//! A format string selects an index permutation of the per-LED channel
//! tuple: output channel `k` is input channel `perm[k]`. Covers the RGB
//! wiring variants (WS2812B is GRB), the RGBW set, and the 5/6-channel
//! amber / dual-white strips.

use std::collections::HashMap;

use once_cell::sync::Lazy;

pub static CHANNEL_MAPS: Lazy<HashMap<&'static str, &'static [usize]>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, &'static [usize]> = HashMap::new();

    // 3-channel RGB
    map.insert("RGB", &[0, 1, 2]);
    map.insert("RBG", &[0, 2, 1]);
    map.insert("GRB", &[1, 0, 2]); // WS2812B standard
    map.insert("GBR", &[1, 2, 0]);
    map.insert("BRG", &[2, 0, 1]);
    map.insert("BGR", &[2, 1, 0]);

    // 4-channel RGBW
    map.insert("RGBW", &[0, 1, 2, 3]);
    map.insert("RBGW", &[0, 2, 1, 3]);
    map.insert("GRBW", &[1, 0, 2, 3]); // WS2812B RGBW
    map.insert("GBRW", &[1, 2, 0, 3]);
    map.insert("BRGW", &[2, 0, 1, 3]);
    map.insert("BGRW", &[2, 1, 0, 3]);
    map.insert("WRGB", &[3, 0, 1, 2]);
    map.insert("WRBG", &[3, 0, 2, 1]);
    map.insert("WGRB", &[3, 1, 0, 2]);
    map.insert("WGBR", &[3, 1, 2, 0]);
    map.insert("WBRG", &[3, 2, 0, 1]);
    map.insert("WBGR", &[3, 2, 1, 0]);

    // 5-channel RGBAW / dual-white
    map.insert("RGBAW", &[0, 1, 2, 3, 4]);
    map.insert("RGBWA", &[0, 1, 2, 4, 3]);
    map.insert("RGBWW", &[0, 1, 2, 3, 4]); // warm, cool
    map.insert("RGBCW", &[0, 1, 2, 4, 3]); // cool, warm
    map.insert("GRBAW", &[1, 0, 2, 3, 4]);
    map.insert("GRBWA", &[1, 0, 2, 4, 3]);

    // 6-channel
    map.insert("RGBCWW", &[0, 1, 2, 3, 4, 5]);
    map.insert("RGBWWC", &[0, 1, 2, 4, 5, 3]);

    map
});

pub fn is_valid_format(channel_order: &str) -> bool {
    CHANNEL_MAPS.contains_key(channel_order)
}

pub fn channel_count(channel_order: &str) -> usize {
    CHANNEL_MAPS.get(channel_order).map(|p| p.len()).unwrap_or(3)
}

pub fn supported_formats() -> Vec<&'static str> {
    let mut formats: Vec<&'static str> = CHANNEL_MAPS.keys().copied().collect();
    formats.sort_unstable();
    formats
}

/// Remap one LED's channels. Unknown formats and channel-count
/// mismatches pass through unchanged.
pub fn map_channels(channels: &[u8], channel_order: &str) -> Vec<u8> {
    match CHANNEL_MAPS.get(channel_order) {
        Some(perm) if perm.len() == channels.len() => {
            perm.iter().map(|&i| channels[i]).collect()
        }
        _ => channels.to_vec(),
    }
}

/// Invert a permutation: the format that undoes `channel_order`.
pub fn inverse_permutation(channel_order: &str) -> Option<Vec<usize>> {
    let perm = CHANNEL_MAPS.get(channel_order)?;
    let mut inverse = vec![0usize; perm.len()];
    for (k, &src) in perm.iter().enumerate() {
        inverse[src] = k;
    }
    Some(inverse)
}
