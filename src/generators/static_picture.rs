//! Still image source.
//!
//! Decodes PNG/JPG/BMP/TIFF/WebP files. Filenames are resolved against
//! `paths.video_dir` first, then each entry of `paths.video_sources` in
//! order; the first hit wins.

use std::path::{Path, PathBuf};

use log::warn;
use walkdir::WalkDir;

use crate::config;
use crate::frame::Frame;
use crate::plugin::{
    seed_params, Generator, ParamMap, ParamSpec, ParamValue, Plugin, PluginKind, PluginMeta,
};

pub const META: PluginMeta = PluginMeta {
    id: "static_picture",
    name: "Static Picture",
    description: "Still image source (PNG, JPG, BMP, TIFF, WebP)",
    author: "Prism Team",
    version: "1.0.0",
    kind: PluginKind::Generator,
};

pub const SCHEMA: &[ParamSpec] = &[
    ParamSpec::string("filename", "Filename", "", "Image file name or relative path"),
    ParamSpec::select(
        "fit",
        "Fit",
        "stretch",
        &["stretch", "fit", "fill"],
        "How the image maps onto the canvas",
    ),
    ParamSpec::int(
        "duration",
        "Duration (seconds)",
        10,
        1,
        600,
        "Playback duration in seconds (for playlist auto-advance)",
    ),
];

const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tiff", "tif", "webp"];

pub struct StaticPicture {
    filename: String,
    fit: String,
    duration: u32,
    decoded: Option<Frame>,
    // Resize is cached per canvas size; status polls re-request constantly.
    scaled: Option<Frame>,
}

impl StaticPicture {
    pub fn new(config: &ParamMap) -> Self {
        let params = seed_params(SCHEMA, config);
        Self {
            filename: params["filename"].as_str().unwrap_or("").to_string(),
            fit: params["fit"].as_str().unwrap_or("stretch").to_string(),
            duration: params["duration"].as_i64().unwrap_or(10).clamp(1, 600) as u32,
            decoded: None,
            scaled: None,
        }
    }

    /// Search the configured media directories for the file.
    pub fn resolve_path(filename: &str) -> Option<PathBuf> {
        let direct = Path::new(filename);
        if direct.is_absolute() && direct.is_file() {
            return Some(direct.to_path_buf());
        }

        for dir in config::media_search_dirs() {
            let candidate = dir.join(filename);
            if candidate.is_file() {
                return Some(candidate);
            }
            // Fall back to a recursive basename search within the dir.
            let target = direct.file_name()?;
            for entry in WalkDir::new(&dir).max_depth(4).into_iter().flatten() {
                if entry.file_type().is_file() && entry.file_name() == target {
                    return Some(entry.into_path());
                }
            }
        }
        None
    }

    fn ensure_decoded(&mut self) -> Result<&Frame, String> {
        if self.decoded.is_none() {
            let path = Self::resolve_path(&self.filename)
                .ok_or_else(|| format!("image '{}' not found in media paths", self.filename))?;

            let extension = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase())
                .unwrap_or_default();
            if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
                warn!(
                    "[static_picture] unexpected extension '{}' for {}, attempting decode anyway",
                    extension,
                    path.display()
                );
            }

            let img = image::open(&path)
                .map_err(|e| format!("failed to decode '{}': {}", path.display(), e))?
                .to_rgb8();
            self.decoded = Some(Frame {
                width: img.width(),
                height: img.height(),
                pixels: img.into_raw(),
            });
        }
        Ok(self.decoded.as_ref().expect("decoded image present"))
    }

    fn scale_to(&mut self, width: u32, height: u32) -> Result<Frame, String> {
        if let Some(cached) = &self.scaled {
            if cached.width == width && cached.height == height {
                return Ok(cached.clone());
            }
        }

        let fit = self.fit.clone();
        let source = self.ensure_decoded()?.clone();
        let scaled = match fit.as_str() {
            "fit" | "fill" => {
                let sx = width as f64 / source.width as f64;
                let sy = height as f64 / source.height as f64;
                let s = if fit == "fit" { sx.min(sy) } else { sx.max(sy) };
                let scaled_w = ((source.width as f64 * s).round() as u32).max(1);
                let scaled_h = ((source.height as f64 * s).round() as u32).max(1);
                let resized = source.resize_nearest(scaled_w, scaled_h);

                // Center onto (fit) or crop to (fill) the canvas.
                let mut out = Frame::new(width, height);
                let dx = (width as i64 - scaled_w as i64) / 2;
                let dy = (height as i64 - scaled_h as i64) / 2;
                for y in 0..height {
                    let sy = y as i64 - dy;
                    if sy < 0 || sy >= scaled_h as i64 {
                        continue;
                    }
                    for x in 0..width {
                        let sx = x as i64 - dx;
                        if sx < 0 || sx >= scaled_w as i64 {
                            continue;
                        }
                        out.put(x, y, resized.get(sx as u32, sy as u32));
                    }
                }
                out
            }
            _ => source.resize_nearest(width, height),
        };

        self.scaled = Some(scaled.clone());
        Ok(scaled)
    }
}

impl Plugin for StaticPicture {
    fn meta(&self) -> &'static PluginMeta {
        &META
    }

    fn param_schema(&self) -> &'static [ParamSpec] {
        SCHEMA
    }

    fn update_param(&mut self, name: &str, value: ParamValue) -> bool {
        match name {
            "filename" => {
                if let Some(s) = value.as_str() {
                    self.filename = s.to_string();
                    self.decoded = None;
                    self.scaled = None;
                    return true;
                }
                false
            }
            "fit" => {
                if let Some(s) = value.as_str() {
                    if ["stretch", "fit", "fill"].contains(&s) {
                        self.fit = s.to_string();
                        self.scaled = None;
                        return true;
                    }
                }
                false
            }
            "duration" => {
                self.duration =
                    value.as_i64().unwrap_or(self.duration as i64).clamp(1, 600) as u32;
                true
            }
            _ => false,
        }
    }

    fn params(&self) -> ParamMap {
        let mut map = ParamMap::new();
        map.insert("filename".into(), ParamValue::Text(self.filename.clone()));
        map.insert("fit".into(), ParamValue::Select(self.fit.clone()));
        map.insert("duration".into(), ParamValue::Int(self.duration as i64));
        map
    }

    fn cleanup(&mut self) {
        self.decoded = None;
        self.scaled = None;
    }
}

impl Generator for StaticPicture {
    fn generate(
        &mut self,
        width: u32,
        height: u32,
        _frame_number: u64,
        _time: f64,
        _fps: f32,
    ) -> Result<Frame, String> {
        self.scale_to(width, height)
    }

    fn duration_s(&self) -> Option<f64> {
        Some(self.duration as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_an_error_not_a_panic() {
        let mut config = ParamMap::new();
        config.insert("filename".into(), ParamValue::Text("does_not_exist.png".into()));
        let mut gen = StaticPicture::new(&config);
        assert!(gen.generate(16, 16, 0, 0.0, 30.0).is_err());
    }

    #[test]
    fn decodes_and_stretches_a_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("swatch.png");
        let img = image::RgbImage::from_pixel(2, 2, image::Rgb([10, 20, 30]));
        img.save(&path).unwrap();

        let mut config = ParamMap::new();
        config.insert(
            "filename".into(),
            ParamValue::Text(path.to_string_lossy().into_owned()),
        );
        let mut gen = StaticPicture::new(&config);
        let frame = gen.generate(8, 8, 0, 0.0, 30.0).unwrap();
        assert_eq!(frame.get(4, 4), [10, 20, 30]);
    }
}
