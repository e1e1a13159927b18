//! Application Configuration
//!
//! `config.json` loaded once at startup into a typed struct. Faults are
//! isolated per key: a missing or malformed individual value logs a
//! WARNING and takes that field's documented default while the rest of
//! the file still applies; an unreadable file falls back wholesale.
//! Configuration faults never abort startup.

use std::path::{Path, PathBuf};

use log::{warn, LevelFilter};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

static GLOBAL: OnceCell<AppConfig> = OnceCell::new();

// One module per field: the documented default plus a lenient
// deserializer that falls back to it (with a warning) when the value in
// the file has the wrong shape.
macro_rules! config_field {
    ($name:ident, $ty:ty, $value:expr) => {
        mod $name {
            #[allow(unused_imports)]
            use super::*;

            pub fn default() -> $ty {
                $value
            }

            pub fn deserialize<'de, D>(deserializer: D) -> Result<$ty, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = <serde_json::Value as serde::Deserialize>::deserialize(deserializer)?;
                Ok(serde_json::from_value(raw.clone()).unwrap_or_else(|_| {
                    log::warn!(
                        "[config] ignoring bad value {} for '{}', using default",
                        raw,
                        stringify!($name)
                    );
                    default()
                }))
            }
        }
    };
}

config_field!(console_log_level, String, "INFO".to_string());
config_field!(file_log_level, String, "INFO".to_string());
config_field!(max_log_files, u32, 5);
config_field!(video_dir, String, "media".to_string());
config_field!(data_dir, String, String::new());
config_field!(video_sources, Vec<String>, Vec::new());
config_field!(scripts_dir, String, "scripts".to_string());
config_field!(default_points_json, String, "points.json".to_string());
config_field!(target_ip, String, "255.255.255.255".to_string());
config_field!(start_universe, u16, 0);
config_field!(default_fps, f32, 30.0);
config_field!(default_brightness, f32, 1.0);
config_field!(default_speed, f32, 1.0);
config_field!(player_resolution, ResolutionSection, ResolutionSection::default());
config_field!(preset, String, "1080p".to_string());
config_field!(custom_width, u32, 1920);
config_field!(custom_height, u32, 1080);
config_field!(autosize, String, "off".to_string());
config_field!(api_host, String, "127.0.0.1".to_string());
config_field!(api_port, u16, 8000);
config_field!(position_update_interval, u32, 10);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub paths: PathsSection,
    #[serde(default)]
    pub artnet: ArtnetSection,
    #[serde(default)]
    pub video: VideoSection,
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub effects: EffectsSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSection {
    #[serde(
        default = "console_log_level::default",
        deserialize_with = "console_log_level::deserialize"
    )]
    pub console_log_level: String,
    #[serde(
        default = "file_log_level::default",
        deserialize_with = "file_log_level::deserialize"
    )]
    pub file_log_level: String,
    #[serde(default = "max_log_files::default", deserialize_with = "max_log_files::deserialize")]
    pub max_log_files: u32,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            console_log_level: console_log_level::default(),
            file_log_level: file_log_level::default(),
            max_log_files: max_log_files::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsSection {
    #[serde(default = "video_dir::default", deserialize_with = "video_dir::deserialize")]
    pub video_dir: String,
    #[serde(default = "data_dir::default", deserialize_with = "data_dir::deserialize")]
    pub data_dir: String,
    #[serde(default = "video_sources::default", deserialize_with = "video_sources::deserialize")]
    pub video_sources: Vec<String>,
    #[serde(default = "scripts_dir::default", deserialize_with = "scripts_dir::deserialize")]
    pub scripts_dir: String,
    #[serde(
        default = "default_points_json::default",
        deserialize_with = "default_points_json::deserialize"
    )]
    pub default_points_json: String,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            video_dir: video_dir::default(),
            data_dir: data_dir::default(),
            video_sources: video_sources::default(),
            scripts_dir: scripts_dir::default(),
            default_points_json: default_points_json::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtnetSection {
    #[serde(default = "target_ip::default", deserialize_with = "target_ip::deserialize")]
    pub target_ip: String,
    #[serde(default = "start_universe::default", deserialize_with = "start_universe::deserialize")]
    pub start_universe: u16,
}

impl Default for ArtnetSection {
    fn default() -> Self {
        Self {
            target_ip: target_ip::default(),
            start_universe: start_universe::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoSection {
    #[serde(default = "default_fps::default", deserialize_with = "default_fps::deserialize")]
    pub default_fps: f32,
    #[serde(
        default = "default_brightness::default",
        deserialize_with = "default_brightness::deserialize"
    )]
    pub default_brightness: f32,
    #[serde(default = "default_speed::default", deserialize_with = "default_speed::deserialize")]
    pub default_speed: f32,
    #[serde(
        default = "player_resolution::default",
        deserialize_with = "player_resolution::deserialize"
    )]
    pub player_resolution: ResolutionSection,
}

impl Default for VideoSection {
    fn default() -> Self {
        Self {
            default_fps: default_fps::default(),
            default_brightness: default_brightness::default(),
            default_speed: default_speed::default(),
            player_resolution: player_resolution::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionSection {
    #[serde(default = "preset::default", deserialize_with = "preset::deserialize")]
    pub preset: String,
    #[serde(default = "custom_width::default", deserialize_with = "custom_width::deserialize")]
    pub custom_width: u32,
    #[serde(default = "custom_height::default", deserialize_with = "custom_height::deserialize")]
    pub custom_height: u32,
    #[serde(default = "autosize::default", deserialize_with = "autosize::deserialize")]
    pub autosize: String,
}

impl Default for ResolutionSection {
    fn default() -> Self {
        Self {
            preset: preset::default(),
            custom_width: custom_width::default(),
            custom_height: custom_height::default(),
            autosize: autosize::default(),
        }
    }
}

impl ResolutionSection {
    /// Canvas size for the preview player. Unknown presets warn and fall
    /// back to 1080p.
    pub fn canvas_size(&self) -> (u32, u32) {
        match self.preset.as_str() {
            "720p" => (1280, 720),
            "1080p" => (1920, 1080),
            "1440p" => (2560, 1440),
            "2160p" => (3840, 2160),
            "custom" => (self.custom_width.max(1), self.custom_height.max(1)),
            other => {
                warn!("[config] unknown resolution preset '{}', using 1080p", other);
                (1920, 1080)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSection {
    #[serde(default = "api_host::default", deserialize_with = "api_host::deserialize")]
    pub host: String,
    #[serde(default = "api_port::default", deserialize_with = "api_port::deserialize")]
    pub port: u16,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            host: api_host::default(),
            port: api_port::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectsSection {
    #[serde(
        default = "position_update_interval::default",
        deserialize_with = "position_update_interval::deserialize"
    )]
    pub transport_position_update_interval: u32,
}

impl Default for EffectsSection {
    fn default() -> Self {
        Self {
            transport_position_update_interval: position_update_interval::default(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> AppConfig {
        match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<AppConfig>(&raw) {
                Ok(config) => config,
                Err(e) => {
                    warn!(
                        "[config] failed to parse {}: {} — using defaults",
                        path.display(),
                        e
                    );
                    AppConfig::default()
                }
            },
            Err(e) => {
                warn!(
                    "[config] could not read {}: {} — using defaults",
                    path.display(),
                    e
                );
                AppConfig::default()
            }
        }
    }

    /// Install as the process-wide configuration. First caller wins; later
    /// calls are ignored (tests install ad-hoc configs).
    pub fn install(self) -> &'static AppConfig {
        let _ = GLOBAL.set(self);
        GLOBAL.get().expect("config installed")
    }

    pub fn log_level(level: &str) -> LevelFilter {
        match level.to_ascii_uppercase().as_str() {
            "DEBUG" => LevelFilter::Debug,
            "INFO" => LevelFilter::Info,
            "WARNING" => LevelFilter::Warn,
            "ERROR" => LevelFilter::Error,
            "CRITICAL" => LevelFilter::Error,
            other => {
                warn!("[config] unknown log level '{}', using INFO", other);
                LevelFilter::Info
            }
        }
    }

    /// Where session state lives: `paths.data_dir`, or a per-user data dir.
    pub fn data_dir(&self) -> PathBuf {
        if !self.paths.data_dir.is_empty() {
            return PathBuf::from(&self.paths.data_dir);
        }
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("prism")
    }
}

/// Process-wide configuration, defaults if none installed.
pub fn get() -> &'static AppConfig {
    GLOBAL.get_or_init(AppConfig::default)
}

/// `paths.video_dir` first, then every `paths.video_sources` entry in
/// order. Used by file-backed sources to resolve media names.
pub fn media_search_dirs() -> Vec<PathBuf> {
    let config = get();
    let mut dirs = vec![PathBuf::from(&config.paths.video_dir)];
    dirs.extend(config.paths.video_sources.iter().map(PathBuf::from));
    dirs
}

pub fn transport_position_update_interval() -> u32 {
    get().effects.transport_position_update_interval.max(1)
}
