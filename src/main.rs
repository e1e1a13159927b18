use std::path::PathBuf;

use log::LevelFilter;

use prism::config::AppConfig;

fn main() {
    // Pre-read the config for the log level; the real load happens in
    // `run` where parse warnings can actually be seen.
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.json"));
    let reload_session = std::env::args().any(|a| a == "--reload-session");

    let level = std::fs::read_to_string(&config_path)
        .ok()
        .and_then(|raw| serde_json::from_str::<AppConfig>(&raw).ok())
        .map(|c| AppConfig::log_level(&c.app.console_log_level))
        .unwrap_or(LevelFilter::Info);

    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp_millis()
        .init();

    prism::run(&config_path, reload_session);
}
