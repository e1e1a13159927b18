pub mod artnet;
pub mod blend;
pub mod chain;
pub mod clip;
pub mod color;
pub mod compositor;
pub mod config;
pub mod effects;
pub mod engine;
pub mod events;
pub mod frame;
pub mod generators;
pub mod outputs;
pub mod player;
pub mod playlist;
pub mod plugin;
pub mod session;
pub mod status;
pub mod transitions;

use std::io::BufRead;
use std::path::Path;

use log::info;

use crate::config::AppConfig;
use crate::engine::Engine;
use crate::session::{default_session_path, SessionState};

/// Headless entry: load config, build the engine, run until stdin closes
/// (or a `quit` line arrives), then walk the ordered shutdown.
pub fn run(config_path: &Path, reload_session: bool) {
    let config = AppConfig::load(config_path).install();

    let engine = Engine::build(config);
    let session = SessionState::load_or_default(&default_session_path(), reload_session);
    engine.restore_session(&session);
    engine.start();

    info!("engine running; 'quit' or EOF on stdin shuts down");
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        match line {
            Ok(cmd) if cmd.trim() == "quit" => break,
            Ok(cmd) if cmd.trim() == "status" => {
                println!("{}", engine.status().to_json());
            }
            Ok(_) => {}
            Err(_) => break,
        }
    }

    engine.shutdown(true);
}
