//! Main application entry point.
//!
//! Usage: `mapsketch [CONFIG.json] [SCRIPT.json]`

use std::path::PathBuf;

fn main() {
    env_logger::init();
    log::info!("Starting MapSketch");

    let mut args = std::env::args_os().skip(1).map(PathBuf::from);
    let config = args.next();
    let script = args.next();

    let summary = match mapsketch_app::run(config.as_deref(), script.as_deref()) {
        Ok(summary) => summary,
        Err(err) => {
            log::error!("{}", err);
            std::process::exit(1);
        }
    };

    match serde_json::to_string_pretty(&summary) {
        Ok(json) => println!("{}", json),
        Err(err) => {
            log::error!("Failed to serialize scene summary: {}", err);
            std::process::exit(1);
        }
    }
}
