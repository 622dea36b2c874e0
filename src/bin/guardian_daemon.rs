use std::env;
use std::path::PathBuf;

use guardian::{Config, Guardian, ShutdownSignal};

/// Daemon entry point: `guardian_daemon [config.toml]`
fn main() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(e) = run() {
        log::error!("Fatal error: {}", e);
        eprintln!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    log::info!("Starting Guardian daemon...");

    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let mut config = if config_path.exists() {
        Config::from_file(&config_path)?
    } else {
        log::warn!("Config file {:?} not found, using defaults", config_path);
        Config::default()
    };
    config.apply_env_overrides()?;

    let shutdown = ShutdownSignal::new();
    shutdown.install_handler()?;

    log::info!("AI Model: {}", config.classifier.model);
    log::info!("Daemon running. Press Ctrl+C to stop.");

    let mut guardian = Guardian::from_config(&config);
    guardian.run(&shutdown)?;

    Ok(())
}
