//! emgbridge daemon entry point.

use emgbridge::app::BridgeApp;
use emgbridge::config::AppConfig;
use emgbridge::error::Result;
use std::env;
use std::path::Path;

/// Default configuration path when none is given.
const DEFAULT_CONFIG_PATH: &str = "/etc/emgbridge.toml";

/// Parse config path from command line arguments.
///
/// Supports:
/// - `emgbridge <path>` (positional)
/// - `emgbridge --config <path>` (flag-based)
/// - `emgbridge -c <path>` (short flag)
fn parse_config_path() -> String {
    let args: Vec<String> = env::args().collect();

    // Look for --config or -c flag
    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }

    // Fall back to first positional argument (if it doesn't start with -)
    if args.len() > 1 && !args[1].starts_with('-') {
        return args[1].clone();
    }

    DEFAULT_CONFIG_PATH.to_string()
}

fn main() -> Result<()> {
    let config_path = parse_config_path();

    let config_found = Path::new(&config_path).exists();
    let config = if config_found {
        AppConfig::from_file(&config_path)?
    } else {
        AppConfig::default()
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("emgbridge v0.1.0 starting...");
    if config_found {
        log::info!("Using config: {}", config_path);
    } else {
        log::warn!("Config {} not found, using built-in defaults", config_path);
    }

    let mut app = BridgeApp::new(config)?;
    app.run()
}
