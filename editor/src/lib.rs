pub mod app;
pub mod config;
pub mod export;
pub mod fonts;
pub mod session;
pub mod tracking;
pub mod upload;

use std::path::PathBuf;

use config::AppConfig;

/// Default data directory: `~/.photo-frame`.
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".photo-frame")
}

/// Load .env from multiple candidate paths.
pub fn load_dotenv() {
    let candidates = [".env", "../.env", "../../.env"];
    for path in &candidates {
        if dotenvy::from_filename(path).is_ok() {
            tracing::info!("Loaded .env from: {path}");
            return;
        }
    }
    tracing::info!("No .env file found, using system environment variables");
}

/// Load `.env`, read configuration and make sure the data directory exists.
pub fn init_foundation() -> Result<AppConfig, anyhow::Error> {
    load_dotenv();
    let config = AppConfig::load();
    std::fs::create_dir_all(&config.data_dir)?;
    tracing::info!(data_dir = %config.data_dir.display(), "Configuration loaded");
    Ok(config)
}
