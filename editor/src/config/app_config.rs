//! Runtime application configuration loaded from the environment.

use std::path::PathBuf;
use std::time::Duration;

use super::defaults::get_default;
use super::validation::validate_setting;

/// Runtime configuration. Invalid values fall back to their defaults.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub catalog_url: String,
    pub catalog_file: String,
    pub data_dir: PathBuf,
    pub fonts_dir: PathBuf,
    pub default_font_path: Option<PathBuf>,
    pub max_upload_bytes: u64,
    pub pixel_ratio: f32,
    pub http_timeout: Duration,
    pub usage_tracking: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = crate::default_data_dir();
        Self {
            catalog_url: String::new(),
            catalog_file: String::new(),
            fonts_dir: data_dir.join("fonts"),
            data_dir,
            default_font_path: None,
            max_upload_bytes: 10 * 1024 * 1024,
            pixel_ratio: 1.0,
            http_timeout: Duration::from_secs(15),
            usage_tracking: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from process environment variables.
    pub fn load() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let g = |key: &str| -> String {
            let default = get_default(key).unwrap_or_default();
            let value = match lookup(key) {
                Some(v) => v.trim().to_string(),
                None => return default.to_string(),
            };
            if value.is_empty() {
                return default.to_string();
            }
            match validate_setting(key, &value) {
                Ok(()) => value,
                Err(reason) => {
                    tracing::warn!(key, value = %value, reason = %reason, "Invalid setting, using default");
                    default.to_string()
                }
            }
        };

        let data_dir = match g("FRAME_DATA_DIR") {
            d if d.is_empty() => crate::default_data_dir(),
            d => PathBuf::from(d),
        };
        let fonts_dir = match g("FRAME_FONTS_DIR") {
            d if d.is_empty() => data_dir.join("fonts"),
            d => PathBuf::from(d),
        };
        let default_font_path = Some(g("DEFAULT_FONT_PATH"))
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);

        Self {
            catalog_url: g("FRAME_CATALOG_URL"),
            catalog_file: g("FRAME_CATALOG_FILE"),
            data_dir,
            fonts_dir,
            default_font_path,
            max_upload_bytes: parse_u64(&g("MAX_UPLOAD_BYTES"), 10 * 1024 * 1024),
            pixel_ratio: parse_f32(&g("PIXEL_RATIO"), 1.0),
            http_timeout: Duration::from_secs(parse_u64(&g("HTTP_TIMEOUT_SECS"), 15)),
            usage_tracking: g("USAGE_TRACKING") == "true",
        }
    }

    /// Where frames come from: the service URL wins over the local file.
    pub fn catalog_location(&self) -> Option<&str> {
        [self.catalog_url.as_str(), self.catalog_file.as_str()]
            .into_iter()
            .find(|l| !l.is_empty())
    }

    /// JSON file backing the favorites store.
    pub fn favorites_path(&self) -> PathBuf {
        self.data_dir.join("favorites.json")
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.data_dir.join("exports")
    }
}

fn parse_f32(s: &str, default: f32) -> f32 {
    if s.is_empty() {
        return default;
    }
    s.parse().unwrap_or(default)
}

fn parse_u64(s: &str, default: u64) -> u64 {
    if s.is_empty() {
        return default;
    }
    s.parse().unwrap_or(default)
}
