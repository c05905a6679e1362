//! Setting value validation.

use frame_compositor::canvas::MAX_PIXEL_RATIO;
use regex::Regex;
use std::sync::LazyLock;

static RE_HTTP_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s/?#]+(/[^\s]*)?$").unwrap());
static RE_FONT_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(ttf|otf)$").unwrap());

/// Upper bound for `MAX_UPLOAD_BYTES` (100 MiB).
const UPLOAD_CEILING: u64 = 100 * 1024 * 1024;

/// Validate a setting value. Returns `Ok(())` if valid, or an error message.
pub fn validate_setting(key: &str, value: &str) -> Result<(), String> {
    match key {
        "FRAME_CATALOG_URL" => {
            if !value.is_empty() && !RE_HTTP_URL.is_match(value) {
                return Err("must be an http:// or https:// URL".into());
            }
        }
        "DEFAULT_FONT_PATH" => {
            if !value.is_empty() && !RE_FONT_FILE.is_match(value) {
                return Err("must point to a .ttf or .otf file".into());
            }
        }
        "MAX_UPLOAD_BYTES" => {
            let v: u64 = value.parse().map_err(|_| "must be an integer")?;
            if !(1..=UPLOAD_CEILING).contains(&v) {
                return Err(format!("must be between 1 and {UPLOAD_CEILING}"));
            }
        }
        "PIXEL_RATIO" => {
            let v: f32 = value.parse().map_err(|_| "must be a number")?;
            if !v.is_finite() || v <= 0.0 || v > MAX_PIXEL_RATIO {
                return Err(format!("must be greater than 0 and at most {MAX_PIXEL_RATIO}"));
            }
        }
        "HTTP_TIMEOUT_SECS" => validate_int_range(value, 1, 300)?,
        k if is_boolean_setting(k) => {
            if value != "true" && value != "false" {
                return Err("must be 'true' or 'false'".into());
            }
        }
        _ => {}
    }
    Ok(())
}

fn validate_int_range(value: &str, min: i64, max: i64) -> Result<(), String> {
    let v: i64 = value.parse().map_err(|_| "must be an integer")?;
    if v < min || v > max {
        return Err(format!("must be between {min} and {max}"));
    }
    Ok(())
}

fn is_boolean_setting(key: &str) -> bool {
    matches!(key, "USAGE_TRACKING")
}
