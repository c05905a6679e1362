//! All setting definitions with their default values.

use std::collections::HashMap;
use std::sync::LazyLock;

type DefTuple = (&'static str, &'static str, &'static str);

const DEFS: &[DefTuple] = &[
    ("FRAME_CATALOG_URL", "", "Base URL of the frame catalog service"),
    ("FRAME_CATALOG_FILE", "", "Local catalog JSON, used when no URL is set"),
    ("FRAME_DATA_DIR", "", "Data directory (defaults to ~/.photo-frame)"),
    ("FRAME_FONTS_DIR", "", "Caption font directory (defaults to <data dir>/fonts)"),
    ("DEFAULT_FONT_PATH", "", "Fallback caption font (.ttf/.otf)"),
    ("MAX_UPLOAD_BYTES", "10485760", "Largest accepted photo upload in bytes"),
    ("PIXEL_RATIO", "1", "Device pixel ratio for composites"),
    ("HTTP_TIMEOUT_SECS", "15", "Catalog and image request timeout"),
    ("USAGE_TRACKING", "true", "Record frame usage after delivery"),
];

/// A single setting definition.
#[derive(Debug, Clone)]
pub struct SettingDef {
    pub key: &'static str,
    pub default: &'static str,
    pub description: &'static str,
}

/// Global setting definitions indexed by key.
pub static DEFAULT_SETTINGS: LazyLock<HashMap<&'static str, SettingDef>> = LazyLock::new(|| {
    DEFS.iter()
        .map(|&(key, default, description)| {
            (
                key,
                SettingDef {
                    key,
                    default,
                    description,
                },
            )
        })
        .collect()
});

/// Get the default value for a setting key, or `None` if not defined.
pub fn get_default(key: &str) -> Option<&'static str> {
    DEFAULT_SETTINGS.get(key).map(|d| d.default)
}

/// Setting keys in declaration order.
pub fn keys() -> impl Iterator<Item = &'static str> {
    DEFS.iter().map(|&(key, _, _)| key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::validation::validate_setting;

    #[test]
    fn test_every_default_is_valid() {
        for key in keys() {
            let default = get_default(key).unwrap();
            assert!(
                default.is_empty() || validate_setting(key, default).is_ok(),
                "default for {key} fails validation"
            );
        }
    }

    #[test]
    fn test_unknown_key_has_no_default() {
        assert_eq!(get_default("NOPE"), None);
        assert_eq!(DEFAULT_SETTINGS.len(), keys().count());
    }
}
