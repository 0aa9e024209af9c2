//! Gallery configuration.
//!
//! One immutable [`GalleryConfig`] is built at startup and handed to every
//! listing and export call. Nothing reads process-global state, so tests can
//! point the core at a temporary directory with a config built in place.
//!
//! ## Loading
//!
//! Stock defaults are serialized to a TOML table, the user's file is merged
//! over it key by key, and the result is deserialized and validated:
//!
//! ```text
//! stock defaults  →  picturepi.toml (optional)  →  CLI flags
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! photo_root = "pictures"      # Directory holding the album tree
//! listen = "0.0.0.0:8080"      # HTTP bind address
//!
//! [pictures]
//! extensions = [".CR2", ".JPG", ".MOV"]   # Case-sensitive suffixes
//!
//! [previews]
//! suffix = "-preview1"         # IMG_1.CR2 → IMG_1-preview1.jpg
//! extension = "jpg"
//!
//! [scan]
//! max_depth = 64               # Nesting limit for album discovery
//!
//! [archive]
//! name_prefix = "photos"       # photos-2020-trip.zip
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::classify::{Classifier, DEFAULT_EXTENSIONS};
use crate::naming::PreviewNaming;
use crate::scan::{DEFAULT_MAX_DEPTH, ScanOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Top-level configuration. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryConfig {
    /// Directory holding the album tree.
    pub photo_root: PathBuf,
    /// Socket address the HTTP server binds to.
    pub listen: String,
    pub pictures: PicturesConfig,
    pub previews: PreviewNaming,
    pub scan: ScanConfig,
    pub archive: ArchiveConfig,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            photo_root: PathBuf::from("pictures"),
            listen: "0.0.0.0:8080".to_string(),
            pictures: PicturesConfig::default(),
            previews: PreviewNaming::default(),
            scan: ScanConfig::default(),
            archive: ArchiveConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PicturesConfig {
    /// File suffixes (with leading dot) that count as pictures or video.
    pub extensions: Vec<String>,
}

impl Default for PicturesConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    pub max_depth: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveConfig {
    /// Leading part of download file names.
    pub name_prefix: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            name_prefix: "photos".to_string(),
        }
    }
}

impl GalleryConfig {
    /// Validate values that deserialize fine but make no sense.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pictures.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "pictures.extensions must not be empty".into(),
            ));
        }
        if let Some(bad) = self
            .pictures
            .extensions
            .iter()
            .find(|ext| !ext.starts_with('.') || ext.len() < 2)
        {
            return Err(ConfigError::Validation(format!(
                "pictures.extensions entry {bad:?} must start with '.' and name a suffix"
            )));
        }
        if self.previews.extension.is_empty() {
            return Err(ConfigError::Validation(
                "previews.extension must not be empty".into(),
            ));
        }
        if self.scan.max_depth == 0 {
            return Err(ConfigError::Validation(
                "scan.max_depth must be at least 1".into(),
            ));
        }
        if self.archive.name_prefix.is_empty() {
            return Err(ConfigError::Validation(
                "archive.name_prefix must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn classifier(&self) -> Classifier {
        Classifier::new(self.pictures.extensions.iter().cloned())
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            max_depth: self.scan.max_depth,
        }
    }

    pub fn photo_root(&self) -> &Path {
        &self.photo_root
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// The stock defaults as a TOML table, the base layer for merging.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(GalleryConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto the stock defaults, deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<GalleryConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: GalleryConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from `path`, or the stock defaults when `None`.
///
/// A path that was given but cannot be read is an error.
pub fn load_config(path: Option<&Path>) -> Result<GalleryConfig, ConfigError> {
    let overlay = match path {
        Some(p) => {
            let content = fs::read_to_string(p)?;
            Some(toml::from_str::<toml::Value>(&content)?)
        }
        None => None,
    };
    resolve_config(overlay)
}

/// A fully commented stock config, printed by `picturepi gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# picturepi configuration
# =======================
# All settings are optional. Values shown below are the defaults.
# Unknown keys cause an error.

# Directory holding the album tree. Leaf directories become albums.
photo_root = "pictures"

# Address the HTTP server listens on.
listen = "0.0.0.0:8080"

# ---------------------------------------------------------------------------
# Which files count as pictures
# ---------------------------------------------------------------------------
[pictures]
# Case-sensitive suffixes. Files matching none of them are neither listed
# nor exported by "download all".
extensions = [".CR2", ".JPG", ".MOV"]

# ---------------------------------------------------------------------------
# Preview naming convention
# ---------------------------------------------------------------------------
[previews]
# IMG_0001.CR2 -> IMG_0001-preview1.jpg
suffix = "-preview1"
extension = "jpg"

# ---------------------------------------------------------------------------
# Album discovery
# ---------------------------------------------------------------------------
[scan]
# Directory levels below the photo root before a listing request fails.
max_depth = 64

# ---------------------------------------------------------------------------
# Archive downloads
# ---------------------------------------------------------------------------
[archive]
# Download name: <name_prefix>-<album path with / as ->.zip
name_prefix = "photos"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_camera_conventions() {
        let config = GalleryConfig::default();
        assert_eq!(config.pictures.extensions, vec![".CR2", ".JPG", ".MOV"]);
        assert_eq!(config.previews.suffix, "-preview1");
        assert_eq!(config.previews.extension, "jpg");
        assert_eq!(config.scan.max_depth, 64);
        assert_eq!(config.archive.name_prefix, "photos");
        assert_eq!(config.listen, "0.0.0.0:8080");
    }

    #[test]
    fn validate_default_config_passes() {
        assert!(GalleryConfig::default().validate().is_ok());
    }

    #[test]
    fn classifier_built_from_extensions() {
        let mut config = GalleryConfig::default();
        config.pictures.extensions = vec![".cr2".into()];
        let classifier = config.classifier();
        assert!(classifier.is_picture("a.cr2"));
        assert!(!classifier.is_picture("a.CR2"));
    }

    #[test]
    fn load_config_without_file_is_default() {
        let config = load_config(None).unwrap();
        assert_eq!(config, GalleryConfig::default());
    }

    #[test]
    fn load_config_merges_partial_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("picturepi.toml");
        fs::write(
            &path,
            r#"
photo_root = "/srv/photos"

[previews]
extension = "webp"
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.photo_root, PathBuf::from("/srv/photos"));
        assert_eq!(config.previews.extension, "webp");
        // untouched keys keep their defaults
        assert_eq!(config.previews.suffix, "-preview1");
        assert_eq!(config.pictures.extensions.len(), 3);
    }

    #[test]
    fn load_config_missing_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = load_config(Some(&tmp.path().join("absent.toml")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("picturepi.toml");
        fs::write(&path, "photo_root = [unterminated").unwrap();
        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn unknown_key_rejected() {
        let overlay: toml::Value = toml::from_str("[scan]\nmax_dept = 3").unwrap();
        let err = resolve_config(Some(overlay)).unwrap_err().to_string();
        assert!(err.contains("unknown field"), "{err}");
    }

    #[test]
    fn unknown_section_rejected() {
        let overlay: toml::Value = toml::from_str("[thumbnails]\nsize = 3").unwrap();
        assert!(resolve_config(Some(overlay)).is_err());
    }

    #[test]
    fn validate_rejects_empty_extensions() {
        let overlay: toml::Value = toml::from_str("[pictures]\nextensions = []").unwrap();
        assert!(matches!(
            resolve_config(Some(overlay)),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn validate_rejects_extension_without_dot() {
        let mut config = GalleryConfig::default();
        config.pictures.extensions = vec!["CR2".into()];
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_rejects_zero_depth() {
        let mut config = GalleryConfig::default();
        config.scan.max_depth = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_rejects_empty_prefix() {
        let mut config = GalleryConfig::default();
        config.archive.name_prefix.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str("[previews]\nsuffix = \"-p\"\nextension = \"jpg\"").unwrap();
        let overlay: toml::Value = toml::from_str("[previews]\nextension = \"png\"").unwrap();
        let merged = merge_toml(base, overlay);
        let previews = merged.get("previews").unwrap();
        assert_eq!(previews.get("extension").unwrap().as_str(), Some("png"));
        assert_eq!(previews.get("suffix").unwrap().as_str(), Some("-p"));
    }

    #[test]
    fn merge_toml_array_replaced_not_appended() {
        let base: toml::Value = toml::from_str("extensions = [\".CR2\", \".MOV\"]").unwrap();
        let overlay: toml::Value = toml::from_str("extensions = [\".NEF\"]").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("extensions").unwrap().as_array().unwrap().len(), 1);
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: GalleryConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, GalleryConfig::default());
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value().unwrap();
        for section in ["pictures", "previews", "scan", "archive"] {
            assert!(val.get(section).is_some(), "missing [{section}]");
        }
    }
}
