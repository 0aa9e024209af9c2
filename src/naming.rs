//! Naming conventions shared by listing, serving and export.
//!
//! ## Preview Files
//!
//! Every raw file has a pre-generated preview next to it. The preview name is
//! derived from the raw name alone, no disk lookup involved:
//! - `IMG_0001.CR2` → `IMG_0001-preview1.jpg`
//! - `clip.MOV` → `clip-preview1.jpg`
//! - `README` → `README-preview1.jpg` (no extension to strip)
//!
//! ## Album Paths
//!
//! Album paths arrive from request URLs and form bodies. They are normalised
//! to a `/`-separated path relative to the photo root before touching the
//! filesystem, and anything that would climb out of the root is rejected.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PathError {
    #[error("Album path escapes the photo root: {0}")]
    Traversal(String),
    #[error("Album path contains a NUL byte")]
    Nul,
}

/// How preview file names are derived from raw file names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewNaming {
    /// Appended to the raw stem, e.g. `"-preview1"`.
    pub suffix: String,
    /// Preview image extension without the dot.
    pub extension: String,
}

impl Default for PreviewNaming {
    fn default() -> Self {
        Self {
            suffix: "-preview1".to_string(),
            extension: "jpg".to_string(),
        }
    }
}

impl PreviewNaming {
    /// Derive the preview file name for `raw_name`.
    pub fn preview_name(&self, raw_name: &str) -> String {
        let stem = match raw_name.rfind('.') {
            Some(pos) if pos > 0 => &raw_name[..pos],
            _ => raw_name,
        };
        format!("{}{}.{}", stem, self.suffix, self.extension)
    }
}

/// Normalise a request-supplied album path.
///
/// - `"/2020/trip/"` → `"2020/trip"`
/// - `"./2020//trip"` → `"2020/trip"`
/// - `""` or `"/"` → `""` (the root)
/// - `"2020/../.."` → `Err(Traversal)`
pub fn normalize_album_path(raw: &str) -> Result<String, PathError> {
    if raw.contains('\0') {
        return Err(PathError::Nul);
    }
    let mut parts = Vec::new();
    for component in raw.split(['/', '\\']) {
        match component {
            "" | "." => {}
            ".." => return Err(PathError::Traversal(raw.to_string())),
            other => parts.push(other),
        }
    }
    Ok(parts.join("/"))
}

/// Join two `/`-separated relative paths, either of which may be empty.
pub fn join_relative(base: &str, name: &str) -> String {
    match (base.is_empty(), name.is_empty()) {
        (true, _) => name.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{base}/{name}"),
    }
}

/// Download name for an album archive: `photos-2020-trip.zip`.
pub fn archive_file_name(prefix: &str, album: &str) -> String {
    if album.is_empty() {
        format!("{prefix}.zip")
    } else {
        format!("{}-{}.zip", prefix, album.replace('/', "-"))
    }
}
