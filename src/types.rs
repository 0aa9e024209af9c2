//! Data model shared by the scanner, the CLI and the HTTP front end.
//!
//! Everything here is built fresh from a filesystem read for each request
//! and serialized straight to JSON or HTML. Nothing is cached.

use serde::{Deserialize, Serialize};

/// URL prefix under which the photo root is served.
pub const IMAGE_URL_PREFIX: &str = "/images/";

/// One qualifying file within an album.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PictureEntry {
    /// File name inside the album, e.g. `IMG_0001.CR2`
    pub file_name: String,
    /// Derived preview file name, e.g. `IMG_0001-preview1.jpg`. Not checked on disk.
    pub preview_file_name: String,
    /// Raw file path relative to the photo root
    pub raw_path: String,
    /// Preview file path relative to the photo root
    pub preview_path: String,
    /// Owning album, relative to the photo root
    pub album: String,
}

impl PictureEntry {
    pub fn raw_url(&self) -> String {
        format!("{}{}", IMAGE_URL_PREFIX, self.raw_path)
    }

    pub fn preview_url(&self) -> String {
        format!("{}{}", IMAGE_URL_PREFIX, self.preview_path)
    }
}

/// A directory of pictures, ordered by file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    /// Path relative to the photo root; empty for the root itself
    pub path: String,
    pub pictures: Vec<PictureEntry>,
}

impl Album {
    pub fn file_names(&self) -> Vec<&str> {
        self.pictures.iter().map(|p| p.file_name.as_str()).collect()
    }
}

/// Leaf albums found below a prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumTree {
    /// Directory the walk started from, relative to the photo root
    pub prefix: String,
    /// Leaf album paths relative to the photo root, sorted
    pub albums: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_rooted_under_images() {
        let entry = PictureEntry {
            file_name: "a.CR2".into(),
            preview_file_name: "a-preview1.jpg".into(),
            raw_path: "2020/trip/a.CR2".into(),
            preview_path: "2020/trip/a-preview1.jpg".into(),
            album: "2020/trip".into(),
        };
        assert_eq!(entry.raw_url(), "/images/2020/trip/a.CR2");
        assert_eq!(entry.preview_url(), "/images/2020/trip/a-preview1.jpg");
    }

    #[test]
    fn album_serializes_as_plain_json() {
        let album = Album {
            path: "2021".into(),
            pictures: vec![],
        };
        let json = serde_json::to_value(&album).unwrap();
        assert_eq!(json["path"], "2021");
        assert!(json["pictures"].as_array().unwrap().is_empty());
    }
}
