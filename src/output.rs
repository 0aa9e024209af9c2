//! CLI output formatting.
//!
//! Each command has a `format_*` function returning lines, for testability,
//! and a `print_*` wrapper writing them to stdout. Format functions do no I/O.
//!
//! # Output Format
//!
//! ## list
//!
//! ```text
//! Albums
//! 001 2020/trip
//! 002 2021
//!
//! 2 albums
//! ```
//!
//! ## album
//!
//! ```text
//! 2020/trip (2 pictures)
//! 001 IMG_0001.CR2
//!     Preview: IMG_0001-preview1.jpg
//! 002 MVI_0002.MOV
//!     Preview: MVI_0002-preview1.jpg
//! ```
//!
//! ## export
//!
//! ```text
//! photos-2020-trip.zip: 2 files, 48213 bytes
//!     Skipped: broken.CR2
//! ```
//!
//! Export output goes to stderr, since the archive itself may be on stdout.

use crate::archive::ExportSummary;
use crate::types::{Album, AlbumTree};

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

pub fn format_album_list(tree: &AlbumTree) -> Vec<String> {
    let mut lines = vec!["Albums".to_string()];
    for (i, album) in tree.albums.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), album));
    }
    lines.push(String::new());
    lines.push(plural(tree.albums.len(), "album"));
    lines
}

pub fn format_album(album: &Album) -> Vec<String> {
    let title = if album.path.is_empty() {
        "(root)"
    } else {
        album.path.as_str()
    };
    let mut lines = vec![format!(
        "{} ({})",
        title,
        plural(album.pictures.len(), "picture")
    )];
    for (i, picture) in album.pictures.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), picture.file_name));
        lines.push(format!("    Preview: {}", picture.preview_file_name));
    }
    lines
}

pub fn format_export_summary(file_name: &str, summary: &ExportSummary) -> Vec<String> {
    let mut lines = vec![format!(
        "{}: {}, {} bytes",
        file_name,
        plural(summary.written.len(), "file"),
        summary.bytes
    )];
    for skipped in &summary.skipped {
        lines.push(format!("    Skipped: {skipped}"));
    }
    lines
}

pub fn print_album_list(tree: &AlbumTree) {
    for line in format_album_list(tree) {
        println!("{line}");
    }
}

pub fn print_album(album: &Album) {
    for line in format_album(album) {
        println!("{line}");
    }
}

pub fn print_export_summary(file_name: &str, summary: &ExportSummary) {
    for line in format_export_summary(file_name, summary) {
        eprintln!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PictureEntry;

    #[test]
    fn album_list_is_numbered() {
        let tree = AlbumTree {
            prefix: String::new(),
            albums: vec!["2020/trip".into(), "2021".into()],
        };
        assert_eq!(
            format_album_list(&tree),
            vec!["Albums", "001 2020/trip", "002 2021", "", "2 albums"]
        );
    }

    #[test]
    fn single_album_count_is_singular() {
        let tree = AlbumTree {
            prefix: String::new(),
            albums: vec!["only".into()],
        };
        assert_eq!(format_album_list(&tree).last().unwrap(), "1 album");
    }

    #[test]
    fn album_shows_previews() {
        let album = Album {
            path: "2021".into(),
            pictures: vec![PictureEntry {
                file_name: "a.CR2".into(),
                preview_file_name: "a-preview1.jpg".into(),
                raw_path: "2021/a.CR2".into(),
                preview_path: "2021/a-preview1.jpg".into(),
                album: "2021".into(),
            }],
        };
        assert_eq!(
            format_album(&album),
            vec!["2021 (1 picture)", "001 a.CR2", "    Preview: a-preview1.jpg"]
        );
    }

    #[test]
    fn root_album_title() {
        let album = Album {
            path: String::new(),
            pictures: vec![],
        };
        assert_eq!(format_album(&album), vec!["(root) (0 pictures)"]);
    }

    #[test]
    fn export_summary_lists_skipped() {
        let summary = ExportSummary {
            written: vec!["a.CR2".into(), "b.MOV".into()],
            skipped: vec!["c.CR2".into()],
            bytes: 4096,
        };
        assert_eq!(
            format_export_summary("photos-x.zip", &summary),
            vec!["photos-x.zip: 2 files, 4096 bytes", "    Skipped: c.CR2"]
        );
    }
}
