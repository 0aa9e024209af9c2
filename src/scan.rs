//! Album discovery and album listing.
//!
//! ## Leaf Albums
//!
//! Any directory can hold pictures, but only *leaf* directories are listed as
//! albums. A directory whose subtree yields albums is a container and is never
//! listed next to its children:
//!
//! ```text
//! pictures/
//! ├── 2020/                 # container (not listed)
//! │   └── trip/             # listed as "2020/trip"
//! │       ├── IMG_0001.CR2
//! │       └── IMG_0001-preview1.jpg
//! ├── 2021/                 # listed as "2021"
//! │   └── IMG_0100.CR2
//! ├── .thumbs/              # hidden, never visited
//! └── borrowed -> /mnt/usb/photos   # followed like a real directory
//! ```
//!
//! ## Traversal
//!
//! The walk uses an explicit stack of frames instead of native recursion, so a
//! deep tree costs heap, not call stack. Siblings are visited in name order.
//! Symlinks are resolved with `fs::metadata`; a link that cannot be resolved is
//! logged and skipped. A directory whose canonical path already appears on the
//! current ancestor chain is a symlink cycle and is skipped the same way.
//! Descending past [`ScanOptions::max_depth`] fails the request.
//!
//! ## Album Contents
//!
//! [`read_album`] lists the immediate files of one album that the
//! [`Classifier`] accepts, sorted by file name, each paired with its derived
//! preview name.

use crate::classify::Classifier;
use crate::naming::{self, PathError, PreviewNaming};
use crate::types::{Album, AlbumTree, PictureEntry};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Default nesting limit below the starting directory.
pub const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Album not found: {path}")]
    AlbumNotFound {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Directory nesting exceeds {limit} levels at {path}")]
    DepthExceeded { path: String, limit: usize },
    #[error("Invalid album path: {0}")]
    Path(#[from] PathError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Maximum number of directory levels below the starting directory.
    pub max_depth: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// A subdirectory (or symlink resolving to one) found while walking.
#[derive(Debug)]
struct ChildDir {
    name: String,
    path: PathBuf,
}

/// One directory on the walk stack.
struct Frame {
    /// Path relative to the starting directory
    rel: String,
    canonical: PathBuf,
    children: std::vec::IntoIter<ChildDir>,
    /// Albums reported from this frame's subtree so far
    found: usize,
}

/// List leaf albums below `root/prefix`.
///
/// Returned paths are relative to `root/prefix` and use `/` separators. The
/// starting directory itself is never part of the result.
pub fn list_albums(
    root: &Path,
    prefix: &str,
    options: &ScanOptions,
) -> Result<Vec<String>, ScanError> {
    let prefix = naming::normalize_album_path(prefix)?;
    let start = root.join(&prefix);
    let not_found = |source| ScanError::AlbumNotFound {
        path: prefix.clone(),
        source,
    };

    let children = read_child_dirs(&start).map_err(not_found)?;
    let canonical = fs::canonicalize(&start).map_err(not_found)?;

    let mut albums = Vec::new();
    let mut stack = vec![Frame {
        rel: String::new(),
        canonical,
        children: children.into_iter(),
        found: 0,
    }];

    loop {
        let Some(frame) = stack.last_mut() else {
            break;
        };
        let Some(child) = frame.children.next() else {
            // Frame exhausted: a childless directory is itself a leaf album
            let Some(done) = stack.pop() else { break };
            if let Some(parent) = stack.last_mut() {
                if done.found == 0 {
                    debug!(album = %done.rel, "leaf album");
                    albums.push(done.rel);
                    parent.found += 1;
                } else {
                    parent.found += done.found;
                }
            }
            continue;
        };
        let rel = naming::join_relative(&frame.rel, &child.name);

        let canonical = match fs::canonicalize(&child.path) {
            Ok(c) => c,
            Err(err) => {
                warn!(path = %child.path.display(), error = %err, "failed to resolve directory, skipping");
                continue;
            }
        };
        if stack.iter().any(|f| f.canonical == canonical) {
            warn!(path = %child.path.display(), target = %canonical.display(), "symlink cycle, skipping");
            continue;
        }
        if stack.len() > options.max_depth {
            return Err(ScanError::DepthExceeded {
                path: naming::join_relative(&prefix, &rel),
                limit: options.max_depth,
            });
        }

        let grandchildren = read_child_dirs(&child.path).unwrap_or_else(|err| {
            warn!(path = %child.path.display(), error = %err, "failed to read directory");
            Vec::new()
        });
        stack.push(Frame {
            rel,
            canonical,
            children: grandchildren.into_iter(),
            found: 0,
        });
    }

    Ok(albums)
}

/// [`list_albums`] re-rooted under the prefix and sorted for display.
pub fn album_tree(root: &Path, prefix: &str, options: &ScanOptions) -> Result<AlbumTree, ScanError> {
    let prefix = naming::normalize_album_path(prefix)?;
    let mut albums: Vec<String> = list_albums(root, &prefix, options)?
        .into_iter()
        .map(|album| naming::join_relative(&prefix, &album))
        .collect();
    albums.sort();
    Ok(AlbumTree { prefix, albums })
}

/// Immediate visible subdirectories of `dir`, symlinks resolved, sorted by name.
fn read_child_dirs(dir: &Path) -> io::Result<Vec<ChildDir>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                warn!(dir = %dir.display(), error = %err, "failed to read directory entry");
                continue;
            }
        };
        let path = entry.path();
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            debug!(path = %path.display(), "skipping non UTF-8 name");
            continue;
        };
        if name.starts_with('.') {
            continue;
        }

        let file_type = match entry.file_type() {
            Ok(t) => t,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to stat entry");
                continue;
            }
        };
        let is_dir = if file_type.is_symlink() {
            match fs::metadata(&path) {
                Ok(meta) => meta.is_dir(),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "failed to resolve symlink, skipping");
                    continue;
                }
            }
        } else {
            file_type.is_dir()
        };

        if is_dir {
            dirs.push(ChildDir { name, path });
        }
    }
    dirs.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(dirs)
}

/// List the pictures in one album.
pub fn read_album(
    root: &Path,
    album: &str,
    classifier: &Classifier,
    previews: &PreviewNaming,
) -> Result<Album, ScanError> {
    let album = naming::normalize_album_path(album)?;
    let dir = root.join(&album);
    let entries = fs::read_dir(&dir).map_err(|source| ScanError::AlbumNotFound {
        path: album.clone(),
        source,
    })?;

    let mut names = Vec::new();
    for entry in entries.filter_map(|e| e.ok()) {
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if !classifier.is_picture(&name) {
            continue;
        }
        // Follows symlinks; dangling links stay listed and are skipped at export
        if fs::metadata(entry.path()).is_ok_and(|m| m.is_dir()) {
            continue;
        }
        names.push(name);
    }
    names.sort();

    let pictures = names
        .into_iter()
        .map(|file_name| {
            let preview_file_name = previews.preview_name(&file_name);
            PictureEntry {
                raw_path: naming::join_relative(&album, &file_name),
                preview_path: naming::join_relative(&album, &preview_file_name),
                file_name,
                preview_file_name,
                album: album.clone(),
            }
        })
        .collect();

    Ok(Album {
        path: album,
        pictures,
    })
}
