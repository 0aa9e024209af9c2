//! Shared test utilities for the picturepi test suite.
//!
//! Fixture trees are built on the fly inside a `TempDir`, and archives are
//! read back with `zip::ZipArchive` so assertions work on entries, not bytes.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! touch(tmp.path(), "2020/trip/a.CR2");
//!
//! let mut out = Vec::new();
//! export_archive(tmp.path(), "2020/trip", &Selection::AllQualifying, &classifier, &mut out)?;
//! assert_eq!(entry_names(&read_zip(&out)), vec!["a.CR2"]);
//! ```

use std::fs;
use std::io::{self, Cursor, Read, Write};
use std::path::Path;

// =========================================================================
// Fixture setup
// =========================================================================

/// Write `contents` at `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, contents: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

/// Create a file whose content is its own relative path.
pub fn touch(root: &Path, rel: &str) {
    write_file(root, rel, rel.as_bytes());
}

pub fn mkdir(root: &Path, rel: &str) {
    fs::create_dir_all(root.join(rel)).unwrap();
}

#[cfg(unix)]
pub fn symlink(target: &Path, link: &Path) {
    std::os::unix::fs::symlink(target, link).unwrap();
}

// =========================================================================
// Archive inspection
// =========================================================================

#[derive(Debug)]
pub struct ZipEntry {
    pub name: String,
    pub data: Vec<u8>,
    pub mode: Option<u32>,
    pub modified: Option<zip::DateTime>,
    pub stored: bool,
}

/// Parse a complete zip archive from its central directory. Panics if it is
/// malformed.
pub fn read_zip(bytes: &[u8]) -> Vec<ZipEntry> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut file = archive.by_index(i).unwrap();
            let mut data = Vec::new();
            file.read_to_end(&mut data).unwrap();
            ZipEntry {
                name: file.name().to_string(),
                mode: file.unix_mode(),
                modified: file.last_modified(),
                stored: file.compression() == zip::CompressionMethod::Stored,
                data,
            }
        })
        .collect()
}

pub fn entry_names(entries: &[ZipEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.name.as_str()).collect()
}

// =========================================================================
// Sinks
// =========================================================================

/// Accepts `limit` bytes, then fails every write like a closed socket.
pub struct FailingSink {
    limit: usize,
    written: usize,
}

impl FailingSink {
    pub fn after(limit: usize) -> Self {
        Self { limit, written: 0 }
    }
}

impl Write for FailingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written + buf.len() > self.limit {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer went away"));
        }
        self.written += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Discards bytes, keeping only write statistics.
#[derive(Debug, Default)]
pub struct CountingSink {
    pub total: u64,
    pub writes: usize,
    pub largest_write: usize,
}

impl Write for CountingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.total += buf.len() as u64;
        self.writes += 1;
        self.largest_write = self.largest_write.max(buf.len());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
