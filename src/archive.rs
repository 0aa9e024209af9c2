//! Streaming album export.
//!
//! Writes the files of one album into a zip archive on any [`Write`] sink,
//! one entry at a time. Every entry is stored, not deflated: raw and video
//! files are already compressed and must come back bit-identical.
//!
//! ## Streaming
//!
//! The sink is never seeked. Each entry's CRC and sizes follow its data in a
//! data descriptor, and the central directory is written once the last entry
//! is done. Each file is opened, copied through a fixed-size buffer and
//! closed before the next one is touched. Memory use is bounded by that
//! buffer, independent of album size, so the sink can be a network response.
//!
//! ## Failures
//!
//! | Situation | Outcome |
//! |-----------|---------|
//! | Album directory missing | [`ExportError::AlbumNotFound`], nothing written |
//! | A source file cannot be opened | logged, listed in [`ExportSummary::skipped`], export continues |
//! | The sink rejects a write | [`ExportError::Sink`], export stops immediately |
//! | A source file fails or shrinks mid-read | [`ExportError::Source`], no central directory is written |
//!
//! The central directory is written whenever the loop completes, including
//! after skips. After an abort nothing more reaches the sink, so the client
//! is left with a truncated archive rather than one that looks complete.

use crate::classify::Classifier;
use crate::naming::{self, PathError};
use std::cell::Cell;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, info, warn};
use zip::result::ZipError;
use zip::write::{SimpleFileOptions, StreamWriter};
use zip::{CompressionMethod, ZIP64_BYTES_THR, ZipWriter};

/// Media type of the produced archive.
pub const ARCHIVE_CONTENT_TYPE: &str = "application/zip";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Album not found: {path}")]
    AlbumNotFound {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Invalid album path: {0}")]
    Path(#[from] PathError),
    #[error("Archive output failed: {0}")]
    Sink(#[source] io::Error),
    #[error("Failed reading {name}: {source}")]
    Source {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("Archive format error: {0}")]
    Zip(#[from] ZipError),
}

impl ExportError {
    /// True when the client side went away rather than something on disk.
    pub fn is_sink(&self) -> bool {
        matches!(self, ExportError::Sink(_))
    }
}

/// Which files of an album go into the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every file the classifier accepts.
    AllQualifying,
    /// Exactly these names, classifier not consulted.
    NamedSubset(BTreeSet<String>),
}

impl Selection {
    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Selection::NamedSubset(names.into_iter().map(Into::into).collect())
    }

    pub fn accepts(&self, name: &str, classifier: &Classifier) -> bool {
        match self {
            Selection::AllQualifying => classifier.is_picture(name),
            Selection::NamedSubset(names) => names.contains(name),
        }
    }
}

/// What an export wrote.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    /// Entry names in archive order
    pub written: Vec<String>,
    /// Selected files that could not be opened
    pub skipped: Vec<String>,
    /// Total bytes handed to the sink, headers and central directory included
    pub bytes: u64,
}

/// Sink state shared between the export loop and the zip writer owning the sink.
#[derive(Debug, Default)]
struct SinkState {
    /// A write or flush on the real sink failed
    failed: Cell<bool>,
    /// Further bytes are discarded instead of written
    closed: Cell<bool>,
    bytes: Cell<u64>,
}

impl SinkState {
    fn close(&self) {
        self.closed.set(true);
    }
}

/// Counts bytes and remembers whether the wrapped sink failed, so a failed
/// entry can be attributed to the output side or the source file.
struct TrackedSink<W> {
    inner: W,
    state: Rc<SinkState>,
}

impl<W> TrackedSink<W> {
    fn fail(&self) {
        self.state.failed.set(true);
        self.state.close();
    }
}

impl<W: Write> Write for TrackedSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // The zip writer still finalizes when dropped after an abort
        if self.state.closed.get() {
            return Ok(buf.len());
        }
        match self.inner.write(buf) {
            Ok(n) => {
                self.state.bytes.set(self.state.bytes.get() + n as u64);
                Ok(n)
            }
            Err(err) => {
                if err.kind() != io::ErrorKind::Interrupted {
                    self.fail();
                }
                Err(err)
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.state.closed.get() {
            return Ok(());
        }
        self.inner.flush().inspect_err(|_| self.fail())
    }
}

/// Stream the selected files of `root/album` into `sink` as a zip archive.
///
/// Only the album's immediate files are considered, in file-name order.
/// Directories and other non-regular entries are ignored.
pub fn export_archive<W: Write>(
    root: &Path,
    album: &str,
    selection: &Selection,
    classifier: &Classifier,
    sink: W,
) -> Result<ExportSummary, ExportError> {
    let album = naming::normalize_album_path(album)?;
    let dir = root.join(&album);
    let mut names: Vec<String> = fs::read_dir(&dir)
        .map_err(|source| ExportError::AlbumNotFound {
            path: album.clone(),
            source,
        })?
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .filter(|name| selection.accepts(name, classifier))
        .collect();
    names.sort();

    let state = Rc::new(SinkState::default());
    let mut zip = ZipWriter::new_stream(TrackedSink {
        inner: sink,
        state: Rc::clone(&state),
    });
    let mut summary = ExportSummary::default();

    for name in names {
        let path = dir.join(&name);
        match fs::metadata(&path) {
            Ok(meta) if !meta.is_file() => {
                debug!(path = %path.display(), "not a regular file, skipping");
                continue;
            }
            _ => {}
        }

        let mut file = match File::open(&path) {
            Ok(f) => f,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "cannot open file, leaving it out of the archive");
                summary.skipped.push(name);
                continue;
            }
        };
        let meta = match file.metadata() {
            Ok(m) => m,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "cannot stat file, leaving it out of the archive");
                summary.skipped.push(name);
                continue;
            }
        };

        if let Err(err) = append_file(&mut zip, &name, &mut file, &meta) {
            state.close();
            return Err(if state.failed.get() {
                ExportError::Sink(err)
            } else {
                ExportError::Source { name, source: err }
            });
        }
        debug!(file = %name, size = meta.len(), "archived");
        summary.written.push(name);
        // `file` is dropped here, before the next entry is opened
    }

    let mut sink = zip
        .finish()
        .map_err(|err| {
            state.close();
            if state.failed.get() {
                ExportError::Sink(err.into())
            } else {
                ExportError::Zip(err)
            }
        })?
        .into_inner();
    sink.flush().map_err(ExportError::Sink)?;
    summary.bytes = state.bytes.get();

    info!(
        album = %album,
        written = summary.written.len(),
        skipped = summary.skipped.len(),
        bytes = summary.bytes,
        "archive complete"
    );
    Ok(summary)
}

/// Add one stored entry carrying the file's mtime and permission bits.
fn append_file<W: Write>(
    zip: &mut ZipWriter<StreamWriter<W>>,
    name: &str,
    file: &mut File,
    meta: &fs::Metadata,
) -> io::Result<()> {
    let mut options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .unix_permissions(permission_bits(meta))
        .large_file(meta.len() >= ZIP64_BYTES_THR);
    if let Some(mtime) = modified_time(meta) {
        options = options.last_modified_time(mtime);
    }
    zip.start_file(name, options)?;
    copy_exact(file, meta.len(), zip)
}

/// Copy exactly `len` bytes from `src`, failing if it ends early.
fn copy_exact<R: Read, W: Write>(src: R, len: u64, dst: &mut W) -> io::Result<()> {
    let copied = io::copy(&mut src.take(len), dst)?;
    if copied < len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("file shrank while archiving: expected {len} bytes, read {copied}"),
        ));
    }
    Ok(())
}

/// Zip timestamps are MS-DOS local fields; UTC is written so output does not
/// depend on the server's time zone. Out-of-range times fall back to the
/// zip writer's default.
fn modified_time(meta: &fs::Metadata) -> Option<zip::DateTime> {
    let modified: chrono::DateTime<chrono::Utc> = meta.modified().ok()?.into();
    zip::DateTime::try_from(modified.naive_utc()).ok()
}

#[cfg(unix)]
fn permission_bits(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode()
}

#[cfg(not(unix))]
fn permission_bits(meta: &fs::Metadata) -> u32 {
    if meta.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}
