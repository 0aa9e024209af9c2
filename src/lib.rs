//! # picturepi
//!
//! Serves a directory tree of raw photos and videos as a browsable gallery and
//! lets a client download a whole album, or a hand-picked part of one, as a
//! single archive.
//!
//! # Architecture
//!
//! Two operations do the real work; everything else is plumbing around them:
//!
//! ```text
//! list    photo root  →  leaf albums          (scan::list_albums)
//! export  one album   →  zip stream on a sink (archive::export_archive)
//! ```
//!
//! Both filter files through the same [`classify::Classifier`], so a picture
//! shown in the gallery is always part of "download all" and nothing else is.
//! Every call builds its result from a fresh filesystem read; there is no
//! cache and no shared mutable state, so concurrent requests never interact.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`classify`] | Picture Classifier: case-sensitive suffix match |
//! | [`naming`] | Preview names, album path normalisation, archive file names |
//! | [`types`] | `PictureEntry`, `Album`, `AlbumTree` |
//! | [`scan`] | Leaf album discovery and single-album listing |
//! | [`archive`] | Streaming zip export with two selection modes |
//! | [`config`] | `GalleryConfig` loaded from TOML over stock defaults |
//! | [`server`] | axum routes, streaming response bridge |
//! | [`pages`] | maud HTML for the album index and album grid |
//! | [`output`] | CLI text output |
//!
//! # Design Decisions
//!
//! ## Zip, Stored
//!
//! Raw and video files are already compressed, so entries are stored
//! verbatim with their mtime and permission bits. Sizes and CRCs go into data
//! descriptors after each entry, which lets the archive be written to a
//! socket front to back without seeking.
//!
//! ## Errors Stay With Their Request
//!
//! A missing album, an unreadable file or a client hanging up mid-download is
//! reported to that one request. An unreadable file inside an album is left
//! out of the archive and the rest is still delivered.
//!
//! ## Symlinks Are Directories Too
//!
//! Photo roots often link in external drives. Links are followed during
//! discovery; broken links and cycles back into the current path are skipped.

pub mod archive;
pub mod classify;
pub mod config;
pub mod naming;
pub mod output;
pub mod pages;
pub mod scan;
pub mod server;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
