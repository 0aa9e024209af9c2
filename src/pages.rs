//! HTML rendering for the browsing interface.
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating, so
//! album and file names are escaped on interpolation.
//!
//! ## Pages
//!
//! - **Album index** (`/`, `/list`): every leaf album as a link
//! - **Album page** (`/photos/{album}`): preview grid inside a plain form.
//!   Each picture has a `selectedFiles` checkbox; submitting posts the form to
//!   `/zipSelected` and the browser saves the streamed attachment directly.
//!   A "download all" link points at `/zip`.
//!
//! Previews are referenced by their derived names. Whether the file exists is
//! the browser's concern; a missing preview shows as a broken image.

use crate::naming;
use crate::types::{Album, AlbumTree};
use maud::{DOCTYPE, Markup, PreEscaped, html};

const CSS: &str = r#"
body { font-family: system-ui, sans-serif; margin: 1.5rem; background: #111; color: #eee; }
a { color: #9cf; }
ul.albums { list-style: none; padding: 0; columns: 3 16rem; }
ul.albums li { margin: 0.25rem 0; }
.grid { display: flex; flex-wrap: wrap; gap: 0.75rem; }
.thumbnail { width: 160px; border: 2px solid transparent; padding: 2px; }
.thumbnail:has(input:checked) { border-color: #9cf; }
.thumbnail img { width: 160px; height: 120px; object-fit: cover; display: block; }
.fileName { font-size: 0.8rem; word-break: break-all; }
.actions { margin: 1rem 0; display: flex; gap: 1rem; align-items: center; }
"#;

fn base_document(title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(CSS)) }
            }
            body {
                (content)
            }
        }
    }
}

/// Percent-encode a relative path for use in a URL, keeping `/`.
fn url_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for byte in path.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Renders the list of leaf albums
pub fn render_index(tree: &AlbumTree) -> Markup {
    let content = html! {
        h1 { "Albums" }
        @if tree.albums.is_empty() {
            p { "No albums found." }
        } @else {
            ul.albums {
                @for album in &tree.albums {
                    li {
                        a href={ "/photos/" (url_path(album)) } { (album) }
                    }
                }
            }
        }
    };
    base_document("Albums", content)
}

/// Renders one album as a selectable preview grid
pub fn render_album(album: &Album, archive_prefix: &str) -> Markup {
    let archive_name = naming::archive_file_name(archive_prefix, &album.path);
    let title = if album.path.is_empty() {
        "Photos"
    } else {
        album.path.as_str()
    };

    let content = html! {
        nav { a href="/" { "All albums" } }
        h1 { (title) }
        form method="post" action="/zipSelected" {
            input type="hidden" name="path" value=(album.path);
            div.actions {
                a href={ "/zip?path=" (url_path(&album.path)) } download=(archive_name) {
                    "Download all (" (album.pictures.len()) ")"
                }
                button type="submit" { "Download selected" }
            }
            div.grid {
                @for picture in &album.pictures {
                    label.thumbnail {
                        img src=(url_path(&picture.preview_url())) alt=(picture.file_name) loading="lazy";
                        input type="checkbox" name="selectedFiles" value=(picture.file_name);
                        span.fileName {
                            a href=(url_path(&picture.raw_url())) { (picture.file_name) }
                        }
                    }
                }
            }
        }
    };
    base_document(title, content)
}
