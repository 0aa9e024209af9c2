//! HTTP front end.
//!
//! Thin axum layer over [`scan`](crate::scan) and [`archive`](crate::archive):
//!
//! | Route | Response |
//! |-------|----------|
//! | `GET /`, `GET /list` | HTML album index |
//! | `GET /photos/{album}` | HTML preview grid for one album, `/photos/` for the root |
//! | `GET /api/albums` | album index as JSON |
//! | `GET /api/photos/{album}` | one album as JSON |
//! | `GET /zip?path={album}` | zip of every picture in the album |
//! | `POST /zipSelected` | zip of the files named in the form body |
//!
//! `/zipSelected` takes an ordinary form post (`path` plus one `selectedFiles`
//! field per file), so the browser saves the attachment straight to disk as
//! it arrives.
//! | `GET /images/{path}` | raw and preview files from the photo root |
//!
//! ## Streaming Exports
//!
//! The archive writer is synchronous, so each export runs on the blocking
//! pool and writes into a [`ChannelWriter`]. The writer hands fixed-size
//! chunks to a bounded channel that backs the response body. When the client
//! disconnects the receiver is dropped, the next write fails with
//! `BrokenPipe`, and the export stops. Other requests are unaffected.

use crate::archive::{ARCHIVE_CONTENT_TYPE, ExportError, ExportSummary, Selection, export_archive};
use crate::classify::Classifier;
use crate::config::GalleryConfig;
use crate::naming;
use crate::pages;
use crate::scan::{self, ScanError};
use crate::types::{Album, AlbumTree};
use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{Path as UrlPath, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::Form;
use serde::Deserialize;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info, warn};

/// Size of each chunk handed to the response body.
const CHUNK_SIZE: usize = 64 * 1024;
/// Chunks buffered between the export thread and the socket.
const CHANNEL_DEPTH: usize = 4;

#[derive(Clone)]
pub struct AppState {
    config: Arc<GalleryConfig>,
    classifier: Arc<Classifier>,
}

impl AppState {
    pub fn new(config: GalleryConfig) -> Self {
        let classifier = Arc::new(config.classifier());
        Self {
            config: Arc::new(config),
            classifier,
        }
    }
}

/// Request-scoped failure, rendered as a JSON error body.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl From<ScanError> for ApiError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::AlbumNotFound { .. } => ApiError::NotFound(err.to_string()),
            ScanError::Path(_) => ApiError::BadRequest(err.to_string()),
            ScanError::DepthExceeded { .. } => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<naming::PathError> for ApiError {
    fn from(err: naming::PathError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => {
                error!(error = %msg, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    let images = ServeDir::new(state.config.photo_root.clone());

    Router::new()
        .route("/", get(album_index))
        .route("/list", get(album_index))
        .route("/photos", get(root_album_page))
        .route("/photos/", get(root_album_page))
        .route("/photos/*album", get(album_page))
        .route("/api/albums", get(album_index_json))
        .route("/api/photos", get(root_album_json))
        .route("/api/photos/", get(root_album_json))
        .route("/api/photos/*album", get(album_json))
        .route("/zip", get(zip_all))
        .route("/zipSelected", post(zip_selected))
        .nest_service("/images", images)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `config.listen` and serve until Ctrl-C.
pub async fn serve(config: GalleryConfig) -> io::Result<()> {
    let listener = tokio::net::TcpListener::bind(&config.listen).await?;
    info!(
        addr = %listener.local_addr()?,
        root = %config.photo_root.display(),
        "picturepi listening"
    );
    axum::serve(listener, router(AppState::new(config)))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

/// Run blocking filesystem work off the async workers.
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| ApiError::Internal(format!("worker failed: {err}")))?
}

async fn load_tree(state: &AppState) -> Result<AlbumTree, ApiError> {
    let config = state.config.clone();
    blocking(move || {
        Ok(scan::album_tree(
            &config.photo_root,
            "",
            &config.scan_options(),
        )?)
    })
    .await
}

async fn load_album(state: &AppState, album: String) -> Result<Album, ApiError> {
    let config = state.config.clone();
    let classifier = state.classifier.clone();
    blocking(move || {
        Ok(scan::read_album(
            &config.photo_root,
            &album,
            &classifier,
            &config.previews,
        )?)
    })
    .await
}

async fn album_index(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let tree = load_tree(&state).await?;
    Ok(Html(pages::render_index(&tree).into_string()))
}

async fn album_index_json(State(state): State<AppState>) -> Result<Json<AlbumTree>, ApiError> {
    Ok(Json(load_tree(&state).await?))
}

async fn album_page(
    State(state): State<AppState>,
    UrlPath(album): UrlPath<String>,
) -> Result<Html<String>, ApiError> {
    let album = load_album(&state, album).await?;
    Ok(Html(
        pages::render_album(&album, &state.config.archive.name_prefix).into_string(),
    ))
}

async fn root_album_page(state: State<AppState>) -> Result<Html<String>, ApiError> {
    album_page(state, UrlPath(String::new())).await
}

async fn root_album_json(state: State<AppState>) -> Result<Json<Album>, ApiError> {
    album_json(state, UrlPath(String::new())).await
}

async fn album_json(
    State(state): State<AppState>,
    UrlPath(album): UrlPath<String>,
) -> Result<Json<Album>, ApiError> {
    Ok(Json(load_album(&state, album).await?))
}

#[derive(Debug, Deserialize)]
pub struct ZipQuery {
    #[serde(default)]
    pub path: String,
}

/// Form body of `POST /zipSelected`, e.g. `path=2020/trip&selectedFiles=a.CR2&selectedFiles=b.MOV`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZipSelectedForm {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub selected_files: Vec<String>,
}

async fn zip_all(
    State(state): State<AppState>,
    Query(query): Query<ZipQuery>,
) -> Result<Response, ApiError> {
    stream_export(state, &query.path, Selection::AllQualifying).await
}

async fn zip_selected(
    State(state): State<AppState>,
    Form(form): Form<ZipSelectedForm>,
) -> Result<Response, ApiError> {
    if form.selected_files.is_empty() {
        return Err(ApiError::BadRequest("No files selected".to_string()));
    }
    stream_export(state, &form.path, Selection::named(form.selected_files)).await
}

async fn stream_export(
    state: AppState,
    raw_path: &str,
    selection: Selection,
) -> Result<Response, ApiError> {
    let album = naming::normalize_album_path(raw_path)?;
    let dir = state.config.photo_root.join(&album);
    // Checked up front: once the body starts streaming the status is fixed
    let is_dir = tokio::fs::metadata(&dir).await.is_ok_and(|m| m.is_dir());
    if !is_dir {
        return Err(ApiError::NotFound(format!("Album not found: {album}")));
    }

    let file_name = naming::archive_file_name(&state.config.archive.name_prefix, &album);
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        header_safe(&file_name)
    ))
    .map_err(|err| ApiError::Internal(err.to_string()))?;

    let (tx, rx) = mpsc::channel::<io::Result<Bytes>>(CHANNEL_DEPTH);
    let root = state.config.photo_root.clone();
    let classifier = state.classifier.clone();
    let task_album = album.clone();
    tokio::task::spawn_blocking(move || {
        let mut writer = ChannelWriter::new(tx.clone());
        let result = export_archive(&root, &task_album, &selection, &classifier, &mut writer);
        finish_stream(&task_album, result, &tx);
    });

    info!(album = %album, file = %file_name, "streaming archive");
    let headers = [
        (
            header::CONTENT_TYPE,
            HeaderValue::from_static(ARCHIVE_CONTENT_TYPE),
        ),
        (header::CONTENT_DISPOSITION, disposition),
    ];
    Ok((headers, Body::from_stream(ReceiverStream::new(rx))).into_response())
}

/// Log how an export ended. Failures other than a vanished client are pushed
/// into the body, so the client sees a truncated transfer instead of an
/// archive that merely ends early.
fn finish_stream(
    album: &str,
    result: Result<ExportSummary, ExportError>,
    tx: &mpsc::Sender<io::Result<Bytes>>,
) {
    match result {
        Ok(summary) if !summary.skipped.is_empty() => {
            warn!(album = %album, skipped = ?summary.skipped, "archive sent with files missing");
        }
        Ok(_) => {}
        Err(err @ ExportError::Sink(_)) => {
            warn!(album = %album, error = %err, "client went away, export aborted");
        }
        Err(err) => {
            error!(album = %album, error = %err, "export failed mid-stream");
            let _ = tx.blocking_send(Err(io::Error::other(err.to_string())));
        }
    }
}

/// Replace characters that cannot appear inside a quoted header value.
fn header_safe(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_graphic() && c != '"' && c != '\\' || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `io::Write` adapter feeding a streaming response body.
///
/// Bytes are collected into [`CHUNK_SIZE`] chunks and sent with
/// `blocking_send`, so it must only be used from a blocking thread. A closed
/// receiver turns into `BrokenPipe`.
pub struct ChannelWriter {
    tx: mpsc::Sender<io::Result<Bytes>>,
    buf: Vec<u8>,
}

impl ChannelWriter {
    pub fn new(tx: mpsc::Sender<io::Result<Bytes>>) -> Self {
        Self {
            tx,
            buf: Vec::with_capacity(CHUNK_SIZE),
        }
    }

    fn send_chunk(&mut self) -> io::Result<()> {
        let chunk = std::mem::replace(&mut self.buf, Vec::with_capacity(CHUNK_SIZE));
        self.tx
            .blocking_send(Ok(Bytes::from(chunk)))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "response body dropped"))
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let n = (CHUNK_SIZE - self.buf.len()).min(data.len());
        self.buf.extend_from_slice(&data[..n]);
        if self.buf.len() >= CHUNK_SIZE {
            self.send_chunk()?;
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        self.send_chunk()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_writer_chunks_and_flushes() {
        let (tx, mut rx) = mpsc::channel(16);
        let handle = std::thread::spawn(move || {
            let mut writer = ChannelWriter::new(tx);
            writer.write_all(&vec![7u8; CHUNK_SIZE + 10]).unwrap();
            writer.flush().unwrap();
        });
        handle.join().unwrap();

        let first = rx.blocking_recv().unwrap().unwrap();
        let second = rx.blocking_recv().unwrap().unwrap();
        assert_eq!(first.len(), CHUNK_SIZE);
        assert_eq!(second.len(), 10);
        assert!(rx.blocking_recv().is_none());
    }

    #[test]
    fn channel_writer_reports_closed_receiver() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let mut writer = ChannelWriter::new(tx);
        writer.write_all(b"partial").unwrap();
        let err = writer.flush().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    async fn collect(rx: mpsc::Receiver<io::Result<Bytes>>) -> Result<Bytes, axum::Error> {
        axum::body::to_bytes(Body::from_stream(ReceiverStream::new(rx)), usize::MAX).await
    }

    #[tokio::test]
    async fn failure_after_headers_fails_the_body() {
        let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
        tokio::task::spawn_blocking(move || {
            let mut writer = ChannelWriter::new(tx.clone());
            writer.write_all(b"PK\x03\x04partial entry").unwrap();
            writer.flush().unwrap();
            let err = ExportError::Source {
                name: "a.CR2".into(),
                source: io::Error::new(io::ErrorKind::UnexpectedEof, "file shrank"),
            };
            finish_stream("2020/trip", Err(err), &tx);
        })
        .await
        .unwrap();

        assert!(collect(rx).await.is_err());
    }

    #[tokio::test]
    async fn vanished_client_adds_nothing_to_the_body() {
        let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
        tokio::task::spawn_blocking(move || {
            let err = ExportError::Sink(io::Error::from(io::ErrorKind::BrokenPipe));
            finish_stream("2020/trip", Err(err), &tx);
        })
        .await
        .unwrap();

        assert!(collect(rx).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn completed_export_body_collects() {
        let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
        tokio::task::spawn_blocking(move || {
            let mut writer = ChannelWriter::new(tx.clone());
            writer.write_all(b"whole archive").unwrap();
            writer.flush().unwrap();
            finish_stream("2020/trip", Ok(ExportSummary::default()), &tx);
        })
        .await
        .unwrap();

        assert_eq!(collect(rx).await.unwrap(), Bytes::from_static(b"whole archive"));
    }

    #[test]
    fn header_safe_replaces_quotes_and_non_ascii() {
        assert_eq!(header_safe("photos-a\"b.zip"), "photos-a_b.zip");
        assert_eq!(header_safe("photos-été.zip"), "photos-_t_.zip");
        assert_eq!(header_safe("photos-my trip.zip"), "photos-my trip.zip");
    }

    #[test]
    fn scan_errors_map_to_statuses() {
        let not_found = ScanError::AlbumNotFound {
            path: "x".into(),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert!(matches!(ApiError::from(not_found), ApiError::NotFound(_)));

        let bad = ScanError::Path(naming::PathError::Traversal("..".into()));
        assert!(matches!(ApiError::from(bad), ApiError::BadRequest(_)));

        let deep = ScanError::DepthExceeded {
            path: "a".into(),
            limit: 1,
        };
        let response = ApiError::from(deep).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
