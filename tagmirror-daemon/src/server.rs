//! Static HTTP view of the store.
//!
//! `GET /` and `GET /<path>` resolve under the store root. Directories render
//! as HTML listings; files are returned whole with a content type taken from
//! their extension. `*.gz` files are decompressed before serving.

use std::fs;
use std::io::{ErrorKind, Read};
use std::path::{Component, Path as FsPath, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use tower_http::trace::TraceLayer;

use tagmirror_core::{MirrorConfig, Repository};
use tagmirror_renderer::{ListingContext, ListingEntry, Renderer};

use crate::error::ServeError;

/// Upper bound on the decompressed size of a served `.gz` file.
pub const MAX_DECOMPRESSED_BYTES: u64 = 50 * 1024 * 1024;

const DEFAULT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Shared, read-only state of the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    store_root: Arc<PathBuf>,
    renderer: Arc<Renderer>,
    interval_minutes: u64,
    repositories: Arc<Vec<Repository>>,
}

impl AppState {
    pub fn new(
        store_root: impl Into<PathBuf>,
        renderer: Renderer,
        interval_minutes: u64,
        repositories: Vec<Repository>,
    ) -> Self {
        AppState {
            store_root: Arc::new(store_root.into()),
            renderer: Arc::new(renderer),
            interval_minutes,
            repositories: Arc::new(repositories),
        }
    }

    pub fn from_config(config: &MirrorConfig, renderer: Renderer) -> Self {
        Self::new(
            config.store_root.clone(),
            renderer,
            config.interval_minutes,
            config.repositories.clone(),
        )
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(serve_root))
        .route("/*path", get(serve_path))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn serve_root(State(state): State<AppState>) -> Response {
    serve(state, String::new()).await
}

async fn serve_path(State(state): State<AppState>, Path(path): Path<String>) -> Response {
    serve(state, path).await
}

async fn serve(state: AppState, request_path: String) -> Response {
    tracing::debug!(path = %request_path, "request");
    tokio::task::spawn_blocking(move || respond(&state, &request_path))
        .await
        .unwrap_or(Err(ServeError::Join))
        .unwrap_or_else(IntoResponse::into_response)
}

/// Blocking body of every request.
pub fn respond(state: &AppState, request_path: &str) -> Result<Response, ServeError> {
    let target = resolve(&state.store_root, request_path).ok_or(ServeError::NotFound)?;
    let meta = fs::metadata(&target).map_err(|err| match err.kind() {
        ErrorKind::NotFound | ErrorKind::NotADirectory => ServeError::NotFound,
        _ => ServeError::Read(err),
    })?;

    if meta.is_dir() {
        let html = render_listing(state, &target, request_path)?;
        return Ok(Html(html).into_response());
    }

    let (content, ext) = read_file(&target)?;
    Ok((
        [(header::CONTENT_TYPE, content_type_for(&ext))],
        content,
    )
        .into_response())
}

/// Map a request path to a location under `root`.
///
/// Only plain components are accepted; `..`, a root or a drive prefix yields
/// `None`, so nothing outside `root` is ever reachable.
pub fn resolve(root: &FsPath, request_path: &str) -> Option<PathBuf> {
    let mut resolved = root.to_path_buf();
    for component in FsPath::new(request_path.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(resolved)
}

fn render_listing(state: &AppState, dir: &FsPath, request_path: &str) -> Result<String, ServeError> {
    let entries = fs::read_dir(dir).map_err(ServeError::ReadDir)?;

    let mut listing = Vec::new();
    for entry in entries {
        let entry = entry.map_err(ServeError::ReadDir)?;
        let Ok(meta) = entry.metadata() else {
            tracing::debug!(path = %entry.path().display(), "skipping entry without metadata");
            continue;
        };
        let modified = meta
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| DateTime::<Utc>::from(UNIX_EPOCH));
        listing.push(ListingEntry::new(
            request_path,
            entry.file_name().to_string_lossy(),
            meta.is_dir(),
            meta.len(),
            modified,
        ));
    }

    let ctx = ListingContext::new(
        request_path,
        listing,
        state.interval_minutes,
        &state.repositories,
    );
    state.renderer.render_listing(&ctx).map_err(ServeError::Render)
}

/// Read a file for serving. Returns the bytes and the lowercase extension
/// that decides the content type; for `x.json.gz` that is `json`.
fn read_file(path: &FsPath) -> Result<(Vec<u8>, String), ServeError> {
    let ext = lowercase_extension(path);
    if ext != "gz" {
        let content = fs::read(path).map_err(ServeError::Read)?;
        return Ok((content, ext));
    }

    let file = fs::File::open(path).map_err(ServeError::Open)?;
    let mut content = Vec::new();
    GzDecoder::new(file)
        .take(MAX_DECOMPRESSED_BYTES + 1)
        .read_to_end(&mut content)
        .map_err(ServeError::Decompress)?;
    if content.len() as u64 > MAX_DECOMPRESSED_BYTES {
        return Err(ServeError::TooLarge);
    }

    let inner = path.file_stem().map(PathBuf::from).unwrap_or_default();
    Ok((content, lowercase_extension(&inner)))
}

fn lowercase_extension(path: &FsPath) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

/// Content type for a lowercase extension without the dot.
pub fn content_type_for(ext: &str) -> &'static str {
    match ext {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" => "application/javascript",
        "json" => "application/json",
        "xml" | "junit" => "text/xml; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "zip" | "tar" | "tgz" => "application/octet-stream",
        _ => DEFAULT_CONTENT_TYPE,
    }
}
