//! Gallery HTTP server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/gallery?keyword=&tags=&folders=` | Full page, first page of items |
//! | `GET`  | `/items?offset=&keyword=&tags=&folders=` | Items fragment for infinite scroll |
//! | `GET`  | `/img/{item_id}?fq=true` | Thumbnail, or the original with `fq=true` |
//! | `POST` | `/upload` | Multipart PNG upload (field `file`) |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! Errors are plain-text bodies carrying the error message. Image resolution
//! failures are `400` with `get thumbnail path=<path> err=<message>`; library
//! service failures on page routes are `500`. Render failures are reported
//! as `500 failed to render template` and logged at `error`, since they mean
//! the templates and the model disagree.

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, Query, Request, State},
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::GalleryError;
use crate::gallery::assemble_gallery;
use crate::library::{EagleClient, LibraryClient};
use crate::models::ItemListOptions;
use crate::query::{build_filter, first_value};
use crate::reload::spawn_template_watcher;
use crate::render::{embedded_templates, load_templates, render, RenderTarget, TemplateStore};
use crate::resolve::{content_type_for, resolve_display_path};
use crate::upload::process_upload;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Immutable process-wide configuration.
    pub config: Arc<Config>,
    /// Client for the library service.
    pub library: Arc<dyn LibraryClient>,
    /// Current template snapshot, swapped by the reload watcher.
    pub templates: Arc<TemplateStore>,
}

impl AppState {
    /// State with the embedded templates.
    pub fn new(config: Config, library: Arc<dyn LibraryClient>) -> anyhow::Result<Self> {
        Ok(Self {
            config: Arc::new(config),
            library,
            templates: Arc::new(TemplateStore::new(embedded_templates()?)),
        })
    }
}

/// Starts the gallery server.
///
/// Binds to `[server].bind`, loads templates (from `[templates].dir` when set,
/// embedded otherwise) and, if `[templates].watch` is on, keeps reloading them
/// while the server runs.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let library = Arc::new(EagleClient::new(&config.library)?);

    let templates = match &config.templates.dir {
        Some(dir) => load_templates(dir)?,
        None => embedded_templates()?,
    };
    let templates = Arc::new(TemplateStore::new(templates));

    let _watcher = match (&config.templates.dir, config.templates.watch) {
        (Some(dir), true) => Some(spawn_template_watcher(dir.clone(), templates.clone())?),
        _ => None,
    };

    tracing::info!("Library service at {}", library.base_url());

    let state = AppState {
        config: Arc::new(config.clone()),
        library,
        templates,
    };
    let app = build_router(state);

    tracing::info!("Gallery listening on http://{}/gallery", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the router with all gallery routes.
pub fn build_router(state: AppState) -> Router {
    // Multipart framing adds a little on top of the file itself.
    let upload_limit = state.config.upload.max_bytes + 64 * 1024;

    Router::new()
        .route("/gallery", get(handle_gallery))
        .route("/items", get(handle_items))
        .route("/img/", get(handle_missing_item_id))
        .route("/img/{item_id}", get(handle_image))
        .route(
            "/upload",
            post(handle_upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============ Error response ============

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::debug!(status = %self.status, code = self.code, "request failed");
        (self.status, self.message).into_response()
    }
}

impl AppError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

/// Maps errors from the page routes. Render errors are defects and get
/// logged louder than upstream trouble.
fn page_error(err: GalleryError) -> AppError {
    if err.is_defect() {
        tracing::error!(code = err.code(), "template render failed: {}", err);
        return AppError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            err.code(),
            "failed to render template",
        );
    }
    tracing::warn!(code = err.code(), "{}", err);
    AppError::new(StatusCode::INTERNAL_SERVER_ERROR, err.code(), err.to_string())
}

fn image_error(path: &str, err: impl std::fmt::Display, code: &'static str) -> AppError {
    tracing::warn!(code, path, "{}", err);
    AppError::new(
        StatusCode::BAD_REQUEST,
        code,
        format!("get thumbnail path={} err={}", path, err),
    )
}

fn upload_error(err: GalleryError) -> AppError {
    let status = match err {
        GalleryError::UnsupportedMedia(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::warn!(code = err.code(), "upload failed: {}", err);
    AppError::new(status, err.code(), err.to_string())
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    /// The crate version from `Cargo.toml`.
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /gallery, GET /items ============

/// Handler for `GET /gallery`. Always the first page; any `offset` is ignored.
async fn handle_gallery(
    State(state): State<AppState>,
    Query(raw): Query<Vec<(String, String)>>,
) -> Result<Html<String>, AppError> {
    let mut filter = build_filter(&raw, &state.config.gallery);
    filter.offset = 0;
    render_page(&state, filter, RenderTarget::FullGallery).await
}

/// Handler for `GET /items`. The offset doubles as the page index.
async fn handle_items(
    State(state): State<AppState>,
    Query(raw): Query<Vec<(String, String)>>,
) -> Result<Html<String>, AppError> {
    let filter = build_filter(&raw, &state.config.gallery);
    render_page(&state, filter, RenderTarget::ItemsFragment).await
}

async fn render_page(
    state: &AppState,
    filter: ItemListOptions,
    target: RenderTarget,
) -> Result<Html<String>, AppError> {
    let page = filter.offset;
    let data = assemble_gallery(state.library.as_ref(), filter, page)
        .await
        .map_err(page_error)?;

    let templates = state.templates.snapshot();
    let html = render(&templates, target, &data).map_err(page_error)?;
    Ok(Html(html))
}

// ============ GET /img/{item_id} ============

async fn handle_missing_item_id() -> AppError {
    AppError::new(StatusCode::BAD_REQUEST, "bad_request", "missing itemId")
}

/// Handler for `GET /img/{item_id}`.
///
/// Serves the thumbnail, or with `fq=true` the best full-resolution file
/// available. The file is streamed and honours `Range` and conditional
/// requests.
async fn handle_image(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    Query(raw): Query<Vec<(String, String)>>,
    request: Request,
) -> Result<Response, AppError> {
    let full_quality = first_value(&raw, "fq") == Some("true");
    let uri_path = request.uri().path().to_string();

    let path = resolve_display_path(state.library.as_ref(), &item_id, full_quality)
        .await
        .map_err(|e| image_error(&uri_path, &e, e.code()))?;

    let response = match ServeFile::new(&path).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };

    // The file can vanish between resolution and serving.
    if response.status() == StatusCode::NOT_FOUND {
        let err = GalleryError::NotFound(path.display().to_string());
        return Err(image_error(&uri_path, &err, err.code()));
    }

    let mut response = response.map(Body::new);
    if response.status().is_success() {
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(content_type_for(&path)),
        );
    }
    Ok(response)
}

// ============ POST /upload ============

/// Handler for `POST /upload`. Expects the image in a multipart field named `file`.
async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<&'static str, AppError> {
    let max_bytes = state.config.upload.max_bytes;

    let mut data = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some("file") {
            data = Some(field.bytes().await.map_err(multipart_error)?);
            break;
        }
    }

    let data = data.ok_or_else(|| {
        AppError::new(StatusCode::BAD_REQUEST, "bad_request", "Invalid file upload")
    })?;

    if data.len() > max_bytes {
        return Err(AppError::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            "too_large",
            format!("upload exceeds {} bytes", max_bytes),
        ));
    }

    process_upload(state.library.as_ref(), &state.config.upload, &data)
        .await
        .map_err(upload_error)?;

    Ok("success. item uploaded.")
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> AppError {
    AppError::new(
        err.status(),
        "bad_request",
        format!("Failed to parse multipart form: {}", err.body_text()),
    )
}
