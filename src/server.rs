//! HTTP API over the photo store.
//!
//! | Route | Methods | Purpose |
//! |-------|---------|---------|
//! | `/photos` | GET, POST | Paginated gallery listing; upload and delete commands |
//! | `/photo/{id}` | GET | Raw image bytes decoded from the stored data-URI |
//! | `/debug/storage` | GET | Backend description and per-photo metadata |
//!
//! Every response carries permissive CORS headers, including the `500` a
//! panicking handler is turned into. `OPTIONS` on any path is
//! answered with an empty `200`; other unsupported methods on a known route
//! get `405 {"error": "Method not allowed"}`.
//!
//! POST bodies are decoded once into a [`PhotoCommand`] before touching the
//! store, so malformed requests never reach storage.

use crate::config::AppConfig;
use crate::data_uri::DataUri;
use crate::store::{PhotoStore, StoreError};
use crate::types::{DEFAULT_LIMIT, PageRequest, Photo, PhotoPage};
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router, middleware};
use serde::Deserialize;
use serde_json::{Value, json};
use std::any::Any;
use std::net::SocketAddr;
use thiserror::Error;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Cache policy for image bytes. Photos are immutable once stored.
const IMMUTABLE_CACHE: &str = "public, max-age=31536000, immutable";

/// Longest description prefix shown by the storage debug endpoint.
const DEBUG_DESCRIPTION_CHARS: usize = 50;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid bind address '{0}'")]
    Bind(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a POST body was rejected.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Invalid JSON body")]
    InvalidJson(#[source] serde_json::Error),
    #[error("Missing photo")]
    MissingPhoto,
    #[error("Invalid photo record")]
    InvalidPhoto(#[source] serde_json::Error),
    #[error("Photo id is required")]
    MissingId,
    #[error("Unknown action '{0}'")]
    UnknownAction(String),
}

/// A decoded `POST /photos` request.
#[derive(Debug, Clone, PartialEq)]
pub enum PhotoCommand {
    Upload(Photo),
    Delete { id: String },
}

impl PhotoCommand {
    /// Decode `{"photo": ..., "action": "upload" | "delete"}`.
    ///
    /// A missing, null or empty `action` means upload. An empty body is
    /// treated as `{}`.
    pub fn decode(body: &[u8]) -> Result<Self, CommandError> {
        let value: Value = if body.iter().all(u8::is_ascii_whitespace) {
            json!({})
        } else {
            serde_json::from_slice(body).map_err(CommandError::InvalidJson)?
        };

        let photo = match value.get("photo") {
            None | Some(Value::Null) => return Err(CommandError::MissingPhoto),
            Some(photo) => photo,
        };

        let action = match value.get("action") {
            None | Some(Value::Null) => "upload",
            Some(Value::String(s)) if s.is_empty() => "upload",
            Some(Value::String(s)) => s.as_str(),
            Some(other) => return Err(CommandError::UnknownAction(other.to_string())),
        };

        match action {
            "upload" => serde_json::from_value(photo.clone())
                .map(PhotoCommand::Upload)
                .map_err(CommandError::InvalidPhoto),
            "delete" => photo
                .get("id")
                .and_then(Value::as_str)
                .map(|id| PhotoCommand::Delete { id: id.to_string() })
                .ok_or(CommandError::MissingId),
            other => Err(CommandError::UnknownAction(other.to_string())),
        }
    }
}

/// JSON error response: `{"error": ..., "details": ...}`.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    error: String,
    details: Option<String>,
}

impl ApiError {
    fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: impl ToString) -> Self {
        self.details = Some(details.to_string());
        self
    }

    /// Map a failed store write: lost races are 409, anything else 500.
    fn store(context: &str, err: StoreError) -> Self {
        let status = if err.is_conflict() {
            StatusCode::CONFLICT
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        error!(error = %err, "{context}");
        Self::new(status, context).with_details(err)
    }
}

impl From<CommandError> for ApiError {
    fn from(err: CommandError) -> Self {
        let api = ApiError::new(StatusCode::BAD_REQUEST, err.to_string());
        match err {
            CommandError::InvalidJson(source) | CommandError::InvalidPhoto(source) => {
                api.with_details(source)
            }
            _ => api,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

#[derive(Clone)]
struct AppState {
    store: PhotoStore,
}

/// Build the API router over `store`.
pub fn router(store: PhotoStore, max_body_bytes: usize) -> Router {
    let routes = Router::new()
        .route(
            "/photos",
            get(list_photos)
                .post(post_photos)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .route(
            "/photo/:id",
            get(get_photo).options(preflight).fallback(method_not_allowed),
        )
        .route(
            "/debug/storage",
            get(debug_storage)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .fallback(not_found)
        .with_state(AppState { store });
    with_layers(routes, max_body_bytes)
}

/// Body limit, panic recovery, CORS and request tracing, innermost first.
fn with_layers(routes: Router, max_body_bytes: usize) -> Router {
    routes
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::map_response(cors_headers))
        .layer(TraceLayer::new_for_http())
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let details = panic
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "handler panicked".to_string());
    error!(details = %details, "Request handler panicked");
    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        .with_details(details)
        .into_response()
}

/// Bind to the configured address and serve until Ctrl-C.
pub async fn serve(config: &AppConfig, store: PhotoStore) -> Result<(), ServerError> {
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .map_err(|_| ServerError::Bind(config.server.bind.clone()))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        storage = %store.describe(),
        "Listening on http://{}",
        listener.local_addr()?
    );

    axum::serve(listener, router(store, config.server.max_body_bytes))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for Ctrl-C; serving until killed");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

async fn cors_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, DELETE, OPTIONS"),
    );
    response
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> ApiError {
    ApiError::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

async fn not_found(method: Method) -> Response {
    if method == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        ApiError::new(StatusCode::NOT_FOUND, "Not found").into_response()
    }
}

// ============================================================================
// /photos
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct ListParams {
    page: Option<String>,
    limit: Option<String>,
    thumbnails: Option<String>,
}

/// Parse a positive integer, falling back to `default` for anything else.
fn positive_or(value: Option<&str>, default: usize) -> usize {
    value
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&n| n >= 1)
        .unwrap_or(default)
}

async fn list_photos(
    State(state): State<AppState>,
    params: Option<Query<ListParams>>,
) -> Json<PhotoPage> {
    let params = params.map(|Query(p)| p).unwrap_or_default();
    let request = PageRequest::new(
        positive_or(params.page.as_deref(), 1),
        positive_or(params.limit.as_deref(), DEFAULT_LIMIT),
    );

    let mut page = state.store.list(request).await;
    if params.thumbnails.as_deref() == Some("true") {
        for photo in &mut page.photos {
            photo.url = photo.thumbnail_url.clone();
        }
    }
    Json(page)
}

async fn post_photos(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    match PhotoCommand::decode(&body)? {
        PhotoCommand::Upload(photo) => {
            let photo = state
                .store
                .insert(photo)
                .await
                .map_err(|e| ApiError::store("Failed to upload photo", e))?;
            info!(id = %photo.id, filename = %photo.filename, "Stored photo");
            Ok(Json(json!({ "success": true, "photo": photo })))
        }
        PhotoCommand::Delete { id } => {
            let removed = state
                .store
                .delete(&id)
                .await
                .map_err(|e| ApiError::store("Failed to delete photo", e))?;
            info!(id = %id, removed, "Deleted photo");
            Ok(Json(json!({ "success": true, "deleted": id })))
        }
    }
}

// ============================================================================
// /photo/{id}
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct PhotoParams {
    thumbnail: Option<String>,
}

async fn get_photo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: Option<Query<PhotoParams>>,
) -> Result<Response, ApiError> {
    let params = params.map(|Query(p)| p).unwrap_or_default();
    let photo = state.store.get(&id).await.map_err(|e| {
        error!(id = %id, error = %e, "Failed to load photo");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").with_details(e)
    })?;
    let photo = photo.ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "Photo not found"))?;

    let uri = if params.thumbnail.as_deref() == Some("true") {
        &photo.thumbnail_url
    } else {
        &photo.url
    };
    let image = DataUri::parse(uri)
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, "Invalid image data").with_details(e))?;

    Ok((
        [
            (header::CONTENT_TYPE, image.mime_type),
            (header::CACHE_CONTROL, IMMUTABLE_CACHE.to_string()),
            (header::CONTENT_LENGTH, image.data.len().to_string()),
        ],
        image.data,
    )
        .into_response())
}

// ============================================================================
// /debug/storage
// ============================================================================

fn photo_metadata(photo: &Photo) -> Value {
    let description = if photo.description.is_empty() {
        "No description".to_string()
    } else {
        photo.description.chars().take(DEBUG_DESCRIPTION_CHARS).collect()
    };
    json!({
        "id": photo.id,
        "filename": photo.filename,
        "description": description,
        "uploadedBy": photo.uploaded_by,
        "uploadedAt": photo.uploaded_at,
        "hasUrl": !photo.url.is_empty(),
        "hasThumb": !photo.thumbnail_url.is_empty(),
        "urlSize": photo.url.len(),
        "thumbSize": photo.thumbnail_url.len(),
    })
}

async fn debug_storage(State(state): State<AppState>) -> Json<Value> {
    let store = &state.store;
    match store.list_all().await {
        Ok(all) => Json(json!({
            "storage": store.describe(),
            "key": store.key(),
            "totalPhotos": all.len(),
            "photosMetadata": all.iter().map(photo_metadata).collect::<Vec<_>>(),
            "lastFivePhotos": all
                .iter()
                .take(5)
                .map(|p| json!({
                    "id": p.id,
                    "filename": p.filename,
                    "uploadedAt": p.uploaded_at,
                    "uploadedBy": p.uploaded_by,
                }))
                .collect::<Vec<_>>(),
        })),
        Err(e) => {
            warn!(error = %e, "Storage debug read failed");
            Json(json!({
                "error": "Failed to access storage",
                "details": e.to_string(),
                "storage": store.describe(),
                "key": store.key(),
            }))
        }
    }
}
