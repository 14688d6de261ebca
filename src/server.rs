//! HTTP surface: axum router, handlers and error mapping.
//!
//! | Method/Path | Handler |
//! |-------------|---------|
//! | `GET /` | banner |
//! | `POST /parse-bill` | multipart upload → [`crate::extract::parse_receipt`] |
//! | `POST /split-equal` | [`crate::split::split_equal`] |
//! | `POST /split-by-item` | [`crate::split::split_by_item`] |
//!
//! Errors are answered as `{"detail": "<message>"}` with the status from
//! [`BillSplitError::status_code`].

use crate::bill::{EqualSplit, ItemSplit, ItemSplitRequest, SplitRequest};
use crate::config::ServiceConfig;
use crate::error::BillSplitError;
use crate::extract::{self, Upload};
use crate::pipeline::llm::VisionModel;
use crate::split;
use axum::extract::rejection::JsonRejection;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Multipart field carrying the receipt image.
pub const UPLOAD_FIELD: &str = "file";

/// Shared, read-only state for all handlers.
pub struct AppState {
    pub config: ServiceConfig,
    pub vision: Arc<dyn VisionModel>,
}

impl AppState {
    pub fn new(config: ServiceConfig, vision: Arc<dyn VisionModel>) -> Self {
        Self { config, vision }
    }
}

/// Build the router with CORS, tracing and the upload size limit applied.
pub fn build_router(state: Arc<AppState>) -> Result<Router, BillSplitError> {
    let origin: HeaderValue = state.config.allowed_origin.parse().map_err(|_| {
        BillSplitError::InvalidConfig(format!(
            "Allowed origin is not a valid header value: '{}'",
            state.config.allowed_origin
        ))
    })?;

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list([origin]))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    let body_limit = state.config.max_upload_bytes;

    Ok(Router::new()
        .route("/", get(root))
        .route("/parse-bill", post(parse_bill))
        .route("/split-equal", post(split_equal))
        .route("/split-by-item", post(split_by_item))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Bind and serve until Ctrl-C.
pub async fn serve(
    config: ServiceConfig,
    vision: Arc<dyn VisionModel>,
) -> Result<(), BillSplitError> {
    let addr = config.socket_addr();
    let origin = config.allowed_origin.clone();
    let app = build_router(Arc::new(AppState::new(config, vision)))?;

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| BillSplitError::Internal(format!("cannot bind {addr}: {e}")))?;
    info!(addr = %addr, origin = %origin, "Bill splitting API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| BillSplitError::Internal(format!("server error: {e}")))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install Ctrl-C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

// ── Handlers ─────────────────────────────────────────────────────────────

async fn root() -> Json<Value> {
    Json(json!({ "message": "Bill Splitting API" }))
}

async fn parse_bill(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, BillSplitError> {
    let mut multipart = multipart.map_err(|e| BillSplitError::InvalidInput(e.body_text()))?;
    let upload = read_upload(&mut multipart).await?;
    info!(
        filename = upload.filename.as_deref().unwrap_or("<none>"),
        content_type = %upload.content_type,
        bytes = upload.bytes.len(),
        "Parsing receipt"
    );

    let quality = state.config.jpeg_quality;
    let bill = extract::parse_receipt(state.vision.as_ref(), upload, quality).await?;
    Ok(Json(bill))
}

async fn split_equal(
    payload: Result<Json<SplitRequest>, JsonRejection>,
) -> Result<Json<EqualSplit>, BillSplitError> {
    let Json(request) = payload.map_err(rejection)?;
    Ok(Json(split::split_equal(&request)?))
}

async fn split_by_item(
    payload: Result<Json<ItemSplitRequest>, JsonRejection>,
) -> Result<Json<ItemSplit>, BillSplitError> {
    let Json(request) = payload.map_err(rejection)?;
    Ok(Json(split::split_by_item(&request)?))
}

/// Pull the `file` field out of a multipart body.
async fn read_upload(multipart: &mut Multipart) -> Result<Upload, BillSplitError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let filename = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;

        return Ok(Upload {
            bytes: bytes.to_vec(),
            content_type,
            filename,
        });
    }

    Err(BillSplitError::InvalidInput(format!(
        "Missing multipart field '{UPLOAD_FIELD}'"
    )))
}

fn multipart_error(e: MultipartError) -> BillSplitError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        BillSplitError::PayloadTooLarge(e.body_text())
    } else {
        BillSplitError::InvalidInput(e.body_text())
    }
}

fn rejection(e: JsonRejection) -> BillSplitError {
    let status = e.status();
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        BillSplitError::PayloadTooLarge(e.body_text())
    } else if status == StatusCode::UNSUPPORTED_MEDIA_TYPE {
        BillSplitError::UnsupportedMediaType(e.body_text())
    } else {
        BillSplitError::MalformedRequest(e.body_text())
    }
}

impl IntoResponse for BillSplitError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if self.is_client_error() {
            warn!(status = status.as_u16(), "{}", self);
        } else {
            error!(status = status.as_u16(), "{}", self);
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
