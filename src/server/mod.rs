//! HTTP surface for the extraction service.
//!
//! Thin I/O plumbing around [`crate::extract::run_extraction`]: route
//! declarations, multipart upload handling, static artifact serving, the
//! health check, and the served contract document. The router is built
//! here in the library so the endpoint contract can be exercised in tests
//! without binding a socket.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use uuid::Uuid;

use crate::engine::SharedLayoutEngine;
use crate::extract::{ExtractionOptions, run_extraction};
use crate::pdf::PdfExporter;

/// Uploads above this size are rejected by the transport layer.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Root directory for per-request output directories.
    pub output_root: PathBuf,
    /// Location of the served `openapi.yaml` contract document.
    pub spec_path: PathBuf,
}

/// Application state shared across handlers.
///
/// The engine is constructed once at process start and injected here;
/// handlers never build or look up engines themselves.
pub struct AppState {
    pub engine: SharedLayoutEngine,
    pub exporter: PdfExporter,
    pub output_root: PathBuf,
    pub spec_path: PathBuf,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ErrorDetail {
    detail: String,
}

/// Builds the service router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/openapi.yaml", get(openapi_handler))
        .route("/extract", post(extract_handler))
        .nest_service("/outputs", ServeDir::new(state.output_root.clone()))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Runs the HTTP server until shutdown.
pub async fn run_server(
    config: ServerConfig,
    engine: SharedLayoutEngine,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    std::fs::create_dir_all(&config.output_root)?;

    let state = Arc::new(AppState {
        engine,
        exporter: PdfExporter::new(),
        output_root: config.output_root.clone(),
        spec_path: config.spec_path.clone(),
    });

    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| format!("Invalid address: {}", e))?;

    info!("Server listening on http://{}", addr);
    info!("Endpoints:");
    info!("  GET  /health        - Health check");
    info!("  GET  /openapi.yaml  - Contract document");
    info!("  POST /extract       - Page extraction");
    info!("  GET  /outputs/...   - Persisted artifacts");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Health check endpoint.
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Serves the contract document, or a diagnostic body when it is missing.
async fn openapi_handler(State(state): State<Arc<AppState>>) -> Response {
    match std::fs::read_to_string(&state.spec_path) {
        Ok(contents) => (
            [(header::CONTENT_TYPE, "application/yaml")],
            contents,
        )
            .into_response(),
        Err(_) => Json(ErrorDetail {
            detail: format!("Spec not found at {}", state.spec_path.display()),
        })
        .into_response(),
    }
}

/// Parsed `/extract` form fields.
struct ExtractForm {
    file_bytes: Vec<u8>,
    file_name: String,
    content_type: Option<String>,
    store_outputs: bool,
    return_annotated: bool,
    generate_pdf: bool,
    ocr_engine: String,
}

/// Page extraction endpoint.
async fn extract_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Response {
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(detail) => return error_response(StatusCode::BAD_REQUEST, detail),
    };

    if !form
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.starts_with("image/"))
    {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!(
                "Unsupported content type: {}",
                form.content_type.as_deref().unwrap_or("unknown")
            ),
        );
    }

    // Reject undecodable or zero-dimension uploads before anything is
    // written to disk. Header-only probe; the full decode happens in the
    // pipeline.
    if !probe_image_dimensions(&form.file_bytes) {
        return error_response(StatusCode::BAD_REQUEST, "Could not decode image".to_string());
    }

    let request_id = Uuid::new_v4().to_string();
    info!(
        request_id = %request_id,
        file = %form.file_name,
        ocr_engine = %form.ocr_engine,
        store_outputs = form.store_outputs,
        "Processing extraction request"
    );

    // Single-engine implementation: the ocr_engine field is accepted for
    // contract compatibility but not dispatched on.

    let output_dir = if form.store_outputs {
        let dir = state.output_root.join(&request_id);
        if let Err(e) = std::fs::create_dir_all(&dir) {
            error!(request_id = %request_id, error = %e, "Failed to create output directory");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create output directory".to_string(),
            );
        }
        if let Err(e) = save_upload(&dir, &form.file_name, &form.file_bytes) {
            error!(request_id = %request_id, error = %e, "Failed to persist upload");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to persist upload".to_string(),
            );
        }
        Some(dir)
    } else {
        None
    };

    let options = ExtractionOptions {
        request_id: request_id.clone(),
        output_dir: output_dir.clone(),
        store_outputs: form.store_outputs,
        return_annotated: form.return_annotated,
    };

    let mut response = match run_extraction(state.engine.as_ref(), &form.file_bytes, &options) {
        Ok(response) => response,
        Err(e) if e.is_invalid_input() => {
            return error_response(StatusCode::BAD_REQUEST, e.to_string());
        }
        Err(e) => {
            error!(request_id = %request_id, error = %e, "Extraction failed");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Extraction failed".to_string(),
            );
        }
    };

    // PDF export runs after extraction and must never fail the request.
    if form.generate_pdf {
        match &output_dir {
            Some(dir) => {
                let destination = dir.join("output.pdf");
                match state.exporter.export(&response.blocks, &destination) {
                    Ok(()) => {
                        response.exports.pdf_path =
                            Some(format!("/outputs/{}/output.pdf", request_id));
                    }
                    Err(e) => {
                        error!(request_id = %request_id, error = %e, "PDF export failed");
                        response.errors.push(format!("PDF export failed: {}", e));
                    }
                }
            }
            None => {
                response
                    .errors
                    .push("PDF export skipped: store_outputs is disabled".to_string());
            }
        }
    }

    info!(
        request_id = %request_id,
        blocks = response.blocks.len(),
        figures = response.figures.len(),
        "Extraction complete"
    );

    (StatusCode::OK, Json(response)).into_response()
}

/// Reads the multipart form, applying contract defaults.
async fn read_form(mut multipart: Multipart) -> Result<ExtractForm, String> {
    let mut file_bytes = None;
    let mut file_name = "upload".to_string();
    let mut content_type = None;
    let mut store_outputs = true;
    let mut return_annotated = true;
    let mut generate_pdf = false;
    let mut ocr_engine = "paddle".to_string();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Invalid multipart body: {}", e))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                content_type = field.content_type().map(str::to_string);
                if let Some(name) = field.file_name() {
                    file_name = name.to_string();
                }
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| format!("Failed to read file field: {}", e))?;
                file_bytes = Some(bytes.to_vec());
            }
            Some("store_outputs") => {
                store_outputs = parse_bool(&read_text(field).await?).unwrap_or(store_outputs);
            }
            Some("return_annotated") => {
                return_annotated = parse_bool(&read_text(field).await?).unwrap_or(return_annotated);
            }
            Some("generate_pdf") => {
                generate_pdf = parse_bool(&read_text(field).await?).unwrap_or(generate_pdf);
            }
            Some("ocr_engine") => {
                ocr_engine = read_text(field).await?;
            }
            _ => {}
        }
    }

    let file_bytes = file_bytes.ok_or_else(|| "No file provided".to_string())?;

    Ok(ExtractForm {
        file_bytes,
        file_name,
        content_type,
        store_outputs,
        return_annotated,
        generate_pdf,
        ocr_engine,
    })
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, String> {
    field
        .text()
        .await
        .map_err(|e| format!("Failed to read form field: {}", e))
}

/// Returns true if the bytes look like a decodable, non-empty image.
fn probe_image_dimensions(bytes: &[u8]) -> bool {
    image::ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .ok()
        .and_then(|reader| reader.into_dimensions().ok())
        .is_some_and(|(width, height)| width > 0 && height > 0)
}

/// Parses a form boolean; unrecognized values keep the field default.
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Saves the uploaded file alongside the request's other artifacts.
fn save_upload(dir: &Path, file_name: &str, bytes: &[u8]) -> std::io::Result<()> {
    // Keep only the final path component of the client-supplied name.
    let safe_name = Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload");
    std::fs::write(dir.join(format!("input_{}", safe_name)), bytes)
}

fn error_response(status: StatusCode, detail: String) -> Response {
    (status, Json(ErrorDetail { detail })).into_response()
}

/// Graceful shutdown on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        }
    }
}
