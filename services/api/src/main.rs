//! API Service - Web upload form for the edificio XML generator
//!
//! Endpoints:
//! - GET /                    - Upload form
//! - POST /                   - Process an uploaded CSV (multipart field `file`)
//! - GET /download/:filename  - Download a generated ZIP
//! - GET /sobre               - About page
//! - GET /health              - Health check

mod pages;

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use edificio_core::logging::{init_logging, LogConfig, LogFormat};
use edificio_core::pipeline::{process_csv, BatchOptions, BatchReport};
use edificio_core::{sweep_stale_archives, GeradorError};
use serde::Serialize;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

/// Uploads above this size are rejected before processing.
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;
/// Generated archives older than this are deleted.
const RETENTION: Duration = Duration::from_secs(60 * 60);
const SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

const MSG_NO_FILE: &str = "Nenhum arquivo selecionado";
const MSG_NOT_CSV: &str = "Por favor, selecione um arquivo CSV";
const MSG_NOT_FOUND: &str = "Arquivo não encontrado";
const MSG_TOO_LARGE: &str = "Arquivo muito grande (limite de 16 MB)";

// ============================================================================
// Config
// ============================================================================

#[derive(Debug, Clone)]
struct Config {
    bind: String,
    download_dir: PathBuf,
    upload_dir: PathBuf,
}

impl Config {
    fn from_env() -> Self {
        Self {
            bind: std::env::var("API_BIND").unwrap_or_else(|_| "0.0.0.0:5000".to_string()),
            download_dir: std::env::var("DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("downloads")),
            upload_dir: std::env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir()),
        }
    }

    fn batch_options(&self) -> BatchOptions {
        BatchOptions::new(&self.download_dir).with_staging_dir(&self.upload_dir)
    }
}

// ============================================================================
// State
// ============================================================================

struct AppState {
    config: Config,
}

// ============================================================================
// Response types
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    version: &'static str,
}

fn form_response(status: StatusCode, message: &str) -> Response {
    (status, Html(pages::index_page(Some(message)))).into_response()
}

fn not_found() -> Response {
    form_response(StatusCode::NOT_FOUND, MSG_NOT_FOUND)
}

// ============================================================================
// Upload handling
// ============================================================================

struct Upload {
    file_name: String,
    bytes: Bytes,
}

enum UploadCheck {
    Accepted(Upload),
    Rejected(&'static str),
}

/// Pull the `file` field out of the form and check it looks like a CSV.
async fn read_upload(multipart: &mut Multipart) -> Result<UploadCheck, axum::extract::multipart::MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        if file_name.is_empty() {
            return Ok(UploadCheck::Rejected(MSG_NO_FILE));
        }
        if !file_name.ends_with(".csv") {
            return Ok(UploadCheck::Rejected(MSG_NOT_CSV));
        }
        let bytes = field.bytes().await?;
        return Ok(UploadCheck::Accepted(Upload { file_name, bytes }));
    }
    Ok(UploadCheck::Rejected(MSG_NO_FILE))
}

/// Spool the upload to a temp file and run the batch on it.
///
/// The temp file is removed when it goes out of scope, on both paths.
fn process_upload(config: &Config, bytes: &[u8]) -> Result<BatchReport, GeradorError> {
    let spool_error = |source| GeradorError::FileRead {
        path: config.upload_dir.clone(),
        source,
    };
    let mut upload = tempfile::Builder::new()
        .prefix("upload_")
        .suffix(".csv")
        .tempfile_in(&config.upload_dir)
        .map_err(spool_error)?;
    upload.write_all(bytes).map_err(spool_error)?;
    upload.flush().map_err(spool_error)?;

    process_csv(upload.path(), &config.batch_options())
}

fn status_for(err: &GeradorError) -> StatusCode {
    if err.is_input_error() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn index_handler() -> Html<String> {
    Html(pages::index_page(None))
}

async fn about_handler() -> Html<String> {
    Html(pages::about_page())
}

async fn upload_handler(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let upload = match read_upload(&mut multipart).await {
        Ok(UploadCheck::Accepted(upload)) => upload,
        Ok(UploadCheck::Rejected(message)) => return form_response(StatusCode::BAD_REQUEST, message),
        Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return form_response(StatusCode::PAYLOAD_TOO_LARGE, MSG_TOO_LARGE);
        }
        Err(e) => {
            warn!(error = %e, "malformed upload");
            return form_response(e.status(), &format!("Erro no processamento: {}", e.body_text()));
        }
    };

    let run_id = Uuid::new_v4();
    let span = info_span!("upload", %run_id, file = %upload.file_name, bytes = upload.bytes.len());
    let worker_state = Arc::clone(&state);
    let joined = tokio::task::spawn_blocking(move || {
        let _entered = span.entered();
        process_upload(&worker_state.config, &upload.bytes)
    })
    .await;

    match joined {
        Ok(Ok(report)) => {
            info!(%run_id, archive = %report.archive_name, rows = report.row_count, "upload processed");
            Html(pages::result_page(&report)).into_response()
        }
        Ok(Err(e)) => {
            warn!(%run_id, error = %e, "upload failed");
            form_response(
                status_for(&e),
                &format!("Erro no processamento: {}", e.user_message()),
            )
        }
        Err(e) => {
            error!(%run_id, error = %e, "batch worker panicked");
            form_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Erro no processamento: falha interna",
            )
        }
    }
}

/// Archive names are single path components made of `[A-Za-z0-9._-]`, ending in `.zip`.
fn is_safe_archive_name(name: &str) -> bool {
    !name.starts_with('.')
        && name.ends_with(".zip")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}

async fn download_handler(State(state): State<Arc<AppState>>, Path(filename): Path<String>) -> Response {
    if !is_safe_archive_name(&filename) {
        warn!(filename = %filename, "rejected download name");
        return not_found();
    }

    let path = state.config.download_dir.join(&filename);
    match tokio::fs::read(&path).await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "application/zip".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{filename}\""),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => not_found(),
        Err(e) => {
            error!(path = %path.display(), error = %e, "failed to read archive");
            form_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("Erro ao fazer download: {e}"),
            )
        }
    }
}

// ============================================================================
// Router
// ============================================================================

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler).post(upload_handler))
        .route("/download/:filename", get(download_handler))
        .route("/sobre", get(about_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Sweep once now, then every [`SWEEP_INTERVAL`].
async fn sweep_loop(download_dir: PathBuf) {
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        interval.tick().await;
        let dir = download_dir.clone();
        match tokio::task::spawn_blocking(move || sweep_stale_archives(&dir, RETENTION)).await {
            Ok(Ok(removed)) => info!(removed, "stale archive sweep finished"),
            Ok(Err(e)) => warn!(error = %e, "stale archive sweep failed"),
            Err(e) => error!(error = %e, "stale archive sweep panicked"),
        }
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let log_format: LogFormat = std::env::var("LOG_FORMAT")
        .ok()
        .map(|v| v.parse::<LogFormat>())
        .transpose()
        .map_err(anyhow::Error::msg)
        .context("Invalid LOG_FORMAT")?
        .unwrap_or_default();
    let log_config = LogConfig::default()
        .with_format(log_format)
        .with_target(true)
        .with_ansi(std::io::stderr().is_terminal());
    init_logging(&log_config).context("Failed to initialize logging")?;

    let config = Config::from_env();
    tokio::fs::create_dir_all(&config.download_dir)
        .await
        .with_context(|| format!("Failed to create {}", config.download_dir.display()))?;
    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("Failed to create {}", config.upload_dir.display()))?;

    info!(
        download_dir = %config.download_dir.display(),
        upload_dir = %config.upload_dir.display(),
        "=== Gerador de XML de Moradias ==="
    );

    tokio::spawn(sweep_loop(config.download_dir.clone()));

    let bind = config.bind.clone();
    let app = build_router(Arc::new(AppState { config }));

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    info!("API listening on http://{}", bind);

    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
