//! REST API server for CertChain
//!
//! A thin transport over [`ChainStore`]: issuing, looking up, exporting,
//! importing and resetting the certificate ledger.

use axum::{
    extract::{Path, Request, State},
    http::{self, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;

use crate::blockchain::{Block, CertificateRecord, ChainStatus, ChainStore, Verification};
use crate::config::Config;
use crate::error::ChainError;

/// State shared by every handler.
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<ChainStore>,
    started: Instant,
}

impl ApiState {
    pub fn new(store: Arc<ChainStore>) -> Self {
        Self {
            store,
            started: Instant::now(),
        }
    }
}

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BlockchainError(ChainError),
    InvalidInput(String),
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BlockchainError(e) => {
                let status = match &e {
                    ChainError::IoError(_) | ChainError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
                    _ => StatusCode::BAD_REQUEST,
                };
                (status, e.to_string())
            }
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        (
            status,
            Json(ErrorResponse {
                success: false,
                message,
            }),
        )
            .into_response()
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        ApiError::BlockchainError(err)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueResponse {
    pub success: bool,
    pub message: String,
    pub block_hash: String,
    pub index: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateResponse {
    pub success: bool,
    pub certificate: CertificateRecord,
    pub block_hash: String,
    pub timestamp: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainResponse {
    pub success: bool,
    pub chain: Vec<Block>,
    pub is_valid: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceResponse {
    pub success: bool,
    pub message: String,
    pub chain_length: usize,
}

#[derive(Deserialize)]
struct ImportRequest {
    chain: Vec<Block>,
}

// ============================================================================
// Middleware
// ============================================================================

/// Logs method, path, status and duration of every request.
async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "api.request"
    );

    response
}

// ============================================================================
// API Server
// ============================================================================

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(vec![
            http::Method::GET,
            http::Method::POST,
            http::Method::OPTIONS,
        ])
        .allow_headers(vec![http::header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Build the API router. Paths outside `/api` fall back to `static_dir` when given.
pub fn build_api_router(state: ApiState, static_dir: Option<&str>) -> Router {
    let api_routes = Router::new()
        // Certificate endpoints
        .route("/certificates", post(issue_certificate))
        .route("/certificates/:certificate_id", get(get_certificate))
        // Chain endpoints
        .route("/chain", get(get_chain))
        .route("/chain/status", get(get_chain_status))
        .route("/chain/import", post(import_chain))
        .route("/chain/reset", post(reset_chain))
        // System endpoints
        .route("/health", get(health_check))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state);

    let app = Router::new().nest("/api", api_routes);
    let app = match static_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app,
    };
    app.layer(cors_layer())
}

/// Bind to the configured address and serve until the process stops.
pub async fn run_api_server(store: Arc<ChainStore>, config: &Config) -> Result<(), ChainError> {
    let app = build_api_router(ApiState::new(store), config.server.static_dir.as_deref());
    let addr = config.bind_address();

    let listener = tokio::net::TcpListener::bind(addr.as_str()).await?;
    tracing::info!(address = %addr, "API server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn health_check(State(state): State<ApiState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "uptime_seconds": state.started.elapsed().as_secs(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn issue_certificate(
    State(state): State<ApiState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<IssueResponse>, ApiError> {
    let record: CertificateRecord = serde_json::from_value(body)
        .map_err(|e| ApiError::InvalidInput(format!("Malformed certificate: {}", e)))?;
    let receipt = state.store.issue(record)?;
    Ok(Json(IssueResponse {
        success: true,
        message: "Certificate added to blockchain".to_string(),
        block_hash: receipt.hash,
        index: receipt.index,
    }))
}

async fn get_certificate(
    State(state): State<ApiState>,
    Path(certificate_id): Path<String>,
) -> Result<Json<CertificateResponse>, ApiError> {
    match state.store.verify_certificate(&certificate_id) {
        Verification::Found(found) => Ok(Json(CertificateResponse {
            success: true,
            certificate: found.data,
            block_hash: found.block_hash,
            timestamp: found.timestamp,
        })),
        Verification::NotFound => Err(ApiError::NotFound("Certificate not found".to_string())),
    }
}

async fn get_chain(State(state): State<ApiState>) -> Json<ChainResponse> {
    let chain = state.store.export_chain();
    let is_valid = crate::blockchain::validate_blocks(&chain).is_ok();
    Json(ChainResponse {
        success: true,
        chain,
        is_valid,
    })
}

async fn get_chain_status(State(state): State<ApiState>) -> Json<ChainStatus> {
    Json(state.store.status())
}

async fn import_chain(
    State(state): State<ApiState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<ReplaceResponse>, ApiError> {
    let request: ImportRequest = serde_json::from_value(body)
        .map_err(|e| ApiError::InvalidInput(format!("Malformed chain: {}", e)))?;

    let chain_length = state.store.import_chain(request.chain)?;
    Ok(Json(ReplaceResponse {
        success: true,
        message: "Blockchain data imported successfully".to_string(),
        chain_length,
    }))
}

async fn reset_chain(State(state): State<ApiState>) -> Result<Json<ReplaceResponse>, ApiError> {
    let chain_length = state.store.reset_chain()?;
    Ok(Json(ReplaceResponse {
        success: true,
        message: "Blockchain reset successfully".to_string(),
        chain_length,
    }))
}
