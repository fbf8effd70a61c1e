//! HTTP facade over the trail store, arrival checks and photo challenges.
//!
//! | Route | Body | Response |
//! |-------|------|----------|
//! | `POST /trails/nearby` | `{latitude, longitude, radius_km?}` | enriched trails with `distance_km` |
//! | `GET /trails` | | `[{id, name}]` |
//! | `GET /trails/:id` | | enriched trail, 404 when unknown |
//! | `POST /progress/check` | `{trail_id, checkpoint_index, latitude, longitude}` | `{reached, distance_km}` |
//! | `POST /challenges/validate` | multipart `image` + `keyword` | `{valid, filename_match, score}` |
//! | `GET /health` | | `OK` |
//!
//! Failures are returned as `{"error": "<message>"}`: 422 for rejected input,
//! 404 for missing trails or checkpoint positions, 400 for malformed bodies and
//! 413 for uploads over `PhotoConfig::max_upload_bytes`.

use crate::config::Config;
use crate::error::QueryError;
use crate::photo::{PhotoValidator, PhotoVerdict};
use crate::proximity::{ArrivalStatus, ProximityChecker};
use crate::store::{StoreConfig, TrailStore};
use crate::{EnrichedTrail, TrailSummary};
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

/// Everything the handlers need, shared across requests.
#[derive(Debug)]
pub struct AppState {
    pub store: TrailStore,
    pub validator: PhotoValidator,
    pub store_config: StoreConfig,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            store: TrailStore::from_config(&config.store),
            validator: PhotoValidator::new(config.photo.clone()),
            store_config: config.store.clone(),
        }
    }
}

pub type SharedState = Arc<AppState>;

/// Build the application router.
pub fn router(state: SharedState) -> Router {
    let upload_limit = state.validator.config().max_upload_bytes;

    Router::new()
        .route("/trails", get(list_trails))
        .route("/trails/nearby", post(nearby_trails))
        .route("/trails/:id", get(trail_detail))
        .route("/progress/check", post(check_progress))
        .route(
            "/challenges/validate",
            post(validate_challenge).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/health", get(health_check))
        .with_state(state)
}

/// Bind to `0.0.0.0:port` and serve until the process is stopped.
pub async fn serve(config: Config, port: u16) -> std::io::Result<()> {
    let app = router(Arc::new(AppState::from_config(&config)));
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("[StrideQuest] Listening on {}", addr);
    axum::serve(listener, app).await
}

// ============================================================================
// Request / response bodies
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct NearbyRequest {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub radius_km: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PositionRequest {
    pub trail_id: u64,
    pub checkpoint_index: usize,
    pub latitude: f64,
    pub longitude: f64,
}

/// A photo upload pulled out of the multipart form.
#[derive(Debug, Clone, Default)]
pub struct ChallengeUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub keyword: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Error half of every handler result.
#[derive(Debug)]
pub enum ApiError {
    Query(QueryError),
    /// A request body axum could not extract, with the status it chose.
    Rejected { status: StatusCode, message: String },
    BadRequest(String),
    Internal(String),
}

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self {
        ApiError::Query(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        ApiError::Rejected {
            status: e.status(),
            message: e.body_text(),
        }
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Query(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            ApiError::Query(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Rejected { status, .. } => *status,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            ApiError::Query(e) => e.to_string(),
            ApiError::Rejected { message, .. } => message,
            ApiError::BadRequest(msg) | ApiError::Internal(msg) => msg,
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn list_trails(State(state): State<SharedState>) -> Json<Vec<TrailSummary>> {
    Json(state.store.list())
}

async fn nearby_trails(
    State(state): State<SharedState>,
    body: Result<Json<NearbyRequest>, JsonRejection>,
) -> Result<Json<Vec<EnrichedTrail>>, ApiError> {
    let Json(request) = body?;
    let trails = state
        .store
        .find_nearby(request.latitude, request.longitude, request.radius_km)?;
    Ok(Json(trails))
}

async fn trail_detail(
    State(state): State<SharedState>,
    Path(trail_id): Path<u64>,
) -> Result<Json<EnrichedTrail>, ApiError> {
    state
        .store
        .get_by_id(trail_id)
        .map(Json)
        .ok_or(ApiError::Query(QueryError::TrailNotFound { trail_id }))
}

async fn check_progress(
    State(state): State<SharedState>,
    body: Result<Json<PositionRequest>, JsonRejection>,
) -> Result<Json<ArrivalStatus>, ApiError> {
    let Json(request) = body?;
    let checker = ProximityChecker::from_config(&state.store, &state.store_config);
    let status = checker.check(
        request.trail_id,
        request.checkpoint_index,
        request.latitude,
        request.longitude,
    )?;
    Ok(Json(status))
}

async fn validate_challenge(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<Json<PhotoVerdict>, ApiError> {
    let upload = read_upload(multipart).await?;
    assess_challenge(state, upload).await.map(Json)
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn read_upload(mut multipart: Multipart) -> Result<ChallengeUpload, ApiError> {
    let mut image = None;
    let mut keyword = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                image = Some((file_name, bytes.to_vec()));
            }
            "keyword" => {
                keyword = Some(field.text().await?);
            }
            _ => {}
        }
    }

    let (file_name, bytes) = image.ok_or_else(|| ApiError::BadRequest("Missing image".into()))?;
    let keyword = keyword.ok_or_else(|| ApiError::BadRequest("Missing keyword".into()))?;
    Ok(ChallengeUpload {
        file_name,
        bytes,
        keyword,
    })
}

/// Score an upload off the async runtime; keypoint matching is CPU-bound.
pub async fn assess_challenge(
    state: SharedState,
    upload: ChallengeUpload,
) -> Result<PhotoVerdict, ApiError> {
    tokio::task::spawn_blocking(move || {
        state
            .validator
            .assess_upload(&upload.file_name, &upload.bytes, &upload.keyword)
    })
    .await
    .map_err(|e| {
        warn!("[StrideQuest] Photo assessment task failed: {}", e);
        ApiError::Internal("Photo assessment failed".into())
    })
}
