// 🌐 HTTP API - REST surface over the registration core
//
// Every request runs its own one-shot registration session; sessions share
// nothing but the store. Same-day duplicates are 409, bad names 400, store
// trouble 503 (retryable).

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::entities::{AttendanceRecord, EnsureOutcome, Name};
use crate::error::CheckInError;
use crate::orchestrator::Orchestrator;
use crate::store::CheckInStore;
use crate::temporal::Clock;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn CheckInStore>,
    clock: Arc<dyn Clock>,
    store_timeout: Option<Duration>,
    recent_limit: usize,
}

impl AppState {
    pub fn new(store: Arc<dyn CheckInStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            store_timeout: None,
            recent_limit: 50,
        }
    }

    pub fn with_store_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit;
        self
    }

    /// Fresh session for one request.
    fn session(&self) -> Orchestrator {
        Orchestrator::new(Arc::clone(&self.store), Arc::clone(&self.clock))
            .with_store_timeout(self.store_timeout)
    }
}

/// API Response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

#[derive(Debug)]
pub struct ApiError(CheckInError);

impl From<CheckInError> for ApiError {
    fn from(err: CheckInError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CheckInError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            CheckInError::AlreadyRegisteredToday { .. } => StatusCode::CONFLICT,
            CheckInError::StoreUnavailable(e) => {
                error!(error = %e, "store unavailable");
                StatusCode::SERVICE_UNAVAILABLE
            }
        };

        let body = ApiResponse {
            success: false,
            data: (),
            error: Some(self.0.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

// ============================================================================
// Request / Response types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct NamesQuery {
    #[serde(default)]
    pub search: Option<String>,
    /// Only names not yet checked in today
    #[serde(default)]
    pub available: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct NameRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckInResponse {
    pub record: AttendanceRecord,
    pub name_added: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TodayStatus {
    pub name: Name,
    pub checked_in: bool,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/names?search=&available= - Roster, optionally filtered
async fn get_names(
    State(state): State<AppState>,
    Query(query): Query<NamesQuery>,
) -> ApiResult<Vec<Name>> {
    let session = state.session();
    let search = query.search.unwrap_or_default();

    let names = if query.available.unwrap_or(false) {
        session.available_names(&search).await?
    } else {
        session.search(&search).await?
    };
    Ok(Json(ApiResponse::ok(names)))
}

/// POST /api/names - Add a name without checking in
async fn add_name(
    State(state): State<AppState>,
    Json(request): Json<NameRequest>,
) -> Result<(StatusCode, Json<ApiResponse<EnsureOutcome>>), ApiError> {
    let mut session = state.session();
    let outcome = session.add_name(&request.name).await?;

    let status = if outcome.already_present {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(ApiResponse::ok(outcome))))
}

/// GET /api/attendance?limit= - Most recent check-ins, newest first
async fn get_recent(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> ApiResult<Vec<AttendanceRecord>> {
    let limit = query.limit.unwrap_or(state.recent_limit);
    let records = state.session().list_recent(limit).await?;
    Ok(Json(ApiResponse::ok(records)))
}

/// GET /api/attendance/today - Today's check-ins, oldest first
async fn get_today(State(state): State<AppState>) -> ApiResult<Vec<AttendanceRecord>> {
    let records = state.session().todays_attendance().await?;
    Ok(Json(ApiResponse::ok(records)))
}

/// GET /api/attendance/:name/today - Has this name checked in today?
async fn get_today_status(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> ApiResult<TodayStatus> {
    // `Path` has already percent-decoded the segment
    let name = Name::parse(&raw)?;
    let checked_in = state.session().has_checked_in_today(&name).await?;
    Ok(Json(ApiResponse::ok(TodayStatus { name, checked_in })))
}

/// POST /api/check-in - Register a name for today
async fn check_in(
    State(state): State<AppState>,
    Json(request): Json<NameRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CheckInResponse>>), ApiError> {
    let mut session = state.session();
    let check_in = session.submit(Some(&request.name)).await?;

    info!(name = %check_in.record.name, "checked in via api");
    let response = CheckInResponse {
        record: check_in.record,
        name_added: check_in.name_added,
        message: session.status().to_string(),
    };
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(response))))
}

/// All `/api` routes, state applied.
pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/names", get(get_names).post(add_name))
        .route("/attendance", get(get_recent))
        .route("/attendance/today", get(get_today))
        .route("/attendance/:name/today", get(get_today_status))
        .route("/check-in", post(check_in))
        .with_state(state);

    Router::new().nest("/api", api_routes)
}
