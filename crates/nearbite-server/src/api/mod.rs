mod auth;
mod search;
mod visited;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use nearbite_core::AppConfig;
use nearbite_places::PlacesClient;
use nearbite_search::{ScanError, ScanOrchestrator, Step};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{enforce_rate_limit, load_session, request_id, RateLimitState};
use crate::session::SessionState;
use crate::signed::DbSignedLookup;

pub type Orchestrator = ScanOrchestrator<PlacesClient, DbSignedLookup>;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub pool: Option<PgPool>,
    pub sessions: SessionState,
}

impl AppState {
    /// Wires the orchestrator and session handling from configuration.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client or session keys cannot be built.
    pub fn from_config(config: &AppConfig, pool: Option<PgPool>) -> anyhow::Result<Self> {
        let gateway = match config.google_maps_api_key.as_deref() {
            Some(key) => Some(PlacesClient::new(
                key,
                config.places_timeout_secs,
                config.places_max_retries,
                config.places_retry_backoff_ms,
            )?),
            None => {
                tracing::warn!("GOOGLE_MAPS_API_KEY not set; search routes will return config errors");
                None
            }
        };
        let sessions = SessionState::new(config.account.as_ref(), config.is_production())?;
        Ok(Self::new(gateway, pool, sessions, config.enrich_concurrency))
    }

    #[must_use]
    pub fn new(
        gateway: Option<PlacesClient>,
        pool: Option<PgPool>,
        sessions: SessionState,
        enrich_concurrency: usize,
    ) -> Self {
        let orchestrator = ScanOrchestrator::new(gateway)
            .with_signed_lookup(pool.clone().map(DbSignedLookup::new))
            .with_enrich_concurrency(enrich_concurrency);
        Self {
            orchestrator: Arc::new(orchestrator),
            pool,
            sessions,
        }
    }
}

/// Error response: `{"error": {"step" | "code", "message"}}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorEnvelope,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    step: Option<Step>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorEnvelope {
                error: ErrorBody {
                    step: None,
                    code: Some(code),
                    message: message.into(),
                },
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", "Unauthorized")
    }

    /// Converts a scan failure, logging it against the request id.
    pub fn from_scan(request_id: &str, err: &ScanError) -> Self {
        match err.step() {
            Step::Unknown => {
                tracing::error!(request_id, error = %err, "unexpected scan failure");
            }
            Step::Validation => {
                tracing::debug!(request_id, error = %err, "rejected scan request");
            }
            step => {
                tracing::warn!(request_id, step = %step, error = %err, "scan request failed");
            }
        }
        Self {
            status: StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body: ErrorEnvelope {
                error: ErrorBody {
                    step: Some(err.step()),
                    code: None,
                    message: err.public_message(),
                },
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub(super) fn map_db_error(request_id: &str, error: &nearbite_db::DbError) -> ApiError {
    tracing::error!(request_id, error = %error, "database query failed");
    ApiError::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "database query failed",
    )
}

/// The configured pool, or a 500 when the deployment has no database.
pub(super) fn require_pool(state: &AppState) -> Result<&PgPool, ApiError> {
    state.pool.as_ref().ok_or_else(|| {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "config",
            "Missing DATABASE_URL",
        )
    })
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::COOKIE,
            HeaderName::from_static("x-request-id"),
        ])
}

fn provider_router(rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/search", get(search::search))
        .route("/api/resolve", get(search::resolve))
        .route("/api/place", get(search::place))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ))
}

pub fn build_app(state: AppState, rate_limit: RateLimitState) -> Router {
    let account_routes = Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route(
            "/api/visited",
            get(visited::list_visited).post(visited::update_visited),
        );

    Router::new()
        .route("/api/health", get(health))
        .merge(provider_router(rate_limit))
        .merge(account_routes)
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id))
                .layer(axum::middleware::from_fn_with_state(
                    state.sessions.clone(),
                    load_session,
                )),
        )
        .with_state(state)
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
    places: &'static str,
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let places = if state.orchestrator.is_configured() {
        "configured"
    } else {
        "not_configured"
    };

    let Some(pool) = state.pool.as_ref() else {
        return (
            StatusCode::OK,
            Json(HealthData {
                status: "ok",
                database: "not_configured",
                places,
            }),
        );
    };

    match nearbite_db::health_check(pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthData {
                status: "ok",
                database: "ok",
                places,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthData {
                    status: "degraded",
                    database: "unavailable",
                    places,
                }),
            )
        }
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
