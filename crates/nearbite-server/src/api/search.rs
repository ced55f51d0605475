use axum::{
    extract::{Query, State},
    Extension, Json,
};
use nearbite_core::{Candidate, EnrichedResult, Page, ScanCursor};
use nearbite_search::PageRequest;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{ApiError, AppState};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SearchQuery {
    pub query: Option<String>,
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub radius_km: Option<String>,
    pub scan_index: Option<String>,
}

/// Non-numeric input becomes NaN so range validation rejects it in order
/// with the other checks.
fn parse_number(raw: &str) -> f64 {
    raw.trim().parse::<f64>().unwrap_or(f64::NAN)
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.filter(|s| !s.trim().is_empty())
}

impl SearchQuery {
    pub(super) fn into_page_request(self) -> PageRequest {
        let center = match (non_blank(self.lat.as_deref()), non_blank(self.lng.as_deref())) {
            (Some(lat), Some(lng)) => Some((parse_number(lat), parse_number(lng))),
            _ => None,
        };
        PageRequest {
            query: self.query.filter(|q| !q.trim().is_empty()),
            center,
            radius_km: non_blank(self.radius_km.as_deref()).map(parse_number),
            cursor: ScanCursor::from_param(self.scan_index.as_deref()),
        }
    }
}

pub(super) async fn search(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Page>, ApiError> {
    let request = query.into_page_request();
    let page = state
        .orchestrator
        .fetch_page(&request)
        .await
        .map_err(|e| ApiError::from_scan(&req_id.0, &e))?;
    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
pub(super) struct ResolveQuery {
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct ResolveResponse {
    candidates: Vec<Candidate>,
}

pub(super) async fn resolve(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ResolveQuery>,
) -> Result<Json<ResolveResponse>, ApiError> {
    let candidates = state
        .orchestrator
        .resolve_text(query.query.as_deref().unwrap_or_default())
        .await
        .map_err(|e| ApiError::from_scan(&req_id.0, &e))?;
    Ok(Json(ResolveResponse { candidates }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PlaceQuery {
    pub place_id: Option<String>,
}

pub(super) async fn place(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<PlaceQuery>,
) -> Result<Json<EnrichedResult>, ApiError> {
    let result = state
        .orchestrator
        .fetch_place(query.place_id.as_deref().unwrap_or_default())
        .await
        .map_err(|e| ApiError::from_scan(&req_id.0, &e))?;
    Ok(Json(result))
}
