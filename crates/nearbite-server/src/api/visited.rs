use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::middleware::{CurrentUser, RequestId};

use super::{map_db_error, require_pool, ApiError, AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct VisitedList {
    place_ids: Vec<String>,
}

/// Either a single toggle or a bulk import of place ids.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum VisitedUpdate {
    Import {
        #[serde(rename = "placeIds")]
        place_ids: Vec<String>,
    },
    Toggle {
        #[serde(rename = "placeId")]
        place_id: String,
        visited: bool,
    },
}

#[derive(Debug, Serialize)]
pub(super) struct VisitedUpdateResponse {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    imported: Option<usize>,
}

fn require_user(user: CurrentUser) -> Result<String, ApiError> {
    user.0.ok_or_else(ApiError::unauthorized)
}

pub(super) async fn list_visited(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<VisitedList>, ApiError> {
    let user_id = require_user(user)?;
    let pool = require_pool(&state)?;

    let rows = nearbite_db::list_visited(pool, &user_id)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e))?;

    Ok(Json(VisitedList {
        place_ids: rows.into_iter().map(|r| r.place_id).collect(),
    }))
}

pub(super) async fn update_visited(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<CurrentUser>,
    body: Result<Json<VisitedUpdate>, JsonRejection>,
) -> Result<Json<VisitedUpdateResponse>, ApiError> {
    let user_id = require_user(user)?;
    let Json(update) = body.map_err(|_| ApiError::bad_request("Invalid payload"))?;
    let pool = require_pool(&state)?;

    match update {
        VisitedUpdate::Import { place_ids } => {
            let imported = nearbite_db::import_visited(pool, &user_id, &place_ids)
                .await
                .map_err(|e| map_db_error(&req_id.0, &e))?;
            tracing::info!(request_id = %req_id.0, imported, "imported visited marks");
            Ok(Json(VisitedUpdateResponse {
                ok: true,
                imported: Some(imported),
            }))
        }
        VisitedUpdate::Toggle { place_id, visited } => {
            let place_id = place_id.trim();
            if place_id.is_empty() {
                return Err(ApiError::bad_request("Invalid payload"));
            }
            let result = if visited {
                nearbite_db::mark_visited(pool, &user_id, place_id).await
            } else {
                nearbite_db::unmark_visited(pool, &user_id, place_id)
                    .await
                    .map(|_| ())
            };
            result.map_err(|e| map_db_error(&req_id.0, &e))?;
            Ok(Json(VisitedUpdateResponse {
                ok: true,
                imported: None,
            }))
        }
    }
}
