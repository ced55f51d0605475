use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, StatusCode},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::middleware::{CurrentUser, RequestId};

use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct LoginBody {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct LoginResponse {
    ok: bool,
    username: String,
}

#[derive(Debug, Serialize)]
pub(super) struct OkResponse {
    ok: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct MeResponse {
    authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
}

fn cookie_header(value: &str) -> Result<HeaderMap, ApiError> {
    let value = HeaderValue::from_str(value).map_err(|_| {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "could not encode session cookie",
        )
    })?;
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, value);
    Ok(headers)
}

pub(super) async fn login(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<LoginBody>, JsonRejection>,
) -> Result<(HeaderMap, Json<LoginResponse>), ApiError> {
    let Json(body) = body.map_err(|_| ApiError::bad_request("Invalid JSON body"))?;
    let username = body.username.unwrap_or_default().trim().to_owned();
    let password = body.password.unwrap_or_default();
    if username.is_empty() || password.is_empty() {
        return Err(ApiError::bad_request("Missing username or password"));
    }

    let Some(valid) = state.sessions.check_credentials(&username, &password) else {
        tracing::error!(request_id = %req_id.0, "login attempted but account is not configured");
        return Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "config",
            "Login is not configured",
        ));
    };
    if !valid {
        tracing::warn!(request_id = %req_id.0, "login rejected");
        return Err(ApiError::new(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "Invalid credentials",
        ));
    }

    let Some(keys) = state.sessions.keys() else {
        return Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "config",
            "Login is not configured",
        ));
    };
    let token = keys.issue(&username, chrono::Utc::now().timestamp());
    let headers = cookie_header(&keys.set_cookie(&token))?;

    tracing::info!(request_id = %req_id.0, username = %username, "login succeeded");
    Ok((headers, Json(LoginResponse { ok: true, username })))
}

pub(super) async fn logout(
    State(state): State<AppState>,
) -> Result<(HeaderMap, Json<OkResponse>), ApiError> {
    let headers = match state.sessions.keys() {
        Some(keys) => cookie_header(&keys.clear_cookie())?,
        None => HeaderMap::new(),
    };
    Ok((headers, Json(OkResponse { ok: true })))
}

pub(super) async fn me(Extension(user): Extension<CurrentUser>) -> Json<MeResponse> {
    Json(MeResponse {
        authenticated: user.0.is_some(),
        username: user.0,
    })
}
