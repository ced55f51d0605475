//! HTTP client for the nearbite server's JSON API.
//!
//! Error bodies of the form `{"error": {"step" | "code", "message"}}` are
//! decoded into [`ClientError::Api`] so the CLI can report which stage of a
//! scan failed.

use std::time::Duration;

use nearbite_core::{Candidate, Page, ScanCursor};
use reqwest::{header, Client, Method, RequestBuilder, Response, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

const SESSION_COOKIE: &str = "mr_session";

#[derive(Debug, thiserror::Error)]
pub(crate) enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{label}: {message} (HTTP {status})")]
    Api {
        status: u16,
        label: String,
        message: String,
    },

    #[error("invalid server URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("server did not return a session cookie")]
    MissingSessionCookie,
}

impl ClientError {
    pub(crate) fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api { status: 401, .. })
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    step: Option<String>,
    code: Option<String>,
    message: String,
}

/// Where a scan session is anchored. Either `query` or `center` must be set;
/// the server rejects requests with neither.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct SearchParams {
    pub query: Option<String>,
    pub center: Option<(f64, f64)>,
    pub radius_km: Option<f64>,
}

impl SearchParams {
    fn query_pairs(&self, cursor: ScanCursor) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(5);
        if let Some(query) = &self.query {
            pairs.push(("query", query.clone()));
        }
        if let Some((lat, lng)) = self.center {
            pairs.push(("lat", lat.to_string()));
            pairs.push(("lng", lng.to_string()));
        }
        if let Some(radius_km) = self.radius_km {
            pairs.push(("radiusKm", radius_km.to_string()));
        }
        pairs.push(("scanIndex", cursor.to_string()));
        pairs
    }
}

#[derive(Debug, Deserialize)]
struct CandidatesResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VisitedList {
    place_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ImportResponse {
    imported: usize,
}

#[derive(Debug, Deserialize)]
struct MeResponse {
    authenticated: bool,
    username: Option<String>,
}

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ToggleBody<'a> {
    place_id: &'a str,
    visited: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportBody<'a> {
    place_ids: &'a [String],
}

pub(crate) struct ApiClient {
    client: Client,
    base: Url,
    session: Option<String>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base", &self.base.as_str())
            .field("session", &self.session.as_ref().map(|_| "[redacted]"))
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidBaseUrl`] if `base_url` does not parse,
    /// or [`ClientError::Http`] if the HTTP client cannot be built.
    pub(crate) fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        let mut base = Url::parse(base_url).map_err(|e| ClientError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            client,
            base,
            session: None,
        })
    }

    /// Attaches a `name=value` session cookie to every subsequent request.
    #[must_use]
    pub(crate) fn with_session(mut self, cookie: Option<String>) -> Self {
        self.session = cookie;
        self
    }

    pub(crate) fn has_session(&self) -> bool {
        self.session.is_some()
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let url = self
            .base
            .join(path)
            .map_err(|e| ClientError::InvalidBaseUrl {
                url: format!("{}{path}", self.base),
                reason: e.to_string(),
            })?;
        let mut builder = self.client.request(method, url);
        if let Some(cookie) = &self.session {
            builder = builder.header(header::COOKIE, cookie);
        }
        Ok(builder)
    }

    /// Fetches one scan page.
    pub(crate) async fn search(
        &self,
        params: &SearchParams,
        cursor: ScanCursor,
    ) -> Result<Page, ClientError> {
        let response = self
            .request(Method::GET, "api/search")?
            .query(&params.query_pairs(cursor))
            .send()
            .await?;
        decode(response).await
    }

    pub(crate) async fn resolve(&self, query: &str) -> Result<Vec<Candidate>, ClientError> {
        let response = self
            .request(Method::GET, "api/resolve")?
            .query(&[("query", query)])
            .send()
            .await?;
        let body: CandidatesResponse = decode(response).await?;
        Ok(body.candidates)
    }

    /// Logs in and returns the `name=value` session cookie to persist.
    pub(crate) async fn login(&self, username: &str, password: &str) -> Result<String, ClientError> {
        let response = self
            .request(Method::POST, "api/auth/login")?
            .json(&Credentials { username, password })
            .send()
            .await?;
        let cookie = session_cookie(&response);
        let _: serde_json::Value = decode(response).await?;
        cookie.ok_or(ClientError::MissingSessionCookie)
    }

    pub(crate) async fn logout(&self) -> Result<(), ClientError> {
        let response = self
            .request(Method::POST, "api/auth/logout")?
            .json(&serde_json::json!({}))
            .send()
            .await?;
        let _: serde_json::Value = decode(response).await?;
        Ok(())
    }

    /// The username the current session belongs to, if any.
    pub(crate) async fn me(&self) -> Result<Option<String>, ClientError> {
        let response = self.request(Method::GET, "api/auth/me")?.send().await?;
        let body: MeResponse = decode(response).await?;
        Ok(body.username.filter(|_| body.authenticated))
    }

    pub(crate) async fn list_visited(&self) -> Result<Vec<String>, ClientError> {
        let response = self.request(Method::GET, "api/visited")?.send().await?;
        let body: VisitedList = decode(response).await?;
        Ok(body.place_ids)
    }

    pub(crate) async fn set_visited(&self, place_id: &str, visited: bool) -> Result<(), ClientError> {
        let response = self
            .request(Method::POST, "api/visited")?
            .json(&ToggleBody { place_id, visited })
            .send()
            .await?;
        let _: serde_json::Value = decode(response).await?;
        Ok(())
    }

    /// Bulk-imports place ids; returns the count the server accepted.
    pub(crate) async fn import_visited(&self, place_ids: &[String]) -> Result<usize, ClientError> {
        let response = self
            .request(Method::POST, "api/visited")?
            .json(&ImportBody { place_ids })
            .send()
            .await?;
        let body: ImportResponse = decode(response).await?;
        Ok(body.imported)
    }
}

fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .map(str::trim)
        .find(|pair| {
            pair.strip_prefix(SESSION_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
                .is_some_and(|value| !value.is_empty())
        })
        .map(str::to_owned)
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let (label, message) = match serde_json::from_str::<ErrorEnvelope>(&text) {
        Ok(envelope) => (
            envelope
                .error
                .step
                .or(envelope.error.code)
                .unwrap_or_else(|| "error".to_owned()),
            envelope.error.message,
        ),
        Err(_) => ("error".to_owned(), text),
    };
    Err(ClientError::Api {
        status: status.as_u16(),
        label,
        message,
    })
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
