//! Signed session cookie for the single configured account.
//!
//! Cookie value: `base64url(json{u, iat}) "." base64url(HMAC-SHA256(secret, payload))`.

use axum::http::{header::COOKIE, HeaderMap};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use nearbite_core::AccountConfig;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "mr_session";
pub const SESSION_MAX_AGE_SECS: i64 = 180 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session secret cannot be used as an HMAC key")]
    InvalidSecret,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    u: String,
    iat: i64,
}

/// Issues and verifies session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    mac: HmacSha256,
    secure: bool,
}

impl SessionKeys {
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidSecret`] if the HMAC cannot be keyed.
    pub fn new(secret: &str, secure: bool) -> Result<Self, SessionError> {
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| SessionError::InvalidSecret)?;
        Ok(Self { mac, secure })
    }

    fn signature(&self, payload: &str) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    /// Builds a token for `username` issued at unix time `now`.
    #[must_use]
    pub fn issue(&self, username: &str, now: i64) -> String {
        let claims = Claims {
            u: username.to_owned(),
            iat: now,
        };
        // Serializing a String and an i64 cannot fail.
        let json = serde_json::to_vec(&claims).unwrap_or_default();
        let payload = URL_SAFE_NO_PAD.encode(json);
        let sig = URL_SAFE_NO_PAD.encode(self.signature(&payload));
        format!("{payload}.{sig}")
    }

    /// Returns the username for a valid, unexpired token.
    #[must_use]
    pub fn verify(&self, token: &str, now: i64) -> Option<String> {
        let (payload, sig) = token.split_once('.')?;
        let sig = URL_SAFE_NO_PAD.decode(sig).ok()?;

        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.verify_slice(&sig).ok()?;

        let json = URL_SAFE_NO_PAD.decode(payload).ok()?;
        let claims: Claims = serde_json::from_slice(&json).ok()?;
        if claims.u.is_empty() || now - claims.iat > SESSION_MAX_AGE_SECS {
            return None;
        }
        Some(claims.u)
    }

    #[must_use]
    pub fn set_cookie(&self, token: &str) -> String {
        self.cookie(token, SESSION_MAX_AGE_SECS)
    }

    #[must_use]
    pub fn clear_cookie(&self) -> String {
        self.cookie("", 0)
    }

    fn cookie(&self, value: &str, max_age: i64) -> String {
        let mut cookie =
            format!("{SESSION_COOKIE}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Login configuration: present only when username, password and secret
/// are all configured.
#[derive(Clone, Default)]
pub struct SessionState {
    inner: Option<Configured>,
}

#[derive(Clone)]
struct Configured {
    username: String,
    password: String,
    keys: SessionKeys,
}

impl SessionState {
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidSecret`] if the secret cannot key the HMAC.
    pub fn new(account: Option<&AccountConfig>, secure: bool) -> Result<Self, SessionError> {
        let inner = match account {
            Some(account) => Some(Configured {
                username: account.username.clone(),
                password: account.password.clone(),
                keys: SessionKeys::new(&account.session_secret, secure)?,
            }),
            None => None,
        };
        Ok(Self { inner })
    }

    #[must_use]
    pub fn keys(&self) -> Option<&SessionKeys> {
        self.inner.as_ref().map(|c| &c.keys)
    }

    /// Constant-time credential check. `None` when login is not configured.
    #[must_use]
    pub fn check_credentials(&self, username: &str, password: &str) -> Option<bool> {
        let configured = self.inner.as_ref()?;
        let user_ok = configured.username.as_bytes().ct_eq(username.as_bytes());
        let pass_ok = configured.password.as_bytes().ct_eq(password.as_bytes());
        Some(bool::from(user_ok & pass_ok))
    }

    /// Username of the session carried by `headers`, if any.
    #[must_use]
    pub fn authenticate(&self, headers: &HeaderMap, now: i64) -> Option<String> {
        let keys = self.keys()?;
        let token = cookie_value(headers, SESSION_COOKIE)?;
        keys.verify(token, now)
    }
}

/// Finds a cookie by name across all `Cookie` headers.
pub(crate) fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    const NOW: i64 = 1_760_000_000;

    fn keys() -> SessionKeys {
        SessionKeys::new("test-secret", false).unwrap()
    }

    fn account() -> AccountConfig {
        AccountConfig {
            username: "mika".to_owned(),
            password: "hunter2".to_owned(),
            session_secret: "test-secret".to_owned(),
        }
    }

    #[test]
    fn issued_token_verifies() {
        let token = keys().issue("mika", NOW);
        assert_eq!(keys().verify(&token, NOW + 60).as_deref(), Some("mika"));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let token = keys().issue("mika", NOW);
        let (_, sig) = token.split_once('.').unwrap();
        let forged_payload = URL_SAFE_NO_PAD.encode(br#"{"u":"admin","iat":1760000000}"#);
        assert!(keys().verify(&format!("{forged_payload}.{sig}"), NOW).is_none());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let other = SessionKeys::new("other-secret", false).unwrap();
        let token = other.issue("mika", NOW);
        assert!(keys().verify(&token, NOW).is_none());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = keys().issue("mika", NOW);
        assert!(keys().verify(&token, NOW + SESSION_MAX_AGE_SECS + 1).is_none());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(keys().verify("not-a-token", NOW).is_none());
        assert!(keys().verify("a.b", NOW).is_none());
    }

    #[test]
    fn cookie_attributes() {
        let cookie = keys().set_cookie("abc");
        assert!(cookie.starts_with("mr_session=abc; "));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=15552000"));
        assert!(!cookie.contains("Secure"));

        let secure = SessionKeys::new("s", true).unwrap();
        assert!(secure.clear_cookie().ends_with("Max-Age=0; Secure"));
    }

    #[test]
    fn credentials_are_checked() {
        let state = SessionState::new(Some(&account()), false).unwrap();
        assert_eq!(state.check_credentials("mika", "hunter2"), Some(true));
        assert_eq!(state.check_credentials("mika", "hunter3"), Some(false));
        assert_eq!(state.check_credentials("", ""), Some(false));
        assert_eq!(SessionState::default().check_credentials("a", "b"), None);
    }

    #[test]
    fn authenticate_reads_cookie_header() {
        let state = SessionState::new(Some(&account()), false).unwrap();
        let token = state.keys().unwrap().issue("mika", NOW);
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("theme=dark; mr_session={token}")).unwrap(),
        );
        assert_eq!(state.authenticate(&headers, NOW).as_deref(), Some("mika"));
        assert!(state.authenticate(&HeaderMap::new(), NOW).is_none());
    }
}
