//! Codephrase login and the session-cookie gate in front of the API.
//!
//! A successful login sets a `tp_auth=1` cookie; every route outside the
//! public list requires that cookie. The codephrase itself is never stored,
//! only its SHA-256 hex digest.

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};

use super::AppState;
use crate::error::AppError;

pub const AUTH_COOKIE_NAME: &str = "tp_auth";

const SESSION_MAX_AGE_SECS: i64 = 30 * 24 * 60 * 60;

/// Routes reachable without a session cookie.
const PUBLIC_PATHS: [&str; 4] = ["/health", "/ready", "/api/auth/login", "/api/auth/logout"];

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub codephrase: String,
}

/// SHA-256 hex digest of a codephrase, the form it is stored and compared in.
pub fn hash_codephrase(codephrase: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(codephrase.as_bytes());
    hex::encode(hasher.finalize())
}

fn session_cookie(max_age_secs: i64) -> String {
    format!(
        "{}=1; HttpOnly; SameSite=Lax; Path=/; Secure; Max-Age={}",
        AUTH_COOKIE_NAME, max_age_secs
    )
}

fn has_session_cookie(headers: &HeaderMap) -> bool {
    let cookies = match headers.get(header::COOKIE).and_then(|v| v.to_str().ok()) {
        Some(c) => c,
        None => return false,
    };

    cookies
        .split(';')
        .filter_map(|part| part.trim().split_once('='))
        .any(|(name, value)| name == AUTH_COOKIE_NAME && value == "1")
}

/// Middleware guarding everything outside [`PUBLIC_PATHS`].
pub async fn require_auth(req: Request, next: Next) -> Response {
    if PUBLIC_PATHS.contains(&req.uri().path()) {
        return next.run(req).await;
    }

    if has_session_cookie(req.headers()) {
        return next.run(req).await;
    }

    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"ok": false, "error": "unauthorized"})),
    )
        .into_response()
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let stored = state.repo.get_codephrase_hash().await?;
    let presented = hash_codephrase(&body.codephrase);

    // A missing stored hash rejects every codephrase rather than
    // accepting all of them.
    if stored.as_deref() != Some(presented.as_str()) {
        return Ok((
            StatusCode::UNAUTHORIZED,
            Json(json!({"ok": false, "error": "Invalid codephrase"})),
        )
            .into_response());
    }

    Ok((
        [(header::SET_COOKIE, session_cookie(SESSION_MAX_AGE_SECS))],
        Json(json!({"ok": true})),
    )
        .into_response())
}

pub async fn logout() -> Response {
    (
        [(header::SET_COOKIE, session_cookie(0))],
        Json(json!({"ok": true})),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_hash_codephrase_is_hex_sha256() {
        let digest = hash_codephrase("letmein");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(digest, hash_codephrase("letmein"));
        assert_ne!(digest, hash_codephrase("letmeout"));
    }

    #[test]
    fn test_session_cookie_shape() {
        let cookie = session_cookie(2592000);
        assert!(cookie.starts_with("tp_auth=1; "));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.ends_with("Max-Age=2592000"));
        assert!(session_cookie(0).ends_with("Max-Age=0"));
    }

    #[test]
    fn test_session_cookie_detected_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; tp_auth=1; lang=en"),
        );
        assert!(has_session_cookie(&headers));
    }

    #[test]
    fn test_wrong_or_missing_cookie_rejected() {
        let mut headers = HeaderMap::new();
        assert!(!has_session_cookie(&headers));

        headers.insert(header::COOKIE, HeaderValue::from_static("tp_auth=0"));
        assert!(!has_session_cookie(&headers));

        headers.insert(header::COOKIE, HeaderValue::from_static("tp_auth_extra=1"));
        assert!(!has_session_cookie(&headers));
    }
}
