// src/api/auth.rs

use actix_web::http::header::AUTHORIZATION;
use actix_web::HttpRequest;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::config::AuthSettings;

#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("auth service request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("auth service error status={0}")]
    Status(u16),
}

/// Token from `Authorization: Bearer <token>`, if any.
pub fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Exchanges the caller's access token for a user via `GET {auth}/auth/v1/user`.
///
/// `Ok(None)` means no valid session: no token, or the service refused it.
pub async fn resolve_user(
    http: &reqwest::Client,
    settings: AuthSettings<'_>,
    token: Option<&str>,
) -> Result<Option<AuthUser>, AuthError> {
    let Some(token) = token else {
        return Ok(None);
    };

    let resp = http
        .get(format!("{}/auth/v1/user", settings.base_url))
        .header("apikey", settings.api_key.expose())
        .bearer_auth(token)
        .send()
        .await?;

    match resp.status() {
        s if s.is_success() => Ok(Some(resp.json::<AuthUser>().await?)),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(None),
        s => Err(AuthError::Status(s.as_u16())),
    }
}
