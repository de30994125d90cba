use axum::{extract::FromRequestParts, http::request::Parts};
use common::identity::normalize_subject;
use common::storage::ContentHash;

use crate::config::AuthConfig;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::jwt;

/// Authenticated caller extracted from the `Authorization: Bearer <token>` header.
///
/// `user_id` is already normalized and is the id used in every table.
pub struct AuthUser {
    pub user_id: String,
}

impl AuthUser {
    /// Returns `Ok(())` if the caller is listed in `auth.moderators`.
    pub fn require_moderator(&self, config: &AuthConfig) -> Result<(), AppError> {
        let listed = config
            .moderators
            .iter()
            .filter_map(|m| normalize_subject(m))
            .any(|m| m == self.user_id);
        if listed {
            Ok(())
        } else {
            Err(AppError::PermissionDenied)
        }
    }
}

/// Like [`AuthUser`], but anonymous requests are allowed.
///
/// A present but invalid token is still rejected.
pub struct OptionalAuthUser(pub Option<AuthUser>);

/// Identity-provider event delivery, authorized with the shared webhook secret.
pub struct WebhookAuth;

fn bearer_token(parts: &Parts) -> Option<Result<&str, AppError>> {
    let header = parts.headers.get("Authorization")?;
    Some(
        header
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(AppError::TokenInvalid),
    )
}

/// Compare two secrets without leaking the position of the first mismatch.
///
/// Both sides are hashed first so the comparison length is fixed.
fn secrets_match(presented: &str, expected: &str) -> bool {
    let a = ContentHash::compute(presented.as_bytes());
    let b = ContentHash::compute(expected.as_bytes());
    a.as_bytes()
        .iter()
        .zip(b.as_bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

fn authenticate(token: &str, secret: &str) -> Result<AuthUser, AppError> {
    let claims = jwt::verify(token, secret).map_err(|_| AppError::TokenInvalid)?;
    let user_id = normalize_subject(&claims.sub).ok_or(AppError::TokenInvalid)?;
    Ok(AuthUser { user_id })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AppError::TokenMissing)??;
        authenticate(token, &state.config.auth.jwt_secret)
    }
}

impl FromRequestParts<AppState> for OptionalAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(parts) {
            None => Ok(OptionalAuthUser(None)),
            Some(token) => Ok(OptionalAuthUser(Some(authenticate(
                token?,
                &state.config.auth.jwt_secret,
            )?))),
        }
    }
}

impl FromRequestParts<AppState> for WebhookAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AppError::TokenMissing)??;
        match state.config.auth.webhook_secret.as_deref() {
            Some(secret) if !secret.is_empty() && secrets_match(token, secret) => Ok(WebhookAuth),
            // Unconfigured secret: refuse every delivery.
            Some(_) | None => Err(AppError::TokenInvalid),
        }
    }
}
