use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
        HeaderMap,
    },
};

use crate::error::QuestError;
use crate::modules::sessions::SessionDatabase;

use super::{blocking, state::AppState};

const SESSION_COOKIE: &str = "session_token";

/// User id of the session attached to the request. Rejects with 401 when there is none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthenticatedUser {
    type Rejection = QuestError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).ok_or(QuestError::Unauthorized)?;
        let database = state.database.clone();
        let now = state.clock.now();

        blocking(move || database.find_session_user(&token, now))
            .await?
            .map(AuthenticatedUser)
            .ok_or(QuestError::Unauthorized)
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// The whole `Authorization` header must read exactly `Bearer <secret>`.
pub fn cron_authorized(headers: &HeaderMap, secret: &str) -> bool {
    let Some(header) = headers.get(AUTHORIZATION) else {
        return false;
    };

    constant_time_eq(header.as_bytes(), format!("Bearer {secret}").as_bytes())
}

// Timing only depends on the lengths.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Bearer header first, then the `session_token` cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = bearer_token(headers) {
        return Some(token.to_string());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}
