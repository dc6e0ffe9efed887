//! Shared-secret authentication for the cron endpoints
//!
//! The scheduler calling `/v1/cron/*` sends `Authorization: Bearer
//! <CRON_SECRET>`. Both sides are hashed with SHA-256 before comparing, so
//! the comparison time does not depend on the secret's length or on where
//! the first mismatch is.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use tipul_shared::auth::middleware::bearer_token;

use crate::{app::AppState, error::ApiError};

/// Compares two secrets through their SHA-256 digests in constant time
pub fn secrets_match(provided: &str, expected: &str) -> bool {
    let a = Sha256::digest(provided.as_bytes());
    let b = Sha256::digest(expected.as_bytes());

    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub async fn cron_auth_layer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.config.cron_secret.as_deref() else {
        tracing::warn!(path = %req.uri().path(), "CRON_SECRET is not set; cron endpoint called without authentication");
        return Ok(next.run(req).await);
    };

    let authorized = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .is_some_and(|token| secrets_match(token, expected));

    if !authorized {
        return Err(ApiError::Unauthorized("Unauthorized".to_string()));
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secrets_match() {
        assert!(secrets_match("cron-secret", "cron-secret"));
        assert!(!secrets_match("cron-secret", "cron-secreT"));
        assert!(!secrets_match("", "cron-secret"));
        assert!(!secrets_match("cron-secret-longer", "cron-secret"));
    }
}
