// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT authentication middleware.

use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Session cookie holding the JWT.
pub const SESSION_COOKIE: &str = "reading_token";

/// Session lifetime for issued tokens.
const SESSION_TTL_SECS: usize = 30 * 24 * 60 * 60;

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (reader's user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Authenticated user extracted from JWT.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
}

/// Middleware that requires valid JWT authentication.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // Try cookie first, then header
    let token = match jar.get(SESSION_COOKIE) {
        Some(cookie) => cookie.value().to_string(),
        None => request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::to_string)
            .ok_or(StatusCode::UNAUTHORIZED)?,
    };

    let user_id = verify_jwt(&token, &state.config.jwt_signing_key).map_err(|e| {
        tracing::debug!(error = %e, "Rejected session token");
        StatusCode::UNAUTHORIZED
    })?;

    request.extensions_mut().insert(AuthUser { user_id });

    Ok(next.run(request).await)
}

/// Decode a session token and return the user ID it was issued for.
pub fn verify_jwt(token: &str, signing_key: &[u8]) -> anyhow::Result<u64> {
    let key = DecodingKey::from_secret(signing_key);
    let validation = Validation::new(Algorithm::HS256);
    let token_data = decode::<Claims>(token, &key, &validation)?;
    Ok(token_data.claims.sub.parse()?)
}

/// Create a JWT for a user session.
pub fn create_jwt(user_id: u64, signing_key: &[u8]) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + SESSION_TTL_SECS,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"unit_test_signing_key_32_bytes!!";

    #[test]
    fn test_jwt_roundtrip() {
        let token = create_jwt(4242, KEY).unwrap();
        assert_eq!(verify_jwt(&token, KEY).unwrap(), 4242);
    }

    #[test]
    fn test_jwt_rejects_wrong_key() {
        let token = create_jwt(4242, KEY).unwrap();
        assert!(verify_jwt(&token, b"some_other_key_entirely_32bytes!").is_err());
    }

    #[test]
    fn test_jwt_rejects_non_numeric_subject() {
        use jsonwebtoken::{encode, EncodingKey, Header};

        let claims = Claims {
            sub: "alice".to_string(),
            iat: 0,
            exp: usize::MAX / 2,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(KEY))
            .unwrap();
        assert!(verify_jwt(&token, KEY).is_err());
    }
}
