// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT session token tests.
//!
//! These tests verify that tokens issued by `create_jwt` use the claim
//! layout and algorithm the auth middleware expects, catching
//! compatibility issues early.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use reading_streak::middleware::auth::{create_jwt, verify_jwt, Claims};
use std::time::{SystemTime, UNIX_EPOCH};

const SIGNING_KEY: &[u8] = b"test_signing_key_32_bytes_long!!";

fn unix_now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

#[test]
fn test_jwt_roundtrip() {
    let user_id = 12345678u64;
    let token = create_jwt(user_id, SIGNING_KEY).unwrap();

    // Decode the raw claims the way any HS256 consumer would
    let key = DecodingKey::from_secret(SIGNING_KEY);
    let validation = Validation::new(Algorithm::HS256);
    let token_data = decode::<Claims>(&token, &key, &validation)
        .expect("Failed to decode JWT - check Claims struct compatibility");

    assert_eq!(token_data.claims.sub, user_id.to_string());
    assert!(token_data.claims.exp > token_data.claims.iat);

    assert_eq!(verify_jwt(&token, SIGNING_KEY).unwrap(), user_id);
}

#[test]
fn test_jwt_expiration_is_future() {
    let token = create_jwt(12345, SIGNING_KEY).unwrap();

    let key = DecodingKey::from_secret(SIGNING_KEY);
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false; // We'll check manually

    let token_data = decode::<Claims>(&token, &key, &validation).unwrap();

    // Token should expire at least 29 days in the future
    assert!(
        token_data.claims.exp > unix_now() + 86400 * 29,
        "Token expiration should be ~30 days in the future"
    );
}

#[test]
fn test_expired_token_rejected() {
    let now = unix_now();
    let claims = Claims {
        sub: "42".to_string(),
        iat: now - 86400 * 2,
        exp: now - 86400,
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SIGNING_KEY),
    )
    .unwrap();

    assert!(verify_jwt(&token, SIGNING_KEY).is_err());
}

#[test]
fn test_non_numeric_subject_rejected() {
    let now = unix_now();
    let claims = Claims {
        sub: "reader@example.com".to_string(),
        iat: now,
        exp: now + 3600,
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SIGNING_KEY),
    )
    .unwrap();

    assert!(verify_jwt(&token, SIGNING_KEY).is_err());
}

#[test]
fn test_wrong_key_rejected() {
    let token = create_jwt(7, SIGNING_KEY).unwrap();
    assert!(verify_jwt(&token, b"a_completely_different_key_here!").is_err());
}
