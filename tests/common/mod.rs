// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use chrono::{DateTime, Utc};
use reading_streak::config::Config;
use reading_streak::db::{FirestoreDb, MemoryDb};
use reading_streak::middleware::auth::create_jwt;
use reading_streak::models::StreakDefaults;
use reading_streak::routes::create_router;
use reading_streak::services::StreakService;
use reading_streak::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection against the emulator.
#[allow(dead_code)]
pub async fn test_db(defaults: StreakDefaults) -> FirestoreDb {
    FirestoreDb::new("test-project", defaults)
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Parse an RFC3339 timestamp.
#[allow(dead_code)]
pub fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .expect("valid RFC3339 timestamp")
        .with_timezone(&Utc)
}

/// Streak defaults with the given threshold and timezone.
#[allow(dead_code)]
pub fn defaults(daily_threshold: u32, timezone: &str) -> StreakDefaults {
    StreakDefaults {
        daily_threshold,
        timezone: timezone.to_string(),
    }
}

/// A fresh service over a fresh in-memory store.
#[allow(dead_code)]
pub fn test_service(defaults: StreakDefaults) -> (StreakService, MemoryDb) {
    let db = MemoryDb::new(defaults.clone());
    let service = StreakService::new(Arc::new(db.clone()), Arc::new(db.clone()), defaults);
    (service, db)
}

/// Create a test app over an in-memory store.
/// Returns the router, the shared state and the store.
#[allow(dead_code)]
pub fn create_test_app_with(config: Config) -> (axum::Router, Arc<AppState>, MemoryDb) {
    let (streak_service, db) = test_service(config.streak_defaults());
    let state = Arc::new(AppState {
        config,
        streak_service,
    });
    (create_router(state.clone()), state, db)
}

#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, MemoryDb) {
    create_test_app_with(Config::test_default())
}

/// Create a session token the auth middleware accepts.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: u64, signing_key: &[u8]) -> String {
    create_jwt(user_id, signing_key).expect("Failed to create JWT")
}
