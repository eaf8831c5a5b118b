// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated readers.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::streak::{MAX_DAILY_THRESHOLD, MIN_DAILY_THRESHOLD};
use crate::models::{StreakRecord, StreakView};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/streak", get(get_streak))
        .route("/api/streak/update", post(update_streak))
        .route("/api/streak/rebuild", post(rebuild_streak))
        .route("/api/streak/threshold", put(update_threshold))
}

// ─── Streak ──────────────────────────────────────────────────

/// Streak response with the result of today's reset check.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StreakResponse {
    #[serde(flatten)]
    #[cfg_attr(feature = "binding-generation", ts(flatten))]
    pub streak: StreakView,
    /// True if this request broke a stale streak
    pub streak_reset: bool,
}

/// Get the reader's streak.
///
/// Runs the day-boundary guard first so a streak that lapsed overnight is
/// never shown as alive.
async fn get_streak(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<StreakResponse>> {
    let owner = state.config.streak_owner(user.user_id);

    let streak_reset = state
        .streak_service
        .check_and_reset_if_needed(owner)
        .await?;
    let streak = state.streak_service.get_streak(owner).await?;

    Ok(Json(StreakResponse {
        streak,
        streak_reset,
    }))
}

/// Fold today's progress into the streak. Called after each progress write.
async fn update_streak(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<StreakRecord>> {
    let owner = state.config.streak_owner(user.user_id);
    let record = state.streak_service.update_streaks(owner).await?;
    Ok(Json(record))
}

/// Recompute the streak from all history.
async fn rebuild_streak(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<StreakRecord>> {
    let owner = state.config.streak_owner(user.user_id);
    tracing::info!(user_id = user.user_id, ?owner, "Streak rebuild requested");
    let record = state.streak_service.rebuild_streak(owner, None).await?;
    Ok(Json(record))
}

// ─── Threshold ───────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct ThresholdRequest {
    #[validate(range(min = 1, max = 9999))]
    pub daily_threshold: i64,
}

/// Change the daily page threshold. Past days are re-evaluated.
async fn update_threshold(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: std::result::Result<Json<ThresholdRequest>, JsonRejection>,
) -> Result<Json<StreakRecord>> {
    let Json(request) = payload.map_err(threshold_rejection)?;
    request.validate().map_err(|_| {
        AppError::Validation(format!(
            "daily_threshold must be between {} and {}",
            MIN_DAILY_THRESHOLD, MAX_DAILY_THRESHOLD
        ))
    })?;

    let owner = state.config.streak_owner(user.user_id);
    let record = state
        .streak_service
        .update_threshold(owner, request.daily_threshold)
        .await?;
    Ok(Json(record))
}

fn threshold_rejection(rejection: JsonRejection) -> AppError {
    match rejection {
        // Well-formed JSON with the wrong shape, e.g. a fractional number
        JsonRejection::JsonDataError(e) => {
            AppError::Validation(format!("daily_threshold must be an integer: {}", e.body_text()))
        }
        other => AppError::BadRequest(other.body_text()),
    }
}
