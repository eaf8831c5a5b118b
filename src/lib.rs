// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Reading Streak: consecutive-days-read tracking for a reading log
//!
//! This crate provides the streak engine and the backend API that exposes
//! it. Streaks are derived from logged reading progress, under a per-reader
//! daily page threshold and timezone.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use services::StreakService;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub streak_service: StreakService,
}
