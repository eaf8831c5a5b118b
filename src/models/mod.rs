// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod progress;
pub mod streak;

pub use progress::{DailyActivity, DailyProgress, ProgressEntry};
pub use streak::{StreakDefaults, StreakPatch, StreakRecord, StreakView};
