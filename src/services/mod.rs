// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod streak;

pub use streak::{compute_rebuild, validate_threshold, StreakService, StreakSummary};
