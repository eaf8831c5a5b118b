// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Reading streak record and its partial-update form.
//!
//! One record exists per reader, or a single global record when the
//! server runs in single-user mode.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::time_utils::{resolve_timezone, BASELINE_TIMEZONE};

/// Store key of the record used when multi-user mode is disabled.
pub const GLOBAL_STREAK_ID: &str = "global";

pub const MIN_DAILY_THRESHOLD: u32 = 1;
pub const MAX_DAILY_THRESHOLD: u32 = 9999;

/// Store key for a reader's streak record.
pub fn streak_id(user_id: Option<u64>) -> String {
    match user_id {
        Some(id) => id.to_string(),
        None => GLOBAL_STREAK_ID.to_string(),
    }
}

/// Values applied to records created lazily on first access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreakDefaults {
    pub daily_threshold: u32,
    pub timezone: String,
}

impl Default for StreakDefaults {
    fn default() -> Self {
        Self {
            daily_threshold: MIN_DAILY_THRESHOLD,
            timezone: BASELINE_TIMEZONE.name().to_string(),
        }
    }
}

/// Persisted streak state for one reader.
///
/// Stored at: `streaks/{user_id | "global"}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StreakRecord {
    /// Document ID (user id, or "global")
    pub id: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number | null"))]
    pub user_id: Option<u64>,

    // ─── Streak State ────────────────────────────────────────────
    /// Consecutive qualifying days ending at the last qualifying day
    #[serde(default)]
    pub current_streak: u32,
    /// Best run ever observed
    #[serde(default)]
    pub longest_streak: u32,
    /// Distinct qualifying days, lifetime
    #[serde(default)]
    pub total_days_active: u32,
    /// Most recent day that contributed to the streak state
    #[serde(default)]
    pub last_activity_date: Option<NaiveDate>,
    /// First day of the current run
    #[serde(default)]
    pub streak_start_date: Option<NaiveDate>,

    // ─── Settings ────────────────────────────────────────────────
    /// Pages that must be read in a day for it to qualify
    pub daily_threshold: u32,
    /// IANA timezone used for every day-boundary decision
    pub user_timezone: String,

    // ─── Day-boundary Guard ──────────────────────────────────────
    /// Last day the reset guard ran
    #[serde(default)]
    pub last_checked_date: Option<NaiveDate>,

    // ─── Metadata ────────────────────────────────────────────────
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StreakRecord {
    /// A zeroed record with default settings.
    pub fn new(user_id: Option<u64>, defaults: &StreakDefaults, now: DateTime<Utc>) -> Self {
        Self {
            id: streak_id(user_id),
            user_id,
            current_streak: 0,
            longest_streak: 0,
            total_days_active: 0,
            last_activity_date: None,
            streak_start_date: None,
            daily_threshold: defaults.daily_threshold,
            user_timezone: resolve_timezone(&defaults.timezone, BASELINE_TIMEZONE)
                .name()
                .to_string(),
            last_checked_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The reader's timezone, or UTC if the stored name is unusable.
    pub fn timezone(&self) -> Tz {
        resolve_timezone(&self.user_timezone, BASELINE_TIMEZONE)
    }

    /// Apply a partial update in place.
    pub fn apply(&mut self, patch: &StreakPatch, now: DateTime<Utc>) {
        if let Some(v) = patch.current_streak {
            self.current_streak = v;
        }
        if let Some(v) = patch.longest_streak {
            self.longest_streak = v;
        }
        if let Some(v) = patch.total_days_active {
            self.total_days_active = v;
        }
        if let Some(v) = patch.last_activity_date {
            self.last_activity_date = v;
        }
        if let Some(v) = patch.streak_start_date {
            self.streak_start_date = v;
        }
        if let Some(v) = patch.daily_threshold {
            self.daily_threshold = v;
        }
        if let Some(v) = &patch.user_timezone {
            self.user_timezone = v.clone();
        }
        if let Some(v) = patch.last_checked_date {
            self.last_checked_date = v;
        }
        self.updated_at = now;
    }
}

/// Partial update of a [`StreakRecord`].
///
/// `None` leaves a field untouched. Nullable dates use a nested `Option`
/// so a patch can clear them with `Some(None)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreakPatch {
    pub current_streak: Option<u32>,
    pub longest_streak: Option<u32>,
    pub total_days_active: Option<u32>,
    pub last_activity_date: Option<Option<NaiveDate>>,
    pub streak_start_date: Option<Option<NaiveDate>>,
    pub daily_threshold: Option<u32>,
    pub user_timezone: Option<String>,
    pub last_checked_date: Option<Option<NaiveDate>>,
}

/// Streak record as shown to a reader, with derived fields.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StreakView {
    #[serde(flatten)]
    #[cfg_attr(feature = "binding-generation", ts(flatten))]
    pub record: StreakRecord,
    /// Whole hours until the next local midnight
    pub hours_remaining_today: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_streak_id() {
        assert_eq!(streak_id(None), GLOBAL_STREAK_ID);
        assert_eq!(streak_id(Some(42)), "42");
    }

    #[test]
    fn test_new_record_is_zeroed() {
        let defaults = StreakDefaults {
            daily_threshold: 20,
            timezone: "Europe/Paris".to_string(),
        };
        let record = StreakRecord::new(Some(7), &defaults, now());

        assert_eq!(record.id, "7");
        assert_eq!(record.current_streak, 0);
        assert_eq!(record.longest_streak, 0);
        assert_eq!(record.total_days_active, 0);
        assert_eq!(record.daily_threshold, 20);
        assert_eq!(record.user_timezone, "Europe/Paris");
        assert!(record.last_activity_date.is_none());
        assert!(record.last_checked_date.is_none());
    }

    #[test]
    fn test_new_record_replaces_invalid_timezone() {
        let defaults = StreakDefaults {
            daily_threshold: 1,
            timezone: "Nowhere/Special".to_string(),
        };
        let record = StreakRecord::new(None, &defaults, now());
        assert_eq!(record.user_timezone, "UTC");
        assert_eq!(record.timezone(), chrono_tz::UTC);
    }

    #[test]
    fn test_apply_patch_sets_and_clears() {
        let mut record = StreakRecord::new(None, &StreakDefaults::default(), now());
        let day = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();

        record.apply(
            &StreakPatch {
                current_streak: Some(3),
                longest_streak: Some(5),
                streak_start_date: Some(Some(day)),
                ..Default::default()
            },
            now(),
        );
        assert_eq!(record.current_streak, 3);
        assert_eq!(record.longest_streak, 5);
        assert_eq!(record.streak_start_date, Some(day));

        record.apply(
            &StreakPatch {
                streak_start_date: Some(None),
                ..Default::default()
            },
            now(),
        );
        assert_eq!(record.streak_start_date, None);
        assert_eq!(record.current_streak, 3);
    }

    #[test]
    fn test_view_serializes_flat() {
        let record = StreakRecord::new(Some(1), &StreakDefaults::default(), now());
        let view = StreakView {
            record,
            hours_remaining_today: 11,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["current_streak"], 0);
        assert_eq!(json["hours_remaining_today"], 11);
        assert_eq!(json["user_timezone"], "UTC");
    }
}
