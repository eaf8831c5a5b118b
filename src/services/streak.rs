// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reading streak engine.
//!
//! Derives "consecutive days read" from the progress log. There are two
//! write paths that must agree:
//! 1. `update_streaks`: incremental, looks only at today's pages
//! 2. `rebuild_streak`: recomputes everything from the full history
//!
//! plus the once-per-day reset guard and the threshold mutator. Every day
//! boundary is computed in the reader's timezone via `time_utils`.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::db::{ProgressStore, StreakStore};
use crate::error::{AppError, Result};
use crate::models::streak::{MAX_DAILY_THRESHOLD, MIN_DAILY_THRESHOLD};
use crate::models::{
    DailyActivity, ProgressEntry, StreakDefaults, StreakPatch, StreakRecord, StreakView,
};
use crate::time_utils::{
    day_bounds_utc, days_between, format_utc_rfc3339, hours_remaining_today, resolve_timezone,
    today_in, BASELINE_TIMEZONE,
};

/// Streak engine over a progress log and a streak record store.
#[derive(Clone)]
pub struct StreakService {
    progress: Arc<dyn ProgressStore>,
    streaks: Arc<dyn StreakStore>,
    defaults: StreakDefaults,
}

impl StreakService {
    pub fn new(
        progress: Arc<dyn ProgressStore>,
        streaks: Arc<dyn StreakStore>,
        defaults: StreakDefaults,
    ) -> Self {
        Self {
            progress,
            streaks,
            defaults,
        }
    }

    // ─── Day-boundary Guard ──────────────────────────────────────

    /// Zero a stale streak, at most once per calendar day.
    ///
    /// Returns `true` if a reset happened. Must run before any user-visible
    /// read of `current_streak`.
    pub async fn check_and_reset_if_needed(&self, user_id: Option<u64>) -> Result<bool> {
        self.check_and_reset_if_needed_at(user_id, Utc::now()).await
    }

    pub async fn check_and_reset_if_needed_at(
        &self,
        user_id: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let outcome = self
            .streaks
            .update_with(user_id, Arc::new(move |record: &StreakRecord| guard_patch(record, now)))
            .await?;

        let record = &outcome.record;
        let Some(patch) = outcome.applied else {
            tracing::debug!(streak_id = %record.id, "Streak already checked today");
            return Ok(false);
        };

        let reset = patch.current_streak == Some(0);
        if reset {
            tracing::info!(
                streak_id = %record.id,
                last_activity = ?record.last_activity_date,
                today = ?record.last_checked_date,
                "Streak reset after missed day"
            );
        }

        Ok(reset)
    }

    // ─── Read Path ───────────────────────────────────────────────

    /// The reader's streak plus hours left in their day.
    pub async fn get_streak(&self, user_id: Option<u64>) -> Result<StreakView> {
        self.get_streak_at(user_id, Utc::now()).await
    }

    pub async fn get_streak_at(&self, user_id: Option<u64>, now: DateTime<Utc>) -> Result<StreakView> {
        let record = self.streaks.get_or_create(user_id).await?;
        let hours_remaining_today = hours_remaining_today(now, record.timezone());
        Ok(StreakView {
            record,
            hours_remaining_today,
        })
    }

    // ─── Incremental Update ──────────────────────────────────────

    /// Fold today's progress into the streak.
    ///
    /// The caller must invoke this after every progress write: a day that
    /// crosses the threshold is only noticed when this runs again.
    pub async fn update_streaks(&self, user_id: Option<u64>) -> Result<StreakRecord> {
        self.update_streaks_at(user_id, Utc::now()).await
    }

    pub async fn update_streaks_at(
        &self,
        user_id: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<StreakRecord> {
        let tz = self
            .streaks
            .find_by_user_id(user_id)
            .await?
            .map(|record| record.timezone())
            .unwrap_or_else(|| self.default_timezone());
        let today = today_in(tz, now);
        let (start, end) = day_bounds_utc(today, tz);

        let today_pages = self
            .progress
            .get_progress_for_date(user_id, start, end)
            .await?
            .map(|p| p.pages_read)
            .unwrap_or(0);

        // Decided against the stored record inside the store's atomic step,
        // so a concurrent guard reset or update is never overwritten
        let outcome = self
            .streaks
            .update_with(
                user_id,
                Arc::new(move |record: &StreakRecord| plan_update(record, today, today_pages)),
            )
            .await?;
        let record = outcome.record;

        if outcome.applied.is_none() {
            tracing::debug!(
                streak_id = %record.id,
                %today,
                today_pages,
                threshold = record.daily_threshold,
                "Streak unchanged"
            );
            return Ok(record);
        }

        tracing::info!(
            streak_id = %record.id,
            %today,
            today_pages,
            current_streak = record.current_streak,
            longest_streak = record.longest_streak,
            total_days_active = record.total_days_active,
            "Streak updated"
        );

        Ok(record)
    }

    // ─── Full Rebuild ────────────────────────────────────────────

    /// Recompute the streak from the complete progress history.
    ///
    /// `now` defaults to the current time. Overwrites the stored counters;
    /// threshold and timezone are kept.
    pub async fn rebuild_streak(
        &self,
        user_id: Option<u64>,
        now: Option<DateTime<Utc>>,
    ) -> Result<StreakRecord> {
        self.rebuild_streak_at(user_id, now.unwrap_or_else(Utc::now))
            .await
    }

    pub async fn rebuild_streak_at(
        &self,
        user_id: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<StreakRecord> {
        let (threshold, tz) = match self.streaks.find_by_user_id(user_id).await? {
            Some(record) => (record.daily_threshold, record.timezone()),
            None => (self.defaults.daily_threshold, self.default_timezone()),
        };

        let entries = self.progress.get_all_progress_ordered(user_id).await?;
        let summary = compute_rebuild(&entries, threshold, tz, today_in(tz, now));

        let record = self.streaks.upsert(user_id, summary.to_patch()).await?;

        tracing::info!(
            streak_id = %record.id,
            entries = entries.len(),
            threshold,
            as_of = %format_utc_rfc3339(now),
            current_streak = record.current_streak,
            longest_streak = record.longest_streak,
            total_days_active = record.total_days_active,
            "Streak rebuilt"
        );

        Ok(record)
    }

    // ─── Threshold ───────────────────────────────────────────────

    /// Change the daily page threshold and re-evaluate all history with it.
    pub async fn update_threshold(
        &self,
        user_id: Option<u64>,
        new_threshold: i64,
    ) -> Result<StreakRecord> {
        self.update_threshold_at(user_id, new_threshold, Utc::now())
            .await
    }

    pub async fn update_threshold_at(
        &self,
        user_id: Option<u64>,
        new_threshold: i64,
        now: DateTime<Utc>,
    ) -> Result<StreakRecord> {
        let threshold = validate_threshold(new_threshold)?;

        let record = self.streaks.update_threshold(user_id, threshold).await?;
        tracing::info!(streak_id = %record.id, threshold, "Daily threshold changed");

        self.rebuild_streak_at(user_id, now).await
    }

    fn default_timezone(&self) -> Tz {
        resolve_timezone(&self.defaults.timezone, BASELINE_TIMEZONE)
    }
}

/// Check a requested daily threshold against the allowed range.
pub fn validate_threshold(value: i64) -> Result<u32> {
    u32::try_from(value)
        .ok()
        .filter(|t| (MIN_DAILY_THRESHOLD..=MAX_DAILY_THRESHOLD).contains(t))
        .ok_or_else(|| {
            AppError::Validation(format!(
                "daily_threshold must be between {} and {}, got {}",
                MIN_DAILY_THRESHOLD, MAX_DAILY_THRESHOLD, value
            ))
        })
}

/// Position of today relative to the last activity day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DayGap {
    SameDay,
    NextDay,
    /// More than one day, or no previous activity at all
    Gap,
}

impl DayGap {
    fn between(last_activity: Option<NaiveDate>, today: NaiveDate) -> Self {
        let Some(last) = last_activity else {
            return DayGap::Gap;
        };
        match days_between(last, today) {
            1 => DayGap::NextDay,
            d if d > 1 => DayGap::Gap,
            0 => DayGap::SameDay,
            d => {
                // Last activity is "after" today, e.g. the timezone moved west.
                tracing::warn!(%last, %today, days = d, "Last activity is in the future");
                DayGap::SameDay
            }
        }
    }
}

/// Decide whether the day-boundary guard changes a record.
///
/// Runs at most once per calendar day: after it has stamped
/// `last_checked_date`, later calls the same day return `None`.
fn guard_patch(record: &StreakRecord, now: DateTime<Utc>) -> Option<StreakPatch> {
    let today = today_in(record.timezone(), now);
    if record.last_checked_date == Some(today) {
        return None;
    }

    let stale = record.current_streak > 0
        && !matches!(
            DayGap::between(record.last_activity_date, today),
            DayGap::SameDay | DayGap::NextDay
        );

    Some(StreakPatch {
        last_checked_date: Some(Some(today)),
        current_streak: stale.then_some(0),
        ..Default::default()
    })
}

/// Decide how today's page count changes a record.
///
/// Returns `None` when the record is already consistent with today. A fresh
/// zeroed record that meets the threshold starts a streak of 1.
fn plan_update(record: &StreakRecord, today: NaiveDate, today_pages: u64) -> Option<StreakPatch> {
    if today_pages == 0 {
        return None;
    }

    let threshold_met = today_pages >= u64::from(record.daily_threshold);
    let gap = DayGap::between(record.last_activity_date, today);

    match (gap, threshold_met) {
        // First qualifying update today after a non-qualifying state
        (DayGap::SameDay, true) if record.current_streak == 0 => Some(StreakPatch {
            current_streak: Some(1),
            longest_streak: Some(record.longest_streak.max(1)),
            total_days_active: Some(record.total_days_active.max(1)),
            last_activity_date: Some(Some(today)),
            streak_start_date: Some(Some(today)),
            ..Default::default()
        }),
        // Threshold raised during the day; today no longer qualifies
        (DayGap::SameDay, false) if record.current_streak > 0 => Some(StreakPatch {
            current_streak: Some(0),
            last_activity_date: Some(Some(today)),
            ..Default::default()
        }),
        (DayGap::SameDay, _) => None,
        // New day below threshold; may still qualify before midnight
        (_, false) => None,
        (DayGap::NextDay, true) => {
            let current = record.current_streak.saturating_add(1);
            Some(StreakPatch {
                current_streak: Some(current),
                longest_streak: Some(record.longest_streak.max(current)),
                total_days_active: Some(record.total_days_active.saturating_add(1)),
                last_activity_date: Some(Some(today)),
                streak_start_date: (record.current_streak == 0 || record.streak_start_date.is_none())
                    .then_some(Some(today)),
                ..Default::default()
            })
        }
        (DayGap::Gap, true) => Some(StreakPatch {
            current_streak: Some(1),
            longest_streak: Some(record.longest_streak.max(1)),
            total_days_active: Some(record.total_days_active.saturating_add(1)),
            last_activity_date: Some(Some(today)),
            streak_start_date: Some(Some(today)),
            ..Default::default()
        }),
    }
}

/// Streak counters derived from the full progress history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreakSummary {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_days_active: u32,
    pub last_activity_date: Option<NaiveDate>,
    pub streak_start_date: Option<NaiveDate>,
}

impl StreakSummary {
    fn to_patch(self) -> StreakPatch {
        StreakPatch {
            current_streak: Some(self.current_streak),
            longest_streak: Some(self.longest_streak),
            total_days_active: Some(self.total_days_active),
            last_activity_date: Some(self.last_activity_date),
            streak_start_date: Some(self.streak_start_date),
            ..Default::default()
        }
    }
}

/// Recompute streak counters from every progress entry.
///
/// Days are bucketed in `tz`; a run still counts as current if its last
/// day is today or yesterday.
pub fn compute_rebuild(
    entries: &[ProgressEntry],
    threshold: u32,
    tz: Tz,
    today: NaiveDate,
) -> StreakSummary {
    let qualifying = DailyActivity::from_entries(entries, tz).qualifying_days(threshold);

    let mut longest = 0u32;
    let mut run_len = 0u32;
    let mut run_start = None;
    let mut previous: Option<NaiveDate> = None;

    for &day in &qualifying {
        match previous {
            Some(prev) if days_between(prev, day) == 1 => run_len += 1,
            _ => {
                run_len = 1;
                run_start = Some(day);
            }
        }
        longest = longest.max(run_len);
        previous = Some(day);
    }

    let alive = previous.is_some_and(|last| days_between(last, today) <= 1);

    StreakSummary {
        current_streak: if alive { run_len } else { 0 },
        longest_streak: longest,
        total_days_active: u32::try_from(qualifying.len()).unwrap_or(u32::MAX),
        last_activity_date: previous,
        streak_start_date: if alive { run_start } else { None },
    }
}
