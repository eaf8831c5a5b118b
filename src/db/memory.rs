// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process store backed by `DashMap`.
//!
//! Used for local development (`STORAGE=memory`) and by tests, where each
//! test builds a fresh instance. Per-record atomicity comes from holding the
//! map's shard lock for the whole read-modify-write.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::db::{PlannedUpdate, ProgressStore, StreakPlan, StreakStore};
use crate::error::Result;
use crate::models::streak::streak_id;
use crate::models::{DailyProgress, ProgressEntry, StreakDefaults, StreakPatch, StreakRecord};

/// In-memory streak and progress store.
#[derive(Clone, Default)]
pub struct MemoryDb {
    defaults: StreakDefaults,
    streaks: Arc<DashMap<String, StreakRecord>>,
    progress: Arc<DashMap<String, Vec<ProgressEntry>>>,
}

impl MemoryDb {
    pub fn new(defaults: StreakDefaults) -> Self {
        Self {
            defaults,
            ..Default::default()
        }
    }

    /// Append a progress entry. Stands in for the library side of the app.
    pub fn log_progress(&self, user_id: Option<u64>, date: DateTime<Utc>, pages_read: u32) {
        let owner = streak_id(user_id);
        self.progress
            .entry(owner.clone())
            .or_default()
            .push(ProgressEntry {
                owner,
                user_id,
                book_id: None,
                date,
                pages_read,
            });
    }

    /// Number of stored streak records.
    pub fn streak_count(&self) -> usize {
        self.streaks.len()
    }
}

#[async_trait]
impl ProgressStore for MemoryDb {
    async fn get_all_progress_ordered(&self, user_id: Option<u64>) -> Result<Vec<ProgressEntry>> {
        let mut entries = self
            .progress
            .get(&streak_id(user_id))
            .map(|e| e.value().clone())
            .unwrap_or_default();
        entries.sort_by_key(|e| e.date);
        Ok(entries)
    }

    async fn get_progress_for_date(
        &self,
        user_id: Option<u64>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<DailyProgress>> {
        let Some(entries) = self.progress.get(&streak_id(user_id)) else {
            return Ok(None);
        };

        let pages: Vec<u64> = entries
            .iter()
            .filter(|e| e.date >= start && e.date < end)
            .map(|e| u64::from(e.pages_read))
            .collect();

        if pages.is_empty() {
            return Ok(None);
        }
        Ok(Some(DailyProgress {
            pages_read: pages.iter().sum(),
        }))
    }
}

#[async_trait]
impl StreakStore for MemoryDb {
    async fn get_or_create(&self, user_id: Option<u64>) -> Result<StreakRecord> {
        let record = self
            .streaks
            .entry(streak_id(user_id))
            .or_insert_with(|| StreakRecord::new(user_id, &self.defaults, Utc::now()));
        Ok(record.value().clone())
    }

    async fn find_by_user_id(&self, user_id: Option<u64>) -> Result<Option<StreakRecord>> {
        Ok(self
            .streaks
            .get(&streak_id(user_id))
            .map(|r| r.value().clone()))
    }

    async fn update(&self, id: &str, patch: StreakPatch) -> Result<Option<StreakRecord>> {
        Ok(self.streaks.get_mut(id).map(|mut record| {
            record.apply(&patch, Utc::now());
            record.value().clone()
        }))
    }

    async fn upsert(&self, user_id: Option<u64>, patch: StreakPatch) -> Result<StreakRecord> {
        let now = Utc::now();
        let mut record = self
            .streaks
            .entry(streak_id(user_id))
            .or_insert_with(|| StreakRecord::new(user_id, &self.defaults, now));
        record.apply(&patch, now);
        Ok(record.value().clone())
    }

    async fn update_with(&self, user_id: Option<u64>, plan: StreakPlan) -> Result<PlannedUpdate> {
        let now = Utc::now();
        let mut record = self
            .streaks
            .entry(streak_id(user_id))
            .or_insert_with(|| StreakRecord::new(user_id, &self.defaults, now));

        let applied = plan(record.value());
        if let Some(patch) = &applied {
            record.apply(patch, now);
        }

        Ok(PlannedUpdate {
            record: record.value().clone(),
            applied,
        })
    }

    async fn update_threshold(
        &self,
        user_id: Option<u64>,
        new_threshold: u32,
    ) -> Result<StreakRecord> {
        self.upsert(
            user_id,
            StreakPatch {
                daily_threshold: Some(new_threshold),
                ..Default::default()
            },
        )
        .await
    }
}
