//! Database layer: store interfaces consumed by the streak engine, plus the
//! Firestore and in-memory implementations.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{DailyProgress, ProgressEntry, StreakPatch, StreakRecord};

/// Collection names as constants.
pub mod collections {
    /// Reading progress events (written by the library side)
    pub const READING_PROGRESS: &str = "reading_progress";
    /// Streak records (keyed by user id, or "global")
    pub const STREAKS: &str = "streaks";
}

/// Read-only view of the reading progress log.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Every progress entry for the reader, oldest first.
    async fn get_all_progress_ordered(&self, user_id: Option<u64>) -> Result<Vec<ProgressEntry>>;

    /// Pages read within `[start, end)`, or `None` if nothing was logged.
    async fn get_progress_for_date(
        &self,
        user_id: Option<u64>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<DailyProgress>>;
}

/// Decides how a streak record changes, given its current stored state.
///
/// May be called more than once when a store retries on contention, so it
/// must not have side effects. `None` means leave the record as it is.
pub type StreakPlan = Arc<dyn Fn(&StreakRecord) -> Option<StreakPatch> + Send + Sync>;

/// Result of [`StreakStore::update_with`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedUpdate {
    /// The record as stored after the update
    pub record: StreakRecord,
    /// The patch the plan produced, if any was written
    pub applied: Option<StreakPatch>,
}

/// Storage for streak records.
///
/// Implementations must make `update`, `upsert` and `update_with` atomic
/// read-modify-writes of a single record.
#[async_trait]
pub trait StreakStore: Send + Sync {
    /// Load the reader's record, creating a zeroed one if absent.
    async fn get_or_create(&self, user_id: Option<u64>) -> Result<StreakRecord>;

    async fn find_by_user_id(&self, user_id: Option<u64>) -> Result<Option<StreakRecord>>;

    /// Apply `patch` to the record with this id. `None` if it does not exist.
    async fn update(&self, id: &str, patch: StreakPatch) -> Result<Option<StreakRecord>>;

    /// Apply `patch` to the reader's record, creating it first if needed.
    async fn upsert(&self, user_id: Option<u64>, patch: StreakPatch) -> Result<StreakRecord>;

    /// Run `plan` against the freshly read record and apply its patch in the
    /// same atomic step. The record is created first if needed.
    async fn update_with(&self, user_id: Option<u64>, plan: StreakPlan) -> Result<PlannedUpdate>;

    async fn update_threshold(&self, user_id: Option<u64>, new_threshold: u32)
        -> Result<StreakRecord>;
}
