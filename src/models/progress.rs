// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Reading progress events and per-day aggregates.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::time_utils::calendar_day;

/// A single logged reading session.
///
/// Written by the library side of the application; the streak engine only
/// reads these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEntry {
    /// Owner key ("global" or user id), used for store queries
    pub owner: String,
    /// Reader (None in single-user mode)
    pub user_id: Option<u64>,
    /// Book the pages belong to, if known
    #[serde(default)]
    pub book_id: Option<u64>,
    /// When the progress was logged
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub date: DateTime<Utc>,
    /// Pages read in this session
    pub pages_read: u32,
}

/// Pages read over one calendar-day interval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DailyProgress {
    pub pages_read: u64,
}

/// Pages read per calendar day, bucketed in a reader's timezone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DailyActivity {
    days: BTreeMap<NaiveDate, u64>,
}

impl DailyActivity {
    /// Sum entries into calendar days of `tz`.
    pub fn from_entries<'a, I>(entries: I, tz: Tz) -> Self
    where
        I: IntoIterator<Item = &'a ProgressEntry>,
    {
        let mut days = BTreeMap::new();
        for entry in entries {
            *days.entry(calendar_day(entry.date, tz)).or_insert(0) += u64::from(entry.pages_read);
        }
        Self { days }
    }

    /// Days meeting `threshold`, ascending.
    pub fn qualifying_days(&self, threshold: u32) -> Vec<NaiveDate> {
        self.days
            .iter()
            .filter(|&(_, &pages)| pages >= u64::from(threshold))
            .map(|(&day, _)| day)
            .collect()
    }
}
