// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides:
//! - Reading progress queries (read-only; written by the library side)
//! - Streak records (one document per reader, or `streaks/global`)

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use firestore::errors::{BackoffError, FirestoreError};
use futures_util::FutureExt;

use crate::db::{collections, PlannedUpdate, ProgressStore, StreakPlan, StreakStore};
use crate::error::{AppError, Result};
use crate::models::streak::streak_id;
use crate::models::{DailyProgress, ProgressEntry, StreakDefaults, StreakPatch, StreakRecord};

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
    defaults: StreakDefaults,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str, defaults: StreakDefaults) -> Result<Self> {
        // The emulator needs an unauthenticated connection
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id, defaults).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
            defaults,
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str, defaults: StreakDefaults) -> Result<Self> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
            defaults,
        })
    }

    /// Create an offline client for testing.
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self {
            client: None,
            defaults: StreakDefaults::default(),
        }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Append a reading progress entry under a generated document ID.
    ///
    /// Progress is normally written by the library side of the app; this is
    /// used for imports and integration tests.
    pub async fn insert_progress(&self, entry: &ProgressEntry) -> Result<()> {
        let _: ProgressEntry = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::READING_PROGRESS)
            .generate_document_id()
            .object(entry)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Streak Document Helpers ─────────────────────────────────

    async fn read_streak(&self, id: &str) -> Result<Option<StreakRecord>> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::STREAKS)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Read-modify-write of one streak document inside a transaction.
    ///
    /// The read goes through the transaction, so a concurrent commit to the
    /// same document makes Firestore retry the whole closure with fresh
    /// data and `plan` always sees the state it is about to overwrite.
    /// With `create_missing`, an absent document starts from a zeroed
    /// record; otherwise `None` is returned and nothing is written.
    async fn run_streak_transaction(
        &self,
        id: String,
        user_id: Option<u64>,
        plan: StreakPlan,
        create_missing: bool,
    ) -> Result<Option<PlannedUpdate>> {
        let defaults = self.defaults.clone();

        self.get_client()?
            .run_transaction(|db, transaction| {
                let id = id.clone();
                let defaults = defaults.clone();
                let plan = plan.clone();

                async move {
                    let existing: Option<StreakRecord> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::STREAKS)
                        .obj()
                        .one(&id)
                        .await?;

                    let now = Utc::now();
                    let (mut record, created) = match existing {
                        Some(record) => (record, false),
                        None if create_missing => {
                            (StreakRecord::new(user_id, &defaults, now), true)
                        }
                        None => return Ok(None),
                    };

                    let applied = plan(&record);
                    if let Some(patch) = &applied {
                        record.apply(patch, now);
                    }

                    if created || applied.is_some() {
                        db.fluent()
                            .update()
                            .in_col(collections::STREAKS)
                            .document_id(&id)
                            .object(&record)
                            .add_to_transaction(transaction)?;
                    }

                    Ok::<_, BackoffError<FirestoreError>>(Some(PlannedUpdate { record, applied }))
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::Database(format!("Streak transaction failed: {}", e)))
    }
}

#[async_trait]
impl ProgressStore for FirestoreDb {
    async fn get_all_progress_ordered(&self, user_id: Option<u64>) -> Result<Vec<ProgressEntry>> {
        let owner = streak_id(user_id);

        self.get_client()?
            .fluent()
            .select()
            .from(collections::READING_PROGRESS)
            .filter(move |q| q.for_all([q.field("owner").eq(owner.clone())]))
            .order_by([("date", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn get_progress_for_date(
        &self,
        user_id: Option<u64>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<DailyProgress>> {
        let owner = streak_id(user_id);

        let entries: Vec<ProgressEntry> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::READING_PROGRESS)
            .filter(move |q| {
                q.for_all([
                    q.field("owner").eq(owner.clone()),
                    q.field("date")
                        .greater_than_or_equal(firestore::FirestoreTimestamp(start)),
                    q.field("date").less_than(firestore::FirestoreTimestamp(end)),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if entries.is_empty() {
            return Ok(None);
        }

        Ok(Some(DailyProgress {
            pages_read: entries.iter().map(|e| u64::from(e.pages_read)).sum(),
        }))
    }
}

#[async_trait]
impl StreakStore for FirestoreDb {
    async fn get_or_create(&self, user_id: Option<u64>) -> Result<StreakRecord> {
        if let Some(record) = self.find_by_user_id(user_id).await? {
            return Ok(record);
        }

        // Created inside a transaction so a concurrent first write is not lost
        let keep: StreakPlan = Arc::new(|_: &StreakRecord| -> Option<StreakPatch> { None });
        let outcome = self.update_with(user_id, keep).await?;
        tracing::debug!(streak_id = %outcome.record.id, "Created streak record");
        Ok(outcome.record)
    }

    async fn find_by_user_id(&self, user_id: Option<u64>) -> Result<Option<StreakRecord>> {
        self.read_streak(&streak_id(user_id)).await
    }

    async fn update(&self, id: &str, patch: StreakPatch) -> Result<Option<StreakRecord>> {
        // Never creates, so the user_id passed along is unused
        let outcome = self
            .run_streak_transaction(id.to_string(), None, fixed_patch(patch), false)
            .await?;
        Ok(outcome.map(|o| o.record))
    }

    async fn upsert(&self, user_id: Option<u64>, patch: StreakPatch) -> Result<StreakRecord> {
        let id = streak_id(user_id);
        self.run_streak_transaction(id.clone(), user_id, fixed_patch(patch), true)
            .await?
            .map(|o| o.record)
            .ok_or_else(|| AppError::NotFound(format!("Streak record {} not found", id)))
    }

    async fn update_with(&self, user_id: Option<u64>, plan: StreakPlan) -> Result<PlannedUpdate> {
        let id = streak_id(user_id);
        self.run_streak_transaction(id.clone(), user_id, plan, true)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Streak record {} not found", id)))
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

/// A plan that applies the same patch regardless of the stored state.
fn fixed_patch(patch: StreakPatch) -> StreakPlan {
    Arc::new(move |_: &StreakRecord| Some(patch.clone()))
}
