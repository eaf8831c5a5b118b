// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reading Streak API Server
//!
//! Tracks consecutive days of reading from the progress log and serves the
//! streak to the reading-tracker frontend.

use reading_streak::{
    config::{Config, StorageBackend},
    db::{FirestoreDb, MemoryDb, ProgressStore, StreakStore},
    services::StreakService,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        storage = ?config.storage,
        multi_user = config.multi_user,
        default_timezone = %config.default_timezone,
        default_daily_threshold = config.default_daily_threshold,
        "Starting Reading Streak API"
    );

    let (progress, streaks): (Arc<dyn ProgressStore>, Arc<dyn StreakStore>) = match config.storage
    {
        StorageBackend::Firestore => {
            let db = FirestoreDb::new(&config.gcp_project_id, config.streak_defaults()).await?;
            (Arc::new(db.clone()), Arc::new(db))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            let db = MemoryDb::new(config.streak_defaults());
            (Arc::new(db.clone()), Arc::new(db))
        }
    };

    let streak_service = StreakService::new(progress, streaks, config.streak_defaults());

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        streak_service,
    });

    // Build router
    let app = reading_streak::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("reading_streak=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
