// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Frame Shell server
//!
//! Holds the session for a set of embedded frames and answers their
//! messages over HTTP.

use anyhow::Context;
use frame_shell::{config::Config, services::FileStorage, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging()?;

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        port = config.port,
        api_base_url = %config.api_base_url,
        frames = config.frames.len(),
        "Starting Frame Shell"
    );

    let storage = FileStorage::open(&config.storage_path).with_context(|| {
        format!(
            "Failed to open credential storage at {}",
            config.storage_path.display()
        )
    })?;
    tracing::info!(path = %storage.path().display(), "Credential storage opened");

    let state = AppState::new(config.clone(), Arc::new(storage))?;
    tracing::info!(session = state.session.state().label(), "Session restored");

    let app = frame_shell::routes::create_router(Arc::new(state));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("frame_shell=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
