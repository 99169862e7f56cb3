// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session state routes.

use crate::models::UserSession;
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/session", get(get_session))
        .route("/api/session/logout", post(logout))
}

/// Current authentication state.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "bindings/"))]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub state: String,
    pub authenticated: bool,
    pub user: Option<UserSession>,
}

async fn get_session(State(state): State<Arc<AppState>>) -> Json<SessionResponse> {
    let session = state.session.state();
    Json(SessionResponse {
        state: session.label().to_string(),
        authenticated: session.user().is_some(),
        user: session.user().cloned(),
    })
}

/// Log out. Always succeeds locally, even if the backend call fails.
async fn logout(State(state): State<Arc<AppState>>) -> StatusCode {
    state.session.logout().await;
    StatusCode::NO_CONTENT
}
