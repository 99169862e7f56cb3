// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Frame message route.
//!
//! A remote frame POSTs an envelope; the reply envelope comes back as the
//! response body. The `Origin` header must be allow-listed and must match the
//! origin configured for the named frame. Dropped or ignored messages get an
//! empty `204` so the transport leaks nothing about why.

use crate::bridge::{FrameHandle, ReplySlot, RouteOutcome};
use crate::error::{Result, ShellError};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::Value;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/frames/{frame}/messages", post(post_message))
}

async fn post_message(
    State(state): State<Arc<AppState>>,
    Path(frame_name): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Result<Response> {
    let frame = state
        .config
        .frame(&frame_name)
        .ok_or_else(|| ShellError::InvalidRequest(format!("unknown frame: {}", frame_name)))?;

    let origin = headers
        .get(header::ORIGIN)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();

    if crate::bridge::origin::normalize_origin(origin).as_deref() != Some(frame.origin.as_str()) {
        tracing::debug!(frame = %frame_name, origin, "Origin does not match frame, dropping");
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let (slot, reply) = ReplySlot::channel();
    let handle = FrameHandle::new(frame.name.clone(), frame.origin.clone(), Arc::new(slot));

    match state.router.dispatch(&handle, origin, &payload).await {
        RouteOutcome::Replied(_) => match reply.await {
            Ok(posted) => Ok(Json(posted.payload).into_response()),
            Err(_) => Err(ShellError::Internal(anyhow::anyhow!("reply was not delivered"))),
        },
        RouteOutcome::Rejected | RouteOutcome::Ignored => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}
