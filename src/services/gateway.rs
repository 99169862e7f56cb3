// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP gateway: the single choke point for backend calls.
//!
//! Handles:
//! - Bearer token decoration from the credential store
//! - Single-flight refresh when a call is rejected with 401
//! - Transparent replay of rejected calls after the refresh settles
//! - Session invalidation when the refresh itself fails
//!
//! Non-401 failures (including timeouts) pass through to the caller unchanged
//! and are never retried.

use crate::config::Config;
use crate::error::{RefreshFailure, Result, ShellError};
use crate::models::tokens::RefreshTokenRequest;
use crate::models::{RefreshTokenResponse, TokenPair};
use crate::services::credentials::CredentialStore;
use crate::services::refresh::{RefreshOutcome, RefreshState, RefreshTicket};
use crate::services::session::SessionSignal;
use futures_util::FutureExt;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const REFRESH_PATH: &str = "/auth/refresh-token";
pub const LOGOUT_PATH: &str = "/auth/logout";

/// A replayable backend request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body: Some(body),
        }
    }

    /// POST without a body.
    pub fn post_empty(path: impl Into<String>) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body: None,
        }
    }
}

/// Result of one attempt, before 401 interception.
enum Attempt {
    Success(Value),
    Unauthorized,
}

struct GatewayInner {
    http: reqwest::Client,
    base_url: String,
    credentials: CredentialStore,
    refresh: RefreshState,
    session: SessionSignal,
}

/// Authenticated backend client. Cheap to clone; clones share the refresh slot.
#[derive(Clone)]
pub struct HttpGateway {
    inner: Arc<GatewayInner>,
}

impl HttpGateway {
    pub fn new(config: &Config, credentials: CredentialStore, session: SessionSignal) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ShellError::Internal(anyhow::anyhow!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            inner: Arc::new(GatewayInner {
                http,
                base_url: config.api_base_url.trim_end_matches('/').to_string(),
                credentials,
                refresh: RefreshState::new(),
                session,
            }),
        })
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.inner.credentials
    }

    pub fn session_signal(&self) -> &SessionSignal {
        &self.inner.session
    }

    pub fn refresh_state(&self) -> &RefreshState {
        &self.inner.refresh
    }

    // ─── Authenticated calls ─────────────────────────────────────

    /// Send an authenticated request, refreshing and replaying once on 401.
    pub async fn send(&self, request: &ApiRequest) -> Result<Value> {
        let sent_token = self.inner.credentials.get_access_token();

        match self.inner.attempt(request, sent_token.as_deref()).await? {
            Attempt::Success(value) => Ok(value),
            Attempt::Unauthorized => {
                tracing::debug!(
                    method = %request.method,
                    path = %request.path,
                    "Request rejected with 401, awaiting refresh"
                );

                let access_token = self.await_refresh(sent_token).await?;

                match self.inner.attempt(request, Some(&access_token)).await? {
                    Attempt::Success(value) => Ok(value),
                    Attempt::Unauthorized => {
                        tracing::warn!(
                            path = %request.path,
                            "Request rejected again after token refresh"
                        );
                        Err(ShellError::AuthenticationFailed(
                            "request rejected after token refresh".to_string(),
                        ))
                    }
                }
            }
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let value = self.send(&ApiRequest::get(path)).await?;
        serde_json::from_value(value).map_err(|e| ShellError::Decode(e.to_string()))
    }

    pub async fn post_json<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T> {
        let value = self.send(&ApiRequest::post(path, body)).await?;
        serde_json::from_value(value).map_err(|e| ShellError::Decode(e.to_string()))
    }

    // ─── Uninterpreted calls ─────────────────────────────────────

    /// Send without credentials and without 401 interception (login, register).
    pub async fn send_public(&self, request: &ApiRequest) -> Result<Value> {
        self.inner.attempt_raw(request, None).await
    }

    /// Send with the current token but without 401 interception (logout).
    pub async fn send_once(&self, request: &ApiRequest) -> Result<Value> {
        let token = self.inner.credentials.get_access_token();
        self.inner.attempt_raw(request, token.as_deref()).await
    }

    // ─── Refresh ─────────────────────────────────────────────────

    /// Obtain the access token to replay with, starting or joining a refresh.
    async fn await_refresh(&self, sent_token: Option<String>) -> Result<String> {
        let credentials = self.inner.credentials.clone();
        let inner = Arc::clone(&self.inner);

        let ticket = self.inner.refresh.begin_or_join(
            || {
                credentials
                    .get_access_token()
                    .filter(|current| Some(current) != sent_token.as_ref())
            },
            move |generation| {
                let epoch = inner.session.epoch();
                inner.run_refresh(generation, epoch).boxed()
            },
        );

        match &ticket {
            RefreshTicket::Leader(_) => tracing::info!("Access token expired, refreshing"),
            RefreshTicket::Joined(_) => tracing::debug!("Joining in-flight token refresh"),
            RefreshTicket::Superseded(_) => {
                tracing::debug!("Token already refreshed, replaying with current token")
            }
        }

        ticket.access_token().await.map_err(ShellError::from)
    }
}

impl GatewayInner {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// One HTTP round trip; 401 is reported instead of failing.
    async fn attempt(&self, request: &ApiRequest, token: Option<&str>) -> Result<Attempt> {
        let response = self.execute(request, token).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Ok(Attempt::Unauthorized);
        }

        read_json(response).await.map(Attempt::Success)
    }

    /// One HTTP round trip; every non-success status is an error.
    async fn attempt_raw(&self, request: &ApiRequest, token: Option<&str>) -> Result<Value> {
        let response = self.execute(request, token).await?;
        read_json(response).await
    }

    async fn execute(&self, request: &ApiRequest, token: Option<&str>) -> Result<reqwest::Response> {
        let mut builder = self
            .http
            .request(request.method.clone(), self.url(&request.path));

        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        builder.send().await.map_err(ShellError::from)
    }

    /// Body of the single in-flight refresh.
    ///
    /// Writes the outcome to the credential store (new tokens, or cleared
    /// session) before returning, so a caller arriving after the slot is free
    /// always sees the settled tokens. The outcome only applies to the session
    /// `epoch` it was started in; if the user logged out or signed in again
    /// meanwhile, new tokens are discarded and a failure leaves the newer
    /// session alone.
    async fn run_refresh(self: Arc<Self>, generation: u64, epoch: u64) -> RefreshOutcome {
        match self.call_refresh_endpoint().await {
            Ok(tokens) => {
                if self.session.store_refreshed(epoch, &tokens) {
                    tracing::info!(generation, "Token refreshed");
                    Ok(tokens)
                } else {
                    tracing::warn!(generation, "Session changed during token refresh, discarding tokens");
                    Err(RefreshFailure("session ended during token refresh".to_string()))
                }
            }
            Err(e) => {
                if self.session.invalidate_if_current(epoch) {
                    tracing::warn!(generation, error = %e, "Token refresh failed, invalidating session");
                } else {
                    tracing::debug!(generation, error = %e, "Token refresh failed for a session that already ended");
                }
                Err(e)
            }
        }
    }

    async fn call_refresh_endpoint(&self) -> RefreshOutcome {
        let refresh_token = self
            .credentials
            .get_refresh_token()
            .ok_or_else(|| RefreshFailure("no refresh token available".to_string()))?;

        let response = self
            .http
            .post(self.url(REFRESH_PATH))
            .json(&RefreshTokenRequest {
                refresh_token: &refresh_token,
            })
            .send()
            .await
            .map_err(|e| RefreshFailure(format!("refresh request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(RefreshFailure(format!(
                "refresh rejected with status {}",
                response.status()
            )));
        }

        let body: RefreshTokenResponse = response
            .json()
            .await
            .map_err(|e| RefreshFailure(format!("invalid refresh response: {}", e)))?;

        if body.access_token.is_empty() {
            return Err(RefreshFailure("refresh response had no access token".to_string()));
        }

        Ok::<TokenPair, RefreshFailure>(body.into_pair(&refresh_token))
    }
}

/// Check the status and parse the body. Empty bodies read as `null`.
async fn read_json(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let body = response.text().await.map_err(ShellError::from)?;

    if !status.is_success() {
        tracing::debug!(status = %status, "Backend returned an error status");
        return Err(ShellError::from_response(status, &body));
    }

    if body.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&body).map_err(|e| ShellError::Decode(e.to_string()))
}
