// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session controller: login, registration, logout, and restore-on-start.
//!
//! State machine: `Anonymous -> Authenticating -> Authenticated -> Anonymous`.
//! The current state is published on a `watch` channel. The gateway holds a
//! [`SessionSignal`] so a failed token refresh drops the session back to
//! `Anonymous` through the same channel.
//!
//! Every change of who owns the stored credentials (sign-in, logout,
//! invalidation) bumps the signal's epoch under one lock. A refresh started in
//! an older epoch may not write to the store.

use crate::error::{Result, ShellError};
use crate::models::{AuthTokensResponse, DecodedIdentity, LoginCredentials, TokenPair, UserSession};
use crate::services::credentials::CredentialStore;
use crate::services::gateway::{ApiRequest, HttpGateway, LOGIN_PATH, LOGOUT_PATH, REGISTER_PATH};
use crate::services::token_decoder;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

/// Authentication state visible to the rest of the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticating,
    Authenticated(UserSession),
}

impl SessionState {
    pub fn user(&self) -> Option<&UserSession> {
        match self {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Anonymous => "ANONYMOUS",
            SessionState::Authenticating => "AUTHENTICATING",
            SessionState::Authenticated(_) => "AUTHENTICATED",
        }
    }
}

/// Shared handle that publishes session state and guards credential writes.
#[derive(Clone)]
pub struct SessionSignal {
    state: Arc<watch::Sender<SessionState>>,
    credentials: CredentialStore,
    epoch: Arc<Mutex<u64>>,
}

impl SessionSignal {
    pub fn new(credentials: CredentialStore) -> Self {
        let (tx, _rx) = watch::channel(SessionState::Anonymous);
        Self {
            state: Arc::new(tx),
            credentials,
            epoch: Arc::new(Mutex::new(0)),
        }
    }

    fn lock_epoch(&self) -> MutexGuard<'_, u64> {
        self.epoch.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current credential epoch.
    pub fn epoch(&self) -> u64 {
        *self.lock_epoch()
    }

    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    fn set(&self, state: SessionState) {
        tracing::debug!(state = state.label(), "Session state changed");
        self.state.send_replace(state);
    }

    /// Clear tokens and the session record, then go `Anonymous`.
    pub fn invalidate(&self) {
        let mut epoch = self.lock_epoch();
        self.clear(&mut epoch);
    }

    /// Invalidate only if nothing has changed hands since `started`.
    pub fn invalidate_if_current(&self, started: u64) -> bool {
        let mut epoch = self.lock_epoch();
        if *epoch != started {
            return false;
        }
        self.clear(&mut epoch);
        true
    }

    /// Store refreshed tokens only if nothing has changed hands since `started`.
    pub fn store_refreshed(&self, started: u64, tokens: &TokenPair) -> bool {
        let epoch = self.lock_epoch();
        if *epoch != started {
            return false;
        }
        self.credentials.set_tokens(tokens);
        true
    }

    fn clear(&self, epoch: &mut u64) {
        self.credentials.clear_tokens();
        self.credentials.clear_user();
        *epoch += 1;
        self.set(SessionState::Anonymous);
    }

    /// Store a new session's tokens and record, then go `Authenticated`.
    fn establish(&self, tokens: &TokenPair, user: &UserSession) {
        let mut epoch = self.lock_epoch();
        self.credentials.set_tokens(tokens);
        self.credentials.save_user(user);
        *epoch += 1;
        self.set(SessionState::Authenticated(user.clone()));
    }

    /// Put back the state seen at `started` after a failed sign-in attempt,
    /// unless the session changed hands in the meantime.
    fn revert(&self, started: u64, previous: SessionState) {
        let epoch = self.lock_epoch();
        if *epoch == started {
            self.set(previous);
        }
    }
}

/// Result of a registration attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RegisterOutcome {
    /// Tokens were issued; the session is live.
    Authenticated(UserSession),
    /// No tokens yet (e.g. email verification pending). Raw backend response.
    VerificationRequired(Value),
}

pub struct SessionController {
    gateway: HttpGateway,
    signal: SessionSignal,
}

impl SessionController {
    /// Build the controller and decide the starting state from storage.
    ///
    /// Runs once and never contacts the server. A stored, unexpired access
    /// token restores `Authenticated`. An expired access token with a refresh
    /// token and a saved record also restores `Authenticated`; the gateway
    /// refreshes on first use, and drops to `Anonymous` if that fails.
    pub fn initialize(gateway: HttpGateway) -> Self {
        let signal = gateway.session_signal().clone();
        let controller = Self { gateway, signal };

        let restored = controller.restore();
        match &restored {
            SessionState::Authenticated(user) => {
                tracing::info!(user_id = %user.id, "Session restored from storage")
            }
            _ => tracing::debug!("No stored session"),
        }
        controller.signal.set(restored);

        controller
    }

    fn restore(&self) -> SessionState {
        let credentials = self.credentials();

        let Some(tokens) = credentials.get_tokens() else {
            credentials.clear_user();
            return SessionState::Anonymous;
        };

        if !token_decoder::is_expired(&tokens.access_token) {
            let user = credentials.load_user().or_else(|| {
                let user = token_decoder::decode_identity(&tokens.access_token)
                    .map(|identity| UserSession::from_identity(&identity))?;
                credentials.save_user(&user);
                Some(user)
            });

            return match user {
                Some(user) => SessionState::Authenticated(user),
                None => SessionState::Anonymous,
            };
        }

        match credentials.load_user() {
            Some(user) => {
                tracing::debug!("Stored access token expired, deferring to refresh on first use");
                SessionState::Authenticated(user)
            }
            None => SessionState::Anonymous,
        }
    }

    fn credentials(&self) -> &CredentialStore {
        self.gateway.credentials()
    }

    pub fn state(&self) -> SessionState {
        self.signal.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.signal.subscribe()
    }

    pub fn current_user(&self) -> Option<UserSession> {
        self.state().user().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state(), SessionState::Authenticated(_))
    }

    pub fn gateway(&self) -> &HttpGateway {
        &self.gateway
    }

    /// Log in with email and password.
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<UserSession> {
        let (previous, started) = self.begin_attempt();

        let result = async {
            let body = serde_json::to_value(credentials)
                .map_err(|e| ShellError::Internal(anyhow::anyhow!("Failed to encode credentials: {}", e)))?;
            let response = self
                .gateway
                .send_public(&ApiRequest::post(LOGIN_PATH, body))
                .await?;

            let tokens = serde_json::from_value::<AuthTokensResponse>(response)
                .ok()
                .and_then(AuthTokensResponse::into_pair)
                .ok_or_else(|| ShellError::Decode("login response did not include tokens".to_string()))?;

            Ok(self.establish(tokens))
        }
        .await;

        match &result {
            Ok(user) => tracing::info!(user_id = %user.id, role = ?user.role, "Login succeeded"),
            Err(e) => {
                tracing::warn!(error = %e, "Login failed");
                self.signal.revert(started, previous);
            }
        }

        result
    }

    /// Create an account. Behaves like login when the backend issues tokens.
    pub async fn register(&self, details: &Value) -> Result<RegisterOutcome> {
        let (previous, started) = self.begin_attempt();

        let result = async {
            let response = self
                .gateway
                .send_public(&ApiRequest::post(REGISTER_PATH, details.clone()))
                .await?;

            let tokens = serde_json::from_value::<AuthTokensResponse>(response.clone())
                .ok()
                .and_then(AuthTokensResponse::into_pair);

            match tokens {
                Some(tokens) => Ok(RegisterOutcome::Authenticated(self.establish(tokens))),
                None => Ok(RegisterOutcome::VerificationRequired(response)),
            }
        }
        .await;

        match &result {
            Ok(RegisterOutcome::Authenticated(user)) => {
                tracing::info!(user_id = %user.id, "Registration succeeded")
            }
            Ok(RegisterOutcome::VerificationRequired(_)) => {
                tracing::info!("Registration pending verification");
                self.signal.revert(started, previous);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Registration failed");
                self.signal.revert(started, previous);
            }
        }

        result
    }

    /// Adopt a token pair minted elsewhere (the auth frame's handoff).
    pub fn accept_tokens(&self, tokens: TokenPair) -> UserSession {
        let user = self.establish(tokens);
        tracing::info!(user_id = %user.id, role = ?user.role, "Accepted handed-off tokens");
        user
    }

    /// Best-effort server-side logout, then unconditional local teardown.
    pub async fn logout(&self) {
        if self.credentials().get_access_token().is_some() {
            if let Err(e) = self
                .gateway
                .send_once(&ApiRequest::post_empty(LOGOUT_PATH))
                .await
            {
                tracing::warn!(error = %e, "Server-side logout failed, clearing local session anyway");
            }
        }

        self.signal.invalidate();
        tracing::info!("Logged out");
    }

    /// Publish `Authenticating`; returns what to revert to on failure.
    fn begin_attempt(&self) -> (SessionState, u64) {
        let previous = self.signal.current();
        let started = self.signal.epoch();
        self.signal.set(SessionState::Authenticating);
        (previous, started)
    }

    /// Store tokens, derive and persist the session record, go `Authenticated`.
    ///
    /// An access token that does not decode still establishes the session,
    /// with a default `Student` identity.
    fn establish(&self, tokens: TokenPair) -> UserSession {
        let identity = token_decoder::decode_identity(&tokens.access_token).unwrap_or_else(|| {
            tracing::warn!("Access token could not be decoded, using default identity");
            DecodedIdentity::default()
        });
        let user = UserSession::from_identity(&identity);

        self.signal.establish(&tokens, &user);
        user
    }
}
