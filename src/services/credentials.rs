// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credential store: the current token pair and the persisted session record.
//!
//! Pure storage, no validation of token contents. Storage failures are logged
//! and read back as "nothing stored", which sends the user through
//! authentication again instead of surfacing an error.

use crate::models::{TokenPair, UserSession};
use crate::services::storage::Storage;
use std::sync::Arc;

/// Storage key for the access token
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Storage key for the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Storage key for the serialized session record
pub const USER_KEY: &str = "user";

#[derive(Clone)]
pub struct CredentialStore {
    storage: Arc<dyn Storage>,
}

impl CredentialStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    // ─── Tokens ──────────────────────────────────────────────────

    /// Persist both tokens in one write.
    pub fn set_tokens(&self, tokens: &TokenPair) {
        let result = self.storage.set_many(&[
            (ACCESS_TOKEN_KEY, tokens.access_token.as_str()),
            (REFRESH_TOKEN_KEY, tokens.refresh_token.as_str()),
        ]);

        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to persist tokens");
        }
    }

    /// The stored pair, only if both halves are present.
    pub fn get_tokens(&self) -> Option<TokenPair> {
        match self.storage.get_many(&[ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY]) {
            Ok(values) => match values.as_slice() {
                [Some(access), Some(refresh)] => Some(TokenPair::new(access, refresh)),
                _ => None,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read tokens");
                None
            }
        }
    }

    pub fn get_access_token(&self) -> Option<String> {
        self.read(ACCESS_TOKEN_KEY)
    }

    pub fn get_refresh_token(&self) -> Option<String> {
        self.read(REFRESH_TOKEN_KEY)
    }

    pub fn clear_tokens(&self) {
        if let Err(e) = self
            .storage
            .remove_many(&[ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY])
        {
            tracing::warn!(error = %e, "Failed to clear tokens");
        }
    }

    // ─── Session record ──────────────────────────────────────────

    pub fn save_user(&self, user: &UserSession) {
        let result = serde_json::to_string(user)
            .map_err(|e| e.to_string())
            .and_then(|json| {
                self.storage
                    .set(USER_KEY, &json)
                    .map_err(|e| e.to_string())
            });

        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to persist session record");
        }
    }

    /// The persisted session record. Unparsable records read as absent.
    pub fn load_user(&self) -> Option<UserSession> {
        let raw = self.read(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable session record");
                None
            }
        }
    }

    pub fn clear_user(&self) {
        if let Err(e) = self.storage.remove(USER_KEY) {
            tracing::warn!(error = %e, "Failed to clear session record");
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to read storage");
                None
            }
        }
    }
}
