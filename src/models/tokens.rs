//! Token pair and auth endpoint bodies.

use serde::{Deserialize, Serialize};

/// Access/refresh credential pair.
///
/// Both halves are always present together; partial pairs never leave the
/// credential store as valid.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    /// Short-lived bearer credential
    pub access_token: String,
    /// Longer-lived credential used only to mint a new access token
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// `POST /auth/login` request body.
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Token-bearing body returned by login and register.
///
/// Register omits the tokens when the account still needs email verification.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokensResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl AuthTokensResponse {
    /// Both tokens, or nothing.
    pub fn into_pair(self) -> Option<TokenPair> {
        match (self.access_token, self.refresh_token) {
            (Some(access), Some(refresh)) if !access.is_empty() && !refresh.is_empty() => {
                Some(TokenPair::new(access, refresh))
            }
            _ => None,
        }
    }
}

/// `POST /auth/refresh-token` request body.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest<'a> {
    pub refresh_token: &'a str,
}

/// `POST /auth/refresh-token` response. The refresh token is only present
/// when the backend rotates it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl RefreshTokenResponse {
    /// Merge with the refresh token that was used, keeping it unless rotated.
    pub fn into_pair(self, previous_refresh: &str) -> TokenPair {
        let refresh = self
            .refresh_token
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| previous_refresh.to_string());
        TokenPair::new(self.access_token, refresh)
    }
}
