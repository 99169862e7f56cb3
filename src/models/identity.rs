//! User identity decoded from access tokens and the persisted session record.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Account role carried in the access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "bindings/")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Teacher,
    #[default]
    Student,
    Admin,
}

impl Role {
    /// Role from a raw claim. Missing or unrecognized claims fall back to
    /// `Student`.
    pub fn from_claim(claim: Option<&str>) -> Self {
        match claim.map(|c| c.trim().to_ascii_uppercase()).as_deref() {
            Some("TEACHER") => Role::Teacher,
            Some("ADMIN") => Role::Admin,
            _ => Role::Student,
        }
    }
}

/// Identity claims extracted from an access token. Never persisted on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedIdentity {
    pub id: String,
    pub email: String,
    pub role: Role,
}

/// Session record persisted for reload continuity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "bindings/")
)]
#[serde(rename_all = "camelCase")]
pub struct UserSession {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
    pub role: Role,
}

impl UserSession {
    /// Build the record from decoded claims. The display name defaults to the
    /// local part of the email address.
    pub fn from_identity(identity: &DecodedIdentity) -> Self {
        let name = identity
            .email
            .split('@')
            .next()
            .filter(|n| !n.is_empty())
            .unwrap_or("User")
            .to_string();

        Self {
            id: identity.id.clone(),
            name,
            email: identity.email.clone(),
            avatar: None,
            role: identity.role,
        }
    }
}
