// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access token decoding.
//!
//! The shell reads identity claims out of the access token without verifying
//! the signature; the backend verifies on every request. Decoding fails soft:
//! anything unparsable yields `None`, and expiry checks treat that as expired.

use crate::models::{DecodedIdentity, Role};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::Value;

/// Claims the shell cares about. Everything is optional at the wire level.
#[derive(Debug, Deserialize)]
struct AccessTokenClaims {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    sub: Option<Value>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    exp: Option<i64>,
}

fn claims(token: &str) -> Option<AccessTokenClaims> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    match decode::<AccessTokenClaims>(token, &DecodingKey::from_secret(&[]), &validation) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            tracing::debug!(error = %e, "Access token could not be decoded");
            None
        }
    }
}

/// Ids may be issued as strings or numbers.
fn id_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Decode the identity carried by an access token.
///
/// The user id comes from `id`, falling back to `sub`. A missing role claim
/// yields `Role::Student`.
pub fn decode_identity(token: &str) -> Option<DecodedIdentity> {
    let claims = claims(token)?;
    let id = claims
        .id
        .and_then(id_string)
        .or_else(|| claims.sub.and_then(id_string))?;

    Some(DecodedIdentity {
        id,
        email: claims.email.unwrap_or_default(),
        role: Role::from_claim(claims.role.as_deref()),
    })
}

/// Expiry instant from the `exp` claim.
pub fn expires_at(token: &str) -> Option<DateTime<Utc>> {
    claims(token)?
        .exp
        .and_then(|exp| DateTime::from_timestamp(exp, 0))
}

/// Whether the token is expired as of `now`.
///
/// Undecodable tokens are expired. A token without an `exp` claim never
/// expires on the client side.
pub fn is_expired_at(token: &str, now: DateTime<Utc>) -> bool {
    match claims(token) {
        Some(c) => match c.exp {
            Some(exp) => exp <= now.timestamp(),
            None => false,
        },
        None => true,
    }
}

pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, Utc::now())
}
