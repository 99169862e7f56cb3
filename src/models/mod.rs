// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models shared by the gateway, session controller, and frame bridge.

pub mod envelope;
pub mod identity;
pub mod tokens;

pub use envelope::{Classified, FrameRequest, InboundEnvelope, OutboundEnvelope, ShellMessage};
pub use identity::{DecodedIdentity, Role, UserSession};
pub use tokens::{AuthTokensResponse, LoginCredentials, RefreshTokenResponse, TokenPair};
