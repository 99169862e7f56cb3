// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Frame Shell: authenticated backend access for sandboxed micro-frontends.
//!
//! The shell owns the credentials and the API client. Embedded frames ask it
//! for data and actions through a typed message protocol, and it answers each
//! request with a correlated reply.

pub mod bridge;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use bridge::{MessageRouter, OriginAllowList};
use config::Config;
use services::{
    CourseApi, CredentialStore, HttpGateway, SessionController, SessionSignal, Storage,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub session: Arc<SessionController>,
    pub router: Arc<MessageRouter>,
}

impl AppState {
    /// Wire the credential store, gateway, session controller, and router
    /// over the given storage. Restores any stored session.
    pub fn new(config: Config, storage: Arc<dyn Storage>) -> error::Result<Self> {
        let credentials = CredentialStore::new(storage);
        let signal = SessionSignal::new(credentials.clone());
        let gateway = HttpGateway::new(&config, credentials, signal)?;

        let session = Arc::new(SessionController::initialize(gateway.clone()));
        let router = Arc::new(MessageRouter::new(
            OriginAllowList::from_frames(&config.frames),
            Arc::clone(&session),
            CourseApi::new(gateway),
        ));

        Ok(Self {
            config,
            session,
            router,
        })
    }
}
