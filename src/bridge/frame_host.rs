// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Frame host: wires one mounted frame to the message router.
//!
//! Once the frame reports loaded, the host pushes the current theme and page
//! into it and re-pushes on every change. Inbound messages are forwarded to
//! the router; a successful auth handoff is surfaced as a [`ShellEvent`] so
//! the shell can navigate.

use crate::bridge::channel::FrameEvent;
use crate::bridge::router::{FrameHandle, MessageRouter, RouteOutcome};
use crate::models::{OutboundEnvelope, ShellMessage, UserSession};
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

/// Shell-level events raised by frame traffic.
#[derive(Debug, Clone, PartialEq)]
pub enum ShellEvent {
    /// The auth frame completed sign-in or sign-up.
    Authenticated(UserSession),
}

struct HostState {
    loaded: bool,
    theme: String,
    page: String,
}

pub struct FrameHost {
    frame: Arc<FrameHandle>,
    router: Arc<MessageRouter>,
    state: Mutex<HostState>,
    events: mpsc::UnboundedSender<ShellEvent>,
}

impl FrameHost {
    /// Mount a frame with the shell's current theme and page.
    pub fn mount(
        frame: FrameHandle,
        router: Arc<MessageRouter>,
        theme: impl Into<String>,
        page: impl Into<String>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<ShellEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let host = Arc::new(Self {
            frame: Arc::new(frame),
            router,
            state: Mutex::new(HostState {
                loaded: false,
                theme: theme.into(),
                page: page.into(),
            }),
            events,
        });
        (host, rx)
    }

    pub fn frame(&self) -> &FrameHandle {
        &self.frame
    }

    /// The frame finished loading: push current state into it.
    pub fn on_load(&self) {
        let (theme, page) = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.loaded = true;
            (state.theme.clone(), state.page.clone())
        };

        tracing::debug!(frame = %self.frame.name, theme = %theme, page = %page, "Frame loaded");
        self.push(ShellMessage::ThemeChange { theme });
        self.push(ShellMessage::PageChange { page });
    }

    pub fn set_theme(&self, theme: impl Into<String>) {
        let theme = theme.into();
        let loaded = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.theme = theme.clone();
            state.loaded
        };
        if loaded {
            self.push(ShellMessage::ThemeChange { theme });
        }
    }

    pub fn set_page(&self, page: impl Into<String>) {
        let page = page.into();
        let loaded = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.page = page.clone();
            state.loaded
        };
        if loaded {
            self.push(ShellMessage::PageChange { page });
        }
    }

    fn push(&self, message: ShellMessage) {
        if let Err(e) = self
            .frame
            .channel
            .post(&OutboundEnvelope::push(message), &self.frame.origin)
        {
            tracing::warn!(frame = %self.frame.name, error = %e, "Failed to push state into frame");
        }
    }

    /// Forward one inbound message to the router.
    pub async fn receive(&self, origin: &str, payload: &Value) -> RouteOutcome {
        let outcome = self.router.dispatch(&self.frame, origin, payload).await;

        if let RouteOutcome::Replied(ShellMessage::AuthCompleted { user }) = &outcome {
            tracing::info!(frame = %self.frame.name, user_id = %user.id, "Frame authenticated user");
            let _ = self.events.send(ShellEvent::Authenticated(user.clone()));
        }

        outcome
    }

    /// Start consuming inbound messages. Each message is handled on its own
    /// task, so independent requests do not wait on one another.
    ///
    /// Dropping or stopping the returned handle removes the listener and
    /// abandons any in-flight handlers.
    pub fn listen(self: &Arc<Self>, mut inbound: mpsc::UnboundedReceiver<FrameEvent>) -> Listener {
        let host = Arc::clone(self);

        let task = tokio::spawn(async move {
            let mut handlers = JoinSet::new();
            loop {
                tokio::select! {
                    event = inbound.recv() => match event {
                        Some(event) => {
                            let host = Arc::clone(&host);
                            handlers.spawn(async move {
                                host.receive(&event.origin, &event.payload).await
                            });
                        }
                        None => break,
                    },
                    Some(_) = handlers.join_next(), if !handlers.is_empty() => {}
                }
            }
            // Inbound closed: let outstanding handlers finish.
            while handlers.join_next().await.is_some() {}
        });

        Listener { task }
    }
}

/// Registered inbound listener for a frame. Unmounts on drop.
pub struct Listener {
    task: JoinHandle<()>,
}

impl Listener {
    pub fn stop(self) {}
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.task.abort();
    }
}
