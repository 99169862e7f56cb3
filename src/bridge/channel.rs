// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Message channels between the shell and a frame.
//!
//! The router only needs to post an envelope at a target origin; how it gets
//! there (an in-process queue, an HTTP response body) is up to the channel.

use crate::models::OutboundEnvelope;
use serde_json::Value;
use std::sync::{Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Frame channel closed")]
    Closed,
}

/// Shell-to-frame direction of a frame channel.
pub trait FrameChannel: Send + Sync {
    /// Deliver an envelope, addressed to the frame's origin.
    fn post(&self, envelope: &OutboundEnvelope, target_origin: &str) -> Result<(), ChannelError>;
}

/// A message as delivered to a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PostedMessage {
    pub target_origin: String,
    pub payload: Value,
}

/// A message as received by the shell, with the sender's origin.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameEvent {
    pub origin: String,
    pub payload: Value,
}

// ─── In-process channel ──────────────────────────────────────

/// Shell side of an in-process channel.
pub struct InProcessChannel {
    tx: mpsc::UnboundedSender<PostedMessage>,
}

impl FrameChannel for InProcessChannel {
    fn post(&self, envelope: &OutboundEnvelope, target_origin: &str) -> Result<(), ChannelError> {
        self.tx
            .send(PostedMessage {
                target_origin: target_origin.to_string(),
                payload: envelope.to_value(),
            })
            .map_err(|_| ChannelError::Closed)
    }
}

/// Frame side of an in-process channel.
pub struct FramePort {
    origin: String,
    outbound: mpsc::UnboundedSender<FrameEvent>,
    inbox: mpsc::UnboundedReceiver<PostedMessage>,
}

impl FramePort {
    /// Send a payload to the shell from this frame's origin.
    pub fn send(&self, payload: Value) -> Result<(), ChannelError> {
        self.send_as(&self.origin, payload)
    }

    /// Send with an arbitrary origin, as any window could.
    pub fn send_as(&self, origin: &str, payload: Value) -> Result<(), ChannelError> {
        self.outbound
            .send(FrameEvent {
                origin: origin.to_string(),
                payload,
            })
            .map_err(|_| ChannelError::Closed)
    }

    pub async fn recv(&mut self) -> Option<PostedMessage> {
        self.inbox.recv().await
    }

    pub fn try_recv(&mut self) -> Option<PostedMessage> {
        self.inbox.try_recv().ok()
    }
}

/// Create a connected channel for a frame at `origin`.
///
/// Returns the shell's posting side, the shell's inbound queue, and the
/// frame's port.
pub fn in_process_pair(
    origin: &str,
) -> (
    InProcessChannel,
    mpsc::UnboundedReceiver<FrameEvent>,
    FramePort,
) {
    let (to_frame, inbox) = mpsc::unbounded_channel();
    let (to_shell, inbound) = mpsc::unbounded_channel();

    (
        InProcessChannel { tx: to_frame },
        inbound,
        FramePort {
            origin: origin.to_string(),
            outbound: to_shell,
            inbox,
        },
    )
}

// ─── Single-reply channel ────────────────────────────────────

/// Channel that captures exactly one posted message, for request/response
/// transports.
pub struct ReplySlot {
    tx: Mutex<Option<oneshot::Sender<PostedMessage>>>,
}

impl ReplySlot {
    /// A slot and the receiver its one message arrives on.
    pub fn channel() -> (Self, oneshot::Receiver<PostedMessage>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                tx: Mutex::new(Some(tx)),
            },
            rx,
        )
    }
}

impl FrameChannel for ReplySlot {
    fn post(&self, envelope: &OutboundEnvelope, target_origin: &str) -> Result<(), ChannelError> {
        let tx = self
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(ChannelError::Closed)?;

        tx.send(PostedMessage {
            target_origin: target_origin.to_string(),
            payload: envelope.to_value(),
        })
        .map_err(|_| ChannelError::Closed)
    }
}
