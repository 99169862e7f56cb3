// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cross-frame bridge: channels, origin checks, routing, and frame hosting.

pub mod channel;
pub mod frame_host;
pub mod origin;
pub mod router;

pub use channel::{in_process_pair, FrameChannel, FrameEvent, FramePort, PostedMessage, ReplySlot};
pub use frame_host::{FrameHost, Listener, ShellEvent};
pub use origin::OriginAllowList;
pub use router::{FrameHandle, MessageRouter, RouteOutcome};
