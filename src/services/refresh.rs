// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Single-flight token refresh slot.
//!
//! At most one refresh is in flight per gateway. The decision "start a refresh
//! or join the running one" is made under one lock acquisition, with no
//! `.await` in between, so concurrent 401s can never race into two refresh
//! calls. Every caller that joins observes the same outcome.
//!
//! The refresh itself runs on its own task. Waiters only observe it, so a
//! cancelled caller never leaves a half-sent refresh parked in the slot.

use crate::error::RefreshFailure;
use crate::models::TokenPair;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Outcome of one refresh, shared by every waiter.
pub type RefreshOutcome = Result<TokenPair, RefreshFailure>;

/// Handle to an in-flight refresh. Cloned for every waiter.
pub type RefreshFuture = Shared<BoxFuture<'static, RefreshOutcome>>;

/// What a caller that saw a 401 should do next.
pub enum RefreshTicket {
    /// This caller started the refresh.
    Leader(RefreshFuture),
    /// A refresh was already running; wait on it.
    Joined(RefreshFuture),
    /// The token that was rejected has already been replaced. Replay with this
    /// access token without refreshing.
    Superseded(String),
}

impl RefreshTicket {
    pub fn is_leader(&self) -> bool {
        matches!(self, RefreshTicket::Leader(_))
    }

    /// Wait for the access token to replay with.
    pub async fn access_token(self) -> Result<String, RefreshFailure> {
        match self {
            RefreshTicket::Leader(fut) | RefreshTicket::Joined(fut) => {
                fut.await.map(|pair| pair.access_token)
            }
            RefreshTicket::Superseded(token) => Ok(token),
        }
    }
}

struct InFlight {
    generation: u64,
    future: RefreshFuture,
}

type Slot = Arc<Mutex<Option<InFlight>>>;

/// Clear the slot if it still holds `generation`.
fn settle(slot: &Slot, generation: u64) {
    let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
    if slot.as_ref().map(|f| f.generation) == Some(generation) {
        *slot = None;
    }
}

/// The refresh slot owned by one gateway.
#[derive(Default)]
pub struct RefreshState {
    in_flight: Slot,
    generation: AtomicU64,
}

impl RefreshState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a refresh, join the running one, or skip it.
    ///
    /// `superseded` runs under the slot lock when nothing is in flight and
    /// returns the current access token if it differs from the rejected one.
    /// `start` builds the refresh for a new generation. It is spawned onto the
    /// runtime and the slot is cleared once it resolves, so the future must
    /// write its outcome to the credential store before returning.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn begin_or_join<S, F>(&self, superseded: S, start: F) -> RefreshTicket
    where
        S: FnOnce() -> Option<String>,
        F: FnOnce(u64) -> BoxFuture<'static, RefreshOutcome>,
    {
        let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(current) = slot.as_ref() {
            return RefreshTicket::Joined(current.future.clone());
        }

        if let Some(token) = superseded() {
            return RefreshTicket::Superseded(token);
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let refresh = start(generation);

        let task_slot = Arc::clone(&self.in_flight);
        let task = tokio::spawn(async move {
            let outcome = refresh.await;
            settle(&task_slot, generation);
            outcome
        });

        let waiter_slot = Arc::clone(&self.in_flight);
        let future = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    settle(&waiter_slot, generation);
                    Err(RefreshFailure(format!("refresh task failed: {}", e)))
                }
            }
        }
        .boxed()
        .shared();

        *slot = Some(InFlight {
            generation,
            future: future.clone(),
        });

        RefreshTicket::Leader(future)
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Number of refreshes started over the lifetime of this slot.
    pub fn refreshes_started(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}
