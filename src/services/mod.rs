// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - credentials, backend access, and session lifecycle.

pub mod course_api;
pub mod credentials;
pub mod gateway;
pub mod refresh;
pub mod session;
pub mod storage;
pub mod token_decoder;

pub use course_api::{CourseApi, CourseContent};
pub use credentials::CredentialStore;
pub use gateway::{ApiRequest, HttpGateway};
pub use refresh::{RefreshState, RefreshTicket};
pub use session::{RegisterOutcome, SessionController, SessionSignal, SessionState};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
