// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shell configuration loaded from environment variables.
//!
//! Loaded once at startup. The frame list doubles as the origin allow-list
//! for the cross-frame message router.

use crate::bridge::origin::normalize_origin;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default bound on every backend call.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// A micro-frontend the shell is allowed to host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameConfig {
    /// Logical frame name (e.g. "auth", "course", "learn")
    pub name: String,
    /// Normalized origin (scheme://host[:port])
    pub origin: String,
}

/// Shell configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend REST root, without trailing slash
    pub api_base_url: String,
    /// Frames the shell hosts, in declaration order
    pub frames: Vec<FrameConfig>,
    /// Timeout applied to every gateway call
    pub request_timeout: Duration,
    /// Durable client-side storage file
    pub storage_path: PathBuf,
    /// HTTP transport port
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file is honored when present; real environment variables win.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let api_base_url =
            env::var("API_BASE_URL").map_err(|_| ConfigError::Missing("API_BASE_URL"))?;
        let frames_raw =
            env::var("FRAME_ORIGINS").map_err(|_| ConfigError::Missing("FRAME_ORIGINS"))?;

        let request_timeout = match env::var("REQUEST_TIMEOUT_SECS") {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|_| {
                ConfigError::Invalid("REQUEST_TIMEOUT_SECS", format!("not a number: {}", raw))
            })?,
            Err(_) => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        Ok(Self {
            api_base_url: api_base_url.trim().trim_end_matches('/').to_string(),
            frames: parse_frames(&frames_raw)?,
            request_timeout: Duration::from_secs(request_timeout),
            storage_path: env::var("STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".frame-shell/storage.json")),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
        })
    }

    /// Fixed configuration for tests.
    pub fn test_default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:9".to_string(),
            frames: vec![
                FrameConfig {
                    name: "auth".to_string(),
                    origin: "http://localhost:5174".to_string(),
                },
                FrameConfig {
                    name: "course".to_string(),
                    origin: "http://localhost:5175".to_string(),
                },
                FrameConfig {
                    name: "learn".to_string(),
                    origin: "http://localhost:5176".to_string(),
                },
            ],
            request_timeout: Duration::from_secs(5),
            storage_path: PathBuf::from(".frame-shell/test-storage.json"),
            port: 8080,
        }
    }

    /// Look up a configured frame by name.
    pub fn frame(&self, name: &str) -> Option<&FrameConfig> {
        self.frames.iter().find(|f| f.name == name)
    }
}

/// Parse `name=origin,name=origin` into frame entries.
fn parse_frames(raw: &str) -> Result<Vec<FrameConfig>, ConfigError> {
    let mut frames = Vec::new();

    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (name, origin) = entry.split_once('=').ok_or_else(|| {
            ConfigError::Invalid("FRAME_ORIGINS", format!("expected name=origin, got {}", entry))
        })?;

        let origin = normalize_origin(origin.trim()).ok_or_else(|| {
            ConfigError::Invalid("FRAME_ORIGINS", format!("invalid origin for {}", name))
        })?;

        frames.push(FrameConfig {
            name: name.trim().to_string(),
            origin,
        });
    }

    if frames.is_empty() {
        return Err(ConfigError::Invalid(
            "FRAME_ORIGINS",
            "at least one frame is required".to_string(),
        ));
    }

    Ok(frames)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
