// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Origin allow-list for cross-frame messages.

use crate::config::FrameConfig;
use std::collections::HashSet;
use url::Url;

/// Normalize to the `scheme://host[:port]` serialization.
///
/// Default ports are elided, paths are dropped. Opaque origins (`null`,
/// `data:`, `file:`) and unparsable input yield `None`.
pub fn normalize_origin(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    let origin = url.origin();
    if !origin.is_tuple() {
        return None;
    }
    Some(origin.ascii_serialization())
}

/// The set of origins whose messages the router will accept.
#[derive(Debug, Clone, Default)]
pub struct OriginAllowList {
    origins: HashSet<String>,
}

impl OriginAllowList {
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            origins: origins
                .into_iter()
                .filter_map(|o| normalize_origin(o.as_ref()))
                .collect(),
        }
    }

    pub fn from_frames(frames: &[FrameConfig]) -> Self {
        Self::new(frames.iter().map(|f| f.origin.as_str()))
    }

    /// Exact scheme+host+port match after normalization.
    pub fn allows(&self, origin: &str) -> bool {
        normalize_origin(origin).is_some_and(|o| self.origins.contains(&o))
    }
}
