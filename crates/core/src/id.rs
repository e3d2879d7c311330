// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request-identity generation
//!
//! Request ids are minted by the manager, never supplied by callers, which
//! is what keeps the at-most-once-waiting invariant trivial to hold.

use crate::lease::RequestId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Mints [`RequestId`]s for acquire calls
pub trait IdGen: Clone + Send + Sync {
    fn next_request_id(&self) -> RequestId;
}

/// UUID-based generator for production use
#[derive(Clone, Default)]
pub struct UuidIdGen;

impl IdGen for UuidIdGen {
    fn next_request_id(&self) -> RequestId {
        RequestId::new(uuid::Uuid::new_v4().to_string())
    }
}

/// Sequential generator for deterministic tests
#[derive(Clone)]
pub struct SequentialIdGen {
    prefix: String,
    counter: Arc<AtomicU64>,
}

impl SequentialIdGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for SequentialIdGen {
    fn default() -> Self {
        Self::new("req")
    }
}

impl IdGen for SequentialIdGen {
    fn next_request_id(&self) -> RequestId {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        RequestId::new(format!("{}-{}", self.prefix, n))
    }
}
