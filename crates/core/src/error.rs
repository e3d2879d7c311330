// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the coordination engine
//!
//! Every variant is terminal for the call that produced it. `PolicyDenied`
//! must never be retried identically; `Unavailable` means the backing store
//! stayed unreachable through the retry budget and the engine failed closed.

use crate::lease::{RequestId, ResourceKey};
use thiserror::Error;

/// Failure at the backing-store seam
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("backing store unavailable: {0}")]
    Unavailable(String),
}

/// Failure of a coordination operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinationError {
    /// The admission gate said no; lock state was never touched
    #[error("admission denied: {reason}")]
    PolicyDenied { reason: String },

    /// The presented fencing token no longer matches the live grant
    #[error("stale fencing token for resource '{resource}'")]
    StaleToken { resource: ResourceKey },

    /// The lease lapsed (and may already belong to another holder)
    #[error("lease expired for resource '{resource}'")]
    LeaseExpired { resource: ResourceKey },

    /// No waiting entry with this request id (already promoted, cancelled,
    /// or never enqueued)
    #[error("unknown request '{0}'")]
    UnknownRequest(RequestId),

    /// Backing store unreachable after bounded retries; no grant was issued
    #[error("coordination unavailable: {0}")]
    Unavailable(#[from] StoreError),
}
