// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! warden-engine: the coordination engine
//!
//! [`LockManager`] orchestrates acquire/release/renew/cancel against the
//! lease store and per-resource wait queues, consulting the policy gate
//! before any mutation. The [`Reaper`] reclaims lapsed leases in the
//! background and promotes waiters.

pub mod manager;
pub mod reaper;

pub use manager::{
    AcquireOutcome, AcquireRequest, LockManager, LockState, Promotion, ReleaseOutcome,
    RequestState, ResourceStatus,
};
pub use reaper::{CoordinationStats, Reaper, ReaperConfig};
