// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The backing-store seam: atomic lease primitives
//!
//! Each operation is a single atomic step at the store. The authoritative
//! liveness test is always "is `now` before the stored deadline", evaluated
//! inside the store operation, never as a read-then-write at the caller.
//! Implementations live in warden-store.

use crate::error::StoreError;
use crate::lease::{FencingToken, HolderId, Lease, ResourceKey};
use async_trait::async_trait;
use std::time::Instant;

/// Result of a set-if-absent attempt
#[derive(Clone, Debug, PartialEq)]
pub enum PutOutcome {
    /// No live lease existed; the new lease is now authoritative
    Inserted,
    /// A live lease is in the way
    Held {
        holder: HolderId,
        token: FencingToken,
        deadline: Instant,
    },
}

/// Result of a token-gated compare-and-delete
#[derive(Clone, Debug, PartialEq)]
pub enum RemoveOutcome {
    Removed(Lease),
    /// Live lease exists with a different token
    TokenMismatch,
    /// Token matched but the deadline had already lapsed
    Expired,
    /// No lease at all
    Missing,
}

/// Result of a compare-deadline-and-extend
#[derive(Clone, Debug, PartialEq)]
pub enum ExtendOutcome {
    Extended(Lease),
    TokenMismatch,
    Expired,
    Missing,
}

/// Atomic primitives the coordination engine needs from its backing store
#[async_trait]
pub trait LeaseStore: Send + Sync + 'static {
    /// Set-if-absent. A present-but-expired lease counts as absent, which is
    /// what makes crash recovery via TTL work: a store that lost its reaper
    /// still never blocks a fresh grant behind a dead holder.
    async fn put_if_absent(&self, lease: Lease, now: Instant) -> Result<PutOutcome, StoreError>;

    /// Read the current lease record, expired or not
    async fn get(&self, resource: &ResourceKey) -> Result<Option<Lease>, StoreError>;

    /// Compare-and-delete gated on the fencing token, with the deadline
    /// evaluated in the same atomic step
    async fn remove_if_token(
        &self,
        resource: &ResourceKey,
        token: FencingToken,
        now: Instant,
    ) -> Result<RemoveOutcome, StoreError>;

    /// Compare-deadline-and-extend: the token must match and the deadline
    /// must not have lapsed. A renew that observably precedes the deadline
    /// always wins, even against a concurrent reaper sweep.
    async fn extend_if_token(
        &self,
        resource: &ResourceKey,
        token: FencingToken,
        new_deadline: Instant,
        now: Instant,
    ) -> Result<ExtendOutcome, StoreError>;

    /// Token-less reclaim for the reaper: removes the lease only if its
    /// deadline has lapsed, atomically
    async fn remove_expired(
        &self,
        resource: &ResourceKey,
        now: Instant,
    ) -> Result<Option<Lease>, StoreError>;

    /// Scan for resources whose lease deadline has passed
    async fn expired_keys(&self, now: Instant) -> Result<Vec<ResourceKey>, StoreError>;
}
