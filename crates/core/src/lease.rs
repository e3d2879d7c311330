// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lease and fencing-token types for exclusive resource access
//!
//! A [`Lease`] is the authoritative record of who holds a resource. At most
//! one live (unexpired) lease exists per resource at any instant; liveness is
//! always decided against the clock, never cached.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Opaque identifier for a contended resource
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey(pub String);

impl ResourceKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a lease holder (an agent)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HolderId(pub String);

impl HolderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for HolderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a single acquire request
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonically increasing credential, unique per grant
///
/// The only credential valid for Release/Renew of a grant; a caller
/// presenting an older token can never mutate the authoritative record.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct FencingToken(pub u64);

impl FencingToken {
    pub fn new(value: u64) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for FencingToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The authoritative holder record for one resource
#[derive(Clone, Debug, PartialEq)]
pub struct Lease {
    pub resource: ResourceKey,
    pub holder: HolderId,
    pub token: FencingToken,
    /// Wall-clock acquisition time, for reporting only
    pub acquired_at: DateTime<Utc>,
    /// Monotonic deadline after which the lease is eligible for reclaim
    pub deadline: Instant,
    pub ttl: Duration,
}

impl Lease {
    pub fn new(
        resource: ResourceKey,
        holder: HolderId,
        token: FencingToken,
        ttl: Duration,
        now: Instant,
    ) -> Self {
        Self {
            resource,
            holder,
            token,
            acquired_at: Utc::now(),
            deadline: now + ttl,
            ttl,
        }
    }

    /// A lease is live strictly before its deadline
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    /// Time left on the lease, zero if lapsed
    pub fn remaining(&self, now: Instant) -> Duration {
        self.deadline.saturating_duration_since(now)
    }

    /// The caller-facing view of this lease
    pub fn grant(&self) -> Grant {
        Grant {
            token: self.token,
            deadline: self.deadline,
            ttl: self.ttl,
        }
    }
}

/// What a successful acquire, promotion, or renew hands back to the caller
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Grant {
    pub token: FencingToken,
    pub deadline: Instant,
    pub ttl: Duration,
}

#[cfg(test)]
#[path = "lease_tests.rs"]
mod tests;
