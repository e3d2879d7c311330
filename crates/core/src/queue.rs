// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-resource wait queue with priority ordering
//!
//! Pending acquires wait here while a resource is held. Ordering is priority
//! descending, then arrival ascending; a monotonic sequence number breaks
//! exact-instant ties so the order is total and deterministic. A request id
//! appears at most once while waiting.

use crate::lease::{HolderId, RequestId, ResourceKey};
use std::cmp::Ordering;
use std::time::{Duration, Instant};

/// A pending acquire waiting for a resource
#[derive(Clone, Debug)]
pub struct QueueEntry {
    pub resource: ResourceKey,
    pub requestor: HolderId,
    pub request_id: RequestId,
    /// Larger means more urgent
    pub priority: i32,
    /// The ttl this request asked for; used when the entry is promoted
    pub ttl: Duration,
    pub enqueued_at: Instant,
    /// Monotonic enqueue counter, breaks equal-instant ties
    pub seq: u64,
}

fn compare(a: &QueueEntry, b: &QueueEntry) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then(a.enqueued_at.cmp(&b.enqueued_at))
        .then(a.seq.cmp(&b.seq))
}

/// Ordered view of one waiter, for status queries
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WaiterInfo {
    pub request_id: RequestId,
    pub requestor: HolderId,
    pub priority: i32,
    /// 1-based position; 1 is next to be promoted
    pub position: usize,
}

/// Per-resource ordered collection of pending requests
///
/// The front entry is always the next to be promoted.
#[derive(Clone, Debug, Default)]
pub struct WaitQueue {
    entries: Vec<QueueEntry>,
}

impl WaitQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of waiting entries
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, request_id: &RequestId) -> bool {
        self.entries.iter().any(|e| &e.request_id == request_id)
    }

    /// Insert at the sorted position, returning the 1-based wait position
    pub fn insert(&mut self, entry: QueueEntry) -> usize {
        let idx = self
            .entries
            .partition_point(|e| compare(e, &entry) != Ordering::Greater);
        self.entries.insert(idx, entry);
        idx + 1
    }

    /// The entry that would be promoted next, without removing it
    pub fn peek_next(&self) -> Option<&QueueEntry> {
        self.entries.first()
    }

    /// Remove and return the highest-priority entry
    pub fn pop_next(&mut self) -> Option<QueueEntry> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0))
        }
    }

    /// Remove an entry from an arbitrary position (cancellation)
    pub fn remove(&mut self, request_id: &RequestId) -> Option<QueueEntry> {
        let idx = self
            .entries
            .iter()
            .position(|e| &e.request_id == request_id)?;
        Some(self.entries.remove(idx))
    }

    /// 1-based position of a waiting entry
    pub fn position_of(&self, request_id: &RequestId) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| &e.request_id == request_id)
            .map(|i| i + 1)
    }

    /// Ordered snapshot of all waiters
    pub fn waiters(&self) -> Vec<WaiterInfo> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| WaiterInfo {
                request_id: e.request_id.clone(),
                requestor: e.requestor.clone(),
                priority: e.priority,
                position: i + 1,
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
