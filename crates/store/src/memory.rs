// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process lease store
//!
//! Every primitive runs under a single mutex, so each one is a single
//! atomic step: the deadline comparison and the mutation it gates can never
//! interleave with another caller.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use warden_core::error::StoreError;
use warden_core::lease::{FencingToken, Lease, ResourceKey};
use warden_core::store::{ExtendOutcome, LeaseStore, PutOutcome, RemoveOutcome};

/// In-memory [`LeaseStore`] for a single coordinator process
#[derive(Clone, Default)]
pub struct MemoryLeaseStore {
    leases: Arc<Mutex<HashMap<ResourceKey, Lease>>>,
}

impl MemoryLeaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of lease records, live or expired
    pub fn len(&self) -> usize {
        self.leases.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl LeaseStore for MemoryLeaseStore {
    async fn put_if_absent(&self, lease: Lease, now: Instant) -> Result<PutOutcome, StoreError> {
        let mut leases = self.leases.lock().unwrap_or_else(|e| e.into_inner());
        match leases.get(&lease.resource) {
            Some(current) if !current.is_expired(now) => Ok(PutOutcome::Held {
                holder: current.holder.clone(),
                token: current.token,
                deadline: current.deadline,
            }),
            // Absent, or expired and therefore reclaimable
            _ => {
                leases.insert(lease.resource.clone(), lease);
                Ok(PutOutcome::Inserted)
            }
        }
    }

    async fn get(&self, resource: &ResourceKey) -> Result<Option<Lease>, StoreError> {
        let leases = self.leases.lock().unwrap_or_else(|e| e.into_inner());
        Ok(leases.get(resource).cloned())
    }

    async fn remove_if_token(
        &self,
        resource: &ResourceKey,
        token: FencingToken,
        now: Instant,
    ) -> Result<RemoveOutcome, StoreError> {
        let mut leases = self.leases.lock().unwrap_or_else(|e| e.into_inner());
        let Some(current) = leases.get(resource) else {
            return Ok(RemoveOutcome::Missing);
        };
        if current.token != token {
            return Ok(RemoveOutcome::TokenMismatch);
        }
        if current.is_expired(now) {
            return Ok(RemoveOutcome::Expired);
        }
        match leases.remove(resource) {
            Some(lease) => Ok(RemoveOutcome::Removed(lease)),
            None => Ok(RemoveOutcome::Missing),
        }
    }

    async fn extend_if_token(
        &self,
        resource: &ResourceKey,
        token: FencingToken,
        new_deadline: Instant,
        now: Instant,
    ) -> Result<ExtendOutcome, StoreError> {
        let mut leases = self.leases.lock().unwrap_or_else(|e| e.into_inner());
        let Some(current) = leases.get_mut(resource) else {
            return Ok(ExtendOutcome::Missing);
        };
        if current.token != token {
            return Ok(ExtendOutcome::TokenMismatch);
        }
        if current.is_expired(now) {
            return Ok(ExtendOutcome::Expired);
        }
        current.deadline = new_deadline;
        current.ttl = new_deadline.saturating_duration_since(now);
        Ok(ExtendOutcome::Extended(current.clone()))
    }

    async fn remove_expired(
        &self,
        resource: &ResourceKey,
        now: Instant,
    ) -> Result<Option<Lease>, StoreError> {
        let mut leases = self.leases.lock().unwrap_or_else(|e| e.into_inner());
        match leases.get(resource) {
            Some(current) if current.is_expired(now) => Ok(leases.remove(resource)),
            _ => Ok(None),
        }
    }

    async fn expired_keys(&self, now: Instant) -> Result<Vec<ResourceKey>, StoreError> {
        let leases = self.leases.lock().unwrap_or_else(|e| e.into_inner());
        Ok(leases
            .values()
            .filter(|lease| lease.is_expired(now))
            .map(|lease| lease.resource.clone())
            .collect())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
