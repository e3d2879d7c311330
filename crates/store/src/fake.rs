// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure-injecting store wrapper for tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;
use warden_core::error::StoreError;
use warden_core::lease::{FencingToken, Lease, ResourceKey};
use warden_core::store::{ExtendOutcome, LeaseStore, PutOutcome, RemoveOutcome};

/// Wraps a store and fails the next N operations with `Unavailable`
#[derive(Clone)]
pub struct FlakyStore<S> {
    inner: S,
    failures_remaining: Arc<AtomicU32>,
    ops_attempted: Arc<AtomicU32>,
}

impl<S: LeaseStore> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            failures_remaining: Arc::new(AtomicU32::new(0)),
            ops_attempted: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Make the next `count` operations fail
    pub fn fail_next(&self, count: u32) {
        self.failures_remaining.store(count, Ordering::SeqCst);
    }

    /// Total operations attempted, failed or not
    pub fn ops_attempted(&self) -> u32 {
        self.ops_attempted.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), StoreError> {
        self.ops_attempted.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl<S: LeaseStore> LeaseStore for FlakyStore<S> {
    async fn put_if_absent(&self, lease: Lease, now: Instant) -> Result<PutOutcome, StoreError> {
        self.check()?;
        self.inner.put_if_absent(lease, now).await
    }

    async fn get(&self, resource: &ResourceKey) -> Result<Option<Lease>, StoreError> {
        self.check()?;
        self.inner.get(resource).await
    }

    async fn remove_if_token(
        &self,
        resource: &ResourceKey,
        token: FencingToken,
        now: Instant,
    ) -> Result<RemoveOutcome, StoreError> {
        self.check()?;
        self.inner.remove_if_token(resource, token, now).await
    }

    async fn extend_if_token(
        &self,
        resource: &ResourceKey,
        token: FencingToken,
        new_deadline: Instant,
        now: Instant,
    ) -> Result<ExtendOutcome, StoreError> {
        self.check()?;
        self.inner
            .extend_if_token(resource, token, new_deadline, now)
            .await
    }

    async fn remove_expired(
        &self,
        resource: &ResourceKey,
        now: Instant,
    ) -> Result<Option<Lease>, StoreError> {
        self.check()?;
        self.inner.remove_expired(resource, now).await
    }

    async fn expired_keys(&self, now: Instant) -> Result<Vec<ResourceKey>, StoreError> {
        self.check()?;
        self.inner.expired_keys(now).await
    }
}
