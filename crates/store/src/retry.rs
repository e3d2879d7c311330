// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded retry-with-backoff decorator for a lease store
//!
//! Connectivity failures are retried a bounded number of times with
//! exponential backoff. If the inner store is still unreachable, the error
//! propagates: the engine fails closed and no grant is issued.

use async_trait::async_trait;
use std::time::{Duration, Instant};
use warden_core::error::StoreError;
use warden_core::lease::{FencingToken, Lease, ResourceKey};
use warden_core::store::{ExtendOutcome, LeaseStore, PutOutcome, RemoveOutcome};

/// Retry budget for backing-store operations
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Total attempts per operation, including the first
    pub max_attempts: u32,
    /// Delay before the first retry; doubles each attempt
    pub base_delay: Duration,
    /// Cap on the backoff delay
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }
}

/// [`LeaseStore`] decorator adding the retry budget to every primitive
#[derive(Clone)]
pub struct RetryingStore<S> {
    inner: S,
    config: RetryConfig,
}

impl<S: LeaseStore> RetryingStore<S> {
    pub fn new(inner: S, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

macro_rules! with_retry {
    ($self:expr, $op:expr, $call:expr) => {{
        let mut delay = $self.config.base_delay;
        let mut attempt = 1u32;
        loop {
            match $call {
                Ok(value) => break Ok(value),
                Err(err) if attempt < $self.config.max_attempts => {
                    tracing::warn!(attempt, "store op {} failed, retrying: {}", $op, err);
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min($self.config.max_delay);
                    attempt += 1;
                }
                Err(err) => {
                    tracing::error!(attempt, "store op {} failed, giving up: {}", $op, err);
                    break Err(err);
                }
            }
        }
    }};
}

#[async_trait]
impl<S: LeaseStore> LeaseStore for RetryingStore<S> {
    async fn put_if_absent(&self, lease: Lease, now: Instant) -> Result<PutOutcome, StoreError> {
        with_retry!(self, "put_if_absent", {
            self.inner.put_if_absent(lease.clone(), now).await
        })
    }

    async fn get(&self, resource: &ResourceKey) -> Result<Option<Lease>, StoreError> {
        with_retry!(self, "get", self.inner.get(resource).await)
    }

    async fn remove_if_token(
        &self,
        resource: &ResourceKey,
        token: FencingToken,
        now: Instant,
    ) -> Result<RemoveOutcome, StoreError> {
        with_retry!(self, "remove_if_token", {
            self.inner.remove_if_token(resource, token, now).await
        })
    }

    async fn extend_if_token(
        &self,
        resource: &ResourceKey,
        token: FencingToken,
        new_deadline: Instant,
        now: Instant,
    ) -> Result<ExtendOutcome, StoreError> {
        with_retry!(self, "extend_if_token", {
            self.inner
                .extend_if_token(resource, token, new_deadline, now)
                .await
        })
    }

    async fn remove_expired(
        &self,
        resource: &ResourceKey,
        now: Instant,
    ) -> Result<Option<Lease>, StoreError> {
        with_retry!(self, "remove_expired", {
            self.inner.remove_expired(resource, now).await
        })
    }

    async fn expired_keys(&self, now: Instant) -> Result<Vec<ResourceKey>, StoreError> {
        with_retry!(self, "expired_keys", self.inner.expired_keys(now).await)
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
