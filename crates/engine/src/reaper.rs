// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background reclaim of lapsed leases
//!
//! The reaper is a safety net, not the primary expiry path: acquire and the
//! status queries already treat a lapsed lease as gone. Sweeping on an
//! interval bounds how long a crashed holder can stall its waiters.

use crate::manager::{LockManager, LockState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use warden_core::clock::Clock;
use warden_core::error::CoordinationError;
use warden_core::id::IdGen;
use warden_core::store::LeaseStore;

/// How often the reaper sweeps for lapsed leases
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReaperConfig {
    #[serde(with = "humantime_serde", default = "default_interval")]
    pub interval: Duration,
}

fn default_interval() -> Duration {
    Duration::from_secs(1)
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
        }
    }
}

impl ReaperConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Periodic sweep task over a shared [`LockManager`]
pub struct Reaper<S: LeaseStore, C: Clock, I: IdGen> {
    manager: Arc<LockManager<S, C, I>>,
    config: ReaperConfig,
}

impl<S: LeaseStore, C: Clock, I: IdGen> Reaper<S, C, I> {
    pub fn new(manager: Arc<LockManager<S, C, I>>, config: ReaperConfig) -> Self {
        Self { manager, config }
    }

    /// Sweep until the shutdown signal flips. A failed sweep is logged and
    /// retried at the next tick; leases only ever outlive their ttl by one
    /// store outage, never lose it.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        tracing::debug!(interval = ?self.config.interval, "reaper started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.manager.reap().await {
                        Ok(events) if !events.is_empty() => {
                            tracing::info!(reclaimed = events.len(), "reaper sweep reclaimed leases");
                        }
                        Ok(_) => {}
                        Err(err) => {
                            tracing::warn!(error = %err, "reaper sweep failed, will retry");
                        }
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::debug!("reaper stopping");
                        return;
                    }
                }
            }
        }
    }
}

/// Aggregate coordination counters, for operator visibility
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinationStats {
    pub total_resources: usize,
    pub held: usize,
    pub free: usize,
    pub total_waiters: usize,
}

impl CoordinationStats {
    /// Snapshot across every resource the manager has seen
    pub async fn collect<S: LeaseStore, C: Clock, I: IdGen>(
        manager: &LockManager<S, C, I>,
    ) -> Result<Self, CoordinationError> {
        let mut stats = CoordinationStats::default();
        for resource in manager.resource_keys() {
            let status = manager.query_status(&resource).await?;
            stats.total_resources += 1;
            match status.state {
                LockState::Held { .. } => stats.held += 1,
                LockState::Free => stats.free += 1,
            }
            stats.total_waiters += status.queue_depth;
        }
        Ok(stats)
    }
}

#[cfg(test)]
#[path = "reaper_tests.rs"]
mod tests;
