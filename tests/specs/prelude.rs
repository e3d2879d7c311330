//! Shared helpers for warden behavioral specs

#![allow(dead_code)]

use std::time::Duration;
use warden_core::clock::FakeClock;
use warden_core::id::SequentialIdGen;
use warden_core::lease::{Grant, RequestId};
use warden_core::policy::PolicyGate;
use warden_engine::{AcquireOutcome, LockManager};
use warden_store::MemoryLeaseStore;

pub type SpecManager = LockManager<MemoryLeaseStore, FakeClock, SequentialIdGen>;

/// A manager with a controllable clock, sequential request ids, and no
/// admission rules
pub fn manager(clock: &FakeClock) -> SpecManager {
    manager_with_gate(clock, PolicyGate::default())
}

pub fn manager_with_gate(clock: &FakeClock, gate: PolicyGate) -> SpecManager {
    LockManager::with_ids(
        MemoryLeaseStore::new(),
        clock.clone(),
        gate,
        SequentialIdGen::default(),
    )
}

pub fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

/// Unwrap an immediate grant
pub fn granted(outcome: AcquireOutcome) -> (RequestId, Grant) {
    match outcome {
        AcquireOutcome::Granted { request_id, grant } => (request_id, grant),
        other => panic!("expected a grant, got {other:?}"),
    }
}

/// Unwrap a queued outcome into (request_id, position)
pub fn queued(outcome: AcquireOutcome) -> (RequestId, usize) {
    match outcome {
        AcquireOutcome::Queued {
            request_id,
            position,
        } => (request_id, position),
        other => panic!("expected to queue, got {other:?}"),
    }
}
