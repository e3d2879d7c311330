// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! warden-core: Core library for the warden coordination engine
//!
//! This crate provides:
//! - Lease and fencing-token types for exclusive resource access
//! - Per-resource priority wait queues
//! - The admission (policy) gate evaluated before any lock-state mutation
//! - The `LeaseStore` seam over the backing store's atomic primitives
//! - Event taxonomy and an event bus for observers

pub mod bus;
pub mod clock;
pub mod error;
pub mod event;
pub mod id;
pub mod lease;
pub mod policy;
pub mod queue;
pub mod store;

// Re-exports
pub use bus::{EventBus, EventReceiver, Subscription};
pub use clock::{Clock, FakeClock, SystemClock};
pub use error::{CoordinationError, StoreError};
pub use event::Event;
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use lease::{FencingToken, Grant, HolderId, Lease, RequestId, ResourceKey};
pub use policy::{
    ActionType, AdmissionContext, AdmissionRequest, AdmissionRule, PolicyConfig, PolicyDecision,
    PolicyGate, RiskLevel, Verdict,
};
pub use queue::{QueueEntry, WaitQueue, WaiterInfo};
pub use store::{ExtendOutcome, LeaseStore, PutOutcome, RemoveOutcome};
