// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! warden-store: LeaseStore implementations
//!
//! - [`MemoryLeaseStore`] - in-process store; every primitive is atomic
//!   under one mutex
//! - [`RetryingStore`] - bounded retry-with-backoff decorator that fails
//!   closed when the inner store stays unreachable
//! - `FlakyStore` (feature `test-support`) - failure-injecting wrapper for
//!   fail-closed and retry tests

pub mod memory;
pub mod retry;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use memory::MemoryLeaseStore;
pub use retry::{RetryConfig, RetryingStore};

#[cfg(any(test, feature = "test-support"))]
pub use fake::FlakyStore;
