//! Fail-closed behavior when the lease store is unreachable

use std::time::Duration;
use warden_core::clock::FakeClock;
use warden_core::error::CoordinationError;
use warden_core::id::SequentialIdGen;
use warden_core::lease::ResourceKey;
use warden_core::policy::PolicyGate;
use warden_engine::{AcquireOutcome, AcquireRequest, LockManager, LockState};
use warden_store::{FlakyStore, MemoryLeaseStore, RetryConfig, RetryingStore};

type FlakyManager =
    LockManager<RetryingStore<FlakyStore<MemoryLeaseStore>>, FakeClock, SequentialIdGen>;

fn manager(clock: &FakeClock) -> (FlakyManager, FlakyStore<MemoryLeaseStore>) {
    let flaky = FlakyStore::new(MemoryLeaseStore::new());
    let handle = flaky.clone();
    let store = RetryingStore::new(
        flaky,
        RetryConfig::new()
            .with_max_attempts(3)
            .with_base_delay(Duration::from_millis(1))
            .with_max_delay(Duration::from_millis(4)),
    );
    let mgr = LockManager::with_ids(
        store,
        clock.clone(),
        PolicyGate::default(),
        SequentialIdGen::default(),
    );
    (mgr, handle)
}

#[tokio::test]
async fn acquire_fails_closed_when_the_store_stays_down() {
    let clock = FakeClock::new();
    let (mgr, handle) = manager(&clock);
    handle.fail_next(10);

    let err = mgr
        .acquire(AcquireRequest::new("r1", "agent-a", "edit"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoordinationError::Unavailable(_)));

    // Once the store recovers, nothing was half-granted
    handle.fail_next(0);
    let status = mgr.query_status(&ResourceKey::new("r1")).await.unwrap();
    assert_eq!(status.state, LockState::Free);
    assert_eq!(status.queue_depth, 0);
}

#[tokio::test]
async fn a_transient_outage_is_absorbed_by_retries() {
    let clock = FakeClock::new();
    let (mgr, handle) = manager(&clock);
    handle.fail_next(2);

    let outcome = mgr
        .acquire(AcquireRequest::new("r1", "agent-a", "edit"))
        .await
        .unwrap();
    assert!(matches!(outcome, AcquireOutcome::Granted { .. }));
}

#[tokio::test]
async fn reap_surfaces_store_outages_instead_of_dropping_leases() {
    let clock = FakeClock::new();
    let (mgr, handle) = manager(&clock);

    mgr.acquire(AcquireRequest::new("r1", "agent-a", "edit").with_ttl(Duration::from_secs(10)))
        .await
        .unwrap();
    clock.advance(Duration::from_secs(11));

    handle.fail_next(10);
    let err = mgr.reap().await.unwrap_err();
    assert!(matches!(err, CoordinationError::Unavailable(_)));

    // The lapsed lease is still there for the next sweep
    handle.fail_next(0);
    let events = mgr.reap().await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name(), "lease:reclaimed");
}
