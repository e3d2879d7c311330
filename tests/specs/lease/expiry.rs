//! Crash-safety: lapsed leases are reclaimed and waiters promoted

use crate::prelude::*;
use std::sync::Arc;
use tokio::sync::watch;
use warden_core::clock::FakeClock;
use warden_core::lease::{HolderId, ResourceKey};
use warden_engine::{AcquireRequest, LockState, Reaper, ReaperConfig, RequestState};

#[tokio::test]
async fn reap_promotes_the_waiter_behind_a_crashed_holder() {
    let clock = FakeClock::new();
    let mgr = manager(&clock);
    let resource = ResourceKey::new("r1");

    // agent-a acquires with a short ttl and then never comes back
    granted(
        mgr.acquire(AcquireRequest::new("r1", "agent-a", "edit").with_ttl(secs(10)))
            .await
            .unwrap(),
    );
    let (waiter_id, _) = queued(
        mgr.acquire(AcquireRequest::new("r1", "agent-b", "edit").with_ttl(secs(30)))
            .await
            .unwrap(),
    );

    clock.advance(secs(11));
    let events = mgr.reap().await.unwrap();
    let names: Vec<String> = events.iter().map(|e| e.name()).collect();
    assert_eq!(names, vec!["lease:reclaimed", "lease:promoted"]);

    // The waiter now holds, on its own requested ttl
    let RequestState::Granted(grant) = mgr.query_request(&waiter_id).await else {
        panic!("waiter was not promoted");
    };
    assert_eq!(grant.ttl, secs(30));
    let status = mgr.query_status(&resource).await.unwrap();
    assert!(
        matches!(status.state, LockState::Held { ref holder, .. } if holder == &HolderId::new("agent-b"))
    );
    assert_eq!(status.queue_depth, 0);
}

#[tokio::test]
async fn renewal_outruns_the_reaper() {
    let clock = FakeClock::new();
    let mgr = manager(&clock);
    let resource = ResourceKey::new("r1");

    let (_, grant) = granted(
        mgr.acquire(AcquireRequest::new("r1", "agent-a", "edit").with_ttl(secs(10)))
            .await
            .unwrap(),
    );

    // Renew inside the window, then cross the original deadline
    clock.advance(secs(8));
    mgr.renew(&resource, &HolderId::new("agent-a"), grant.token, secs(10))
        .await
        .unwrap();
    clock.advance(secs(5));

    assert!(mgr.reap().await.unwrap().is_empty());
    let status = mgr.query_status(&resource).await.unwrap();
    assert!(matches!(status.state, LockState::Held { .. }));
}

#[tokio::test]
async fn expiry_is_observable_before_any_sweep_runs() {
    let clock = FakeClock::new();
    let mgr = manager(&clock);
    let resource = ResourceKey::new("r1");

    granted(
        mgr.acquire(AcquireRequest::new("r1", "agent-a", "edit").with_ttl(secs(10)))
            .await
            .unwrap(),
    );
    clock.advance(secs(10));

    // No reap has run, but the lapsed lease already reads as free and a
    // fresh acquire goes straight through
    let status = mgr.query_status(&resource).await.unwrap();
    assert_eq!(status.state, LockState::Free);
    granted(
        mgr.acquire(AcquireRequest::new("r1", "agent-b", "edit"))
            .await
            .unwrap(),
    );
}

#[tokio::test(start_paused = true)]
async fn background_reaper_needs_no_caller_involvement() {
    let clock = FakeClock::new();
    let mgr = Arc::new(manager(&clock));

    granted(
        mgr.acquire(AcquireRequest::new("r1", "agent-a", "edit").with_ttl(secs(10)))
            .await
            .unwrap(),
    );
    let (waiter_id, _) = queued(
        mgr.acquire(AcquireRequest::new("r1", "agent-b", "edit"))
            .await
            .unwrap(),
    );
    clock.advance(secs(11));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reaper = Reaper::new(
        Arc::clone(&mgr),
        ReaperConfig::new().with_interval(std::time::Duration::from_millis(50)),
    );
    let handle = tokio::spawn(reaper.run(shutdown_rx));

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert!(matches!(
        mgr.query_request(&waiter_id).await,
        RequestState::Granted(_)
    ));

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();
}
