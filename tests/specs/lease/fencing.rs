//! Fencing: a reclaimed holder can never mutate with its old token

use crate::prelude::*;
use warden_core::clock::FakeClock;
use warden_core::error::CoordinationError;
use warden_core::lease::{HolderId, ResourceKey};
use warden_engine::{AcquireRequest, LockState};

#[tokio::test]
async fn stale_token_cannot_release_after_reclaim_and_promotion() {
    let clock = FakeClock::new();
    let mgr = manager(&clock);
    let resource = ResourceKey::new("ledger");

    // agent-a holds, agent-b waits, agent-a's lease lapses
    let (_, stale) = granted(
        mgr.acquire(AcquireRequest::new("ledger", "agent-a", "write").with_ttl(secs(10)))
            .await
            .unwrap(),
    );
    queued(
        mgr.acquire(AcquireRequest::new("ledger", "agent-b", "write"))
            .await
            .unwrap(),
    );
    clock.advance(secs(11));
    mgr.reap().await.unwrap();

    // agent-a wakes up and tries to release with its dead grant
    let err = mgr
        .release(&resource, &HolderId::new("agent-a"), stale.token)
        .await
        .unwrap_err();
    assert!(matches!(err, CoordinationError::StaleToken { .. }));

    // agent-b's lease is untouched and carries a strictly newer token
    let status = mgr.query_status(&resource).await.unwrap();
    let LockState::Held { holder, token, .. } = status.state else {
        panic!("promoted lease went missing");
    };
    assert_eq!(holder, HolderId::new("agent-b"));
    assert!(token > stale.token);
}

#[tokio::test]
async fn stale_token_cannot_renew_either() {
    let clock = FakeClock::new();
    let mgr = manager(&clock);
    let resource = ResourceKey::new("ledger");

    let (_, stale) = granted(
        mgr.acquire(AcquireRequest::new("ledger", "agent-a", "write").with_ttl(secs(10)))
            .await
            .unwrap(),
    );
    queued(
        mgr.acquire(AcquireRequest::new("ledger", "agent-b", "write"))
            .await
            .unwrap(),
    );
    clock.advance(secs(11));
    mgr.reap().await.unwrap();

    let err = mgr
        .renew(&resource, &HolderId::new("agent-a"), stale.token, secs(30))
        .await
        .unwrap_err();
    assert!(matches!(err, CoordinationError::StaleToken { .. }));
}

#[tokio::test]
async fn every_grant_on_a_resource_carries_a_larger_token() {
    let clock = FakeClock::new();
    let mgr = manager(&clock);
    let resource = ResourceKey::new("r1");

    let mut last = None;
    for holder in ["agent-a", "agent-b", "agent-c"] {
        let (_, grant) = granted(
            mgr.acquire(AcquireRequest::new("r1", holder, "edit"))
                .await
                .unwrap(),
        );
        if let Some(prev) = last {
            assert!(grant.token > prev);
        }
        last = Some(grant.token);
        mgr.release(&resource, &HolderId::new(holder), grant.token)
            .await
            .unwrap();
    }
}
