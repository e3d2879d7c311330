//! The admission gate runs before any lock-state mutation

use crate::prelude::*;
use warden_core::bus::Subscription;
use warden_core::clock::FakeClock;
use warden_core::error::CoordinationError;
use warden_core::lease::{HolderId, ResourceKey};
use warden_core::policy::{ActionType, AdmissionRule, PolicyGate, RiskLevel};
use warden_engine::{AcquireOutcome, AcquireRequest, LockState};

fn denylist_gate() -> PolicyGate {
    PolicyGate::new(vec![AdmissionRule::DeniedActions {
        actions: vec![ActionType::new("wire_transfer")],
    }])
}

#[tokio::test]
async fn a_denied_request_neither_holds_nor_queues() {
    let clock = FakeClock::new();
    let mgr = manager_with_gate(&clock, denylist_gate());
    let resource = ResourceKey::new("accounts");

    // The resource is already held, so a sneaky denial path would be to
    // land in the queue anyway
    granted(
        mgr.acquire(AcquireRequest::new("accounts", "agent-a", "reconcile"))
            .await
            .unwrap(),
    );

    let err = mgr
        .acquire(AcquireRequest::new("accounts", "agent-b", "wire_transfer"))
        .await
        .unwrap_err();
    let CoordinationError::PolicyDenied { reason } = err else {
        panic!("expected a policy denial");
    };
    assert!(reason.contains("wire_transfer"));

    let status = mgr.query_status(&resource).await.unwrap();
    assert!(matches!(status.state, LockState::Held { ref holder, .. } if holder == &HolderId::new("agent-a")));
    assert_eq!(status.queue_depth, 0);
}

#[tokio::test]
async fn denial_is_published_for_audit() {
    let clock = FakeClock::new();
    let mgr = manager_with_gate(&clock, denylist_gate());
    let mut events = mgr.subscribe(Subscription::new("audit", vec!["admission:".into()]));

    let _ = mgr
        .acquire(AcquireRequest::new("accounts", "agent-b", "wire_transfer"))
        .await;

    let event = events.try_recv().unwrap();
    assert_eq!(event.name(), "admission:denied");
}

#[tokio::test]
async fn risk_threshold_gates_on_priority() {
    let clock = FakeClock::new();
    let gate = PolicyGate::new(vec![AdmissionRule::RiskThreshold {
        level: RiskLevel::High,
        min_priority: 5,
    }]);
    let mgr = manager_with_gate(&clock, gate);

    // Low-risk work is untouched by the threshold
    granted(
        mgr.acquire(AcquireRequest::new("scratch", "agent-a", "edit").with_priority(0))
            .await
            .unwrap(),
    );

    // High-risk work below the bar is refused
    let err = mgr
        .acquire(
            AcquireRequest::new("prod-db", "agent-a", "migrate")
                .with_priority(2)
                .with_risk(RiskLevel::High),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoordinationError::PolicyDenied { .. }));

    // At or above the bar it goes through
    granted(
        mgr.acquire(
            AcquireRequest::new("prod-db", "agent-a", "migrate")
                .with_priority(5)
                .with_risk(RiskLevel::High),
        )
        .await
        .unwrap(),
    );
}

#[tokio::test]
async fn critical_risk_is_escalated_but_not_blocked() {
    let clock = FakeClock::new();
    let gate = PolicyGate::new(vec![AdmissionRule::RiskThreshold {
        level: RiskLevel::High,
        min_priority: 5,
    }]);
    let mgr = manager_with_gate(&clock, gate);
    let mut events = mgr.subscribe(Subscription::all("audit"));

    let outcome = mgr
        .acquire(
            AcquireRequest::new("prod-db", "agent-a", "failover")
                .with_priority(9)
                .with_risk(RiskLevel::Critical),
        )
        .await
        .unwrap();
    assert!(matches!(outcome, AcquireOutcome::Granted { .. }));

    let names: Vec<String> = std::iter::from_fn(|| events.try_recv().ok())
        .map(|e| e.name())
        .collect();
    assert_eq!(names, vec!["admission:flagged", "lease:granted"]);
}

#[tokio::test]
async fn hold_limits_deny_the_over_extended_requestor_only() {
    let clock = FakeClock::new();
    let gate = PolicyGate::new(vec![AdmissionRule::MaxConcurrentHolds { limit: 2 }]);
    let mgr = manager_with_gate(&clock, gate);

    granted(
        mgr.acquire(AcquireRequest::new("r1", "agent-a", "edit"))
            .await
            .unwrap(),
    );
    granted(
        mgr.acquire(AcquireRequest::new("r2", "agent-a", "edit"))
            .await
            .unwrap(),
    );

    let err = mgr
        .acquire(AcquireRequest::new("r3", "agent-a", "edit"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoordinationError::PolicyDenied { .. }));

    // Another requestor is unaffected
    granted(
        mgr.acquire(AcquireRequest::new("r3", "agent-b", "edit"))
            .await
            .unwrap(),
    );
}

#[tokio::test]
async fn rules_short_circuit_in_declaration_order() {
    let clock = FakeClock::new();
    let gate = PolicyGate::new(vec![
        AdmissionRule::DeniedActions {
            actions: vec![ActionType::new("wire_transfer")],
        },
        AdmissionRule::MaxConcurrentHolds { limit: 0 },
    ]);
    let mgr = manager_with_gate(&clock, gate);

    // Both rules would fire; the denylist is listed first so its reason wins
    let err = mgr
        .acquire(AcquireRequest::new("r1", "agent-a", "wire_transfer"))
        .await
        .unwrap_err();
    let CoordinationError::PolicyDenied { reason } = err else {
        panic!("expected a policy denial");
    };
    assert!(reason.contains("denylisted"));
}
