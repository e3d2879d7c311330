// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock manager: grant, queue, promote, renew, cancel
//!
//! All mutations touching one resource's lease and wait queue happen inside
//! that resource's own critical section (a per-key async mutex); unrelated
//! resources never contend. The policy gate runs to completion before any
//! lock state is touched. Correctness against stale holders rests on
//! fencing-token comparison inside the store's atomic primitives.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Mutex as AsyncMutex;
use warden_core::bus::{EventBus, EventReceiver, Subscription};
use warden_core::clock::Clock;
use warden_core::error::{CoordinationError, StoreError};
use warden_core::event::Event;
use warden_core::id::{IdGen, UuidIdGen};
use warden_core::lease::{FencingToken, Grant, HolderId, Lease, RequestId, ResourceKey};
use warden_core::policy::{
    ActionType, AdmissionContext, AdmissionRequest, PolicyGate, RiskLevel, Verdict,
};
use warden_core::queue::{QueueEntry, WaitQueue, WaiterInfo};
use warden_core::store::{ExtendOutcome, LeaseStore, PutOutcome, RemoveOutcome};

/// One acquire call, as submitted by a caller
#[derive(Clone, Debug)]
pub struct AcquireRequest {
    pub resource: ResourceKey,
    pub requestor: HolderId,
    pub action: ActionType,
    /// Larger means more urgent
    pub priority: i32,
    pub ttl: Duration,
    /// Risk classification of the resource, for the admission gate
    pub resource_risk: RiskLevel,
}

impl AcquireRequest {
    pub fn new(
        resource: impl Into<String>,
        requestor: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            resource: ResourceKey::new(resource),
            requestor: HolderId::new(requestor),
            action: ActionType::new(action),
            priority: 0,
            ttl: Duration::from_secs(300),
            resource_risk: RiskLevel::Low,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_risk(mut self, risk: RiskLevel) -> Self {
        self.resource_risk = risk;
        self
    }
}

/// What an acquire call returns; queueing is not an error
#[derive(Clone, Debug, PartialEq)]
pub enum AcquireOutcome {
    Granted { request_id: RequestId, grant: Grant },
    Queued { request_id: RequestId, position: usize },
}

/// A waiter converted into the new holder
#[derive(Clone, Debug, PartialEq)]
pub struct Promotion {
    pub requestor: HolderId,
    pub request_id: RequestId,
    pub grant: Grant,
}

/// Result of a successful release
#[derive(Clone, Debug, PartialEq)]
pub struct ReleaseOutcome {
    pub promoted: Option<Promotion>,
}

/// Current holder state of one resource
#[derive(Clone, Debug, PartialEq)]
pub enum LockState {
    Free,
    Held {
        holder: HolderId,
        token: FencingToken,
        deadline: Instant,
    },
}

/// Snapshot answer for a status query
///
/// Reflects the last committed transition; an expired, not-yet-reclaimed
/// lease reads as `Free`.
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceStatus {
    pub resource: ResourceKey,
    pub state: LockState,
    pub queue_depth: usize,
    pub waiters: Vec<WaiterInfo>,
}

/// Where a single request stands
#[derive(Clone, Debug, PartialEq)]
pub enum RequestState {
    Waiting { position: usize },
    Granted(Grant),
    Cancelled,
    Unknown,
}

/// Per-resource state guarded by that resource's critical section
#[derive(Default)]
struct ResourceState {
    queue: WaitQueue,
}

/// The coordination engine's front door
pub struct LockManager<S: LeaseStore, C: Clock, I: IdGen = UuidIdGen> {
    store: S,
    clock: C,
    ids: I,
    gate: PolicyGate,
    bus: EventBus,
    /// Fencing tokens are minted here; strictly increasing across all grants
    token_seq: AtomicU64,
    /// Enqueue counter, breaks equal-instant queue ties
    enqueue_seq: AtomicU64,
    resources: Mutex<HashMap<ResourceKey, Arc<AsyncMutex<ResourceState>>>>,
    /// request_id -> resource, for waiting entries only
    index: Mutex<HashMap<RequestId, ResourceKey>>,
    /// Terminal outcomes (granted/cancelled) observable via query_request,
    /// stamped with when they were recorded
    outcomes: Mutex<HashMap<RequestId, (RequestState, Instant)>>,
    /// How long a terminal outcome stays queryable; the reaper sweep evicts
    /// older ones so the map stays bounded
    outcome_retention: Duration,
    /// Live leases per requestor, fed to the admission gate as context
    holds: Mutex<HashMap<HolderId, usize>>,
}

impl<S: LeaseStore, C: Clock> LockManager<S, C, UuidIdGen> {
    pub fn new(store: S, clock: C, gate: PolicyGate) -> Self {
        Self::with_ids(store, clock, gate, UuidIdGen)
    }
}

impl<S: LeaseStore, C: Clock, I: IdGen> LockManager<S, C, I> {
    pub fn with_ids(store: S, clock: C, gate: PolicyGate, ids: I) -> Self {
        Self {
            store,
            clock,
            ids,
            gate,
            bus: EventBus::new(),
            token_seq: AtomicU64::new(1),
            enqueue_seq: AtomicU64::new(0),
            resources: Mutex::new(HashMap::new()),
            index: Mutex::new(HashMap::new()),
            outcomes: Mutex::new(HashMap::new()),
            outcome_retention: Duration::from_secs(3600),
            holds: Mutex::new(HashMap::new()),
        }
    }

    /// How long granted/cancelled outcomes remain answerable via
    /// [`Self::query_request`] before the reaper sweep evicts them
    pub fn with_outcome_retention(mut self, retention: Duration) -> Self {
        self.outcome_retention = retention;
        self
    }

    /// Subscribe to coordination events (push channel; polling via
    /// query_status/query_request remains authoritative)
    pub fn subscribe(&self, subscription: Subscription) -> EventReceiver {
        self.bus.subscribe(subscription)
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Resources this manager has seen (held, queued, or since released)
    pub fn resource_keys(&self) -> Vec<ResourceKey> {
        self.resources
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    /// Acquire a resource: immediate grant if free, otherwise a queue
    /// position. Never blocks waiting for promotion.
    pub async fn acquire(
        &self,
        request: AcquireRequest,
    ) -> Result<AcquireOutcome, CoordinationError> {
        let decision = self.gate.evaluate(&AdmissionRequest {
            requestor: request.requestor.clone(),
            action: request.action.clone(),
            resource: request.resource.clone(),
            priority: request.priority,
            context: AdmissionContext {
                current_holds: self.holds_of(&request.requestor),
                resource_risk: request.resource_risk,
            },
        });

        match decision.verdict {
            Verdict::Deny { reason } => {
                tracing::info!(
                    resource = %request.resource,
                    requestor = %request.requestor,
                    action = %request.action,
                    %reason,
                    "admission denied"
                );
                self.bus.publish(Event::AdmissionDenied {
                    resource: request.resource.clone(),
                    requestor: request.requestor.clone(),
                    action: request.action.clone(),
                    reason: reason.clone(),
                });
                return Err(CoordinationError::PolicyDenied { reason });
            }
            Verdict::RequireApproval { reason } => {
                // Approval workflows live outside this core; flag and proceed
                tracing::warn!(
                    resource = %request.resource,
                    requestor = %request.requestor,
                    action = %request.action,
                    %reason,
                    "admission flagged for approval, proceeding"
                );
                self.bus.publish(Event::AdmissionFlagged {
                    resource: request.resource.clone(),
                    requestor: request.requestor.clone(),
                    action: request.action.clone(),
                    reason,
                });
            }
            Verdict::Allow => {}
        }

        let state = self.state_for(&request.resource);
        let mut guard = state.lock().await;
        let now = self.clock.now();

        // A lapsed lease is reclaimed before anything else: with waiters
        // behind it the front waiter gets promoted, not whoever calls next.
        if let Some(lapsed) = self.store.remove_expired(&request.resource, now).await? {
            self.drop_hold(&lapsed.holder);
            self.bus.publish(Event::LeaseReclaimed {
                resource: request.resource.clone(),
                previous_holder: lapsed.holder,
            });
            self.promote_next(&mut guard, &request.resource).await?;
        } else if !guard.queue.is_empty() && self.store.get(&request.resource).await?.is_none() {
            // Free resource with waiters still queued: a promotion was cut
            // short by a store outage. The queue goes first.
            self.promote_next(&mut guard, &request.resource).await?;
        }

        let token = self.mint_token();
        let lease = Lease::new(
            request.resource.clone(),
            request.requestor.clone(),
            token,
            request.ttl,
            now,
        );
        let grant = lease.grant();

        match self.store.put_if_absent(lease, now).await? {
            PutOutcome::Inserted => {
                let request_id = self.ids.next_request_id();
                self.bump_hold(&request.requestor);
                self.record_outcome(&request_id, RequestState::Granted(grant));
                tracing::info!(
                    resource = %request.resource,
                    holder = %request.requestor,
                    %token,
                    "lease granted"
                );
                self.bus.publish(Event::LeaseGranted {
                    resource: request.resource.clone(),
                    holder: request.requestor.clone(),
                    token,
                });
                Ok(AcquireOutcome::Granted { request_id, grant })
            }
            PutOutcome::Held { .. } => {
                let request_id = self.ids.next_request_id();
                let position = guard.queue.insert(QueueEntry {
                    resource: request.resource.clone(),
                    requestor: request.requestor.clone(),
                    request_id: request_id.clone(),
                    priority: request.priority,
                    ttl: request.ttl,
                    enqueued_at: now,
                    seq: self.enqueue_seq.fetch_add(1, Ordering::SeqCst),
                });
                self.index
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .insert(request_id.clone(), request.resource.clone());
                tracing::debug!(
                    resource = %request.resource,
                    requestor = %request.requestor,
                    %request_id,
                    position,
                    "resource busy, request queued"
                );
                self.bus.publish(Event::LeaseQueued {
                    resource: request.resource.clone(),
                    requestor: request.requestor.clone(),
                    request_id: request_id.clone(),
                    position,
                });
                Ok(AcquireOutcome::Queued {
                    request_id,
                    position,
                })
            }
        }
    }

    /// Release a held lease; the fencing token is the only credential.
    /// Promotes the highest-priority waiter in the same critical section.
    pub async fn release(
        &self,
        resource: &ResourceKey,
        requestor: &HolderId,
        token: FencingToken,
    ) -> Result<ReleaseOutcome, CoordinationError> {
        let state = self.state_for(resource);
        let mut guard = state.lock().await;
        let now = self.clock.now();

        match self.store.remove_if_token(resource, token, now).await? {
            RemoveOutcome::Removed(lease) => {
                self.drop_hold(&lease.holder);
                tracing::info!(resource = %resource, holder = %requestor, %token, "lease released");
                self.bus.publish(Event::LeaseReleased {
                    resource: resource.clone(),
                    holder: lease.holder,
                });
                let promoted = self.promote_next(&mut guard, resource).await?;
                Ok(ReleaseOutcome { promoted })
            }
            RemoveOutcome::TokenMismatch => Err(CoordinationError::StaleToken {
                resource: resource.clone(),
            }),
            RemoveOutcome::Expired | RemoveOutcome::Missing => {
                Err(CoordinationError::LeaseExpired {
                    resource: resource.clone(),
                })
            }
        }
    }

    /// Extend a live lease's deadline. The token stays the same; renewal is
    /// the only sanctioned way to keep holding (re-acquiring queues instead).
    pub async fn renew(
        &self,
        resource: &ResourceKey,
        requestor: &HolderId,
        token: FencingToken,
        new_ttl: Duration,
    ) -> Result<Grant, CoordinationError> {
        let state = self.state_for(resource);
        let _guard = state.lock().await;
        let now = self.clock.now();
        let new_deadline = self.clock.deadline_in(new_ttl);

        match self
            .store
            .extend_if_token(resource, token, new_deadline, now)
            .await?
        {
            ExtendOutcome::Extended(lease) => {
                tracing::debug!(resource = %resource, holder = %requestor, %token, "lease renewed");
                self.bus.publish(Event::LeaseRenewed {
                    resource: resource.clone(),
                    holder: lease.holder.clone(),
                    token,
                });
                Ok(lease.grant())
            }
            ExtendOutcome::TokenMismatch => Err(CoordinationError::StaleToken {
                resource: resource.clone(),
            }),
            ExtendOutcome::Expired | ExtendOutcome::Missing => {
                Err(CoordinationError::LeaseExpired {
                    resource: resource.clone(),
                })
            }
        }
    }

    /// Withdraw a waiting request. Exactly one of {promotion, cancellation}
    /// wins for any entry; losing the race surfaces as `UnknownRequest`, and
    /// the caller will observe `Granted` via query_request.
    pub async fn cancel(&self, request_id: &RequestId) -> Result<(), CoordinationError> {
        let resource = self
            .index
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(request_id)
            .cloned();
        let Some(resource) = resource else {
            return Err(CoordinationError::UnknownRequest(request_id.clone()));
        };

        let state = self.state_for(&resource);
        let mut guard = state.lock().await;

        let Some(entry) = guard.queue.remove(request_id) else {
            // Promoted between the index lookup and taking the lock
            return Err(CoordinationError::UnknownRequest(request_id.clone()));
        };

        self.index
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(request_id);
        self.record_outcome(request_id, RequestState::Cancelled);
        tracing::debug!(resource = %resource, %request_id, requestor = %entry.requestor, "request cancelled");
        self.bus.publish(Event::RequestCancelled {
            resource,
            request_id: request_id.clone(),
        });
        Ok(())
    }

    /// Holder/queue snapshot for one resource, consistent with the last
    /// committed transition
    pub async fn query_status(
        &self,
        resource: &ResourceKey,
    ) -> Result<ResourceStatus, CoordinationError> {
        let state = self.state_for(resource);
        let guard = state.lock().await;

        let lock_state = match self.store.get(resource).await? {
            Some(lease) if !self.clock.has_passed(lease.deadline) => LockState::Held {
                holder: lease.holder,
                token: lease.token,
                deadline: lease.deadline,
            },
            _ => LockState::Free,
        };

        Ok(ResourceStatus {
            resource: resource.clone(),
            state: lock_state,
            queue_depth: guard.queue.depth(),
            waiters: guard.queue.waiters(),
        })
    }

    /// Where a single request stands: waiting (with position), granted,
    /// cancelled, or unknown
    pub async fn query_request(&self, request_id: &RequestId) -> RequestState {
        if let Some(outcome) = self.terminal_outcome(request_id) {
            return outcome;
        }

        let resource = self
            .index
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(request_id)
            .cloned();
        let Some(resource) = resource else {
            return RequestState::Unknown;
        };

        let state = self.state_for(&resource);
        let guard = state.lock().await;
        if let Some(position) = guard.queue.position_of(request_id) {
            return RequestState::Waiting { position };
        }
        // Reached a terminal state while we were looking
        self.terminal_outcome(request_id)
            .unwrap_or(RequestState::Unknown)
    }

    /// One reaper sweep: reclaim every lapsed lease and promote waiters.
    /// Returns the reclaim/promotion events committed by this sweep.
    pub async fn reap(&self) -> Result<Vec<Event>, CoordinationError> {
        let now = self.clock.now();
        let mut events = Vec::new();

        {
            let retention = self.outcome_retention;
            let mut outcomes = self.outcomes.lock().unwrap_or_else(|e| e.into_inner());
            outcomes.retain(|_, (_, at)| now.saturating_duration_since(*at) < retention);
        }

        for resource in self.store.expired_keys(now).await? {
            let state = self.state_for(&resource);
            let mut guard = state.lock().await;

            // Re-checked atomically at the store: a renew that landed since
            // the scan wins and the lease is no longer expired.
            let Some(lease) = self.store.remove_expired(&resource, now).await? else {
                continue;
            };

            self.drop_hold(&lease.holder);
            tracing::warn!(
                resource = %resource,
                holder = %lease.holder,
                token = %lease.token,
                "lease expired, reclaiming"
            );
            let reclaimed = Event::LeaseReclaimed {
                resource: resource.clone(),
                previous_holder: lease.holder,
            };
            self.bus.publish(reclaimed.clone());
            events.push(reclaimed);

            if let Some(promotion) = self.promote_next(&mut guard, &resource).await? {
                events.push(Event::LeasePromoted {
                    resource: resource.clone(),
                    holder: promotion.requestor,
                    request_id: promotion.request_id,
                    token: promotion.grant.token,
                });
            }
        }

        Ok(events)
    }

    /// Convert the front waiter into the new holder with a fresh token and
    /// its own requested ttl. Caller must hold the resource's critical
    /// section.
    async fn promote_next(
        &self,
        state: &mut ResourceState,
        resource: &ResourceKey,
    ) -> Result<Option<Promotion>, StoreError> {
        let Some(entry) = state.queue.pop_next() else {
            return Ok(None);
        };

        let now = self.clock.now();
        let token = self.mint_token();
        let lease = Lease::new(
            resource.clone(),
            entry.requestor.clone(),
            token,
            entry.ttl,
            now,
        );
        let grant = lease.grant();

        match self.store.put_if_absent(lease, now).await {
            Ok(PutOutcome::Inserted) => {}
            Ok(PutOutcome::Held { holder, .. }) => {
                // Cannot happen inside the resource's critical section; put
                // the entry back rather than lose it.
                tracing::error!(resource = %resource, %holder, "promotion found the resource held");
                state.queue.insert(entry);
                return Ok(None);
            }
            Err(err) => {
                // The waiter must stay observable through the outage: back
                // into the queue, where the next release, sweep, or acquire
                // on this resource will promote it.
                tracing::warn!(
                    resource = %resource,
                    request_id = %entry.request_id,
                    error = %err,
                    "promotion hit a store failure, requeueing the waiter"
                );
                state.queue.insert(entry);
                return Err(err);
            }
        }

        self.index
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&entry.request_id);
        self.bump_hold(&entry.requestor);
        self.record_outcome(&entry.request_id, RequestState::Granted(grant));
        tracing::info!(
            resource = %resource,
            holder = %entry.requestor,
            request_id = %entry.request_id,
            %token,
            "waiter promoted"
        );
        self.bus.publish(Event::LeasePromoted {
            resource: resource.clone(),
            holder: entry.requestor.clone(),
            request_id: entry.request_id.clone(),
            token,
        });

        Ok(Some(Promotion {
            requestor: entry.requestor,
            request_id: entry.request_id,
            grant,
        }))
    }

    fn state_for(&self, resource: &ResourceKey) -> Arc<AsyncMutex<ResourceState>> {
        let mut resources = self.resources.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(
            resources
                .entry(resource.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(ResourceState::default()))),
        )
    }

    fn mint_token(&self) -> FencingToken {
        FencingToken::new(self.token_seq.fetch_add(1, Ordering::SeqCst))
    }

    fn holds_of(&self, requestor: &HolderId) -> usize {
        self.holds
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(requestor)
            .copied()
            .unwrap_or(0)
    }

    fn bump_hold(&self, requestor: &HolderId) {
        let mut holds = self.holds.lock().unwrap_or_else(|e| e.into_inner());
        *holds.entry(requestor.clone()).or_insert(0) += 1;
    }

    fn drop_hold(&self, requestor: &HolderId) {
        let mut holds = self.holds.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(count) = holds.get_mut(requestor) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                holds.remove(requestor);
            }
        }
    }

    fn record_outcome(&self, request_id: &RequestId, outcome: RequestState) {
        self.outcomes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(request_id.clone(), (outcome, self.clock.now()));
    }

    fn terminal_outcome(&self, request_id: &RequestId) -> Option<RequestState> {
        self.outcomes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(request_id)
            .map(|(outcome, _)| outcome.clone())
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
