// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events emitted by the coordination engine

use crate::lease::{FencingToken, HolderId, RequestId, ResourceKey};
use crate::policy::ActionType;
use serde::{Deserialize, Serialize};

/// Observable state transitions, published on the [`crate::bus::EventBus`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    // Lease events
    LeaseGranted {
        resource: ResourceKey,
        holder: HolderId,
        token: FencingToken,
    },
    LeaseQueued {
        resource: ResourceKey,
        requestor: HolderId,
        request_id: RequestId,
        position: usize,
    },
    LeaseReleased {
        resource: ResourceKey,
        holder: HolderId,
    },
    LeasePromoted {
        resource: ResourceKey,
        holder: HolderId,
        request_id: RequestId,
        token: FencingToken,
    },
    LeaseReclaimed {
        resource: ResourceKey,
        previous_holder: HolderId,
    },
    LeaseRenewed {
        resource: ResourceKey,
        holder: HolderId,
        token: FencingToken,
    },

    // Request events
    RequestCancelled {
        resource: ResourceKey,
        request_id: RequestId,
    },

    // Admission events
    AdmissionDenied {
        resource: ResourceKey,
        requestor: HolderId,
        action: ActionType,
        reason: String,
    },
    AdmissionFlagged {
        resource: ResourceKey,
        requestor: HolderId,
        action: ActionType,
        reason: String,
    },
}

impl Event {
    /// Get the event name for pattern matching
    /// Format: "category:action"
    pub fn name(&self) -> String {
        match self {
            Event::LeaseGranted { .. } => "lease:granted".to_string(),
            Event::LeaseQueued { .. } => "lease:queued".to_string(),
            Event::LeaseReleased { .. } => "lease:released".to_string(),
            Event::LeasePromoted { .. } => "lease:promoted".to_string(),
            Event::LeaseReclaimed { .. } => "lease:reclaimed".to_string(),
            Event::LeaseRenewed { .. } => "lease:renewed".to_string(),
            Event::RequestCancelled { .. } => "request:cancelled".to_string(),
            Event::AdmissionDenied { .. } => "admission:denied".to_string(),
            Event::AdmissionFlagged { .. } => "admission:flagged".to_string(),
        }
    }

    /// The resource this event concerns
    pub fn resource(&self) -> &ResourceKey {
        match self {
            Event::LeaseGranted { resource, .. }
            | Event::LeaseQueued { resource, .. }
            | Event::LeaseReleased { resource, .. }
            | Event::LeasePromoted { resource, .. }
            | Event::LeaseReclaimed { resource, .. }
            | Event::LeaseRenewed { resource, .. }
            | Event::RequestCancelled { resource, .. }
            | Event::AdmissionDenied { resource, .. }
            | Event::AdmissionFlagged { resource, .. } => resource,
        }
    }
}
