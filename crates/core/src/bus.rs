// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event bus for routing coordination events to subscribers
//!
//! This is the push channel by which a transport layer can learn about
//! promotions and reclaims without polling. Delivery is best-effort; the
//! authoritative state is always what the status queries report.

use crate::event::Event;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;

/// Sender for event delivery
pub type EventSender = mpsc::UnboundedSender<Event>;
/// Receiver for event delivery
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

/// A subscriber's interest: event-name patterns, matched per event
///
/// Patterns are exact names ("lease:promoted"), prefixes ("lease:" or
/// "lease:*"), or "*" for everything.
#[derive(Clone, Debug)]
pub struct Subscription {
    pub id: String,
    pub patterns: Vec<String>,
}

impl Subscription {
    pub fn new(id: impl Into<String>, patterns: Vec<String>) -> Self {
        Self {
            id: id.into(),
            patterns,
        }
    }

    /// Subscribe to every event
    pub fn all(id: impl Into<String>) -> Self {
        Self::new(id, vec!["*".to_string()])
    }

    pub fn matches(&self, event_name: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| pattern_matches(event_name, p))
    }
}

/// Check if an event name matches a pattern
fn pattern_matches(event_name: &str, pattern: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    if pattern.ends_with(':') || pattern.ends_with('*') {
        // Prefix match: "lease:" matches "lease:granted", "lease:promoted", etc.
        let prefix = pattern.trim_end_matches('*').trim_end_matches(':');
        return event_name.starts_with(prefix);
    }

    event_name == pattern
}

/// The event bus routes events to matching subscribers
pub struct EventBus {
    subscribers: Arc<RwLock<HashMap<String, (Subscription, EventSender)>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Subscribe to events matching the given patterns
    /// Returns a receiver for delivered events
    pub fn subscribe(&self, subscription: Subscription) -> EventReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = subscription.id.clone();

        let mut subs = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        subs.insert(id, (subscription, tx));

        rx
    }

    /// Unsubscribe from events
    pub fn unsubscribe(&self, id: &str) {
        let mut subs = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        subs.remove(id);
    }

    /// Publish an event to all matching subscribers
    pub fn publish(&self, event: Event) {
        let event_name = event.name();

        let subs = self.subscribers.read().unwrap_or_else(|e| e.into_inner());
        for (subscription, tx) in subs.values() {
            if subscription.matches(&event_name) {
                // A dropped receiver just means the subscriber went away
                let _ = tx.send(event.clone());
            }
        }
    }

    /// Get count of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
