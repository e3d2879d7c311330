// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admission gate evaluated before any lock-state mutation
//!
//! A fixed, startup-time enumerated list of rules is checked in order over a
//! typed request; the first non-allow verdict wins. The gate is pure and
//! never reads lock state — the caller supplies the context it needs
//! (current hold count, resource risk).

use crate::lease::{HolderId, ResourceKey};
use serde::{Deserialize, Serialize};

/// Kind of action an agent wants to perform against a resource
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionType(pub String);

impl ActionType {
    pub fn new(action: impl Into<String>) -> Self {
        Self(action.into())
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Risk classification of a resource
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

/// Metadata the gate evaluates against, supplied by the caller
#[derive(Clone, Debug, Default)]
pub struct AdmissionContext {
    /// Leases the requestor currently holds across all resources
    pub current_holds: usize,
    /// Risk classification of the target resource
    pub resource_risk: RiskLevel,
}

/// One pending action, as seen by the gate
#[derive(Clone, Debug)]
pub struct AdmissionRequest {
    pub requestor: HolderId,
    pub action: ActionType,
    pub resource: ResourceKey,
    pub priority: i32,
    pub context: AdmissionContext,
}

/// Outcome of evaluating one rule (or the whole gate)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny { reason: String },
    /// Elevated-risk action; the MVP treats this as allow with a logged flag
    RequireApproval { reason: String },
}

impl Verdict {
    pub fn is_allow(&self) -> bool {
        matches!(self, Verdict::Allow)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Verdict::Allow => None,
            Verdict::Deny { reason } | Verdict::RequireApproval { reason } => Some(reason),
        }
    }
}

/// The gate's answer for one pending action
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyDecision {
    pub action: ActionType,
    pub verdict: Verdict,
}

/// A single admission rule
///
/// The rule set is fixed and enumerable; there is deliberately no general
/// policy language here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum AdmissionRule {
    /// Cap on simultaneous leases per requestor
    MaxConcurrentHolds { limit: usize },
    /// Action types that are never admitted
    DeniedActions { actions: Vec<ActionType> },
    /// Resources at or above `level` require `min_priority`; critical-risk
    /// requests that clear the bar still escalate to approval
    RiskThreshold { level: RiskLevel, min_priority: i32 },
}

impl AdmissionRule {
    fn evaluate(&self, request: &AdmissionRequest) -> Verdict {
        match self {
            AdmissionRule::MaxConcurrentHolds { limit } => {
                if request.context.current_holds >= *limit {
                    Verdict::Deny {
                        reason: format!(
                            "{} already holds {} leases (limit {})",
                            request.requestor, request.context.current_holds, limit
                        ),
                    }
                } else {
                    Verdict::Allow
                }
            }
            AdmissionRule::DeniedActions { actions } => {
                if actions.contains(&request.action) {
                    Verdict::Deny {
                        reason: format!("action '{}' is denylisted", request.action),
                    }
                } else {
                    Verdict::Allow
                }
            }
            AdmissionRule::RiskThreshold {
                level,
                min_priority,
            } => {
                if request.context.resource_risk < *level {
                    return Verdict::Allow;
                }
                if request.priority < *min_priority {
                    return Verdict::Deny {
                        reason: format!(
                            "resource '{}' is {:?} risk: priority {} is below the required {}",
                            request.resource, request.context.resource_risk, request.priority,
                            min_priority
                        ),
                    };
                }
                if request.context.resource_risk == RiskLevel::Critical {
                    return Verdict::RequireApproval {
                        reason: format!(
                            "critical-risk resource '{}' requires approval",
                            request.resource
                        ),
                    };
                }
                Verdict::Allow
            }
        }
    }
}

/// Startup-time policy configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default)]
    pub rules: Vec<AdmissionRule>,
}

/// Ordered, short-circuit rule evaluator
#[derive(Clone, Debug, Default)]
pub struct PolicyGate {
    rules: Vec<AdmissionRule>,
}

impl PolicyGate {
    pub fn new(rules: Vec<AdmissionRule>) -> Self {
        Self { rules }
    }

    pub fn from_config(config: PolicyConfig) -> Self {
        Self::new(config.rules)
    }

    /// Evaluate every rule in order; the first non-allow verdict wins
    pub fn evaluate(&self, request: &AdmissionRequest) -> PolicyDecision {
        for rule in &self.rules {
            let verdict = rule.evaluate(request);
            if !verdict.is_allow() {
                return PolicyDecision {
                    action: request.action.clone(),
                    verdict,
                };
            }
        }
        PolicyDecision {
            action: request.action.clone(),
            verdict: Verdict::Allow,
        }
    }
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
