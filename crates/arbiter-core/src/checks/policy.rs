//! Policy-drift check.
//!
//! **Question**: did the producer itself report a policy violation?
//!
//! Policy tags are first-party admissions; a `violation` status is taken at
//! face value and reported at ERROR severity, one violation per tag.

use super::{Check, CheckRequest};
use crate::evidence::Evidence;
use crate::types::{Patch, PatchAction, PolicyStatus, Severity, Violation, ViolationKind};

pub struct PolicyDriftCheck;

impl Check for PolicyDriftCheck {
    fn kind(&self) -> ViolationKind {
        ViolationKind::PolicyDrift
    }

    fn run(&self, request: &CheckRequest<'_>) -> Vec<Violation> {
        request
            .output
            .policy_tags
            .iter()
            .enumerate()
            .filter(|(_, tag)| tag.status == PolicyStatus::Violation)
            .map(|(index, tag)| {
                let detail = tag.detail.as_deref().unwrap_or("no detail given");
                Violation::new(
                    ViolationKind::PolicyDrift,
                    Severity::Error,
                    format!("policy \"{}\" reported violated: {}", tag.policy, detail),
                )
                .with_evidence(Evidence::from_policy_tag(
                    format!("tag for \"{}\" carries violation status", tag.policy),
                    index,
                ))
            })
            .collect()
    }

    fn suggest_fix(&self, _request: &CheckRequest<'_>, violations: &[Violation]) -> Option<Patch> {
        if violations.is_empty() {
            return None;
        }

        Some(Patch {
            action: PatchAction::Escalate,
            target: ViolationKind::PolicyDrift,
            confidence: 0.7,
            safe_to_auto_apply: false,
            description: "Route the output to the policy owner for review".to_string(),
        })
    }
}
