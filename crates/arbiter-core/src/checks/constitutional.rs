//! Constitutional-misalignment check.
//!
//! **Question**: is an output that needs human approval simultaneously
//! marked constitutionally non-compliant?
//!
//! That combination means a component is asking for sign-off on something it
//! already knows breaks the constitution. It is the only CRITICAL finding
//! the linter produces.

use super::{Check, CheckRequest};
use crate::evidence::Evidence;
use crate::types::{Patch, PatchAction, Severity, Violation, ViolationKind};

pub struct ConstitutionalCheck;

impl Check for ConstitutionalCheck {
    fn kind(&self) -> ViolationKind {
        ViolationKind::ConstitutionalMisalignment
    }

    fn run(&self, request: &CheckRequest<'_>) -> Vec<Violation> {
        let output = request.output;
        if !(output.requires_approval && output.constitutional_compliance == Some(false)) {
            return Vec::new();
        }

        vec![Violation::new(
            ViolationKind::ConstitutionalMisalignment,
            Severity::Critical,
            "approval requested for a constitutionally non-compliant output",
        )
        .with_evidence(Evidence::from_record(
            "requires_approval is set while constitutional_compliance is false",
            "constitutional_compliance",
        ))]
    }

    fn suggest_fix(&self, _request: &CheckRequest<'_>, violations: &[Violation]) -> Option<Patch> {
        if violations.is_empty() {
            return None;
        }

        Some(Patch {
            action: PatchAction::Escalate,
            target: ViolationKind::ConstitutionalMisalignment,
            confidence: 0.9,
            safe_to_auto_apply: false,
            description: "Escalate to a human with the compliance findings attached".to_string(),
        })
    }
}
