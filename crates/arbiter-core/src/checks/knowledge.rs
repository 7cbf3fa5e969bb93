//! Knowledge-conflict check.
//!
//! **Question**: does the output trust a source far more (or less) than we
//! already know to trust it?
//!
//! The caller supplies the known per-source trust in the lint context; the
//! check fires when a citation's confidence diverges from that by more than
//! the configured delta.

use super::{Check, CheckRequest};
use crate::evidence::Evidence;
use crate::types::{Patch, PatchAction, Severity, Violation, ViolationKind};

pub struct KnowledgeConflictCheck;

impl Check for KnowledgeConflictCheck {
    fn kind(&self) -> ViolationKind {
        ViolationKind::KnowledgeConflict
    }

    fn run(&self, request: &CheckRequest<'_>) -> Vec<Violation> {
        let Some(context) = request.context else {
            return Vec::new();
        };

        let delta = request.config.knowledge_delta;
        request
            .output
            .citations
            .iter()
            .enumerate()
            .filter_map(|(index, citation)| {
                let known = *context.known_source_trust.get(&citation.source)?;
                let divergence = (citation.confidence - known).abs();
                if divergence <= delta {
                    return None;
                }

                Some(
                    Violation::new(
                        ViolationKind::KnowledgeConflict,
                        Severity::Warning,
                        format!(
                            "citation of \"{}\" carries confidence {:.2} but the source is known at trust {:.2}",
                            citation.source, citation.confidence, known
                        ),
                    )
                    .with_evidence(Evidence::from_citation(
                        format!("divergence {:.2} exceeds delta {:.2}", divergence, delta),
                        index,
                        "confidence",
                    )),
                )
            })
            .collect()
    }

    fn suggest_fix(&self, _request: &CheckRequest<'_>, violations: &[Violation]) -> Option<Patch> {
        if violations.is_empty() {
            return None;
        }

        Some(Patch {
            action: PatchAction::Merge,
            target: ViolationKind::KnowledgeConflict,
            confidence: 0.5,
            safe_to_auto_apply: false,
            description: "Reconcile citation confidence with the known source trust".to_string(),
        })
    }
}
