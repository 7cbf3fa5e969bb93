//! Causal-dependency check.
//!
//! **Question**: did this component run before the components it depends on?
//!
//! Required predecessor sets are configured per component (e.g. `meta`
//! requires `{reflection, hunter}`); the caller declares the actual causal
//! chain in the lint context. A missing predecessor is a WARNING with no
//! suggested patch: only re-running the pipeline in order can fix it.

use super::{Check, CheckRequest};
use crate::evidence::Evidence;
use crate::types::{Severity, Violation, ViolationKind};

pub struct CausalDependencyCheck;

impl Check for CausalDependencyCheck {
    fn kind(&self) -> ViolationKind {
        ViolationKind::CausalMismatch
    }

    fn run(&self, request: &CheckRequest<'_>) -> Vec<Violation> {
        let Some(required) = request
            .config
            .required_predecessors
            .get(&request.output.component)
        else {
            return Vec::new();
        };

        let declared: &[String] = request
            .context
            .map(|context| context.causal_chain.as_slice())
            .unwrap_or(&[]);

        required
            .iter()
            .filter(|predecessor| !declared.contains(predecessor))
            .map(|predecessor| {
                Violation::new(
                    ViolationKind::CausalMismatch,
                    Severity::Warning,
                    format!(
                        "\"{}\" requires predecessor \"{}\" but the causal chain omits it",
                        request.output.component, predecessor
                    ),
                )
                .with_evidence(Evidence::from_context(
                    format!("declared chain: [{}]", declared.join(", ")),
                    "causal_chain",
                ))
            })
            .collect()
    }
}
