//! Memory-conflict check.
//!
//! **Question**: does this output flatly contradict what the same component
//! said last time?
//!
//! The linter hands the check the most recent cached result for the
//! component; older history is kept for audit but only the latest entry is
//! compared, since a component is allowed to change its mind over time.

use super::patterns::texts_contradict;
use super::{Check, CheckRequest};
use crate::evidence::Evidence;
use crate::types::{Patch, PatchAction, Severity, Violation, ViolationKind};

pub struct MemoryConflictCheck;

impl Check for MemoryConflictCheck {
    fn kind(&self) -> ViolationKind {
        ViolationKind::MemoryConflict
    }

    fn run(&self, request: &CheckRequest<'_>) -> Vec<Violation> {
        let Some(previous) = request.previous_result else {
            return Vec::new();
        };

        let current = request.output.normalized_result();
        let Some(pair) = texts_contradict(&current, previous) else {
            return Vec::new();
        };

        vec![Violation::new(
            ViolationKind::MemoryConflict,
            Severity::Warning,
            format!(
                "contradicts the most recent \"{}\" output on \"{}\"/\"{}\"",
                request.output.component, pair.positive, pair.negative
            ),
        )
        .with_evidence(Evidence::from_context(
            format!("previous result: {}", previous),
            "recent_results",
        ))]
    }

    fn suggest_fix(&self, _request: &CheckRequest<'_>, violations: &[Violation]) -> Option<Patch> {
        if violations.is_empty() {
            return None;
        }

        Some(Patch {
            action: PatchAction::Merge,
            target: ViolationKind::MemoryConflict,
            confidence: 0.5,
            safe_to_auto_apply: false,
            description: "Reconcile with the component's previous result before storing"
                .to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::base_output;
    use super::*;
    use crate::config::LinterConfig;
    use crate::types::ResultPayload;
    use chrono::Utc;

    fn request_with_previous<'a>(
        output: &'a crate::types::OutputRecord,
        config: &'a LinterConfig,
        previous: Option<&'a str>,
    ) -> CheckRequest<'a> {
        CheckRequest {
            output,
            context: None,
            config,
            now: Utc::now(),
            previous_result: previous,
        }
    }

    #[test]
    fn test_no_history_passes() {
        let output = base_output(ResultPayload::Text("retries are enabled".into()));
        let config = LinterConfig::default();
        assert!(MemoryConflictCheck
            .run(&request_with_previous(&output, &config, None))
            .is_empty());
    }

    #[test]
    fn test_contradicting_latest_result_is_flagged() {
        let output = base_output(ResultPayload::Text("retries are disabled".into()));
        let config = LinterConfig::default();
        let violations = MemoryConflictCheck.run(&request_with_previous(
            &output,
            &config,
            Some("retries are enabled"),
        ));

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, Severity::Warning);
        assert_eq!(violations[0].kind, ViolationKind::MemoryConflict);
    }

    #[test]
    fn test_agreement_with_history_passes() {
        let output = base_output(ResultPayload::Text("retries are enabled".into()));
        let config = LinterConfig::default();
        assert!(MemoryConflictCheck
            .run(&request_with_previous(
                &output,
                &config,
                Some("retries are enabled"),
            ))
            .is_empty());
    }
}
