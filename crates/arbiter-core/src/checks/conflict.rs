//! Direct-conflict check.
//!
//! **Question**: does this output affirm and negate the same thing at once?
//!
//! Free text is scanned as a whole; structured results are scanned per
//! field, so "status: enabled" plus "fallback: disabled" in two different
//! fields is not a conflict, but both markers inside one field is.

use super::patterns::conflicting_pair;
use super::{Check, CheckRequest};
use crate::evidence::Evidence;
use crate::types::{Patch, PatchAction, ResultPayload, Severity, Violation, ViolationKind};

pub struct DirectConflictCheck;

impl Check for DirectConflictCheck {
    fn kind(&self) -> ViolationKind {
        ViolationKind::DirectConflict
    }

    fn run(&self, request: &CheckRequest<'_>) -> Vec<Violation> {
        let mut violations = Vec::new();

        match &request.output.result {
            ResultPayload::Text(text) => {
                if let Some(pair) = conflicting_pair(text) {
                    violations.push(
                        Violation::new(
                            ViolationKind::DirectConflict,
                            Severity::Error,
                            format!(
                                "result affirms \"{}\" while also stating \"{}\"",
                                pair.positive, pair.negative
                            ),
                        )
                        .with_evidence(Evidence::from_result_text(format!(
                            "markers \"{}\" and \"{}\" co-occur",
                            pair.positive, pair.negative
                        ))),
                    );
                }
            }
            ResultPayload::Fields(fields) => {
                for (index, field) in fields.iter().enumerate() {
                    if let Some(pair) = conflicting_pair(&field.value) {
                        violations.push(
                            Violation::new(
                                ViolationKind::DirectConflict,
                                Severity::Error,
                                format!(
                                    "field \"{}\" affirms \"{}\" while also stating \"{}\"",
                                    field.name, pair.positive, pair.negative
                                ),
                            )
                            .with_evidence(Evidence::from_result_field(
                                format!(
                                    "markers \"{}\" and \"{}\" co-occur",
                                    pair.positive, pair.negative
                                ),
                                index,
                                &field.name,
                            )),
                        );
                    }
                }
            }
        }

        violations
    }

    fn suggest_fix(&self, _request: &CheckRequest<'_>, violations: &[Violation]) -> Option<Patch> {
        if violations.is_empty() {
            return None;
        }

        // Rewriting prose is a judgment call, never automatic.
        Some(Patch {
            action: PatchAction::Remove,
            target: ViolationKind::DirectConflict,
            confidence: 0.4,
            safe_to_auto_apply: false,
            description: "Remove the contradicting clause from the result".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::{base_output, run_check};
    use super::*;
    use crate::types::ResultField;

    #[test]
    fn test_clean_text_passes() {
        let output = base_output(ResultPayload::Text("deploy window opens at dawn".into()));
        assert!(run_check(&DirectConflictCheck, &output).is_empty());
    }

    #[test]
    fn test_conflicting_text_is_an_error() {
        let output = base_output(ResultPayload::Text(
            "the check returned true, the check returned false".into(),
        ));

        let violations = run_check(&DirectConflictCheck, &output);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, Severity::Error);
        assert_eq!(violations[0].kind, ViolationKind::DirectConflict);
    }

    #[test]
    fn test_fields_are_scanned_independently() {
        let output = base_output(ResultPayload::Fields(vec![
            ResultField::new("retries", "enabled"),
            ResultField::new("cache", "disabled"),
        ]));
        assert!(run_check(&DirectConflictCheck, &output).is_empty());

        let conflicted = base_output(ResultPayload::Fields(vec![ResultField::new(
            "rollout",
            "enabled for eu, disabled for eu",
        )]));
        let violations = run_check(&DirectConflictCheck, &conflicted);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].evidence[0].pointer.starts_with("result.fields[0]"));
    }

    #[test]
    fn test_suggested_fix_is_not_auto_applicable() {
        let output = base_output(ResultPayload::Text("yes and then no".into()));
        let check = DirectConflictCheck;
        let violations = run_check(&check, &output);

        let config = crate::config::LinterConfig::default();
        let request = CheckRequest {
            output: &output,
            context: None,
            config: &config,
            now: chrono::Utc::now(),
            previous_result: None,
        };
        let patch = check.suggest_fix(&request, &violations).unwrap();
        assert!(!patch.safe_to_auto_apply);
        assert_eq!(patch.action, PatchAction::Remove);
    }
}
