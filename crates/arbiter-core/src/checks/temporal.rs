//! Temporal-inconsistency check.
//!
//! **Question**: does the output rest on evidence from the future, or has
//! the output itself already expired?
//!
//! A future citation timestamp is a producer clock bug and is the one
//! violation in the linter with a safe mechanical remedy (clamp to the lint
//! instant). An already-passed expiry is a WARNING, upgraded to ERROR when
//! the record is a DECISION, because acting on a stale decision is worse
//! than recalling a stale observation.

use super::{Check, CheckRequest};
use crate::evidence::Evidence;
use crate::types::{OutputKind, Patch, PatchAction, Severity, Violation, ViolationKind};

pub struct TemporalCheck;

impl Check for TemporalCheck {
    fn kind(&self) -> ViolationKind {
        ViolationKind::TemporalInconsistency
    }

    fn run(&self, request: &CheckRequest<'_>) -> Vec<Violation> {
        let output = request.output;
        let mut violations = Vec::new();

        for (index, citation) in output.citations.iter().enumerate() {
            if citation.timestamp > request.now {
                violations.push(
                    Violation::new(
                        ViolationKind::TemporalInconsistency,
                        Severity::Warning,
                        format!(
                            "citation of \"{}\" is timestamped in the future",
                            citation.source
                        ),
                    )
                    .with_evidence(Evidence::from_citation(
                        format!(
                            "timestamp {} is after the lint instant",
                            citation.timestamp.to_rfc3339()
                        ),
                        index,
                        "timestamp",
                    )),
                );
            }
        }

        if let Some(expires_at) = output.expires_at {
            if expires_at < request.now {
                let severity = if output.kind == OutputKind::Decision {
                    Severity::Error
                } else {
                    Severity::Warning
                };
                violations.push(
                    Violation::new(
                        ViolationKind::TemporalInconsistency,
                        severity,
                        format!("output expired at {}", expires_at.to_rfc3339()),
                    )
                    .with_evidence(Evidence::from_record(
                        "expiry predates the lint instant",
                        "expires_at",
                    )),
                );
            }
        }

        violations
    }

    fn suggest_fix(&self, request: &CheckRequest<'_>, violations: &[Violation]) -> Option<Patch> {
        if violations.is_empty() {
            return None;
        }

        // Only the future-citation half has a mechanical remedy; reviving an
        // expired output is not ours to do.
        let has_future_citation = request
            .output
            .citations
            .iter()
            .any(|citation| citation.timestamp > request.now);
        if !has_future_citation {
            return None;
        }

        Some(Patch {
            action: PatchAction::Replace,
            target: ViolationKind::TemporalInconsistency,
            confidence: 0.9,
            safe_to_auto_apply: true,
            description: "Clamp future citation timestamps to the lint instant".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::base_output;
    use super::*;
    use crate::config::LinterConfig;
    use crate::types::{Citation, ResultPayload};
    use chrono::{Duration, Utc};

    fn request_at<'a>(
        output: &'a crate::types::OutputRecord,
        config: &'a LinterConfig,
        now: chrono::DateTime<Utc>,
    ) -> CheckRequest<'a> {
        CheckRequest {
            output,
            context: None,
            config,
            now,
            previous_result: None,
        }
    }

    #[test]
    fn test_past_citations_pass() {
        let now = Utc::now();
        let output = base_output(ResultPayload::Text("finding".into()))
            .with_citations(vec![Citation::new("mem-9", 0.9, now - Duration::hours(2))]);

        let config = LinterConfig::default();
        assert!(TemporalCheck.run(&request_at(&output, &config, now)).is_empty());
    }

    #[test]
    fn test_future_citation_is_a_warning_with_safe_fix() {
        let now = Utc::now();
        let output = base_output(ResultPayload::Text("finding".into()))
            .with_citations(vec![Citation::new("mem-9", 0.9, now + Duration::hours(3))]);

        let config = LinterConfig::default();
        let request = request_at(&output, &config, now);
        let violations = TemporalCheck.run(&request);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, Severity::Warning);

        let patch = TemporalCheck.suggest_fix(&request, &violations).unwrap();
        assert!(patch.safe_to_auto_apply);
        assert_eq!(patch.action, PatchAction::Replace);
    }

    #[test]
    fn test_expired_decision_is_an_error() {
        let now = Utc::now();
        let mut output = base_output(ResultPayload::Text("ship it".into()))
            .with_expiry(now - Duration::minutes(5));
        output.kind = OutputKind::Decision;

        let config = LinterConfig::default();
        let request = request_at(&output, &config, now);
        let violations = TemporalCheck.run(&request);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, Severity::Error);

        // No safe fix for expiry alone.
        assert!(TemporalCheck.suggest_fix(&request, &violations).is_none());
    }

    #[test]
    fn test_expired_observation_is_only_a_warning() {
        let now = Utc::now();
        let output = base_output(ResultPayload::Text("saw a spike".into()))
            .with_expiry(now - Duration::minutes(5));

        let config = LinterConfig::default();
        let violations = TemporalCheck.run(&request_at(&output, &config, now));
        assert_eq!(violations[0].severity, Severity::Warning);
    }
}
