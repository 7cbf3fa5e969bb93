//! Governance verdict engine: turns one output (plus lint findings) into an
//! ALLOW / DENY / ESCALATE / DEGRADE verdict.
//!
//! Evaluation is an ordered, short-circuiting state machine:
//! 1. Explicit constitutional non-compliance → DENY. Terminal.
//! 2. Score compliance from confidence, citation evidence, error/warning
//!    penalties, policy bonuses and sensitive-content penalties.
//! 3. Low confidence → ESCALATE for human review.
//! 4. Any errors → DEGRADE.
//! 5. Unrecognized output kind → at least DEGRADE, never a silent ALLOW.
//! 6. Otherwise → ALLOW.
//!
//! These rules are governance machinery, not a tuning toy; only the numeric
//! weights behind step 2 are configurable.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::checks::patterns::contains_sensitive_content;
use crate::context::EngineContext;
use crate::types::{clamp01, LintReport, OutputKind, OutputRecord, Verdict, VerdictDecision};

pub struct GovernanceVerdictEngine {
    ctx: Arc<EngineContext>,
}

impl GovernanceVerdictEngine {
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        Self { ctx }
    }

    /// Validate one output on its own fields alone.
    pub fn validate_against_constitution(&self, output: &OutputRecord) -> Verdict {
        self.evaluate(output, 0, 0)
    }

    /// Validate with a lint report folded in: lint findings at ERROR or
    /// above count as errors, the rest as warnings.
    pub fn validate_with_lint(&self, output: &OutputRecord, report: &LintReport) -> Verdict {
        self.evaluate(output, report.error_count(), report.warning_count())
    }

    fn evaluate(&self, output: &OutputRecord, lint_errors: usize, lint_warnings: usize) -> Verdict {
        let config = &self.ctx.config().governance;
        let mut tags = BTreeSet::new();

        // Rule 1: explicit non-compliance is terminal, nothing can soften it.
        if output.constitutional_compliance == Some(false) {
            tags.insert("blocked".to_string());
            tags.insert("constitutional_violation".to_string());
            warn!(output_id = %output.id, "output denied: explicit constitutional non-compliance");
            return Verdict {
                decision: VerdictDecision::Deny,
                compliance_score: 0.0,
                tags,
                safe_to_store: false,
                reason: "producer marked the output constitutionally non-compliant".to_string(),
                evaluated_at: Utc::now(),
            };
        }

        // Rule 2: compliance score.
        let mut score = clamp01(output.confidence);

        if !output.citations.is_empty() {
            let mean_confidence: f64 = output
                .citations
                .iter()
                .map(|citation| citation.confidence)
                .sum::<f64>()
                / output.citations.len() as f64;
            let bonus = (config.citation_bonus * output.citations.len() as f64)
                .min(config.citation_bonus_cap);
            score += bonus * mean_confidence;
        }

        let error_count = output.errors.len() + lint_errors;
        let warning_count = output.warnings.len() + lint_warnings;
        score -= config.error_penalty * error_count as f64;
        score -= config.warning_penalty * warning_count as f64;

        let compliant_tags = output
            .policy_tags
            .iter()
            .filter(|tag| tag.status == crate::types::PolicyStatus::Compliant)
            .count();
        score += (config.policy_bonus * compliant_tags as f64).min(config.policy_bonus_cap);

        let sensitive = output
            .result
            .fragments()
            .into_iter()
            .any(contains_sensitive_content);
        if sensitive {
            score -= config.sensitive_penalty;
            tags.insert("restricted_context".to_string());
        }

        let compliance_score = clamp01(score);

        // Rules 3-6: pick the decision.
        let (decision, reason) = if output.confidence < config.low_confidence_threshold {
            tags.insert("requires_human_review".to_string());
            (
                VerdictDecision::Escalate,
                format!(
                    "confidence {:.2} below threshold {:.2}",
                    output.confidence, config.low_confidence_threshold
                ),
            )
        } else if error_count > 0 {
            tags.insert("degraded_trust".to_string());
            (
                VerdictDecision::Degrade,
                format!("output carries {} error(s)", error_count),
            )
        } else if output.kind == OutputKind::Unrecognized {
            tags.insert("degraded_trust".to_string());
            tags.insert("unrecognized_output_kind".to_string());
            (
                VerdictDecision::Degrade,
                "output kind was not recognized".to_string(),
            )
        } else {
            (
                VerdictDecision::Allow,
                "all constitutional checks passed".to_string(),
            )
        };

        let safe_to_store = matches!(
            decision,
            VerdictDecision::Allow | VerdictDecision::Degrade
        ) && !tags.contains("restricted_context");

        debug!(
            output_id = %output.id,
            decision = decision.as_str(),
            compliance_score,
            safe_to_store,
            "governance verdict"
        );

        Verdict {
            decision,
            compliance_score,
            tags,
            safe_to_store,
            reason,
            evaluated_at: Utc::now(),
        }
    }

    /// Deterministic human-readable summary: always contains the decision
    /// name and the numeric compliance score.
    pub fn explain(&self, verdict: &Verdict) -> String {
        let mut summary = format!(
            "{} (compliance score {:.2}): {}.",
            verdict.decision.as_str(),
            verdict.compliance_score,
            verdict.reason
        );
        if !verdict.tags.is_empty() {
            let tags: Vec<&str> = verdict.tags.iter().map(String::as_str).collect();
            summary.push_str(&format!(" Tags: [{}].", tags.join(", ")));
        }
        summary.push_str(if verdict.safe_to_store {
            " Safe to store."
        } else {
            " Not safe to store."
        });
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;
    use crate::types::{Citation, OutputRecord, PolicyTag, ResultPayload};

    fn engine() -> GovernanceVerdictEngine {
        GovernanceVerdictEngine::new(Arc::new(EngineContext::new(CoreConfig::default())))
    }

    fn output_with_text(text: &str) -> OutputRecord {
        OutputRecord::new(
            "out-1",
            "task-1",
            "hunter",
            OutputKind::Insight,
            ResultPayload::Text(text.into()),
        )
        .with_confidence(0.8)
    }

    #[test]
    fn test_explicit_non_compliance_is_always_denied() {
        // Even a perfect output is denied when the producer flagged it.
        let output = output_with_text("perfect result")
            .with_confidence(0.99)
            .with_compliance(false);

        let verdict = engine().validate_against_constitution(&output);
        assert_eq!(verdict.decision, VerdictDecision::Deny);
        assert!(!verdict.safe_to_store);
        assert!(verdict.tags.contains("blocked"));
        assert!(verdict.tags.contains("constitutional_violation"));
    }

    #[test]
    fn test_well_supported_output_is_allowed() {
        // Confidence 0.95 with three strong citations must clear 0.7.
        let now = Utc::now();
        let output = output_with_text("well supported result")
            .with_confidence(0.95)
            .with_compliance(true)
            .with_citations(vec![
                Citation::new("src-a", 0.95, now),
                Citation::new("src-b", 0.90, now),
                Citation::new("src-c", 0.85, now),
            ]);

        let verdict = engine().validate_against_constitution(&output);
        assert!(matches!(
            verdict.decision,
            VerdictDecision::Allow | VerdictDecision::Degrade
        ));
        assert!(verdict.compliance_score >= 0.7);
        assert!(verdict.safe_to_store);
    }

    #[test]
    fn test_low_confidence_escalates() {
        let output = output_with_text("a hunch").with_confidence(0.3);

        let verdict = engine().validate_against_constitution(&output);
        assert_eq!(verdict.decision, VerdictDecision::Escalate);
        assert!(verdict.tags.contains("requires_human_review"));
        assert!(!verdict.safe_to_store);
    }

    #[test]
    fn test_errors_degrade_trust() {
        let output = output_with_text("mostly fine")
            .with_errors(vec!["tool call failed once".to_string()]);

        let verdict = engine().validate_against_constitution(&output);
        assert_eq!(verdict.decision, VerdictDecision::Degrade);
        assert!(verdict.tags.contains("degraded_trust"));
        assert!(verdict.safe_to_store);
    }

    #[test]
    fn test_unrecognized_kind_never_silently_allowed() {
        let mut output = output_with_text("fine content");
        output.kind = OutputKind::Unrecognized;

        let verdict = engine().validate_against_constitution(&output);
        assert_eq!(verdict.decision, VerdictDecision::Degrade);
        assert!(verdict.tags.contains("unrecognized_output_kind"));
    }

    #[test]
    fn test_sensitive_content_restricts_storage() {
        let output = output_with_text("then run rm -rf /srv/data to clean up");

        let verdict = engine().validate_against_constitution(&output);
        assert!(verdict.tags.contains("restricted_context"));
        assert!(!verdict.safe_to_store);
    }

    #[test]
    fn test_compliant_policy_tags_raise_the_score() {
        let plain = output_with_text("result");
        let tagged = output_with_text("result").with_policy_tags(vec![
            PolicyTag::compliant("no-pii"),
            PolicyTag::compliant("budget-cap"),
        ]);

        let engine = engine();
        let plain_score = engine.validate_against_constitution(&plain).compliance_score;
        let tagged_score = engine
            .validate_against_constitution(&tagged)
            .compliance_score;
        assert!(tagged_score > plain_score);
    }

    #[test]
    fn test_lint_errors_fold_into_the_verdict() {
        use crate::types::{Severity, Violation, ViolationKind};

        let output = output_with_text("fine on its own");
        let report = crate::types::LintReport::from_violations(
            vec![Violation::new(
                ViolationKind::PolicyDrift,
                Severity::Error,
                "drifted",
            )],
            vec![],
        );

        let engine = engine();
        let clean = engine.validate_against_constitution(&output);
        assert_eq!(clean.decision, VerdictDecision::Allow);

        let with_lint = engine.validate_with_lint(&output, &report);
        assert_eq!(with_lint.decision, VerdictDecision::Degrade);
        assert!(with_lint.compliance_score < clean.compliance_score);
    }

    #[test]
    fn test_explain_contains_decision_and_score() {
        let output = output_with_text("result").with_confidence(0.9);
        let engine = engine();
        let verdict = engine.validate_against_constitution(&output);

        let summary = engine.explain(&verdict);
        assert!(summary.contains("ALLOW"));
        assert!(summary.contains(&format!("{:.2}", verdict.compliance_score)));
    }
}
