//! Contradiction linter: fans every output through the independent checks
//! and folds the findings into one report.
//!
//! The linter is the first stage of the single-output pipeline; governance
//! reads its report before any verdict is produced. The only state it keeps
//! is the bounded per-component recent-result cache inside the shared
//! engine context.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::checks::{
    CausalDependencyCheck, Check, CheckRequest, ConstitutionalCheck, DirectConflictCheck,
    KnowledgeConflictCheck, MemoryConflictCheck, PolicyDriftCheck, TemporalCheck,
    UnrecognizedKindCheck,
};
use crate::context::EngineContext;
use crate::types::{LintContext, LintReport, OutputRecord, Patch, ViolationKind};

pub struct ContradictionLinter {
    ctx: Arc<EngineContext>,
}

impl ContradictionLinter {
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        Self { ctx }
    }

    /// Lint one output against the current clock.
    pub fn lint(&self, output: &OutputRecord, context: Option<&LintContext>) -> LintReport {
        self.lint_at(output, context, Utc::now())
    }

    /// Lint one output at an explicit instant. All time comparisons inside
    /// the checks use this instant, never the wall clock.
    pub fn lint_at(
        &self,
        output: &OutputRecord,
        context: Option<&LintContext>,
        now: DateTime<Utc>,
    ) -> LintReport {
        let previous = self.ctx.last_result(&output.component);
        let request = CheckRequest {
            output,
            context,
            config: &self.ctx.config().linter,
            now,
            previous_result: previous.as_deref(),
        };

        let checks: [&dyn Check; 8] = [
            &DirectConflictCheck,
            &PolicyDriftCheck,
            &TemporalCheck,
            &MemoryConflictCheck,
            &ConstitutionalCheck,
            &KnowledgeConflictCheck,
            &CausalDependencyCheck,
            &UnrecognizedKindCheck,
        ];

        let mut violations = Vec::new();
        let mut suggested_fixes = Vec::new();
        for check in checks {
            let found = check.run(&request);
            if found.is_empty() {
                continue;
            }
            debug!(
                output_id = %output.id,
                kind = ?check.kind(),
                count = found.len(),
                "lint check reported violations"
            );
            if let Some(patch) = check.suggest_fix(&request, &found) {
                suggested_fixes.push(patch);
            }
            violations.extend(found);
        }

        // The current result becomes the "most recent" entry for the next
        // lint of this component.
        self.ctx
            .record_result(&output.component, output.normalized_result());

        LintReport::from_violations(violations, suggested_fixes)
    }

    /// Apply the report's auto-applicable patches against the current clock.
    pub fn auto_remediate(
        &self,
        output: &OutputRecord,
        report: &LintReport,
    ) -> (OutputRecord, Vec<Patch>) {
        self.auto_remediate_at(output, report, Utc::now())
    }

    /// Apply only the patches marked `safe_to_auto_apply` to a clone of the
    /// output, appending one audit-trail entry per applied patch.
    ///
    /// Idempotent: a patch that finds nothing left to change is not counted
    /// as applied, so re-running on an already-remediated output (or a clean
    /// report) is a no-op.
    pub fn auto_remediate_at(
        &self,
        output: &OutputRecord,
        report: &LintReport,
        now: DateTime<Utc>,
    ) -> (OutputRecord, Vec<Patch>) {
        let mut patched = output.clone();
        let mut applied = Vec::new();

        for patch in report
            .suggested_fixes
            .iter()
            .filter(|patch| patch.safe_to_auto_apply)
        {
            // Only the temporal clamp is mechanical today; every other kind
            // suggests unsafe patches and never reaches this loop.
            if patch.target != ViolationKind::TemporalInconsistency {
                continue;
            }

            let mut clamped = 0usize;
            for citation in &mut patched.citations {
                if citation.timestamp > now {
                    citation.timestamp = now;
                    clamped += 1;
                }
            }
            if clamped > 0 {
                patched.audit_trail.push(format!(
                    "auto-remediate: clamped {} future citation timestamp(s) to {}",
                    clamped,
                    now.to_rfc3339()
                ));
                applied.push(patch.clone());
            }
        }

        (patched, applied)
    }
}
