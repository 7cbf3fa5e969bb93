//! Feedback integrator: the single-output pipeline end to end.
//!
//! Runs lint, then governance with the lint findings folded in, and only
//! then hands an approved output toward persistence. A verdict that is not
//! safe to store short-circuits the pipeline: no trust score is computed
//! and the sink is never invoked. The core performs no I/O itself; the
//! injected sink is the seam where a persistence collaborator attaches, and
//! its failures surface to the caller unretried.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::context::EngineContext;
use crate::governance::GovernanceVerdictEngine;
use crate::linter::ContradictionLinter;
use crate::trust::{evidence_quality, TrustScorer};
use crate::types::{FeedbackMetrics, LintContext, MemoryReference, OutputRecord};

/// Errors surfaced from feedback integration.
#[derive(Error, Debug)]
pub enum FeedbackError {
    #[error("persistence collaborator rejected the ack: {0}")]
    Sink(String),
}

/// Collaborator notified when an output has been approved for storage.
///
/// Implementations record storage-time metrics (and typically enqueue the
/// durable write). Retries and backoff belong to the collaborator side of
/// this trait, never to the core.
pub trait FeedbackSink: Send + Sync {
    fn on_feedback_ack(
        &self,
        reference: &MemoryReference,
        metrics: &FeedbackMetrics,
    ) -> Result<(), FeedbackError>;
}

pub struct FeedbackIntegrator {
    linter: ContradictionLinter,
    governance: GovernanceVerdictEngine,
    scorer: TrustScorer,
    sink: Arc<dyn FeedbackSink>,
}

impl FeedbackIntegrator {
    pub fn new(ctx: Arc<EngineContext>, sink: Arc<dyn FeedbackSink>) -> Self {
        let scorer = TrustScorer::new(ctx.config().trust.clone());
        Self {
            linter: ContradictionLinter::new(Arc::clone(&ctx)),
            governance: GovernanceVerdictEngine::new(ctx),
            scorer,
            sink,
        }
    }

    /// Run one output through lint and governance; hand it to the sink when
    /// approved.
    ///
    /// Returns `Ok(None)` when the verdict is not safe to store (nothing is
    /// handed to persistence), `Ok(Some(reference))` after the sink has
    /// acknowledged, and an error when the sink fails.
    pub fn integrate(
        &self,
        output: &OutputRecord,
        context: Option<&LintContext>,
    ) -> Result<Option<MemoryReference>, FeedbackError> {
        let report = self.linter.lint(output, context);
        let verdict = self.governance.validate_with_lint(output, &report);

        if !verdict.safe_to_store {
            debug!(
                output_id = %output.id,
                decision = verdict.decision.as_str(),
                "output not approved for storage"
            );
            return Ok(None);
        }

        let trust_score = self.scorer.memory_trust(&verdict, output);
        let reference = MemoryReference::for_output(output);
        let metrics = FeedbackMetrics {
            decision: verdict.decision,
            compliance_score: verdict.compliance_score,
            trust_score,
            evidence_quality: evidence_quality(output),
            violation_count: report.violations.len(),
        };

        self.sink.on_feedback_ack(&reference, &metrics)?;
        info!(
            output_id = %output.id,
            reference = reference.as_str(),
            trust_score,
            "output integrated"
        );
        Ok(Some(reference))
    }
}
