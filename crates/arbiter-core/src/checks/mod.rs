//! Independent lint checks.
//!
//! Each check answers one question about a single output and knows nothing
//! about the others. The linter fans a `CheckRequest` out to every check and
//! folds the findings into one report, so adding a check is a new module
//! here plus one entry in the linter's check table.

pub mod causal;
pub mod conflict;
pub mod constitutional;
pub mod knowledge;
pub mod memory;
pub mod patterns;
pub mod policy;
pub mod temporal;

pub use causal::CausalDependencyCheck;
pub use conflict::DirectConflictCheck;
pub use constitutional::ConstitutionalCheck;
pub use knowledge::KnowledgeConflictCheck;
pub use memory::MemoryConflictCheck;
pub use policy::PolicyDriftCheck;
pub use temporal::TemporalCheck;

use chrono::{DateTime, Utc};

use crate::config::LinterConfig;
use crate::evidence::Evidence;
use crate::types::{
    LintContext, OutputKind, OutputRecord, Patch, Severity, Violation, ViolationKind,
};

/// Everything a check may look at for one lint pass.
pub struct CheckRequest<'a> {
    pub output: &'a OutputRecord,

    /// Caller-side knowledge (causal chain, known source trust).
    pub context: Option<&'a LintContext>,

    pub config: &'a LinterConfig,

    /// The lint instant; time comparisons never call the clock themselves.
    pub now: DateTime<Utc>,

    /// Most recent cached result from the same component, if any.
    pub previous_result: Option<&'a str>,
}

/// One independent lint check.
pub trait Check {
    fn kind(&self) -> ViolationKind;

    fn run(&self, request: &CheckRequest<'_>) -> Vec<Violation>;

    /// At most one suggested patch per violation kind; `None` when the
    /// violation has no mechanical remedy.
    fn suggest_fix(&self, _request: &CheckRequest<'_>, _violations: &[Violation]) -> Option<Patch> {
        None
    }
}

/// Flags outputs whose kind tag was not recognized at the boundary. Such
/// outputs are never fatal, but governance will refuse to silently allow
/// them.
pub struct UnrecognizedKindCheck;

impl Check for UnrecognizedKindCheck {
    fn kind(&self) -> ViolationKind {
        ViolationKind::UnrecognizedKind
    }

    fn run(&self, request: &CheckRequest<'_>) -> Vec<Violation> {
        if request.output.kind != OutputKind::Unrecognized {
            return Vec::new();
        }

        vec![Violation::new(
            ViolationKind::UnrecognizedKind,
            Severity::Warning,
            "output kind tag was not recognized",
        )
        .with_evidence(Evidence::from_record(
            "kind tag fell back to UNRECOGNIZED during decoding",
            "kind",
        ))]
    }
}


#[cfg(test)]
mod tests {
    use super::testutil::{base_output, run_check};
    use super::*;
    use crate::types::ResultPayload;

    #[test]
    fn test_recognized_kind_passes() {
        let output = base_output(ResultPayload::Text("all good".into()));
        assert!(run_check(&UnrecognizedKindCheck, &output).is_empty());
    }

    #[test]
    fn test_unrecognized_kind_is_a_warning_not_an_error() {
        let mut output = base_output(ResultPayload::Text("all good".into()));
        output.kind = OutputKind::Unrecognized;

        let violations = run_check(&UnrecognizedKindCheck, &output);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, Severity::Warning);
        assert_eq!(violations[0].kind, ViolationKind::UnrecognizedKind);
    }
}
