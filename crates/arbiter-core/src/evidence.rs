//! Evidence linking for lint violations.
//!
//! Every violation should point at the specific part of the record that
//! triggered it, so audit trails stay checkable without re-running the lint.

use serde::{Deserialize, Serialize};

/// Where a piece of evidence comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceSource {
    Result,
    Citation,
    PolicyTag,
    Record,
    Context,
}

/// A piece of evidence supporting a lint violation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Evidence {
    /// What this evidence supports
    pub claim: String,

    /// Where the evidence comes from
    pub source: EvidenceSource,

    /// Pointer to the location (e.g., "citations[0].timestamp")
    pub pointer: String,
}

impl Evidence {
    /// Evidence from the result payload's free text.
    pub fn from_result_text(claim: impl Into<String>) -> Self {
        Self {
            claim: claim.into(),
            source: EvidenceSource::Result,
            pointer: "result.text".to_string(),
        }
    }

    /// Evidence from a named field of a structured result.
    pub fn from_result_field(claim: impl Into<String>, index: usize, name: &str) -> Self {
        Self {
            claim: claim.into(),
            source: EvidenceSource::Result,
            pointer: format!("result.fields[{}].{}", index, name),
        }
    }

    /// Evidence from one citation's field.
    pub fn from_citation(claim: impl Into<String>, index: usize, field: &str) -> Self {
        Self {
            claim: claim.into(),
            source: EvidenceSource::Citation,
            pointer: format!("citations[{}].{}", index, field),
        }
    }

    /// Evidence from one policy tag.
    pub fn from_policy_tag(claim: impl Into<String>, index: usize) -> Self {
        Self {
            claim: claim.into(),
            source: EvidenceSource::PolicyTag,
            pointer: format!("policy_tags[{}]", index),
        }
    }

    /// Evidence from a top-level record field.
    pub fn from_record(claim: impl Into<String>, field: &str) -> Self {
        Self {
            claim: claim.into(),
            source: EvidenceSource::Record,
            pointer: field.to_string(),
        }
    }

    /// Evidence from caller-supplied lint context.
    pub fn from_context(claim: impl Into<String>, key: &str) -> Self {
        Self {
            claim: claim.into(),
            source: EvidenceSource::Context,
            pointer: format!("context.{}", key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evidence_from_citation() {
        let evidence = Evidence::from_citation("timestamp is in the future", 2, "timestamp");
        assert_eq!(evidence.source, EvidenceSource::Citation);
        assert_eq!(evidence.pointer, "citations[2].timestamp");
    }

    #[test]
    fn test_evidence_from_result_field() {
        let evidence = Evidence::from_result_field("conflicting markers", 1, "status");
        assert_eq!(evidence.source, EvidenceSource::Result);
        assert_eq!(evidence.pointer, "result.fields[1].status");
    }

    #[test]
    fn test_evidence_from_policy_tag() {
        let evidence = Evidence::from_policy_tag("policy reported violated", 0);
        assert_eq!(evidence.pointer, "policy_tags[0]");
    }
}
