//! Trust scoring: a weighted blend of evidence signals, plus time decay.
//!
//! Governance non-compliance is not just another additive term: it applies a
//! hard multiplicative penalty to the blended score, so a non-compliant
//! memory can never score well on the strength of its other signals.

use serde::{Deserialize, Serialize};

use crate::config::TrustConfig;
use crate::types::{clamp01, OutputRecord, Verdict};

/// Decay curve applied to a stored trust value as it ages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecayCurve {
    Exponential,
    Hyperbolic,
}

impl DecayCurve {
    /// Decay `base_trust` by `age_hours` against `half_life_hours`.
    ///
    /// Both curves return the base unchanged at age zero and are
    /// monotonically non-increasing in age. Negative ages are treated as
    /// zero; a non-positive half-life means no decay is defined and the
    /// base passes through untouched.
    pub fn apply(&self, base_trust: f64, age_hours: f64, half_life_hours: f64) -> f64 {
        if half_life_hours <= 0.0 {
            return clamp01(base_trust);
        }
        let age = age_hours.max(0.0);
        let ratio = age / half_life_hours;
        let decayed = match self {
            DecayCurve::Exponential => base_trust * 0.5_f64.powf(ratio),
            DecayCurve::Hyperbolic => base_trust / (1.0 + ratio),
        };
        clamp01(decayed)
    }
}

/// Decay a trust value over time with the selected curve.
pub fn apply_time_decay(
    base_trust: f64,
    age_hours: f64,
    half_life_hours: f64,
    curve: DecayCurve,
) -> f64 {
    curve.apply(base_trust, age_hours, half_life_hours)
}

pub struct TrustScorer {
    config: TrustConfig,
}

impl TrustScorer {
    pub fn new(config: TrustConfig) -> Self {
        Self { config }
    }

    /// Blend the four evidence signals into one trust value.
    ///
    /// `governance_compliant == false` zeroes its own term and then scales
    /// the whole blend by the non-compliance factor, so non-compliance
    /// dominates regardless of the other signals.
    pub fn calculate_trust_score(
        &self,
        provenance_verified: bool,
        consensus_agreement: f64,
        governance_compliant: bool,
        usage_success_rate: f64,
    ) -> f64 {
        let config = &self.config;
        let provenance = if provenance_verified { 1.0 } else { 0.0 };
        let governance = if governance_compliant { 1.0 } else { 0.0 };

        let mut blended = config.provenance_weight * provenance
            + config.consensus_weight * clamp01(consensus_agreement)
            + config.governance_weight * governance
            + config.usage_weight * clamp01(usage_success_rate);

        if !governance_compliant {
            blended *= config.non_compliance_factor;
        }

        clamp01(blended)
    }

    /// Trust assigned to a memory at storage time, from the verdict's
    /// compliance score, citation-derived evidence quality, and the
    /// output's error/warning load.
    pub fn memory_trust(&self, verdict: &Verdict, output: &OutputRecord) -> f64 {
        let evidence = evidence_quality(output);
        let base = 0.5 * verdict.compliance_score + 0.3 * evidence + 0.2;
        let penalty =
            0.10 * output.errors.len() as f64 + 0.03 * output.warnings.len() as f64;
        clamp01(base - penalty)
    }
}

impl Default for TrustScorer {
    fn default() -> Self {
        Self::new(TrustConfig::default())
    }
}

/// Citation-derived evidence quality: mean citation confidence, scaled up
/// to full weight at three or more citations.
pub fn evidence_quality(output: &OutputRecord) -> f64 {
    if output.citations.is_empty() {
        return 0.0;
    }
    let mean: f64 = output
        .citations
        .iter()
        .map(|citation| citation.confidence)
        .sum::<f64>()
        / output.citations.len() as f64;
    let coverage = (output.citations.len() as f64 / 3.0).min(1.0);
    clamp01(mean * coverage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Citation, OutputKind, ResultPayload, VerdictDecision};
    use chrono::Utc;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn scorer() -> TrustScorer {
        TrustScorer::default()
    }

    #[test]
    fn test_full_signals_score_one() {
        let score = scorer().calculate_trust_score(true, 1.0, true, 1.0);
        assert!((score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_non_compliance_dominates() {
        // Strong signals everywhere else still collapse under the factor:
        // (0.3 + 0.3 + 0.0 + 0.2) * 0.3 = 0.24.
        let score = scorer().calculate_trust_score(true, 1.0, false, 1.0);
        assert!((score - 0.24).abs() < 1e-12);
    }

    #[test]
    fn test_compliant_never_scores_below_non_compliant() {
        let scorer = scorer();
        for agreement in [0.0, 0.3, 0.7, 1.0] {
            for usage in [0.0, 0.5, 1.0] {
                let compliant = scorer.calculate_trust_score(true, agreement, true, usage);
                let non_compliant = scorer.calculate_trust_score(true, agreement, false, usage);
                assert!(compliant >= non_compliant);
            }
        }
    }

    #[test]
    fn test_decay_identity_at_age_zero() {
        for curve in [DecayCurve::Exponential, DecayCurve::Hyperbolic] {
            assert_eq!(apply_time_decay(0.8, 0.0, 24.0, curve), 0.8);
        }
    }

    #[test]
    fn test_exponential_halves_at_half_life() {
        let decayed = apply_time_decay(0.8, 24.0, 24.0, DecayCurve::Exponential);
        assert!((decayed - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_hyperbolic_halves_at_half_life() {
        let decayed = apply_time_decay(0.8, 24.0, 24.0, DecayCurve::Hyperbolic);
        assert!((decayed - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_negative_age_is_treated_as_zero() {
        assert_eq!(
            apply_time_decay(0.6, -5.0, 24.0, DecayCurve::Exponential),
            0.6
        );
    }

    #[test]
    fn test_non_positive_half_life_passes_through() {
        assert_eq!(apply_time_decay(0.6, 10.0, 0.0, DecayCurve::Hyperbolic), 0.6);
    }

    #[test]
    fn test_evidence_quality_scales_with_citation_count() {
        let base = crate::types::OutputRecord::new(
            "o",
            "t",
            "hunter",
            OutputKind::Insight,
            ResultPayload::Text("x".into()),
        );
        assert_eq!(evidence_quality(&base), 0.0);

        let one = base
            .clone()
            .with_citations(vec![Citation::new("s", 0.9, Utc::now())]);
        let three = base.clone().with_citations(vec![
            Citation::new("a", 0.9, Utc::now()),
            Citation::new("b", 0.9, Utc::now()),
            Citation::new("c", 0.9, Utc::now()),
        ]);
        assert!(evidence_quality(&one) < evidence_quality(&three));
        assert!((evidence_quality(&three) - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_memory_trust_penalizes_errors() {
        let verdict = Verdict {
            decision: VerdictDecision::Allow,
            compliance_score: 0.9,
            tags: BTreeSet::new(),
            safe_to_store: true,
            reason: "ok".to_string(),
            evaluated_at: Utc::now(),
        };
        let clean = crate::types::OutputRecord::new(
            "o",
            "t",
            "hunter",
            OutputKind::Insight,
            ResultPayload::Text("x".into()),
        );
        let noisy = clean
            .clone()
            .with_errors(vec!["err".to_string()])
            .with_warnings(vec!["warn".to_string()]);

        let scorer = scorer();
        assert!(scorer.memory_trust(&verdict, &noisy) < scorer.memory_trust(&verdict, &clean));
    }

    proptest! {
        #[test]
        fn prop_decay_is_monotonically_non_increasing(
            base in 0.0f64..=1.0,
            half_life in 0.1f64..=1000.0,
            age_a in 0.0f64..=10_000.0,
            age_b in 0.0f64..=10_000.0,
        ) {
            let (younger, older) = if age_a <= age_b { (age_a, age_b) } else { (age_b, age_a) };
            for curve in [DecayCurve::Exponential, DecayCurve::Hyperbolic] {
                let early = apply_time_decay(base, younger, half_life, curve);
                let late = apply_time_decay(base, older, half_life, curve);
                prop_assert!(late <= early + 1e-12);
            }
        }

        #[test]
        fn prop_trust_blend_stays_clamped(
            provenance in proptest::bool::ANY,
            agreement in -1.0f64..=2.0,
            compliant in proptest::bool::ANY,
            usage in -1.0f64..=2.0,
        ) {
            let score = scorer().calculate_trust_score(provenance, agreement, compliant, usage);
            prop_assert!((0.0..=1.0).contains(&score));
        }
    }
}
