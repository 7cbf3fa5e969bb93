//! Engine configuration parsing from YAML/JSON.
//!
//! Every tunable in the core lives here with a documented default, so a
//! deployment can ship one config file and tests can construct engines with
//! `CoreConfig::default()`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

/// Tunables for the contradiction linter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinterConfig {
    /// Max prior results cached per component (oldest evicted first).
    pub memory_window: usize,

    /// Allowed divergence between a citation's confidence and the known
    /// trust for the same source before a knowledge conflict is reported.
    pub knowledge_delta: f64,

    /// Required predecessor components per component, e.g.
    /// `meta -> [reflection, hunter]`.
    pub required_predecessors: BTreeMap<String, Vec<String>>,
}

impl Default for LinterConfig {
    fn default() -> Self {
        Self {
            memory_window: 100,
            knowledge_delta: 0.4,
            required_predecessors: BTreeMap::new(),
        }
    }
}

/// Tunables for the governance verdict engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    /// Below this confidence a verdict escalates to human review.
    pub low_confidence_threshold: f64,

    /// Compliance-score penalty per error.
    pub error_penalty: f64,

    /// Compliance-score penalty per warning.
    pub warning_penalty: f64,

    /// Evidence bonus per citation, scaled by mean citation confidence.
    pub citation_bonus: f64,

    /// Cap on the total evidence bonus.
    pub citation_bonus_cap: f64,

    /// Bonus per compliant policy tag.
    pub policy_bonus: f64,

    /// Cap on the total policy bonus.
    pub policy_bonus_cap: f64,

    /// Penalty when sensitive-content patterns match the result.
    pub sensitive_penalty: f64,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            low_confidence_threshold: 0.5,
            error_penalty: 0.15,
            warning_penalty: 0.05,
            citation_bonus: 0.03,
            citation_bonus_cap: 0.15,
            policy_bonus: 0.02,
            policy_bonus_cap: 0.10,
            sensitive_penalty: 0.20,
        }
    }
}

/// Tunables for the consensus engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    /// Exponential-moving-average step for specialist trust updates.
    pub trust_alpha: f64,

    /// Rolling outcome window used to compute track records.
    pub outcome_window: usize,

    /// Multiplicative score bonus for constitutionally compliant proposals
    /// under SOFTMAX_WEIGHTED.
    pub compliance_bonus: f64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            trust_alpha: 0.1,
            outcome_window: 20,
            compliance_bonus: 1.15,
        }
    }
}

/// Tunables for the trust scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustConfig {
    pub provenance_weight: f64,
    pub consensus_weight: f64,
    pub governance_weight: f64,
    pub usage_weight: f64,

    /// Hard multiplier applied to the blended score when governance
    /// compliance is false. Non-compliance must dominate the result.
    pub non_compliance_factor: f64,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            provenance_weight: 0.3,
            consensus_weight: 0.3,
            governance_weight: 0.2,
            usage_weight: 0.2,
            non_compliance_factor: 0.3,
        }
    }
}

/// Complete configuration for the decision-validation core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub linter: LinterConfig,
    pub governance: GovernanceConfig,
    pub consensus: ConsensusConfig,
    pub trust: TrustConfig,
}

impl CoreConfig {
    /// Parse a config from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: CoreConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config from JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: CoreConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse a config from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Reject out-of-range tunables.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn unit_range(name: &str, value: f64) -> Result<(), ConfigError> {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::InvalidValue(format!(
                    "{} must be in [0, 1], got {}",
                    name, value
                )))
            }
        }

        if self.linter.memory_window == 0 {
            return Err(ConfigError::InvalidValue(
                "linter.memory_window must be at least 1".to_string(),
            ));
        }
        unit_range("linter.knowledge_delta", self.linter.knowledge_delta)?;

        unit_range(
            "governance.low_confidence_threshold",
            self.governance.low_confidence_threshold,
        )?;
        unit_range("governance.error_penalty", self.governance.error_penalty)?;
        unit_range("governance.warning_penalty", self.governance.warning_penalty)?;
        unit_range("governance.sensitive_penalty", self.governance.sensitive_penalty)?;

        if !(0.0 < self.consensus.trust_alpha && self.consensus.trust_alpha <= 1.0) {
            return Err(ConfigError::InvalidValue(format!(
                "consensus.trust_alpha must be in (0, 1], got {}",
                self.consensus.trust_alpha
            )));
        }
        if self.consensus.outcome_window == 0 {
            return Err(ConfigError::InvalidValue(
                "consensus.outcome_window must be at least 1".to_string(),
            ));
        }
        if self.consensus.compliance_bonus < 1.0 {
            return Err(ConfigError::InvalidValue(format!(
                "consensus.compliance_bonus must be at least 1.0, got {}",
                self.consensus.compliance_bonus
            )));
        }

        let weight_sum = self.trust.provenance_weight
            + self.trust.consensus_weight
            + self.trust.governance_weight
            + self.trust.usage_weight;
        if (weight_sum - 1.0).abs() > 1e-6 {
            return Err(ConfigError::InvalidValue(format!(
                "trust weights must sum to 1.0, got {}",
                weight_sum
            )));
        }
        unit_range("trust.non_compliance_factor", self.trust.non_compliance_factor)?;

        Ok(())
    }
}
