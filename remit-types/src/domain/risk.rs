//! Risk assessment result types.

use serde::{Deserialize, Serialize};

/// Risk classification driving auto-approve, step-up verification, or block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskTier::Low => write!(f, "LOW"),
            RiskTier::Medium => write!(f, "MEDIUM"),
            RiskTier::High => write!(f, "HIGH"),
        }
    }
}

/// A single contributing signal in a risk assessment.
///
/// Serialized into audit payloads only; never read back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskFactor {
    /// Stable machine-readable code, e.g. `amount_vs_history`.
    pub code: &'static str,
    /// Points this factor contributed to its sub-score (0-100 scale).
    pub weight: f64,
    pub detail: String,
}

/// Ephemeral output of the risk scorer.
///
/// Not persisted on its own; the score and ordered factor codes are copied
/// onto the Transaction at creation time for audit purposes.
#[derive(Debug, Clone, Serialize)]
pub struct RiskAssessment {
    /// Composite score clamped to [0, 100].
    pub score: f64,
    pub tier: RiskTier,
    /// Contributing factors in evaluation order.
    pub factors: Vec<RiskFactor>,
}

impl RiskAssessment {
    /// Factor codes in order, the form persisted on the Transaction.
    pub fn factor_codes(&self) -> Vec<String> {
        self.factors.iter().map(|f| f.code.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factor_codes_preserve_order() {
        let assessment = RiskAssessment {
            score: 42.0,
            tier: RiskTier::Medium,
            factors: vec![
                RiskFactor {
                    code: "new_device",
                    weight: 40.0,
                    detail: "fingerprint not seen before".into(),
                },
                RiskFactor {
                    code: "young_account",
                    weight: 20.0,
                    detail: "account is 3 days old".into(),
                },
            ],
        };
        assert_eq!(assessment.factor_codes(), vec!["new_device", "young_account"]);
    }
}
