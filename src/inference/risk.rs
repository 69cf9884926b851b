//! Probability to risk tier mapping

use crate::error::{CabRiskError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete cancellation risk tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskCategory {
    VeryLow,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskCategory {
    /// All tiers from lowest to highest
    pub const ALL: [RiskCategory; 5] = [
        RiskCategory::VeryLow,
        RiskCategory::Low,
        RiskCategory::Medium,
        RiskCategory::High,
        RiskCategory::Critical,
    ];

    pub fn label(self) -> &'static str {
        match self {
            RiskCategory::VeryLow => "Very Low",
            RiskCategory::Low => "Low",
            RiskCategory::Medium => "Medium",
            RiskCategory::High => "High",
            RiskCategory::Critical => "Critical",
        }
    }

    /// Lower bound of the tier, inclusive
    pub fn lower_bound(self) -> f64 {
        match self {
            RiskCategory::VeryLow => 0.0,
            RiskCategory::Low => 0.05,
            RiskCategory::Medium => 0.15,
            RiskCategory::High => 0.30,
            RiskCategory::Critical => 0.50,
        }
    }

    pub fn recommendation(self) -> &'static str {
        match self {
            RiskCategory::Critical => {
                "Critical risk - Immediate intervention required, contact customer proactively"
            }
            RiskCategory::High => {
                "High risk - Consider offering incentives or flexible booking options"
            }
            RiskCategory::Medium => "Medium risk - Send confirmation reminders and monitor closely",
            RiskCategory::Low => {
                "Low risk - Standard monitoring, but keep an eye on booking status"
            }
            RiskCategory::VeryLow => {
                "Very low risk - Standard processing, minimal intervention needed"
            }
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Heuristic confidence label, not a calibrated interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::High => f.write_str("High"),
            Confidence::Medium => f.write_str("Medium"),
        }
    }
}

/// Maps probabilities onto risk tiers and guidance
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskCategorizer;

impl RiskCategorizer {
    pub fn new() -> Self {
        Self
    }

    fn check(probability: f64) -> Result<()> {
        if probability.is_nan() || !(0.0..=1.0).contains(&probability) {
            return Err(CabRiskError::InvalidInput(format!(
                "probability must be within [0, 1], got {}",
                probability
            )));
        }
        Ok(())
    }

    /// Tier for `probability`, checked from the top down
    pub fn category(&self, probability: f64) -> Result<RiskCategory> {
        Self::check(probability)?;
        let category = RiskCategory::ALL
            .iter()
            .rev()
            .copied()
            .find(|c| probability >= c.lower_bound())
            .unwrap_or(RiskCategory::VeryLow);
        Ok(category)
    }

    /// Tier plus its recommendation text
    pub fn categorize(&self, probability: f64) -> Result<(RiskCategory, &'static str)> {
        let category = self.category(probability)?;
        Ok((category, category.recommendation()))
    }

    pub fn confidence(&self, probability: f64) -> Result<Confidence> {
        Self::check(probability)?;
        if probability < 0.10 || probability > 0.90 {
            Ok(Confidence::High)
        } else {
            Ok(Confidence::Medium)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        let c = RiskCategorizer::new();
        assert_eq!(c.category(0.0).unwrap(), RiskCategory::VeryLow);
        assert_eq!(c.category(0.0499).unwrap(), RiskCategory::VeryLow);
        assert_eq!(c.category(0.05).unwrap(), RiskCategory::Low);
        assert_eq!(c.category(0.15).unwrap(), RiskCategory::Medium);
        assert_eq!(c.category(0.2999).unwrap(), RiskCategory::Medium);
        assert_eq!(c.category(0.30).unwrap(), RiskCategory::High);
        assert_eq!(c.category(0.50).unwrap(), RiskCategory::Critical);
        assert_eq!(c.category(1.0).unwrap(), RiskCategory::Critical);
    }

    #[test]
    fn test_recommendations() {
        let c = RiskCategorizer::new();
        let (category, text) = c.categorize(0.42).unwrap();
        assert_eq!(category, RiskCategory::High);
        assert_eq!(
            text,
            "High risk - Consider offering incentives or flexible booking options"
        );
        assert!(c.categorize(0.01).unwrap().1.starts_with("Very low risk"));
    }

    #[test]
    fn test_confidence() {
        let c = RiskCategorizer::new();
        assert_eq!(c.confidence(0.05).unwrap(), Confidence::High);
        assert_eq!(c.confidence(0.10).unwrap(), Confidence::Medium);
        assert_eq!(c.confidence(0.42).unwrap(), Confidence::Medium);
        assert_eq!(c.confidence(0.90).unwrap(), Confidence::Medium);
        assert_eq!(c.confidence(0.95).unwrap(), Confidence::High);
    }

    #[test]
    fn test_rejects_out_of_range() {
        let c = RiskCategorizer::new();
        assert!(matches!(c.category(-0.01), Err(CabRiskError::InvalidInput(_))));
        assert!(c.category(1.5).is_err());
        assert!(c.confidence(f64::NAN).is_err());
    }

    #[test]
    fn test_labels() {
        assert_eq!(RiskCategory::VeryLow.to_string(), "Very Low");
        assert_eq!(RiskCategory::Critical.label(), "Critical");
    }
}
