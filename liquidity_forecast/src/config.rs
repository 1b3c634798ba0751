//! Pipeline configuration
//!
//! Everything here can be overridden from a JSON file; omitted sections keep
//! their defaults. Blend weights and the baseline divisor are policy
//! constants in [`crate::blend`] and are not configurable.

use crate::error::{ForecastError, Result};
use liquidity_math::{BoostingParams, ForestParams};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Decoding rule for a categorical metadata column
///
/// Values look like `<prefix><integer>`; the first `prefix_len` characters
/// are dropped and the remainder parsed as the integer code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalRule {
    /// Metadata column the rule applies to
    pub column: String,
    /// Number of leading characters to strip
    pub prefix_len: usize,
    /// Literal prefix to verify, if known
    #[serde(default)]
    pub prefix: Option<String>,
}

impl CategoricalRule {
    /// Rule that only checks the prefix width
    pub fn new(column: &str, prefix_len: usize) -> Self {
        Self {
            column: column.to_string(),
            prefix_len,
            prefix: None,
        }
    }

    /// Rule that also checks the literal prefix text
    pub fn with_prefix(column: &str, prefix: &str) -> Self {
        Self {
            column: column.to_string(),
            prefix_len: prefix.chars().count(),
            prefix: Some(prefix.to_string()),
        }
    }
}

/// Static feature extraction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Bond identifier column
    pub id_column: String,
    /// Columns dropped from the static table (date-valued fields)
    pub excluded_columns: Vec<String>,
    /// Categorical decoding rules
    pub categorical_rules: Vec<CategoricalRule>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        let rules = [
            ("collateralType", 14),
            ("couponType", 10),
            ("industryGroup", 13),
            ("industrySector", 14),
            ("industrySubgroup", 16),
            ("maturityType", 12),
            ("securityType", 12),
            ("paymentRank", 11),
            ("144aFlag", 4),
            ("ratingAgency1Rating", 6),
            ("ratingAgency1Watch", 5),
            ("ratingAgency2Rating", 6),
            ("ratingAgency2Watch", 5),
            ("market", 6),
            ("issuer", 6),
        ];

        Self {
            id_column: "isin".to_string(),
            excluded_columns: vec![
                "issueDate".to_string(),
                "ratingAgency1EffectiveDate".to_string(),
                "ratingAgency2EffectiveDate".to_string(),
                "maturity".to_string(),
            ],
            categorical_rules: rules
                .iter()
                .map(|(column, len)| CategoricalRule::new(column, *len))
                .collect(),
        }
    }
}

impl FeatureConfig {
    /// Rule for `column`, if it is categorical
    pub fn rule_for(&self, column: &str) -> Option<&CategoricalRule> {
        self.categorical_rules.iter().find(|r| r.column == column)
    }

    /// Whether `column` is kept in the static table
    pub fn is_retained(&self, column: &str) -> bool {
        column != self.id_column && !self.excluded_columns.iter().any(|c| c == column)
    }

    fn validate(&self) -> Result<()> {
        if self.id_column.trim().is_empty() {
            return Err(ForecastError::InvalidParameter(
                "id_column must not be empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for rule in &self.categorical_rules {
            if !seen.insert(rule.column.as_str()) {
                return Err(ForecastError::InvalidParameter(format!(
                    "Duplicate categorical rule for column '{}'",
                    rule.column
                )));
            }
            if !self.is_retained(&rule.column) {
                return Err(ForecastError::InvalidParameter(format!(
                    "Categorical rule targets dropped column '{}'",
                    rule.column
                )));
            }
            if let Some(prefix) = &rule.prefix {
                if prefix.chars().count() != rule.prefix_len {
                    return Err(ForecastError::InvalidParameter(format!(
                        "Prefix '{}' for column '{}' is not {} characters long",
                        prefix, rule.column, rule.prefix_len
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Linear model settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearParams {
    /// Whether to fit an intercept
    pub fit_intercept: bool,
}

impl Default for LinearParams {
    fn default() -> Self {
        Self {
            fit_intercept: true,
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Static feature extraction
    pub features: FeatureConfig,
    /// Gradient boosting member of the ensemble
    pub gradient_boosting: BoostingParams,
    /// Random forest member of the ensemble
    pub random_forest: ForestParams,
    /// Linear member of the ensemble
    pub linear: LinearParams,
}

impl ForecastConfig {
    /// Load and validate a configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Parse and validate a configuration from JSON text
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section
    pub fn validate(&self) -> Result<()> {
        self.features.validate()?;
        self.gradient_boosting
            .validate()
            .map_err(|e| ForecastError::InvalidParameter(format!("gradient_boosting: {}", e)))?;
        self.random_forest
            .validate()
            .map_err(|e| ForecastError::InvalidParameter(format!("random_forest: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_rules_cover_metadata_columns() {
        let config = FeatureConfig::default();
        assert_eq!(config.categorical_rules.len(), 15);
        assert_eq!(config.rule_for("industrySubgroup").unwrap().prefix_len, 16);
        assert_eq!(config.rule_for("144aFlag").unwrap().prefix_len, 4);
        assert!(config.rule_for("coupon").is_none());
        assert!(!config.is_retained("isin"));
        assert!(!config.is_retained("maturity"));
        assert!(config.is_retained("amtIssued"));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ForecastConfig::from_json_str(
            r#"{ "random_forest": { "n_trees": 10 }, "features": { "id_column": "bond" } }"#,
        )
        .unwrap();

        assert_eq!(config.random_forest.n_trees, 10);
        assert_eq!(config.random_forest.max_features, Some(5));
        assert_eq!(config.features.id_column, "bond");
        assert_eq!(config.features.categorical_rules.len(), 15);
        assert_eq!(config.gradient_boosting, BoostingParams::default());
    }

    #[test]
    fn test_invalid_hyperparameter_rejected() {
        let err = ForecastConfig::from_json_str(r#"{ "gradient_boosting": { "subsample": 1.5 } }"#)
            .unwrap_err();
        assert!(matches!(err, ForecastError::InvalidParameter(_)));
    }

    #[test]
    fn test_prefix_length_must_match() {
        let mut config = ForecastConfig::default();
        config.features.categorical_rules = vec![CategoricalRule {
            column: "market".to_string(),
            prefix_len: 3,
            prefix: Some("market".to_string()),
        }];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rule_on_excluded_column_rejected() {
        let mut config = ForecastConfig::default();
        config
            .features
            .categorical_rules
            .push(CategoricalRule::new("maturity", 3));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            ForecastConfig::from_json_str("{ not json"),
            Err(ForecastError::Config(_))
        ));
    }
}
