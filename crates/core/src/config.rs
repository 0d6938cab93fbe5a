//! Configuration structures for the agrimarket pipeline.

use crate::error::{Error, Result};
use crate::types::{PER_HUNDRED_KG_LABEL, UNKNOWN_UNIT_PLACEHOLDER};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration for the cleaning pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Field names looked up on raw records.
    pub fields: FieldConfig,
    /// Price and unit normalization.
    pub normalizer: NormalizerConfig,
    /// Time resolution.
    pub time: TimeConfig,
    /// Duplicate removal.
    pub dedup: DedupConfig,
    /// Response cache.
    pub cache: CacheConfig,
}

impl Config {
    /// Parse a configuration from JSON text. Missing sections take defaults.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        let named = [
            ("fields.country", &self.fields.country),
            ("fields.price", &self.fields.price),
            ("fields.unit", &self.fields.unit),
            ("fields.year", &self.fields.year),
            ("fields.week", &self.fields.week),
            ("fields.month", &self.fields.month),
        ];
        for (name, value) in named {
            if value.trim().is_empty() {
                return Err(Error::config(format!("{name} must not be empty")));
            }
        }
        if self.fields.key_fields.iter().any(|f| f.trim().is_empty()) {
            return Err(Error::config("fields.key_fields must not contain empty names"));
        }
        if self.time.date_format.trim().is_empty() {
            return Err(Error::config("time.date_format must not be empty"));
        }
        self.normalizer.validate()?;
        if self.cache.ttl_secs == 0 {
            return Err(Error::config("cache.ttl_secs must be positive"));
        }
        Ok(())
    }
}

/// Names of the fields the pipeline reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Country (member state) code.
    pub country: String,
    /// Preferred price field; any field containing "price" is the fallback.
    pub price: String,
    /// Unit field.
    pub unit: String,
    /// Preferred explicit date field; any field containing "date" is the fallback.
    pub date: String,
    /// Year number.
    pub year: String,
    /// ISO week number.
    pub week: String,
    /// Month number.
    pub month: String,
    /// Product/category fields added to the natural key when the batch has them.
    pub key_fields: Vec<String>,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            country: "memberStateCode".to_string(),
            price: "price".to_string(),
            unit: "unit".to_string(),
            date: "beginDate".to_string(),
            year: "year".to_string(),
            week: "week".to_string(),
            month: "month".to_string(),
            key_fields: vec![
                "product".to_string(),
                "productCode".to_string(),
                "productName".to_string(),
                "category".to_string(),
                "carcassCategory".to_string(),
                "stageCode".to_string(),
            ],
        }
    }
}

/// Price parsing and unit conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Symbols removed from price text before number extraction.
    pub currency_symbols: Vec<String>,
    /// Currency codes that map onto the symbol form ("eur" -> "€").
    pub currency_codes: Vec<(String, String)>,
    /// Per-single-kilogram rate form, compared after unit normalization.
    pub per_kg_unit: String,
    /// Per-hundred-kilogram rate form, compared after unit normalization.
    pub per_hundred_kg_unit: String,
    /// Multiplier from the per-kg to the per-100kg basis.
    pub per_kg_factor: f64,
    /// Label shown for prices on the per-100kg basis.
    pub canonical_unit_label: String,
    /// Unit shown for priced records without a unit field.
    pub unknown_unit_placeholder: String,
}

impl NormalizerConfig {
    fn validate(&self) -> Result<()> {
        if self.per_kg_unit.is_empty() || self.per_hundred_kg_unit.is_empty() {
            return Err(Error::config("normalizer unit forms must not be empty"));
        }
        if self
            .currency_codes
            .iter()
            .any(|(code, symbol)| code.trim().is_empty() || symbol.is_empty())
        {
            return Err(Error::config(
                "normalizer.currency_codes must not contain empty codes or symbols",
            ));
        }
        if !self.per_kg_factor.is_finite() || self.per_kg_factor <= 0.0 {
            return Err(Error::config("normalizer.per_kg_factor must be a positive number"));
        }
        if self.canonical_unit_label.trim().is_empty() {
            return Err(Error::config("normalizer.canonical_unit_label must not be empty"));
        }
        if self.unknown_unit_placeholder.trim().is_empty() {
            return Err(Error::config("normalizer.unknown_unit_placeholder must not be empty"));
        }
        if self.unknown_unit_placeholder == self.canonical_unit_label {
            return Err(Error::config(
                "normalizer.unknown_unit_placeholder must differ from the canonical unit label",
            ));
        }
        Ok(())
    }
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            currency_symbols: vec!["€".to_string(), "$".to_string(), "£".to_string()],
            currency_codes: vec![("eur".to_string(), "€".to_string())],
            per_kg_unit: "€/kg".to_string(),
            per_hundred_kg_unit: "€/100kg".to_string(),
            per_kg_factor: 100.0,
            canonical_unit_label: PER_HUNDRED_KG_LABEL.to_string(),
            unknown_unit_placeholder: UNKNOWN_UNIT_PLACEHOLDER.to_string(),
        }
    }
}

/// Time resolution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    /// chrono format for explicit date fields (day/month/year).
    pub date_format: String,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            date_format: "%d/%m/%Y".to_string(),
        }
    }
}

/// How records sharing a natural key are collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupMode {
    /// Keep the first record in batch order.
    #[default]
    KeepFirst,
    /// Keep the first record's fields, average the group's prices.
    Mean,
}

/// Duplicate removal configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Collapse policy.
    pub mode: DedupMode,
}

/// Response cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entry lifetime in seconds.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 1800 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.fields.country, "memberStateCode");
        assert_eq!(config.time.date_format, "%d/%m/%Y");
        assert_eq!(config.dedup.mode, DedupMode::KeepFirst);
        assert_eq!(config.cache.ttl_secs, 1800);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config = Config::from_json_str(r#"{"dedup": {"mode": "mean"}, "cache": {"ttl_secs": 900}}"#).unwrap();
        assert_eq!(config.dedup.mode, DedupMode::Mean);
        assert_eq!(config.cache.ttl_secs, 900);
        assert_eq!(config.fields.price, "price");
    }

    #[test]
    fn test_validate_rejects_empty_field() {
        let err = Config::from_json_str(r#"{"fields": {"country": " "}}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_validate_rejects_zero_ttl() {
        let mut config = Config::default();
        config.cache.ttl_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_per_kg_factor() {
        for factor in [0.0, -100.0, f64::NAN, f64::INFINITY] {
            let mut config = Config::default();
            config.normalizer.per_kg_factor = factor;
            assert!(
                matches!(config.validate(), Err(Error::Config(_))),
                "factor {factor} accepted"
            );
        }
    }

    #[test]
    fn test_validate_rejects_empty_currency_code() {
        let err = Config::from_json_str(r#"{"normalizer": {"currency_codes": [["", "€"]]}}"#)
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let mut config = Config::default();
        config.normalizer.currency_codes = vec![("usd".to_string(), String::new())];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unit_labels_configurable() {
        let config = Config::from_json_str(
            r#"{"normalizer": {"canonical_unit_label": "EUR/100kg", "unknown_unit_placeholder": "n/a"}}"#,
        )
        .unwrap();
        assert_eq!(config.normalizer.canonical_unit_label, "EUR/100kg");
        assert_eq!(config.normalizer.unknown_unit_placeholder, "n/a");

        let mut config = Config::default();
        config.normalizer.unknown_unit_placeholder = config.normalizer.canonical_unit_label.clone();
        assert!(config.validate().is_err());
        config.normalizer.unknown_unit_placeholder = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Config::from_file("/nonexistent/agrimarket.json").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
