//! Price parsing and unit normalization.
//!
//! Source prices arrive as text such as `"45,20 €"` with a comma decimal
//! separator, next to a free-form unit such as `"EUR/kg"` or `"€/100KG"`.
//! Every priced record is brought onto the per-100kg basis when its unit is
//! a recognized per-kg rate; other units pass through verbatim.

use agrimarket_core::config::{FieldConfig, NormalizerConfig};
use agrimarket_core::{CanonicalUnit, FieldValue, NormalizedRecord, PriceStatus, RawRecord};
use regex::Regex;
use std::sync::OnceLock;

fn price_number_re() -> &'static Regex {
    static PRICE_NUMBER_RE: OnceLock<Regex> = OnceLock::new();
    PRICE_NUMBER_RE.get_or_init(|| Regex::new(r"[0-9]+(?:\.[0-9]+)?").expect("valid price regex"))
}

/// Extract a price from free text.
///
/// Strips the given currency symbols, reads `,` as the decimal separator and
/// parses the first `digits[.digits]` run. Returns `None` when the text holds
/// no digits. Signs and thousands separators are not interpreted.
pub fn parse_price(text: &str, currency_symbols: &[String]) -> Option<f64> {
    let mut cleaned = text.to_string();
    for symbol in currency_symbols {
        cleaned = cleaned.replace(symbol.as_str(), "");
    }
    let cleaned = cleaned.replace(',', ".");

    price_number_re()
        .find(&cleaned)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// How a unit string relates to the per-100kg basis.
#[derive(Debug, Clone, PartialEq)]
enum UnitClass {
    PerKg,
    PerHundredKg,
    Other(String),
    Absent,
}

/// Stateless per-record price/unit normalizer.
#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    price_field: String,
    unit_field: String,
    currency_symbols: Vec<String>,
    currency_codes: Vec<(String, String)>,
    per_kg: String,
    per_hundred_kg: String,
    per_kg_factor: f64,
    canonical_label: String,
    unknown_placeholder: String,
}

impl RecordNormalizer {
    /// Create a normalizer from configuration.
    pub fn new(fields: &FieldConfig, config: &NormalizerConfig) -> Self {
        let mut normalizer = Self {
            price_field: fields.price.clone(),
            unit_field: fields.unit.clone(),
            currency_symbols: config.currency_symbols.clone(),
            currency_codes: config
                .currency_codes
                .iter()
                .map(|(code, symbol)| (code.to_lowercase(), symbol.clone()))
                .collect(),
            per_kg: String::new(),
            per_hundred_kg: String::new(),
            per_kg_factor: config.per_kg_factor,
            canonical_label: config.canonical_unit_label.clone(),
            unknown_placeholder: config.unknown_unit_placeholder.clone(),
        };
        normalizer.per_kg = normalizer.canonical_unit_text(&config.per_kg_unit);
        normalizer.per_hundred_kg = normalizer.canonical_unit_text(&config.per_hundred_kg_unit);
        normalizer
    }

    /// Normalize one record's price and unit. `time_point` is left empty.
    pub fn normalize(&self, raw: &RawRecord) -> NormalizedRecord {
        let Some((_, price_raw)) = raw.find_field(&self.price_field, "price") else {
            return NormalizedRecord {
                raw: raw.clone(),
                price_value: None,
                price_status: PriceStatus::Missing,
                unit_canonical: None,
                conversion_applied: false,
                time_point: None,
            };
        };

        let parsed = self.parse_value(price_raw);
        let (unit, factor) = match self.classify_unit(raw.get(&self.unit_field)) {
            UnitClass::PerKg => (
                CanonicalUnit::PerHundredKg(self.canonical_label.clone()),
                Some(self.per_kg_factor),
            ),
            UnitClass::PerHundredKg => (CanonicalUnit::PerHundredKg(self.canonical_label.clone()), None),
            UnitClass::Other(unit) => (CanonicalUnit::Other(unit), None),
            UnitClass::Absent => (CanonicalUnit::Unknown(self.unknown_placeholder.clone()), None),
        };

        let conversion_applied = parsed.is_some() && factor.is_some();
        let price_value = parsed.map(|v| v * factor.unwrap_or(1.0));

        NormalizedRecord {
            raw: raw.clone(),
            price_value,
            price_status: if price_value.is_some() {
                PriceStatus::Parsed
            } else {
                PriceStatus::Unparseable
            },
            unit_canonical: Some(unit),
            conversion_applied,
            time_point: None,
        }
    }

    /// Whether the record's price text carries a currency symbol.
    ///
    /// `None` when there is no price field or it is null or blank.
    pub fn price_has_currency(&self, raw: &RawRecord) -> Option<bool> {
        let (_, value) = raw.find_field(&self.price_field, "price")?;
        match value {
            FieldValue::Null => None,
            FieldValue::Number(_) => Some(false),
            FieldValue::Text(text) if text.trim().is_empty() => None,
            FieldValue::Text(text) => Some(
                self.currency_symbols
                    .iter()
                    .any(|symbol| text.contains(symbol.as_str())),
            ),
        }
    }

    fn parse_value(&self, value: &FieldValue) -> Option<f64> {
        match value {
            FieldValue::Null => None,
            FieldValue::Number(n) if n.is_finite() => Some(*n),
            FieldValue::Number(_) => None,
            FieldValue::Text(text) => parse_price(text, &self.currency_symbols),
        }
    }

    fn classify_unit(&self, value: Option<&FieldValue>) -> UnitClass {
        let Some(original) = value.and_then(FieldValue::as_text) else {
            return UnitClass::Absent;
        };
        if original.trim().is_empty() {
            return UnitClass::Absent;
        }

        let canonical = self.canonical_unit_text(&original);
        if canonical.contains(&self.per_hundred_kg) {
            UnitClass::PerHundredKg
        } else if canonical.contains(&self.per_kg) {
            UnitClass::PerKg
        } else {
            UnitClass::Other(original.into_owned())
        }
    }

    /// Lowercase, drop whitespace, map currency codes onto symbols.
    fn canonical_unit_text(&self, unit: &str) -> String {
        let mut text: String = unit
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();
        for (code, symbol) in &self.currency_codes {
            text = text.replace(code.as_str(), symbol);
        }
        text
    }
}

impl Default for RecordNormalizer {
    fn default() -> Self {
        Self::new(&FieldConfig::default(), &NormalizerConfig::default())
    }
}
