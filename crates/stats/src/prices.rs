//! Price statistics.
//!
//! Records are grouped by canonical unit label before any aggregate is taken,
//! so a per-100kg price is never averaged with a per-tonne price or with a
//! price whose unit is unknown.

use agrimarket_core::NormalizedRecord;
use serde::Serialize;
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

/// Descriptive statistics for prices sharing one unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceStats {
    /// Unit label all prices are expressed in.
    pub unit: String,
    /// Number of prices.
    pub count: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Sample standard deviation (n - 1); absent below two prices.
    pub std_dev: Option<f64>,
    /// Lowest price.
    pub min: f64,
    /// Highest price.
    pub max: f64,
    /// Coefficient of variation in percent (std / mean * 100).
    pub volatility_pct: Option<f64>,
}

impl PriceStats {
    /// Compute statistics; `None` for an empty slice.
    pub fn from_prices(unit: impl Into<String>, prices: &[f64]) -> Option<Self> {
        if prices.is_empty() {
            return None;
        }

        let mean = prices.iter().mean();
        let std_dev = if prices.len() >= 2 {
            Some(prices.iter().std_dev())
        } else {
            None
        };
        let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
        let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let volatility_pct = std_dev
            .filter(|_| mean != 0.0)
            .map(|sd| sd / mean * 100.0);

        Some(Self {
            unit: unit.into(),
            count: prices.len(),
            mean,
            std_dev,
            min,
            max,
            volatility_pct,
        })
    }
}

/// Price statistics keyed by unit label.
pub fn price_stats_by_unit(records: &[NormalizedRecord]) -> BTreeMap<String, PriceStats> {
    let mut grouped: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for record in records {
        if let (Some(price), Some(unit)) = (record.price_value, &record.unit_canonical) {
            grouped.entry(unit.label().to_string()).or_default().push(price);
        }
    }

    grouped
        .into_iter()
        .filter_map(|(unit, prices)| {
            PriceStats::from_prices(unit.clone(), &prices).map(|stats| (unit, stats))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use agrimarket_core::{CanonicalUnit, PriceStatus, RawRecord};
    use approx::assert_relative_eq;

    fn priced(price: Option<f64>, unit: CanonicalUnit) -> NormalizedRecord {
        NormalizedRecord {
            raw: RawRecord::new(),
            price_value: price,
            price_status: if price.is_some() {
                PriceStatus::Parsed
            } else {
                PriceStatus::Unparseable
            },
            unit_canonical: Some(unit),
            conversion_applied: false,
            time_point: None,
        }
    }

    #[test]
    fn test_empty_prices() {
        assert!(PriceStats::from_prices("€/100kg", &[]).is_none());
    }

    #[test]
    fn test_single_price_has_no_spread() {
        let stats = PriceStats::from_prices("€/100kg", &[400.0]).unwrap();
        assert_relative_eq!(stats.mean, 400.0);
        assert!(stats.std_dev.is_none());
        assert!(stats.volatility_pct.is_none());
    }

    #[test]
    fn test_known_values() {
        // Mean 4, sample variance ((2-4)^2 + (4-4)^2 + (6-4)^2) / 2 = 4, std 2.
        let stats = PriceStats::from_prices("€/t", &[2.0, 4.0, 6.0]).unwrap();
        assert_eq!(stats.count, 3);
        assert_relative_eq!(stats.mean, 4.0);
        assert_relative_eq!(stats.std_dev.unwrap(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(stats.min, 2.0);
        assert_relative_eq!(stats.max, 6.0);
        assert_relative_eq!(stats.volatility_pct.unwrap(), 50.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_mean_has_no_volatility() {
        let stats = PriceStats::from_prices("€/t", &[0.0, 0.0]).unwrap();
        assert!(stats.volatility_pct.is_none());
    }

    #[test]
    fn test_units_are_not_pooled() {
        let records = vec![
            priced(Some(400.0), CanonicalUnit::PerHundredKg("€/100kg".into())),
            priced(Some(420.0), CanonicalUnit::PerHundredKg("€/100kg".into())),
            priced(Some(9.0), CanonicalUnit::Unknown("unit unknown".into())),
            priced(Some(210.0), CanonicalUnit::Other("€/t".into())),
            priced(None, CanonicalUnit::PerHundredKg("€/100kg".into())),
        ];
        let by_unit = price_stats_by_unit(&records);

        assert_eq!(by_unit.len(), 3);
        assert_eq!(by_unit["€/100kg"].count, 2);
        assert_relative_eq!(by_unit["€/100kg"].mean, 410.0);
        assert_eq!(by_unit["unit unknown"].count, 1);
        assert_eq!(by_unit["€/t"].count, 1);
    }
}
