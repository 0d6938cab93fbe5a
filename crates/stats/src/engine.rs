//! Batch statistics engine.
//!
//! Combines all analytics into one value per processed batch.

use crate::prices::{price_stats_by_unit, PriceStats};
use crate::series::{build_series, country_coverage, PriceSeries, TimeRange};
use agrimarket_core::config::FieldConfig;
use agrimarket_core::NormalizedRecord;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Everything a dashboard shows about one batch besides the table itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchStats {
    /// Records analysed.
    pub record_count: usize,
    /// Price statistics per unit label.
    pub prices_by_unit: BTreeMap<String, PriceStats>,
    /// Span of resolved dates.
    pub time_range: Option<TimeRange>,
    /// Covered country codes.
    pub countries: Vec<String>,
    /// Chart series per country and unit.
    pub series: Vec<PriceSeries>,
}

impl BatchStats {
    /// Compute statistics over normalized records.
    pub fn compute(records: &[NormalizedRecord], fields: &FieldConfig) -> Self {
        let stats = Self {
            record_count: records.len(),
            prices_by_unit: price_stats_by_unit(records),
            time_range: TimeRange::of(records),
            countries: country_coverage(records, &fields.country),
            series: build_series(records, &fields.country),
        };
        debug!(
            records = stats.record_count,
            units = stats.prices_by_unit.len(),
            series = stats.series.len(),
            "computed batch stats"
        );
        stats
    }

    /// Statistics of the only unit in the batch, if prices use exactly one.
    pub fn single_unit(&self) -> Option<&PriceStats> {
        if self.prices_by_unit.len() == 1 {
            self.prices_by_unit.values().next()
        } else {
            None
        }
    }
}
