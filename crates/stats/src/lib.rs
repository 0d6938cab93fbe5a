//! Batch analytics for normalized agrimarket records.
//!
//! This crate provides the figures a dashboard shows next to the table:
//! - Price statistics per canonical unit (never pooled across units)
//! - Covered countries and time range
//! - Per-country time-ordered price series for charts

pub mod engine;
pub mod prices;
pub mod series;

pub use engine::BatchStats;
pub use prices::{price_stats_by_unit, PriceStats};
pub use series::{build_series, country_coverage, PriceSeries, SeriesPoint, TimeRange};
