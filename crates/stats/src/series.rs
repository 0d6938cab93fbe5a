//! Time-ordered price series and coverage.
//!
//! Only records with both a price and a time point belong on a chart; the
//! rest stay in the table but are left out here.

use agrimarket_core::NormalizedRecord;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// One chart point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    /// Resolved time point of the record.
    pub date: NaiveDate,
    /// Price on the record's canonical unit basis.
    pub price: f64,
}

/// Prices of one country in one unit, ordered by date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    /// Country code; `None` for records without one.
    pub country: Option<String>,
    /// Unit label shared by every point.
    pub unit: String,
    /// Points in ascending date order; ties keep batch order.
    pub points: Vec<SeriesPoint>,
}

/// Span of the resolved time points in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    /// First resolved date.
    pub earliest: NaiveDate,
    /// Last resolved date.
    pub latest: NaiveDate,
    /// Number of distinct dates.
    pub distinct_dates: usize,
}

impl TimeRange {
    /// Range over the records' time points; `None` when none has one.
    pub fn of(records: &[NormalizedRecord]) -> Option<Self> {
        let dates: BTreeSet<NaiveDate> = records
            .iter()
            .filter_map(|r| r.time_point.map(|tp| tp.date))
            .collect();
        Some(Self {
            earliest: *dates.first()?,
            latest: *dates.last()?,
            distinct_dates: dates.len(),
        })
    }
}

/// Distinct country codes in sorted order.
pub fn country_coverage(records: &[NormalizedRecord], country_field: &str) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| r.country(country_field))
        .map(|c| c.into_owned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Build one series per (country, unit), sorted by country then unit.
pub fn build_series(records: &[NormalizedRecord], country_field: &str) -> Vec<PriceSeries> {
    let mut grouped: BTreeMap<(Option<String>, String), Vec<SeriesPoint>> = BTreeMap::new();

    for record in records {
        let (Some(price), Some(tp), Some(unit)) =
            (record.price_value, record.time_point, &record.unit_canonical)
        else {
            continue;
        };
        let country = record.country(country_field).map(|c| c.into_owned());
        grouped
            .entry((country, unit.label().to_string()))
            .or_default()
            .push(SeriesPoint {
                date: tp.date,
                price,
            });
    }

    grouped
        .into_iter()
        .map(|((country, unit), mut points)| {
            points.sort_by_key(|p| p.date);
            PriceSeries {
                country,
                unit,
                points,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use agrimarket_ingestion::Pipeline;
    use serde_json::json;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn records() -> Vec<NormalizedRecord> {
        let input = json!([
            {"memberStateCode":"PT","price":"4,60","unit":"€/kg","beginDate":"08/03/2023"},
            {"memberStateCode":"PT","price":"4,50","unit":"€/kg","beginDate":"01/03/2023"},
            {"memberStateCode":"DE","price":"390","unit":"€/100kg","beginDate":"01/03/2023"},
            {"memberStateCode":"DE","price":"n/a","unit":"€/100kg","beginDate":"08/03/2023"},
            {"memberStateCode":"ES","price":"400","unit":"€/100kg","year":2023},
            {"price":"210","unit":"€/t","year":2023,"month":2}
        ]);
        Pipeline::default().process(&input).unwrap().records
    }

    #[test]
    fn test_time_range() {
        let range = TimeRange::of(&records()).unwrap();
        assert_eq!(range.earliest, ymd(2023, 2, 1));
        assert_eq!(range.latest, ymd(2023, 3, 8));
        assert_eq!(range.distinct_dates, 3);
        assert!(TimeRange::of(&[]).is_none());
    }

    #[test]
    fn test_country_coverage() {
        assert_eq!(country_coverage(&records(), "memberStateCode"), vec!["DE", "ES", "PT"]);
    }

    #[test]
    fn test_series_are_time_ordered_and_skip_untimed() {
        let series = build_series(&records(), "memberStateCode");

        // No-country series sorts first; ES has no time point; DE's n/a is skipped.
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].country, None);
        assert_eq!(series[0].unit, "€/t");

        assert_eq!(series[1].country.as_deref(), Some("DE"));
        assert_eq!(series[1].points.len(), 1);

        let pt = &series[2];
        assert_eq!(pt.country.as_deref(), Some("PT"));
        assert_eq!(pt.unit, "€/100kg");
        let dates: Vec<_> = pt.points.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![ymd(2023, 3, 1), ymd(2023, 3, 8)]);
    }
}
