//! End-to-end processing of one fetched batch.
//!
//! decode -> normalize price/unit -> resolve time -> deduplicate -> summarize.
//! Per-record anomalies are counted, never raised; only an invalid batch
//! shape fails the call.

use crate::batch::decode_batch;
use crate::dedup::Deduplicator;
use crate::normalizer::RecordNormalizer;
use crate::time_resolver::TimeResolver;
use agrimarket_core::{
    BatchSummary, CanonicalUnit, Config, NormalizedRecord, PriceStatus, RawRecord, Result,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

/// Output of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedBatch {
    /// Normalized, deduplicated records in batch order.
    pub records: Vec<NormalizedRecord>,
    /// Quality report; always present.
    pub summary: BatchSummary,
}

impl ProcessedBatch {
    /// Records that can be placed on a time axis.
    pub fn timed_records(&self) -> impl Iterator<Item = &NormalizedRecord> {
        self.records.iter().filter(|r| r.time_point.is_some())
    }

    /// Flattened rows for table display or export.
    pub fn to_json_rows(&self) -> Vec<Value> {
        self.records.iter().map(NormalizedRecord::to_json_row).collect()
    }
}

/// The cleaning pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    normalizer: RecordNormalizer,
    resolver: TimeResolver,
    dedup: Deduplicator,
}

impl Pipeline {
    /// Create a pipeline from configuration.
    pub fn new(config: &Config) -> Self {
        let resolver = TimeResolver::new(&config.fields, &config.time);
        Self {
            normalizer: RecordNormalizer::new(&config.fields, &config.normalizer),
            dedup: Deduplicator::new(&config.fields, config.dedup.mode, resolver.clone()),
            resolver,
        }
    }

    /// Process a decoded JSON response.
    pub fn process(&self, value: &Value) -> Result<ProcessedBatch> {
        let raws = decode_batch(value).inspect_err(|e| warn!(error = %e, "rejecting batch"))?;
        Ok(self.process_records(&raws))
    }

    /// Process JSON response text.
    pub fn process_str(&self, text: &str) -> Result<ProcessedBatch> {
        let value: Value = serde_json::from_str(text)?;
        self.process(&value)
    }

    /// Normalize one record: price, unit and time point.
    pub fn normalize_record(&self, raw: &RawRecord) -> NormalizedRecord {
        NormalizedRecord {
            time_point: self.resolver.resolve(raw),
            ..self.normalizer.normalize(raw)
        }
    }

    /// Process already decoded records.
    pub fn process_records(&self, raws: &[RawRecord]) -> ProcessedBatch {
        let mut summary = BatchSummary {
            input_count: raws.len(),
            ..BatchSummary::default()
        };

        let mut with_symbol = false;
        let mut without_symbol = false;
        let mut normalized = Vec::with_capacity(raws.len());

        for raw in raws {
            match self.normalizer.price_has_currency(raw) {
                Some(true) => with_symbol = true,
                Some(false) => without_symbol = true,
                None => {}
            }

            let record = self.normalize_record(raw);
            match record.price_status {
                PriceStatus::Parsed => {}
                PriceStatus::Unparseable => summary.unparseable_prices += 1,
                PriceStatus::Missing => summary.missing_prices += 1,
            }
            if record.conversion_applied {
                summary.converted_units += 1;
            }
            if matches!(record.unit_canonical, Some(CanonicalUnit::Unknown(_))) {
                summary.unknown_units += 1;
            }
            if record.time_point.is_none() {
                summary.unresolved_times += 1;
            }
            normalized.push(record);
        }

        summary.mixed_currency_formats = with_symbol && without_symbol;
        if summary.mixed_currency_formats {
            warn!("batch mixes prices with and without a currency symbol");
        }

        let outcome = self.dedup.dedup(normalized);
        summary.duplicates_removed = outcome.removed_count();
        summary.removed_keys = outcome.removed_keys;
        summary.output_count = outcome.records.len();

        info!(
            input = summary.input_count,
            output = summary.output_count,
            duplicates = summary.duplicates_removed,
            unparseable = summary.unparseable_prices,
            unresolved_time = summary.unresolved_times,
            "processed batch"
        );

        ProcessedBatch {
            records: outcome.records,
            summary,
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agrimarket_core::config::DedupMode;
    use agrimarket_core::{Error, TimeSource};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn test_portuguese_duplicate_scenario() {
        let input = json!([
            {"memberStateCode":"PT","price":"45,20 €","unit":"EUR/kg","beginDate":"01/03/2023"},
            {"memberStateCode":"PT","price":"45,20 €","unit":"EUR/kg","beginDate":"01/03/2023"}
        ]);
        let batch = Pipeline::default().process(&input).unwrap();

        assert_eq!(batch.records.len(), 1);
        let record = &batch.records[0];
        assert_relative_eq!(record.price_value.unwrap(), 4520.0, epsilon = 1e-9);
        assert_eq!(record.unit_canonical, Some(CanonicalUnit::PerHundredKg("€/100kg".to_string())));
        assert!(record.conversion_applied);
        let tp = record.time_point.unwrap();
        assert_eq!(tp.date, NaiveDate::from_ymd_opt(2023, 3, 1).unwrap());
        assert_eq!(tp.source, TimeSource::ExplicitDate);

        assert_eq!(batch.summary.input_count, 2);
        assert_eq!(batch.summary.output_count, 1);
        assert_eq!(batch.summary.duplicates_removed, 1);
        assert_eq!(batch.summary.removed_keys.len(), 1);
        assert_eq!(batch.summary.unparseable_prices, 0);
        assert_eq!(batch.summary.unresolved_times, 0);
    }

    #[test]
    fn test_empty_batch_reports_zero_counts() {
        let pipeline = Pipeline::default();
        for input in [json!([]), json!(null)] {
            let batch = pipeline.process(&input).unwrap();
            assert!(batch.records.is_empty());
            assert_eq!(batch.summary, BatchSummary::default());
        }
    }

    #[test]
    fn test_scalar_input_is_invalid_shape() {
        let pipeline = Pipeline::default();
        assert!(matches!(
            pipeline.process(&json!("beef/prices")),
            Err(Error::InvalidBatchShape { .. })
        ));
        assert!(matches!(
            pipeline.process(&json!(7)),
            Err(Error::InvalidBatchShape { .. })
        ));
    }

    #[test]
    fn test_single_object_response() {
        let batch = Pipeline::default()
            .process_str(r#"{"memberStateCode":"DE","price":"380,00","unit":"€/100kg","year":2023,"month":6}"#)
            .unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].time_point.unwrap().source, TimeSource::Month);
        assert!(!batch.summary.has_anomalies());
    }

    #[test]
    fn test_anomalies_are_counted_not_raised() {
        let input = json!([
            {"memberStateCode":"PT","price":"","unit":"€/kg","beginDate":"01/03/2023"},
            {"memberStateCode":"PT","price":"n/a","beginDate":"08/03/2023"},
            {"memberStateCode":"ES","price":"12,5 €","unit":"€/kg"},
            {"memberStateCode":"ES","year":2023}
        ]);
        let batch = Pipeline::default().process(&input).unwrap();
        let summary = &batch.summary;

        assert_eq!(summary.input_count, 4);
        assert_eq!(summary.unparseable_prices, 2);
        assert_eq!(summary.missing_prices, 1);
        assert_eq!(summary.unknown_units, 1);
        assert_eq!(summary.converted_units, 1);
        assert_eq!(summary.unresolved_times, 2);
        assert!(summary.mixed_currency_formats);
        // Records without a time point stay in the table.
        assert_eq!(batch.records.len(), 4);
        assert_eq!(batch.timed_records().count(), 2);
    }

    #[test]
    fn test_blank_price_does_not_mix_currency_formats() {
        let input = json!([
            {"memberStateCode":"PT","price":"45,20 €","unit":"€/kg","beginDate":"01/03/2023"},
            {"memberStateCode":"PT","price":"","unit":"€/kg","beginDate":"08/03/2023"}
        ]);
        let summary = Pipeline::default().process(&input).unwrap().summary;
        assert_eq!(summary.unparseable_prices, 1);
        assert!(!summary.mixed_currency_formats);
    }

    #[test]
    fn test_mean_mode_fills_blank_price_with_converted_one() {
        let mut config = Config::default();
        config.dedup.mode = DedupMode::Mean;
        let input = json!([
            {"memberStateCode":"PT","price":"","unit":"€/kg","beginDate":"01/03/2023"},
            {"memberStateCode":"PT","price":"0,8","unit":"€/kg","beginDate":"01/03/2023"}
        ]);
        let batch = Pipeline::new(&config).process(&input).unwrap();

        assert_eq!(batch.records.len(), 1);
        assert_relative_eq!(batch.records[0].price_value.unwrap(), 80.0, epsilon = 1e-9);
        assert!(batch.records[0].conversion_applied);
        // Counts describe the input, before duplicates are merged.
        assert_eq!(batch.summary.unparseable_prices, 1);
        assert_eq!(batch.summary.converted_units, 1);
    }

    #[test]
    fn test_normalization_ignores_other_records() {
        let pipeline = Pipeline::default();
        let raw = RawRecord::new()
            .with("memberStateCode", "PT")
            .with("price", "45,20 €")
            .with("unit", "EUR/kg")
            .with("beginDate", "01/03/2023");
        let alone = pipeline.process_records(std::slice::from_ref(&raw));
        let with_others = pipeline.process_records(&[
            raw.clone(),
            RawRecord::new().with("memberStateCode", "DE").with("price", "1"),
        ]);
        assert_eq!(alone.records[0], with_others.records[0]);
        assert_eq!(pipeline.normalize_record(&raw), pipeline.normalize_record(&raw));
    }

    #[test]
    fn test_mean_mode_from_config() {
        let mut config = Config::default();
        config.dedup.mode = DedupMode::Mean;
        let input = json!([
            {"memberStateCode":"PT","price":"1,00","unit":"€/kg","beginDate":"01/03/2023"},
            {"memberStateCode":"PT","price":"3,00","unit":"€/kg","beginDate":"01/03/2023"}
        ]);
        let batch = Pipeline::new(&config).process(&input).unwrap();
        assert_eq!(batch.summary.duplicates_removed, 1);
        assert_relative_eq!(batch.records[0].price_value.unwrap(), 200.0, epsilon = 1e-9);
    }

    #[test]
    fn test_json_rows_keep_raw_fields() {
        let batch = Pipeline::default()
            .process(&json!([{"memberStateCode":"PT","price":"2,5","unit":"€/kg","beginDate":"01/03/2023"}]))
            .unwrap();
        let rows = batch.to_json_rows();
        assert_eq!(rows[0]["price"], json!("2,5"));
        assert_eq!(rows[0]["unit_canonical"], json!("€/100kg"));
        assert_eq!(rows[0]["time_point"], json!("2023-03-01"));
    }
}
