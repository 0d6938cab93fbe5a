//! Duplicate removal by natural key.
//!
//! The key is the country code, the resolved time, and whichever
//! product/category fields the batch actually carries. Records sharing a key
//! collapse onto the first one seen in batch order; `DedupMode::Mean`
//! additionally averages the group's prices onto that survivor.

use crate::time_resolver::TimeResolver;
use agrimarket_core::config::{DedupMode, FieldConfig};
use agrimarket_core::{KeyPart, NaturalKey, NormalizedRecord, PriceStatus};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Result of deduplicating one batch.
#[derive(Debug, Clone, Default)]
pub struct DedupOutcome {
    /// Surviving records in original batch order.
    pub records: Vec<NormalizedRecord>,
    /// Key of every dropped record, in batch order.
    pub removed_keys: Vec<NaturalKey>,
}

impl DedupOutcome {
    /// Number of dropped records.
    pub fn removed_count(&self) -> usize {
        self.removed_keys.len()
    }
}

/// Running sum of the same-unit prices merged onto one survivor.
#[derive(Debug, Clone, Copy, Default)]
struct PriceTotal {
    sum: f64,
    count: usize,
    converted: bool,
}

impl PriceTotal {
    fn add(&mut self, record: &NormalizedRecord) {
        if let Some(price) = record.price_value {
            self.sum += price;
            self.count += 1;
            self.converted |= record.conversion_applied;
        }
    }
}

/// Batch-scoped deduplicator.
#[derive(Debug, Clone)]
pub struct Deduplicator {
    country_field: String,
    key_fields: Vec<String>,
    mode: DedupMode,
    time: TimeResolver,
}

impl Deduplicator {
    /// Create a deduplicator.
    ///
    /// `time` supplies the raw time fields keyed on when a record has no
    /// resolved time point.
    pub fn new(fields: &FieldConfig, mode: DedupMode, time: TimeResolver) -> Self {
        Self {
            country_field: fields.country.clone(),
            key_fields: fields.key_fields.clone(),
            mode,
            time,
        }
    }

    /// Configured product/category fields present on at least one record.
    pub fn key_fields_in<'a>(&'a self, records: &[NormalizedRecord]) -> Vec<&'a str> {
        self.key_fields
            .iter()
            .filter(|field| records.iter().any(|r| r.raw.contains(field)))
            .map(String::as_str)
            .collect()
    }

    /// Natural key of one record given the batch's key fields.
    pub fn natural_key(&self, record: &NormalizedRecord, key_fields: &[&str]) -> NaturalKey {
        let mut parts = Vec::with_capacity(2 + key_fields.len());
        parts.push(KeyPart::from_field(record.raw.get(&self.country_field)));

        match record.time_point {
            Some(tp) => parts.push(KeyPart::Date(tp.date)),
            None => parts.extend(
                self.time
                    .raw_time_fields(&record.raw)
                    .into_iter()
                    .map(KeyPart::from_field),
            ),
        }

        parts.extend(
            key_fields
                .iter()
                .map(|field| KeyPart::from_field(record.raw.get(field))),
        );
        NaturalKey(parts)
    }

    /// Deduplicate one batch.
    pub fn dedup(&self, records: Vec<NormalizedRecord>) -> DedupOutcome {
        let key_fields = self.key_fields_in(&records);
        match self.mode {
            DedupMode::KeepFirst => self.keep_first(records, &key_fields),
            DedupMode::Mean => self.mean(records, &key_fields),
        }
    }

    fn keep_first(&self, records: Vec<NormalizedRecord>, key_fields: &[&str]) -> DedupOutcome {
        let mut seen = HashSet::with_capacity(records.len());
        let mut outcome = DedupOutcome::default();

        for record in records {
            let key = self.natural_key(&record, key_fields);
            if seen.contains(&key) {
                debug!(key = %key, "dropping duplicate record");
                outcome.removed_keys.push(key);
            } else {
                seen.insert(key);
                outcome.records.push(record);
            }
        }

        outcome
    }

    fn mean(&self, records: Vec<NormalizedRecord>, key_fields: &[&str]) -> DedupOutcome {
        let mut index: HashMap<NaturalKey, usize> = HashMap::with_capacity(records.len());
        let mut totals: Vec<PriceTotal> = Vec::new();
        let mut outcome = DedupOutcome::default();

        for record in records {
            let key = self.natural_key(&record, key_fields);
            match index.get(&key) {
                Some(&i) => {
                    let survivor = &outcome.records[i];
                    if record.unit_canonical == survivor.unit_canonical {
                        totals[i].add(&record);
                    } else if record.price_value.is_some() {
                        debug!(key = %key, "unit differs from group, price not averaged");
                    }
                    debug!(key = %key, "merging duplicate record");
                    outcome.removed_keys.push(key);
                }
                None => {
                    let mut total = PriceTotal::default();
                    total.add(&record);
                    totals.push(total);
                    index.insert(key, outcome.records.len());
                    outcome.records.push(record);
                }
            }
        }

        for (record, total) in outcome.records.iter_mut().zip(totals) {
            if total.count > 0 {
                record.price_value = Some(total.sum / total.count as f64);
                record.price_status = PriceStatus::Parsed;
                record.conversion_applied = total.converted;
            }
        }

        outcome
    }
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new(&FieldConfig::default(), DedupMode::default(), TimeResolver::default())
    }
}
