//! Batch ingestion and normalization for the agrimarket pipeline.
//!
//! This crate handles:
//! - Batch shape decoding (array, single object, empty)
//! - Price parsing and unit conversion
//! - Time axis resolution (date, year+week, year+month)
//! - Duplicate removal by natural key
//! - Response caching with explicit expiry

pub mod batch;
pub mod cache;
pub mod dedup;
pub mod normalizer;
pub mod pipeline;
pub mod time_resolver;

pub use batch::{decode_batch, decode_batch_str};
pub use cache::{CacheKey, ResponseCache};
pub use dedup::{DedupOutcome, Deduplicator};
pub use normalizer::{parse_price, RecordNormalizer};
pub use pipeline::{Pipeline, ProcessedBatch};
pub use time_resolver::TimeResolver;
