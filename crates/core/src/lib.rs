//! Core types and configuration for the agrimarket cleaning pipeline.
//!
//! This crate provides shared types used across all other crates:
//! - Raw and normalized market records
//! - Batch summary and natural keys
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
