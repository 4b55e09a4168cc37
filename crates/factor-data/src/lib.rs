#![deny(warnings)]

//! Static cost factor datasets.
//!
//! A dataset is a JSON document holding a list of factor records and,
//! optionally, replacement values for the conservative fallback. The crate
//! ships one embedded dataset and can load others from disk.

use cost_core::{validate_factor, CostFactor, FactorValues, ValidationError};
use cost_engine::FactorTable;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

const EMBEDDED: &str = include_str!("../data/factors.json");

#[derive(Debug, Error)]
pub enum DataError {
    #[error("io error: {0}")]
    Io(String),
    #[error("invalid dataset json: {0}")]
    Json(String),
    #[error("invalid record {index} ({country}): {source}")]
    InvalidRecord {
        index: usize,
        country: String,
        source: ValidationError,
    },
}

impl From<std::io::Error> for DataError {
    fn from(e: std::io::Error) -> Self {
        DataError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for DataError {
    fn from(e: serde_json::Error) -> Self {
        DataError::Json(e.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct Dataset {
    #[serde(default)]
    version: u32,
    factors: Vec<CostFactor>,
    /// Replaces the engine's conservative defaults when present.
    #[serde(default)]
    fallback: Option<FactorValues>,
}

/// Parse and validate a dataset into a resolver table.
pub fn load_table_from_str(text: &str) -> Result<FactorTable, DataError> {
    let data: Dataset = serde_json::from_str(text)?;
    for (index, f) in data.factors.iter().enumerate() {
        validate_factor(f).map_err(|source| DataError::InvalidRecord {
            index,
            country: f.country.to_string(),
            source,
        })?;
    }
    debug!(version = data.version, records = data.factors.len(), "factor dataset parsed");
    let table = FactorTable::new(data.factors);
    Ok(match data.fallback {
        Some(fallback) => table.with_fallback(fallback),
        None => table,
    })
}

/// Load a dataset file.
pub fn load_table_from_path(path: impl AsRef<Path>) -> Result<FactorTable, DataError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let table = load_table_from_str(&text)?;
    info!(path = %path.display(), records = table.len(), "factor dataset loaded");
    Ok(table)
}

/// The dataset compiled into the crate.
pub fn embedded_table() -> Result<FactorTable, DataError> {
    load_table_from_str(EMBEDDED)
}
