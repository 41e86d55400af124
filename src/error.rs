//! Failure taxonomy for a reconciliation run.
//!
//! [`ReconError`] covers the fatal conditions that abort a run before any
//! summary or export is produced. [`Warning`] covers the non-fatal ones that
//! are collected next to a valid, possibly reduced, output.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReconError {
    #[error(
        "No common merchant key: none of [{}] appears in both base and current headers",
        .candidates.join(", ")
    )]
    NoCommonKey { candidates: Vec<String> },

    #[error("Key column '{key}' is missing from the {side} table")]
    MissingKeyColumn { key: String, side: Snapshot },

    #[error("Metric field '{field}' could not be resolved in the {period} table")]
    UnresolvedMetricField { field: String, period: Period },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type ReconResult<T> = Result<T, ReconError>;

/// Snapshot a metric column is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Base,
    Current,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Base => "base",
            Period::Current => "current",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the uploaded tables, named in key errors and warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Snapshot {
    Base,
    Current,
    Mapping,
}

impl Snapshot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Snapshot::Base => "base",
            Snapshot::Current => "current",
            Snapshot::Mapping => "mapping",
        }
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// Mapping table has no column named after the resolved key; enrichment skipped.
    MappingKeyAbsent { key: String },
    /// Optional metric field has no matching column in one period; field skipped.
    MetricUnresolved { field: String, period: Period },
    /// Extra rows sharing a key value; only the first row was kept.
    DuplicateKey {
        table: Snapshot,
        key: String,
        extra_rows: usize,
    },
    /// Rows with an empty key cell were dropped.
    BlankKeys { table: Snapshot, rows: usize },
    /// Filter attribute is not a column of the reconciled table; no restriction applied.
    FilterAttributeAbsent { attribute: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MappingKeyAbsent { key } => write!(
                f,
                "Mapping table has no '{key}' column; skipping mapping enrichment"
            ),
            Self::MetricUnresolved { field, period } => write!(
                f,
                "Metric field '{field}' not found in the {period} table; skipping it"
            ),
            Self::DuplicateKey {
                table,
                key,
                extra_rows,
            } => write!(
                f,
                "Key '{key}' repeats in the {table} table; ignored {extra_rows} extra row(s)"
            ),
            Self::BlankKeys { table, rows } => {
                write!(f, "Dropped {rows} row(s) with a blank key in the {table} table")
            }
            Self::FilterAttributeAbsent { attribute } => write!(
                f,
                "Filter attribute '{attribute}' is not a reconciled column; showing all records"
            ),
        }
    }
}
