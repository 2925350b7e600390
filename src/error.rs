//! Error types for every stage of the pipeline.
//!
//! Fatal errors ([`ConnectionError`], [`DdlError`], [`ImportError`], [`QueryError`],
//! [`ConfigError`]) abort the run. [`RowError`] is never fatal: the import pipeline records it
//! against the offending source line and moves on to the next record.

use crate::config::AttemptHistory;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to open or prepare a session against the target schema.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The schema (database file) does not exist. Recovered once by creating it.
    #[error("schema `{schema}` does not exist at {}", path.display())]
    SchemaMissing { schema: String, path: PathBuf },

    #[error("failed to open session `{url}`: {source}")]
    Open {
        url: String,
        #[source]
        source: diesel::ConnectionError,
    },

    #[error("failed to create schema `{schema}`: {reason}")]
    CreateSchema { schema: String, reason: String },

    #[error("failed to prepare session: {0}")]
    Setup(#[from] diesel::result::Error),
}

/// Step of a schema reset in which a statement failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DdlStep {
    Drop,
    Create,
}

/// A DDL statement failed; the whole reset was rolled back.
#[derive(Debug, Error)]
pub enum DdlError {
    #[error("schema reset failed at {step:?} `{table}`: {source}")]
    Statement {
        table: &'static str,
        step: DdlStep,
        #[source]
        source: diesel::result::Error,
    },

    #[error("schema reset transaction failed: {0}")]
    Transaction(#[from] diesel::result::Error),
}

/// A single source record could not be mapped to its table's columns.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("expected at least {expected} fields, found {found}")]
    MissingField { expected: usize, found: usize },

    #[error("`{column}` is empty")]
    Empty { column: &'static str },

    #[error("`{column}` is longer than {max} characters")]
    TooLong { column: &'static str, max: usize },

    #[error("`{column}`: `{value}` is not an integer")]
    InvalidInteger { column: &'static str, value: String },

    #[error("`{column}`: {value} is outside {min}..={max}")]
    OutOfRange {
        column: &'static str,
        value: i64,
        min: i32,
        max: i32,
    },

    #[error("`{column}`: `{value}` is not a YYYY-MM-DD date")]
    InvalidDate { column: &'static str, value: String },

    #[error("`{column}`: `{value}` is not one of {allowed:?}")]
    UnknownToken {
        column: &'static str,
        value: String,
        allowed: &'static [&'static str],
    },
}

/// A fatal failure of the reload; the transaction has been rolled back.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to open source {}: {source}", path.display())]
    OpenSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read `{source_name}` near line {line}: {reason}")]
    ReadSource {
        source_name: String,
        line: u64,
        reason: String,
    },

    #[error("no source registered for `{0}`")]
    MissingSource(&'static str),

    #[error(
        "academic_performance is keyed by ({found}) but attempt history `{configured:?}` needs \
         ({expected}); reset the schema with the same setting"
    )]
    AttemptHistoryMismatch {
        configured: AttemptHistory,
        expected: String,
        found: String,
    },

    #[error("database error while importing: {0}")]
    Database(#[from] diesel::result::Error),
}

/// The stipend query failed. No partial results are returned.
#[derive(Debug, Error)]
#[error("stipend query failed: {0}")]
pub struct QueryError(#[from] pub diesel::result::Error);

/// Configuration could not be loaded or is invalid.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
