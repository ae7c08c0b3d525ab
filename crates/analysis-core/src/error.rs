use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Input files are missing or unreadable. Analysis for the symbol cannot proceed.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Required input not found: {}", path.display())]
    Missing { path: PathBuf },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid CSV in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed row in {} at line {line}: {reason}", path.display())]
    Malformed {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("Duplicate date {date} in {}", path.display())]
    DuplicateDate { path: PathBuf, date: NaiveDate },

    #[error("No price rows in {}", path.display())]
    Empty { path: PathBuf },
}

/// Degenerate inputs to the valuation model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValuationError {
    #[error("Terminal value diverges: WACC {wacc} must exceed terminal growth {terminal_growth}")]
    NonConvergentTerminal { wacc: f64, terminal_growth: f64 },

    #[error("Current price must be positive, got {0}")]
    NonPositivePrice(f64),

    #[error("Invalid assumption: {0}")]
    InvalidAssumption(String),
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Valuation error: {0}")]
    Valuation(#[from] ValuationError),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),
}
