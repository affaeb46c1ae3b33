//! # Load Math
//!
//! Numeric kernels shared by the load-series repair pipeline and the
//! forecasting models. Everything here works on plain `f64` slices so the
//! higher-level crates stay free of numeric bookkeeping.

use thiserror::Error;

pub mod least_squares;
pub mod optimize;
pub mod statistics;

/// Errors that can occur in numeric routines
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Singular system: {0}")]
    Singular(String),

    #[error("Optimizer did not converge after {iterations} iterations (spread {spread:e})")]
    NotConverged { iterations: usize, spread: f64 },
}

/// Result type for numeric operations
pub type Result<T> = std::result::Result<T, MathError>;
