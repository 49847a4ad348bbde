// src/error.rs
use thiserror::Error;

/// Error types for the jump-sde library
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SdeError {
    /// Invalid parameter values
    #[error("Invalid parameter '{parameter}' = {value}: {constraint}")]
    InvalidParameters {
        parameter: String,
        value: f64,
        constraint: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration for '{field}': {reason}")]
    InvalidConfiguration { field: String, reason: String },

    /// Non-finite intermediate value during simulation or aggregation
    #[error("Numerical instability{}: {reason}", location(.path, .step))]
    NumericalInstability {
        path: Option<usize>,
        step: Option<usize>,
        reason: String,
    },

    /// Cancellation budget reached before the requested path count completed
    #[error("Budget exceeded after {completed} of {requested} paths: {limit}")]
    BudgetExceeded {
        completed: usize,
        requested: usize,
        limit: String,
    },

    /// Malformed configuration file
    #[error("Configuration error: {reason}")]
    Config { reason: String },

    /// Failure writing simulation output
    #[error("Output error: {reason}")]
    Io { reason: String },
}

fn location(path: &Option<usize>, step: &Option<usize>) -> String {
    match (path, step) {
        (Some(p), Some(s)) => format!(" at path {}, step {}", p, s),
        (Some(p), None) => format!(" at path {}", p),
        (None, Some(s)) => format!(" at step {}", s),
        (None, None) => String::new(),
    }
}

impl SdeError {
    /// True for malformed-input failures raised at construction time.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SdeError::InvalidParameters { .. } | SdeError::InvalidConfiguration { .. }
        )
    }

    pub fn is_numerical_instability(&self) -> bool {
        matches!(self, SdeError::NumericalInstability { .. })
    }

    pub fn is_budget_exceeded(&self) -> bool {
        matches!(self, SdeError::BudgetExceeded { .. })
    }

    pub(crate) fn instability(path: usize, step: usize, reason: impl Into<String>) -> Self {
        SdeError::NumericalInstability {
            path: Some(path),
            step: Some(step),
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for SdeError {
    fn from(e: std::io::Error) -> Self {
        SdeError::Io {
            reason: e.to_string(),
        }
    }
}

impl From<csv::Error> for SdeError {
    fn from(e: csv::Error) -> Self {
        SdeError::Io {
            reason: e.to_string(),
        }
    }
}

impl From<toml::de::Error> for SdeError {
    fn from(e: toml::de::Error) -> Self {
        SdeError::Config {
            reason: e.to_string(),
        }
    }
}

/// Result type alias for jump-sde operations
pub type SdeResult<T> = Result<T, SdeError>;

/// Validation utilities
pub mod validation {
    use super::{SdeError, SdeResult};

    /// Validate that a parameter is finite and positive
    pub fn validate_positive(name: &str, value: f64) -> SdeResult<()> {
        validate_finite(name, value)?;
        if value <= 0.0 {
            Err(SdeError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: "must be positive (> 0)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate that a parameter is finite and non-negative
    pub fn validate_non_negative(name: &str, value: f64) -> SdeResult<()> {
        validate_finite(name, value)?;
        if value < 0.0 {
            Err(SdeError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: "must be non-negative (≥ 0)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate that a value is finite and not NaN
    pub fn validate_finite(name: &str, value: f64) -> SdeResult<()> {
        if !value.is_finite() {
            Err(SdeError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: "must be finite (not NaN or infinite)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate paths count
    pub fn validate_paths(paths: usize) -> SdeResult<()> {
        if paths == 0 {
            Err(SdeError::InvalidConfiguration {
                field: "paths".to_string(),
                reason: "must be greater than 0".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate steps count
    pub fn validate_steps(steps: usize) -> SdeResult<()> {
        if steps == 0 {
            Err(SdeError::InvalidConfiguration {
                field: "steps".to_string(),
                reason: "must be greater than 0".to_string(),
            })
        } else {
            Ok(())
        }
    }
}
