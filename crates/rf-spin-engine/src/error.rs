//! Error types for the spin engine

use thiserror::Error;

use crate::symbols::SymbolMode;

/// Wager rejected before any spin state is touched
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WagerError {
    #[error("Wager must be positive")]
    NonPositive,

    #[error("Wager {requested} exceeds the maximum of {max}")]
    ExceedsMax { requested: u64, max: u64 },

    #[error("Wager {requested} exceeds the available balance of {balance}")]
    ExceedsBalance { requested: u64, balance: u64 },
}

/// Failure reported by an external collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Service returned {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

/// Inconsistent engine configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Symbol {symbol} does not belong to the {mode} set")]
    ForeignSymbol { symbol: String, mode: SymbolMode },

    #[error("Weighted pool for {mode} mode: {reason}")]
    Weights { mode: SymbolMode, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yml::Error),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Result type alias for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type alias for collaborator calls
pub type ServiceResult<T> = Result<T, ServiceError>;
