//! Error types for the ledger adapter

use rf_spin_engine::ServiceError;
use thiserror::Error;

/// Error type for bot service calls
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("failed: {status}: {body}")]
    FailedWithBody {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid URL scheme: {0} (expected http or https)")]
    InvalidScheme(String),

    #[error("API key is not a valid header value")]
    InvalidApiKey,
}

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

impl From<LedgerError> for ServiceError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Reqwest(e) if e.is_decode() => ServiceError::Decode(e.to_string()),
            LedgerError::Reqwest(e) if e.is_timeout() || e.is_connect() => {
                ServiceError::Unavailable(e.to_string())
            }
            LedgerError::Reqwest(e) => ServiceError::Transport(e.to_string()),
            LedgerError::FailedWithBody { status, body } => ServiceError::Status {
                code: status.as_u16(),
                body,
            },
            other => ServiceError::Transport(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let err = LedgerError::FailedWithBody {
            status: reqwest::StatusCode::BAD_GATEWAY,
            body: "upstream".into(),
        };
        assert_eq!(
            ServiceError::from(err),
            ServiceError::Status {
                code: 502,
                body: "upstream".into()
            }
        );
    }

    #[test]
    fn test_config_errors_are_transport() {
        let err = LedgerError::InvalidScheme("ftp".into());
        assert!(matches!(ServiceError::from(err), ServiceError::Transport(_)));
    }
}
