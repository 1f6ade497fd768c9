use rust_decimal::Decimal;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

/// Error taxonomy for the money core.
///
/// `InsufficientFunds` and `SignatureMismatch` are expected, recoverable
/// outcomes the caller acts on. `TransferFailed` is only ever raised after the
/// first leg of a cross-wallet transfer has been compensated.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        requested: Decimal,
        available: Decimal,
    },

    #[error("payment signature mismatch")]
    SignatureMismatch,

    #[error("transfer failed and was rolled back: {0}")]
    TransferFailed(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}
