//! Error types for the carbon ledger.

use crate::host::Principal;
use crate::product::ProductId;
use thiserror::Error;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors raised by ledger operations and the CLI around them.
///
/// Every ledger operation validates before it writes, so returning any of
/// these leaves the ledger state untouched.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Operation reserved for the ledger owner
    #[error("{caller} is not the ledger owner")]
    OwnerOnly { caller: Principal },

    /// Referenced record does not exist
    #[error("{kind} {key} not found")]
    NotFound { kind: &'static str, key: String },

    /// Caller lacks the identity or capability the operation requires
    #[error("{caller} is not authorized to {action}")]
    Unauthorized {
        caller: Principal,
        action: &'static str,
    },

    /// Record already exists and cannot be created again
    #[error("{kind} {key} already exists")]
    AlreadyExists { kind: &'static str, key: String },

    /// Argument out of range (zero where positive is required, overflow)
    #[error("invalid {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },

    /// Role outside the allowed set
    #[error("invalid role '{0}' (expected 1=manufacturer, 2=logistics, 3=retailer)")]
    InvalidRole(String),

    /// Caller is not a registered manufacturer
    #[error("{caller} is not a registered manufacturer")]
    NotManufacturer { caller: Principal },

    /// Product is finalized and no longer accepts this operation
    #[error("product {product_id} is finalized")]
    ProductFinalized { product_id: ProductId },

    /// Product must be finalized first
    #[error("product {product_id} is not finalized")]
    ProductNotFinalized { product_id: ProductId },

    /// Transfer source does not hold the ownership token
    #[error("{claimed} does not own the token for product {product_id}")]
    NotTokenOwner {
        product_id: ProductId,
        claimed: Principal,
    },

    /// Settlement primitive refused the funds transfer
    #[error("funds transfer of {amount} failed: {reason}")]
    TransferFailed { amount: u128, reason: String },

    /// Failed to open or read the input file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing or writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid command record
    #[error("Invalid command at row {row}: {message}")]
    InvalidRecord { row: usize, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Missing input file argument
    #[error(
        "Missing input file argument. Usage: carbon-ledger <commands.csv> [products|consumers]"
    )]
    MissingArgument,
}

impl LedgerError {
    pub(crate) fn not_found(kind: &'static str, key: impl ToString) -> Self {
        LedgerError::NotFound {
            kind,
            key: key.to_string(),
        }
    }

    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        LedgerError::InvalidValue {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn unauthorized(caller: &Principal, action: &'static str) -> Self {
        LedgerError::Unauthorized {
            caller: caller.clone(),
            action,
        }
    }
}
