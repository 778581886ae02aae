//! Engine errors

use crate::decimal::DecimalError;
use crate::storage::StoreError;
use thiserror::Error;

/// Errors returned by the decimal engine.
///
/// Store errors are passed through unchanged so callers can report them
/// verbatim.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Decimal(#[from] DecimalError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    /// Returns true if a stored value or an argument was not a decimal.
    pub fn is_conversion(&self) -> bool {
        matches!(self, Self::Decimal(err) if err.is_conversion())
    }
}
