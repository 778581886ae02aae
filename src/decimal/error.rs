//! Decimal conversion and arithmetic errors

use thiserror::Error;

/// Result type for decimal operations.
pub type DecimalResult<T> = Result<T, DecimalError>;

/// Errors raised by the codec and by decimal arithmetic.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecimalError {
    /// The text is not a decimal literal
    #[error("value is not a valid decimal")]
    Conversion,

    /// The text is longer than the context accepts
    #[error("decimal literal too long: {len} bytes (max: {max})")]
    LiteralTooLong { len: usize, max: usize },

    /// Right-hand operand of a division is zero
    #[error("division by zero")]
    DivisionByZero,

    /// Result exponent exceeds the context's emax
    #[error("decimal overflow")]
    Overflow,

    /// The value cannot be represented with the requested fractional digits
    #[error("cannot rescale to {digits} fractional digits")]
    InvalidRescale { digits: i64 },
}

impl DecimalError {
    /// Returns true for the "not a number" family of errors.
    pub fn is_conversion(&self) -> bool {
        matches!(self, Self::Conversion | Self::LiteralTooLong { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(DecimalError::DivisionByZero.to_string(), "division by zero");
        assert_eq!(
            DecimalError::InvalidRescale { digits: 40 }.to_string(),
            "cannot rescale to 40 fractional digits"
        );
    }

    #[test]
    fn test_conversion_family() {
        assert!(DecimalError::Conversion.is_conversion());
        assert!(DecimalError::LiteralTooLong { len: 5000, max: 4096 }.is_conversion());
        assert!(!DecimalError::Overflow.is_conversion());
    }
}
