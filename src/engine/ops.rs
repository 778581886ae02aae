//! Stateless binary arithmetic on decimal text.

use super::error::EngineError;
use crate::decimal::{codec, context, Context, Decimal, DecimalResult, Status};
use tracing::trace;

/// A binary decimal operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    /// Lower-case operator name, as used in command names.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
        }
    }

    /// Applies the operator to two parsed values.
    pub fn evaluate(
        &self,
        lhs: &Decimal,
        rhs: &Decimal,
        ctx: &Context,
        status: &mut Status,
    ) -> DecimalResult<Decimal> {
        match self {
            Self::Add => lhs.add(rhs, ctx, status),
            Self::Sub => lhs.sub(rhs, ctx, status),
            Self::Mul => lhs.mul(rhs, ctx, status),
            Self::Div => lhs.div(rhs, ctx, status),
        }
    }
}

/// Parses both operands, applies `op` under the process-wide context and
/// formats the result.
pub fn apply(op: BinaryOp, lhs: &[u8], rhs: &[u8]) -> Result<String, EngineError> {
    apply_in(op, lhs, rhs, context::current())
}

/// Same as [`apply`], under an explicit context.
pub fn apply_in(op: BinaryOp, lhs: &[u8], rhs: &[u8], ctx: &Context) -> Result<String, EngineError> {
    let mut status = Status::default();

    let lhs = codec::parse_in(lhs, 0, ctx, &mut status)?;
    let rhs = codec::parse_in(rhs, 0, ctx, &mut status)?;
    let result = op.evaluate(&lhs, &rhs, ctx, &mut status);

    if !status.is_empty() {
        trace!(op = op.name(), ?status, "Decimal operation status");
    }
    Ok(codec::format(&result?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::DecimalError;

    fn run(op: BinaryOp, lhs: &str, rhs: &str) -> Result<String, EngineError> {
        apply(op, lhs.as_bytes(), rhs.as_bytes())
    }

    #[test]
    fn test_add_sub() {
        assert_eq!(run(BinaryOp::Add, "1.1", "2.2"), Ok("3.3".to_string()));
        assert_eq!(run(BinaryOp::Add, "10.5", "0.25"), Ok("10.75".to_string()));
        assert_eq!(run(BinaryOp::Sub, "1", "3"), Ok("-2".to_string()));
        assert_eq!(run(BinaryOp::Sub, "0.3", "0.1"), Ok("0.2".to_string()));
    }

    #[test]
    fn test_mul() {
        assert_eq!(run(BinaryOp::Mul, "1.5", "2"), Ok("3.0".to_string()));
        assert_eq!(run(BinaryOp::Mul, "-0.5", "0.5"), Ok("-0.25".to_string()));
    }

    #[test]
    fn test_div() {
        assert_eq!(run(BinaryOp::Div, "10", "4"), Ok("2.5".to_string()));
        assert_eq!(run(BinaryOp::Div, "1", "3"), Ok(format!("0.{}", "3".repeat(34))));
        // Truncated, never rounded up to ...7
        assert_eq!(run(BinaryOp::Div, "2", "3"), Ok(format!("0.{}", "6".repeat(34))));
        assert_eq!(run(BinaryOp::Div, "0", "5"), Ok("0".to_string()));
    }

    #[test]
    fn test_div_by_zero() {
        assert_eq!(
            run(BinaryOp::Div, "5", "0"),
            Err(EngineError::Decimal(DecimalError::DivisionByZero))
        );
        assert_eq!(
            run(BinaryOp::Div, "5", "-0.000"),
            Err(EngineError::Decimal(DecimalError::DivisionByZero))
        );
    }

    #[test]
    fn test_conversion_checked_before_arithmetic() {
        let err = run(BinaryOp::Div, "abc", "0").unwrap_err();
        assert!(err.is_conversion());

        let err = run(BinaryOp::Add, "1", "1,5").unwrap_err();
        assert!(err.is_conversion());
    }

    #[test]
    fn test_overflow() {
        assert_eq!(
            run(BinaryOp::Mul, "9e6144", "10"),
            Err(EngineError::Decimal(DecimalError::Overflow))
        );
    }

    #[test]
    fn test_names() {
        assert_eq!(BinaryOp::Add.name(), "add");
        assert_eq!(BinaryOp::Div.name(), "div");
    }
}
