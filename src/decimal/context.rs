//! Numeric Context
//!
//! Every decimal operation in bnkv runs under one process-wide [`Context`]:
//! 34 significant digits, truncation toward zero and the exponent limits of
//! the IEEE 754 `decimal128` interchange format.
//!
//! The context is installed exactly once (see [`init`]) and is read-only
//! afterwards. Conversion and arithmetic status is *not* stored in the
//! context: each call fills its own [`Status`] value, so concurrent
//! invocations never observe each other's flags.

use std::fmt;
use std::sync::OnceLock;
use tracing::debug;

/// Significant digits retained by `decimal128`.
pub const DECIMAL128_PRECISION: usize = 34;

/// Largest adjusted exponent of `decimal128`.
pub const DECIMAL128_EMAX: i64 = 6144;

/// Smallest normal adjusted exponent of `decimal128`.
pub const DECIMAL128_EMIN: i64 = -6143;

/// Longest textual literal the codec accepts.
///
/// Stored values are read into dynamically sized buffers, so this is the
/// only bound on the length of a decimal's textual form.
pub const MAX_LITERAL_LEN: usize = 4096;

static CONTEXT: OnceLock<Context> = OnceLock::new();

/// Rounding rule applied when a result has more digits than the context keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rounding {
    /// Truncate toward zero. This is the rule bnkv runs with.
    Down,
    /// Round to nearest, ties to even.
    HalfEven,
}

impl Rounding {
    /// Returns a human-readable description of the rounding rule.
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Down => "round toward zero",
            Self::HalfEven => "round half to even",
        }
    }
}

/// Precision, rounding and exponent limits for decimal arithmetic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    /// Maximum number of significant digits of any result
    pub precision: usize,
    /// Rounding rule for results that exceed `precision`
    pub rounding: Rounding,
    /// Largest adjusted exponent
    pub emax: i64,
    /// Smallest adjusted exponent of a normal number
    pub emin: i64,
    /// Fold exponents above `etop()` down by padding the coefficient
    pub clamp: bool,
    /// Longest literal accepted by the codec, in bytes
    pub max_literal_len: usize,
}

impl Context {
    /// The `decimal128` context with truncating rounding.
    pub const fn decimal128() -> Self {
        Self {
            precision: DECIMAL128_PRECISION,
            rounding: Rounding::Down,
            emax: DECIMAL128_EMAX,
            emin: DECIMAL128_EMIN,
            clamp: true,
            max_literal_len: MAX_LITERAL_LEN,
        }
    }

    /// Returns a copy of this context using a different rounding rule.
    pub fn with_rounding(mut self, rounding: Rounding) -> Self {
        self.rounding = rounding;
        self
    }

    /// Returns a copy of this context with a different precision.
    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision.max(1);
        self
    }

    /// Smallest exponent a subnormal result may carry.
    pub fn etiny(&self) -> i64 {
        self.emin - (self.precision as i64 - 1)
    }

    /// Largest exponent a finite result may carry when clamping is enabled.
    pub fn etop(&self) -> i64 {
        self.emax - (self.precision as i64 - 1)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::decimal128()
    }
}

/// Installs the process-wide context and returns it.
///
/// The first call builds the `decimal128` context; later calls return the
/// same instance. Call this once at startup before serving requests.
pub fn init() -> &'static Context {
    CONTEXT.get_or_init(|| {
        let ctx = Context::decimal128();
        debug!(
            precision = ctx.precision,
            rounding = ctx.rounding.description(),
            emax = ctx.emax,
            emin = ctx.emin,
            "Numeric context initialized"
        );
        ctx
    })
}

/// Returns the process-wide context, installing it if needed.
pub fn current() -> &'static Context {
    CONTEXT.get().unwrap_or_else(init)
}

/// Conditions raised while converting or computing a single value.
///
/// A fresh `Status` is used for every invocation.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Status(u32);

impl Status {
    pub const CONVERSION_SYNTAX: Status = Status(1 << 0);
    pub const INEXACT: Status = Status(1 << 1);
    pub const ROUNDED: Status = Status(1 << 2);
    pub const CLAMPED: Status = Status(1 << 3);
    pub const SUBNORMAL: Status = Status(1 << 4);
    pub const UNDERFLOW: Status = Status(1 << 5);
    pub const OVERFLOW: Status = Status(1 << 6);
    pub const DIVISION_BY_ZERO: Status = Status(1 << 7);
    pub const INVALID_OPERATION: Status = Status(1 << 8);

    const NAMES: [(Status, &'static str); 9] = [
        (Self::CONVERSION_SYNTAX, "ConversionSyntax"),
        (Self::INEXACT, "Inexact"),
        (Self::ROUNDED, "Rounded"),
        (Self::CLAMPED, "Clamped"),
        (Self::SUBNORMAL, "Subnormal"),
        (Self::UNDERFLOW, "Underflow"),
        (Self::OVERFLOW, "Overflow"),
        (Self::DIVISION_BY_ZERO, "DivisionByZero"),
        (Self::INVALID_OPERATION, "InvalidOperation"),
    ];

    /// Sets the given flags.
    #[inline]
    pub fn insert(&mut self, flags: Status) {
        self.0 |= flags.0;
    }

    /// Returns true if every flag in `flags` is set.
    #[inline]
    pub fn contains(&self, flags: Status) -> bool {
        self.0 & flags.0 == flags.0
    }

    /// Returns true if no flag is set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Clears every flag.
    #[inline]
    pub fn clear(&mut self) {
        self.0 = 0;
    }
}

impl std::ops::BitOr for Status {
    type Output = Status;

    fn bitor(self, rhs: Status) -> Status {
        Status(self.0 | rhs.0)
    }
}

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "[{}]", names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal128_limits() {
        let ctx = Context::decimal128();
        assert_eq!(ctx.precision, 34);
        assert_eq!(ctx.rounding, Rounding::Down);
        assert_eq!(ctx.etiny(), -6176);
        assert_eq!(ctx.etop(), 6111);
        assert!(ctx.clamp);
    }

    #[test]
    fn test_init_is_idempotent() {
        let first = init() as *const Context;
        let second = init() as *const Context;
        assert_eq!(first, second);
        assert_eq!(current(), &Context::decimal128());
    }

    #[test]
    fn test_status_flags() {
        let mut status = Status::default();
        assert!(status.is_empty());

        status.insert(Status::INEXACT | Status::ROUNDED);
        assert!(status.contains(Status::INEXACT));
        assert!(status.contains(Status::ROUNDED));
        assert!(!status.contains(Status::OVERFLOW));
        assert_eq!(format!("{:?}", status), "[Inexact, Rounded]");

        status.clear();
        assert!(status.is_empty());
    }

    #[test]
    fn test_with_precision_never_zero() {
        let ctx = Context::decimal128().with_precision(0);
        assert_eq!(ctx.precision, 1);
    }
}
