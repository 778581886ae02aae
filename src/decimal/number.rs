//! Exact Decimal Values and Arithmetic
//!
//! A [`Decimal`] is `(-1)^sign * coefficient * 10^exponent` with an
//! arbitrary-precision coefficient. Arithmetic is performed exactly and the
//! result is then *finalized* under a [`Context`]:
//!
//! ```text
//!   exact result
//!        │
//!        ▼
//!   ┌────────────────────┐   adjusted > emax      ┌──────────┐
//!   │ exponent checks    │───────────────────────>│ Overflow │
//!   └─────────┬──────────┘                        └──────────┘
//!             │ exponent < etiny: truncate to etiny (subnormal)
//!             ▼
//!   ┌────────────────────┐
//!   │ precision checks   │  more than `precision` digits: round
//!   └─────────┬──────────┘
//!             │ exponent > etop: pad coefficient (clamp)
//!             ▼
//!        finalized value
//! ```
//!
//! Every `Decimal` handed out by this crate has been finalized, so it has at
//! most `precision` significant digits and an exponent within
//! `[etiny, etop]`.

use super::context::{Context, Rounding, Status};
use super::error::{DecimalError, DecimalResult};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use std::cmp::Ordering;

/// An exact base-10 number.
///
/// Equality is representational: `1.0` and `1.00` are different values,
/// which is what makes the textual round trip exact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decimal {
    negative: bool,
    coefficient: BigUint,
    exponent: i64,
}

impl Decimal {
    /// Builds a value from raw parts without finalizing it.
    pub(crate) fn from_parts(negative: bool, coefficient: BigUint, exponent: i64) -> Self {
        Self {
            negative,
            coefficient,
            exponent,
        }
    }

    /// The value `0`.
    pub fn zero() -> Self {
        Self::from_parts(false, BigUint::zero(), 0)
    }

    /// The value `1`.
    pub fn one() -> Self {
        Self::from_parts(false, BigUint::one(), 0)
    }

    /// Returns true if the sign bit is set (this includes `-0`).
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// Returns true if the coefficient is zero, whatever the sign or exponent.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.coefficient.is_zero()
    }

    /// The unsigned coefficient.
    pub fn coefficient(&self) -> &BigUint {
        &self.coefficient
    }

    /// The power of ten the coefficient is scaled by.
    pub fn exponent(&self) -> i64 {
        self.exponent
    }

    /// Number of digits in the coefficient (`0` has one digit).
    pub fn digits(&self) -> usize {
        digit_count(&self.coefficient)
    }

    /// Exponent of the most significant digit.
    pub fn adjusted(&self) -> i64 {
        self.exponent + self.digits() as i64 - 1
    }

    /// Returns the value with its sign flipped.
    pub fn negate(&self) -> Self {
        Self::from_parts(!self.negative, self.coefficient.clone(), self.exponent)
    }

    /// Computes `self + rhs` under `ctx`.
    pub fn add(&self, rhs: &Decimal, ctx: &Context, status: &mut Status) -> DecimalResult<Decimal> {
        self.add_signed(rhs, rhs.negative, ctx, status)
    }

    /// Computes `self - rhs` under `ctx`.
    pub fn sub(&self, rhs: &Decimal, ctx: &Context, status: &mut Status) -> DecimalResult<Decimal> {
        self.add_signed(rhs, !rhs.negative, ctx, status)
    }

    /// Computes `self * rhs` under `ctx`.
    pub fn mul(&self, rhs: &Decimal, ctx: &Context, status: &mut Status) -> DecimalResult<Decimal> {
        Decimal::from_parts(
            self.negative != rhs.negative,
            &self.coefficient * &rhs.coefficient,
            self.exponent + rhs.exponent,
        )
        .finalize(ctx, status)
    }

    /// Computes `self / rhs` under `ctx`.
    ///
    /// An exact quotient keeps the exponent closest to `self.exponent -
    /// rhs.exponent`; an inexact one carries `precision` digits.
    pub fn div(&self, rhs: &Decimal, ctx: &Context, status: &mut Status) -> DecimalResult<Decimal> {
        if rhs.is_zero() {
            if self.is_zero() {
                status.insert(Status::INVALID_OPERATION);
            } else {
                status.insert(Status::DIVISION_BY_ZERO);
            }
            return Err(DecimalError::DivisionByZero);
        }

        let negative = self.negative != rhs.negative;
        let ideal_exponent = self.exponent - rhs.exponent;

        if self.is_zero() {
            return Decimal::from_parts(negative, BigUint::zero(), ideal_exponent)
                .finalize(ctx, status);
        }

        // Scale so the truncated quotient has at least precision + 1 digits.
        let shift = rhs.digits() as i64 - self.digits() as i64 + ctx.precision as i64 + 1;
        let (dividend, divisor) = if shift >= 0 {
            (&self.coefficient * pow10(shift as usize), rhs.coefficient.clone())
        } else {
            (self.coefficient.clone(), &rhs.coefficient * pow10(shift.unsigned_abs() as usize))
        };

        let mut quotient = &dividend / &divisor;
        let remainder = &dividend % &divisor;
        let mut exponent = ideal_exponent - shift;

        if !remainder.is_zero() {
            // The last digit is always rounded away; keep it off 0 and 5 so
            // ties are not mistaken for exact halves.
            let last = &quotient % BigUint::from(10u32);
            if last.is_zero() || last == BigUint::from(5u32) {
                quotient += 1u32;
            }
            status.insert(Status::INEXACT | Status::ROUNDED);
        } else if shift > 0 {
            let (stripped, removed) = strip_trailing_zeros(quotient, shift as usize);
            quotient = stripped;
            exponent += removed as i64;
        }

        Decimal::from_parts(negative, quotient, exponent).finalize(ctx, status)
    }

    /// Returns the value re-expressed with exactly the given exponent.
    ///
    /// Returns `None` if the exponent lies outside `[etiny, etop]` or the
    /// coefficient would need more than `precision` digits.
    pub fn with_exponent(&self, exponent: i64, ctx: &Context, status: &mut Status) -> Option<Decimal> {
        if exponent < ctx.etiny() || exponent > ctx.etop() {
            status.insert(Status::INVALID_OPERATION);
            return None;
        }

        if self.is_zero() {
            return Some(Decimal::from_parts(self.negative, BigUint::zero(), exponent));
        }

        let coefficient = match self.exponent.cmp(&exponent) {
            Ordering::Equal => self.coefficient.clone(),
            Ordering::Greater => {
                let pad = (self.exponent - exponent) as usize;
                if self.digits() + pad > ctx.precision {
                    status.insert(Status::INVALID_OPERATION);
                    return None;
                }
                &self.coefficient * pow10(pad)
            }
            Ordering::Less => {
                let places = (exponent - self.exponent) as usize;
                status.insert(Status::ROUNDED);
                shift_right(&self.coefficient, places, ctx.rounding, status)
            }
        };

        if digit_count(&coefficient) > ctx.precision {
            status.insert(Status::INVALID_OPERATION);
            return None;
        }

        Some(Decimal::from_parts(self.negative, coefficient, exponent))
    }

    /// Rounds and range-checks an exact result under `ctx`.
    pub(crate) fn finalize(mut self, ctx: &Context, status: &mut Status) -> DecimalResult<Decimal> {
        let etiny = ctx.etiny();
        let etop = ctx.etop();

        if self.coefficient.is_zero() {
            let ceiling = if ctx.clamp { etop } else { ctx.emax };
            if self.exponent > ceiling {
                self.exponent = ceiling;
                status.insert(Status::CLAMPED);
            } else if self.exponent < etiny {
                self.exponent = etiny;
                status.insert(Status::CLAMPED);
            }
            return Ok(self);
        }

        let adjusted = self.exponent.saturating_add(self.digits() as i64 - 1);
        if adjusted > ctx.emax {
            status.insert(Status::OVERFLOW | Status::INEXACT | Status::ROUNDED);
            return Err(DecimalError::Overflow);
        }

        if adjusted < ctx.emin {
            status.insert(Status::SUBNORMAL);
            if self.exponent < etiny {
                let places = usize::try_from(etiny - self.exponent).unwrap_or(usize::MAX);
                let mut local = Status::default();
                self.coefficient = shift_right(&self.coefficient, places, ctx.rounding, &mut local);
                self.exponent = etiny;
                status.insert(Status::ROUNDED);
                if local.contains(Status::INEXACT) {
                    status.insert(Status::INEXACT | Status::UNDERFLOW);
                }
                if self.coefficient.is_zero() {
                    status.insert(Status::CLAMPED);
                }
            }
            return Ok(self);
        }

        let digits = self.digits();
        if digits > ctx.precision {
            let places = digits - ctx.precision;
            self.coefficient = shift_right(&self.coefficient, places, ctx.rounding, status);
            self.exponent += places as i64;
            status.insert(Status::ROUNDED);

            // Rounding up 99..9 carries into one more digit.
            if digit_count(&self.coefficient) > ctx.precision {
                self.coefficient = &self.coefficient / BigUint::from(10u32);
                self.exponent += 1;
            }
            if self.adjusted() > ctx.emax {
                status.insert(Status::OVERFLOW | Status::INEXACT);
                return Err(DecimalError::Overflow);
            }
        }

        if ctx.clamp && self.exponent > etop {
            let pad = (self.exponent - etop) as usize;
            self.coefficient = &self.coefficient * pow10(pad);
            self.exponent = etop;
            status.insert(Status::CLAMPED);
        }

        Ok(self)
    }

    fn add_signed(
        &self,
        rhs: &Decimal,
        rhs_negative: bool,
        ctx: &Context,
        status: &mut Status,
    ) -> DecimalResult<Decimal> {
        let exponent = self.exponent.min(rhs.exponent);
        let lhs_coefficient = align(&self.coefficient, self.exponent - exponent);
        let rhs_coefficient = align(&rhs.coefficient, rhs.exponent - exponent);

        let (negative, coefficient) = if self.negative == rhs_negative {
            (self.negative, lhs_coefficient + rhs_coefficient)
        } else {
            match lhs_coefficient.cmp(&rhs_coefficient) {
                Ordering::Greater => (self.negative, lhs_coefficient - rhs_coefficient),
                Ordering::Less => (rhs_negative, rhs_coefficient - lhs_coefficient),
                Ordering::Equal => (false, BigUint::zero()),
            }
        };

        Decimal::from_parts(negative, coefficient, exponent).finalize(ctx, status)
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Self::from_parts(value < 0, BigUint::from(value.unsigned_abs()), 0)
    }
}

/// `10^n`
pub(crate) fn pow10(n: usize) -> BigUint {
    num_traits::pow(BigUint::from(10u32), n)
}

/// Number of decimal digits of `n` (`0` has one digit).
pub(crate) fn digit_count(n: &BigUint) -> usize {
    n.to_string().len()
}

fn align(coefficient: &BigUint, places: i64) -> BigUint {
    if places == 0 || coefficient.is_zero() {
        coefficient.clone()
    } else {
        coefficient * pow10(places as usize)
    }
}

/// Drops `places` low-order digits, rounding per `rounding`.
fn shift_right(coefficient: &BigUint, places: usize, rounding: Rounding, status: &mut Status) -> BigUint {
    if places == 0 {
        return coefficient.clone();
    }

    // Everything is shifted out and the discarded part is below one half.
    if places > digit_count(coefficient) {
        if !coefficient.is_zero() {
            status.insert(Status::INEXACT);
        }
        return BigUint::zero();
    }

    let divisor = pow10(places);
    let quotient = coefficient / &divisor;
    let remainder = coefficient % &divisor;
    if remainder.is_zero() {
        return quotient;
    }

    status.insert(Status::INEXACT);
    match rounding {
        Rounding::Down => quotient,
        Rounding::HalfEven => {
            let twice = remainder * 2u32;
            match twice.cmp(&divisor) {
                Ordering::Greater => quotient + 1u32,
                Ordering::Less => quotient,
                Ordering::Equal => {
                    if (&quotient % BigUint::from(2u32)).is_zero() {
                        quotient
                    } else {
                        quotient + 1u32
                    }
                }
            }
        }
    }
}

/// Removes up to `limit` trailing zeros, returning the value and the count removed.
fn strip_trailing_zeros(mut value: BigUint, limit: usize) -> (BigUint, usize) {
    let ten = BigUint::from(10u32);
    let mut removed = 0;
    while removed < limit && !value.is_zero() && (&value % &ten).is_zero() {
        value = &value / &ten;
        removed += 1;
    }
    (value, removed)
}
