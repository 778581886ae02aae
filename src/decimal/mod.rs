//! Decimal Module
//!
//! Exact decimal numbers and their textual encoding.
//!
//! ## Components
//!
//! - `context`: The fixed numeric context (precision, rounding, exponent limits)
//! - `number`: The [`Decimal`] value type and its arithmetic
//! - `codec`: Parsing, formatting and rescaling of decimal text
//! - `error`: Conversion and arithmetic errors

pub mod codec;
pub mod context;
pub mod error;
pub mod number;

pub use codec::{format, parse, parse_in, rescale, rescale_in};
pub use context::{Context, Rounding, Status};
pub use error::{DecimalError, DecimalResult};
pub use number::Decimal;
