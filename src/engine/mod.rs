//! Decimal Engine Module
//!
//! Decimal arithmetic on top of the store.
//!
//! ## Components
//!
//! - `ops`: Stateless binary operators (`add`, `sub`, `mul`, `div`) on decimal text
//! - `rmw`: [`DecimalEngine`], which reads, increments and rescales stored decimals
//! - `error`: [`EngineError`], the union of decimal and store errors

pub mod error;
pub mod ops;
pub mod rmw;

pub use error::EngineError;
pub use ops::{apply, apply_in, BinaryOp};
pub use rmw::{DecimalEngine, Sign};
