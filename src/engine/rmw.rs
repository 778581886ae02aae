//! Read-Modify-Write Decimal Engine
//!
//! [`DecimalEngine`] reads decimal text from a [`StoreClient`], does exact
//! arithmetic on it and writes the canonical result back.
//!
//! ## Increment Cycle
//!
//! ```text
//!   increment(key, delta, sign)
//!        │
//!        ▼
//!   StoreClient::update(key) ─── no other writer touches `key` ───┐
//!        │                                                         │
//!        ├─ absent      → 0                                        │
//!        ├─ malformed   → conversion error, nothing written        │
//!        └─ value       → value ± delta → format → write ──────────┘
//! ```
//!
//! Absence and malformed data are never confused: a missing key counts as
//! zero, a key holding anything that is not a decimal is an error.

use super::error::EngineError;
use super::ops::{self, BinaryOp};
use crate::decimal::{codec, context, Context, Decimal, Status};
use crate::storage::{KeyRef, StoreClient};
use bytes::Bytes;
use tracing::trace;

/// Direction of an increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sign {
    Plus,
    Minus,
}

/// Decimal operations over a store.
#[derive(Debug, Clone)]
pub struct DecimalEngine<S> {
    store: S,
    context: Context,
}

impl<S: StoreClient> DecimalEngine<S> {
    /// Creates an engine running under the process-wide context.
    pub fn new(store: S) -> Self {
        Self::with_context(store, context::current().clone())
    }

    /// Creates an engine running under an explicit context.
    pub fn with_context(store: S, context: Context) -> Self {
        Self { store, context }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Reads the decimal at `key`, rescaled to `fractional_digits` when that
    /// is non-zero.
    ///
    /// Returns `Ok(None)` if the key is absent. Never writes.
    pub fn get(&self, key: &KeyRef<'_>, fractional_digits: i64) -> Result<Option<String>, EngineError> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };

        let mut status = Status::default();
        let value = codec::parse_in(&raw, fractional_digits, &self.context, &mut status);
        trace_status("get", key, status);
        Ok(Some(codec::format(&value?)))
    }

    /// Adds (or subtracts) `delta` to the value at `key` and stores the result.
    ///
    /// An absent key counts as zero. Returns the stored text.
    pub fn increment(&self, key: &KeyRef<'_>, delta: &Decimal, sign: Sign) -> Result<String, EngineError> {
        let mut status = Status::default();

        let result = self.store.update(key, |current| -> Result<(Bytes, String), EngineError> {
            let current = match current {
                Some(raw) => codec::parse_in(raw, 0, &self.context, &mut status)?,
                None => Decimal::zero(),
            };
            let next = match sign {
                Sign::Plus => current.add(delta, &self.context, &mut status)?,
                Sign::Minus => current.sub(delta, &self.context, &mut status)?,
            };

            let text = codec::format(&next);
            Ok((Bytes::from(text.clone()), text))
        });

        trace_status("increment", key, status);
        result
    }

    /// Parses `delta` and increments by it.
    ///
    /// A malformed delta fails before the store is touched.
    pub fn increment_by(&self, key: &KeyRef<'_>, delta: &[u8], sign: Sign) -> Result<String, EngineError> {
        let mut status = Status::default();
        let delta = codec::parse_in(delta, 0, &self.context, &mut status)?;
        self.increment(key, &delta, sign)
    }

    /// Rescales decimal text to `fractional_digits` digits after the point.
    pub fn fixed_point(&self, text: &[u8], fractional_digits: i64) -> Result<String, EngineError> {
        let mut status = Status::default();
        let value = codec::parse_in(text, 0, &self.context, &mut status)?;
        let fixed = codec::rescale_in(&value, fractional_digits, &self.context, &mut status)?;
        Ok(codec::format(&fixed))
    }

    /// Applies a binary operator to two decimal texts.
    pub fn apply(&self, op: BinaryOp, lhs: &[u8], rhs: &[u8]) -> Result<String, EngineError> {
        ops::apply_in(op, lhs, rhs, &self.context)
    }
}

fn trace_status(operation: &'static str, key: &KeyRef<'_>, status: Status) {
    if !status.is_empty() {
        trace!(operation, key = %key, ?status, "Decimal status");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::DecimalError;
    use crate::storage::{StorageEngine, StoreError};
    use std::sync::Arc;

    fn engine() -> DecimalEngine<Arc<StorageEngine>> {
        DecimalEngine::new(Arc::new(StorageEngine::new()))
    }

    fn seed(engine: &DecimalEngine<Arc<StorageEngine>>, key: &str, value: &str) {
        StorageEngine::set(engine.store(), Bytes::from(key.to_string()), Bytes::from(value.to_string()))
            .unwrap();
    }

    fn stored(engine: &DecimalEngine<Arc<StorageEngine>>, key: &[u8]) -> Option<Bytes> {
        StorageEngine::get(engine.store(), key).unwrap()
    }

    /// A store whose every call fails.
    struct FailingStore;

    impl StoreClient for FailingStore {
        fn get(&self, _key: &KeyRef<'_>) -> Result<Option<Bytes>, StoreError> {
            Err(StoreError::Unavailable("connection reset".into()))
        }

        fn set(&self, _key: &KeyRef<'_>, _value: Bytes) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection reset".into()))
        }

        fn update<T, E, F>(&self, _key: &KeyRef<'_>, _f: F) -> Result<T, E>
        where
            E: From<StoreError>,
            F: FnOnce(Option<&Bytes>) -> Result<(Bytes, T), E>,
        {
            Err(StoreError::Unavailable("connection reset".into()).into())
        }
    }

    #[test]
    fn test_incrby_absent_then_existing() {
        let engine = engine();
        let key = KeyRef::flat(b"acct");

        assert_eq!(engine.increment_by(&key, b"10.5", Sign::Plus), Ok("10.5".to_string()));
        assert_eq!(engine.increment_by(&key, b"0.25", Sign::Plus), Ok("10.75".to_string()));
        assert_eq!(stored(&engine, b"acct"), Some(Bytes::from("10.75")));
    }

    #[test]
    fn test_incr_decr_by_one() {
        let engine = engine();
        let key = KeyRef::flat(b"n");

        assert_eq!(engine.increment(&key, &Decimal::one(), Sign::Minus), Ok("-1".to_string()));
        assert_eq!(engine.increment(&key, &Decimal::one(), Sign::Plus), Ok("0".to_string()));
        assert_eq!(engine.increment(&key, &Decimal::one(), Sign::Plus), Ok("1".to_string()));
    }

    #[test]
    fn test_hash_field_increment() {
        let engine = engine();
        engine
            .store()
            .hset(Bytes::from("h"), Bytes::from("f"), Bytes::from("5"))
            .unwrap();

        let key = KeyRef::field(b"h", b"f");
        assert_eq!(engine.increment_by(&key, b"-3", Sign::Plus), Ok("2".to_string()));
        assert_eq!(engine.increment_by(&key, b"0.5", Sign::Minus), Ok("1.5".to_string()));
        assert_eq!(engine.get(&key, 0), Ok(Some("1.5".to_string())));
    }

    #[test]
    fn test_malformed_value_is_not_overwritten() {
        let engine = engine();
        seed(&engine, "k", "abc");

        let err = engine.increment_by(&KeyRef::flat(b"k"), b"1", Sign::Plus).unwrap_err();
        assert!(err.is_conversion());
        assert_eq!(stored(&engine, b"k"), Some(Bytes::from("abc")));

        let err = engine.get(&KeyRef::flat(b"k"), 0).unwrap_err();
        assert!(err.is_conversion());
    }

    #[test]
    fn test_absent_vs_malformed() {
        let engine = engine();
        assert_eq!(engine.get(&KeyRef::flat(b"missing"), 0), Ok(None));
        assert_eq!(engine.get(&KeyRef::field(b"missing", b"f"), 2), Ok(None));
    }

    #[test]
    fn test_malformed_delta_never_reaches_store() {
        let engine = DecimalEngine::new(FailingStore);
        let err = engine.increment_by(&KeyRef::flat(b"k"), b"ten", Sign::Plus).unwrap_err();
        assert_eq!(err, EngineError::Decimal(DecimalError::Conversion));
    }

    #[test]
    fn test_store_errors_pass_through() {
        let engine = DecimalEngine::new(FailingStore);
        let unavailable = EngineError::Store(StoreError::Unavailable("connection reset".into()));

        assert_eq!(engine.get(&KeyRef::flat(b"k"), 0), Err(unavailable.clone()));
        assert_eq!(engine.increment_by(&KeyRef::flat(b"k"), b"1", Sign::Plus), Err(unavailable));
    }

    #[test]
    fn test_wrong_type_passes_through() {
        let engine = engine();
        engine
            .store()
            .hset(Bytes::from("h"), Bytes::from("f"), Bytes::from("1"))
            .unwrap();

        assert_eq!(
            engine.increment(&KeyRef::flat(b"h"), &Decimal::one(), Sign::Plus),
            Err(EngineError::Store(StoreError::WrongType))
        );
    }

    #[test]
    fn test_get_with_fractional_digits() {
        let engine = engine();
        seed(&engine, "p", "1.005");

        assert_eq!(engine.get(&KeyRef::flat(b"p"), 2), Ok(Some("1.00".to_string())));
        assert_eq!(engine.get(&KeyRef::flat(b"p"), 5), Ok(Some("1.00500".to_string())));
        assert_eq!(
            engine.get(&KeyRef::flat(b"p"), 40),
            Err(EngineError::Decimal(DecimalError::InvalidRescale { digits: 40 }))
        );
    }

    #[test]
    fn test_precision_bound_truncates() {
        let engine = engine();
        let nines = "9".repeat(34);
        seed(&engine, "big", &nines);

        let result = engine.increment_by(&KeyRef::flat(b"big"), b"0.9", Sign::Plus);
        assert_eq!(result, Ok(nines));
    }

    #[test]
    fn test_division_by_zero_guard() {
        let engine = engine();
        assert_eq!(
            engine.apply(BinaryOp::Div, b"1", b"0"),
            Err(EngineError::Decimal(DecimalError::DivisionByZero))
        );
        assert_eq!(engine.apply(BinaryOp::Add, b"1", b"2"), Ok("3".to_string()));
    }

    #[test]
    fn test_fixed_point() {
        let engine = engine();
        assert_eq!(engine.fixed_point(b"1.005", 2), Ok("1.00".to_string()));
        assert_eq!(engine.fixed_point(b"0.123456789", 2), Ok("0.12".to_string()));
        assert_eq!(engine.fixed_point(b"1234", -2), Ok("1.2e+3".to_string()));
        assert!(engine.fixed_point(b"abc", 2).unwrap_err().is_conversion());
    }

    #[test]
    fn test_concurrent_increments_compose() {
        use std::thread;

        let engine = Arc::new(engine());
        let mut handles = vec![];

        for _ in 0..8 {
            let engine = Arc::clone(&engine);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    engine
                        .increment_by(&KeyRef::flat(b"total"), b"0.01", Sign::Plus)
                        .unwrap();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(engine.get(&KeyRef::flat(b"total"), 0), Ok(Some("8.00".to_string())));
    }
}
