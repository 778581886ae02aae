//! Store Client Contract
//!
//! The decimal engine never touches the storage engine directly. It talks
//! to a [`StoreClient`], which reads and writes raw values addressed by a
//! [`KeyRef`]: either a top-level key or a field inside a hash container.
//!
//! Besides plain `get` and `set`, a client must provide [`StoreClient::update`]:
//! a read-modify-write cycle during which no other writer may touch the
//! key. Increments are built on it, so two concurrent `BN.INCRBY` calls on
//! the same key always compose.

use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Address of a single stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyRef<'a> {
    /// A top-level string key
    Flat(&'a [u8]),
    /// A field inside a hash container
    Field { container: &'a [u8], field: &'a [u8] },
}

impl<'a> KeyRef<'a> {
    /// Addresses a top-level key.
    pub fn flat(key: &'a [u8]) -> Self {
        Self::Flat(key)
    }

    /// Addresses a field of a hash container.
    pub fn field(container: &'a [u8], field: &'a [u8]) -> Self {
        Self::Field { container, field }
    }

    /// The top-level key that owns the value; stores route on this.
    pub fn routing_key(&self) -> &'a [u8] {
        match self {
            Self::Flat(key) => key,
            Self::Field { container, .. } => container,
        }
    }
}

impl fmt::Display for KeyRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat(key) => write!(f, "{}", String::from_utf8_lossy(key)),
            Self::Field { container, field } => write!(
                f,
                "{}[{}]",
                String::from_utf8_lossy(container),
                String::from_utf8_lossy(field)
            ),
        }
    }
}

/// Errors reported by a store client.
///
/// The messages are the exact error replies sent to clients.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The key holds a value of another kind (string vs. hash)
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    /// The value exceeds the store's size limit
    #[error("ERR value too large: {size} bytes (max: {max})")]
    ValueTooLarge { size: usize, max: usize },

    /// The backing store could not serve the request
    #[error("ERR store unavailable: {0}")]
    Unavailable(String),
}

/// Access to raw stored values.
pub trait StoreClient {
    /// Fetches the value at `key`, or `None` if it is absent.
    fn get(&self, key: &KeyRef<'_>) -> Result<Option<Bytes>, StoreError>;

    /// Stores `value` at `key`, replacing any previous value.
    fn set(&self, key: &KeyRef<'_>, value: Bytes) -> Result<(), StoreError>;

    /// Runs a read-modify-write cycle on `key` in isolation.
    ///
    /// `f` receives the current value (or `None`) and returns the value to
    /// store together with a result for the caller. No other write to `key`
    /// may happen between the read and the write. If `f` fails, nothing is
    /// written and its error is returned.
    fn update<T, E, F>(&self, key: &KeyRef<'_>, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(Option<&Bytes>) -> Result<(Bytes, T), E>;
}

impl<C: StoreClient + ?Sized> StoreClient for Arc<C> {
    fn get(&self, key: &KeyRef<'_>) -> Result<Option<Bytes>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &KeyRef<'_>, value: Bytes) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn update<T, E, F>(&self, key: &KeyRef<'_>, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(Option<&Bytes>) -> Result<(Bytes, T), E>,
    {
        (**self).update(key, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_key() {
        assert_eq!(KeyRef::flat(b"acct").routing_key(), b"acct");
        assert_eq!(KeyRef::field(b"h", b"f").routing_key(), b"h");
    }

    #[test]
    fn test_display() {
        assert_eq!(KeyRef::flat(b"acct").to_string(), "acct");
        assert_eq!(KeyRef::field(b"wallet", b"usd").to_string(), "wallet[usd]");
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            StoreError::WrongType.to_string(),
            "WRONGTYPE Operation against a key holding the wrong kind of value"
        );
        assert_eq!(
            StoreError::ValueTooLarge { size: 10, max: 5 }.to_string(),
            "ERR value too large: 10 bytes (max: 5)"
        );
    }
}
