//! RESP Protocol Implementation
//!
//! bnkv speaks RESP2, the Redis Serialization Protocol, so any Redis client
//! can issue `BN.*` commands.
//!
//! ## Modules
//!
//! - `types`: Defines the `RespValue` enum and serialization
//! - `parser`: Incremental parser for incoming RESP data
//!
//! ## Example
//!
//! ```
//! use bnkv::protocol::{parse_message, RespValue};
//!
//! let (value, consumed) = parse_message(b"*2\r\n$6\r\nBN.GET\r\n$4\r\nacct\r\n").unwrap().unwrap();
//! assert_eq!(value, RespValue::command(["BN.GET", "acct"]));
//! assert_eq!(consumed, 26);
//!
//! let reply = RespValue::bulk_string("10.75");
//! assert_eq!(reply.serialize(), b"$5\r\n10.75\r\n");
//! ```

pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use parser::{parse_message, ParseError, ParseResult, RespParser};
pub use types::RespValue;
