//! Command Module
//!
//! Turns parsed RESP requests into replies.
//!
//! ```text
//! RESP request ──> CommandHandler ──> DecimalEngine ──> StorageEngine
//!                        │                                  ▲
//!                        └──────── host commands ───────────┘
//! ```
//!
//! ## Supported Commands
//!
//! ### Decimal Commands
//! - `BN.GET`, `BN.HGET`
//! - `BN.INCR`, `BN.DECR`, `BN.INCRBY`, `BN.DECRBY`
//! - `BN.HINCR`, `BN.HDECR`, `BN.HINCRBY`, `BN.HDECRBY`
//! - `BN.ADD`, `BN.SUB`, `BN.MUL`, `BN.DIV`, `BN.TO_FIXED`
//!
//! ### Host Commands
//! - `GET`, `SET`, `DEL`, `EXISTS`, `TYPE`
//! - `HGET`, `HSET`, `HDEL`, `HGETALL`
//! - `PING`, `ECHO`, `DBSIZE`, `FLUSHDB`, `FLUSHALL`, `COMMAND`, `QUIT`

pub mod handler;

pub use handler::{is_quit, CommandError, CommandHandler, CommandSpec, COMMANDS};
