//! # bnkv - Exact Decimal Arithmetic for a Key-Value Store
//!
//! bnkv stores numbers as text and reads, increments and combines them with
//! arbitrary-precision decimal arithmetic instead of floating point, so
//! `0.1 + 0.2` is `0.3` and a balance never drifts.
//!
//! ## Features
//!
//! - **Exact decimals**: 34 significant digits, truncation toward zero,
//!   exponent limits of the 128-bit decimal interchange format
//! - **Atomic read-modify-write**: increments hold the shard lock for the
//!   whole parse, add and store cycle
//! - **Redis-compatible**: speaks RESP, so `redis-cli` works out of the box
//! - **Async I/O**: one Tokio task per client
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                bnkv                                     │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │                  │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │                  │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘                  │
//! │                                               │                         │
//! │                                               ▼                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │   RESP      │    │  Decimal    │───>│  Context +  │                  │
//! │  │   Parser    │    │  Engine     │    │  Codec      │                  │
//! │  └─────────────┘    └──────┬──────┘    └─────────────┘                  │
//! │                            │ StoreClient                                │
//! │                            ▼                                            │
//! │                     ┌──────────────────────────────────────────────┐   │
//! │                     │              StorageEngine                   │   │
//! │                     │  ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐ │   │
//! │                     │  │Shard 0 │ │Shard 1 │ │Shard 2 │ │...N    │ │   │
//! │                     │  └────────┘ └────────┘ └────────┘ └────────┘ │   │
//! │                     └──────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use bnkv::engine::{DecimalEngine, Sign};
//! use bnkv::storage::{KeyRef, StorageEngine};
//! use std::sync::Arc;
//!
//! let engine = DecimalEngine::new(Arc::new(StorageEngine::new()));
//! let acct = KeyRef::flat(b"acct");
//!
//! engine.increment_by(&acct, b"10.5", Sign::Plus).unwrap();
//! assert_eq!(engine.increment_by(&acct, b"0.25", Sign::Plus).unwrap(), "10.75");
//! assert_eq!(engine.get(&acct, 4).unwrap().as_deref(), Some("10.7500"));
//! ```
//!
//! ## Module Overview
//!
//! - [`decimal`]: Numeric context, decimal value, text codec
//! - [`engine`]: Stateless operators and store-backed read-modify-write
//! - [`storage`]: Store client contract and the sharded in-memory store
//! - [`protocol`]: RESP parser and types
//! - [`commands`]: `BN.*` and host command dispatch
//! - [`connection`]: Client connection management

pub mod commands;
pub mod connection;
pub mod decimal;
pub mod engine;
pub mod protocol;
pub mod storage;

pub use commands::CommandHandler;
pub use connection::{handle_connection, ConnectionStats};
pub use decimal::{Context, Decimal, DecimalError};
pub use engine::{DecimalEngine, EngineError, Sign};
pub use protocol::{ParseError, RespParser, RespValue};
pub use storage::{KeyRef, StorageEngine, StoreClient, StoreError};

/// The default port bnkv listens on (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host bnkv binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
