//! Storage Module
//!
//! This module provides the in-memory store behind bnkv and the client
//! contract the decimal engine uses to reach it.
//!
//! ## Architecture
//!
//! ```text
//!              ┌───────────────────────────┐
//!              │      DecimalEngine        │
//!              └─────────────┬─────────────┘
//!                            │ StoreClient (get / set / update)
//!                            ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │...64    │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ shards  │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Sharded Storage**: 64 independent shards reduce lock contention
//! - **Strings and Hashes**: One keyspace, one type per key
//! - **Isolated Updates**: Read-modify-write cycles hold the shard's write lock
//!
//! ## Example
//!
//! ```
//! use bnkv::storage::{KeyRef, StorageEngine, StoreClient};
//! use bytes::Bytes;
//!
//! let engine = StorageEngine::new();
//!
//! let key = KeyRef::field(b"wallet", b"usd");
//! StoreClient::set(&engine, &key, Bytes::from("10.5")).unwrap();
//! assert_eq!(engine.hget(b"wallet", b"usd").unwrap(), Some(Bytes::from("10.5")));
//! ```

pub mod client;
pub mod engine;

// Re-export commonly used types
pub use client::{KeyRef, StoreClient, StoreError};
pub use engine::{StorageEngine, StorageStats, Value, MAX_VALUE_SIZE};
