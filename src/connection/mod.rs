//! Connection Module
//!
//! Manages individual client connections. Every accepted socket is served
//! by its own async task, so one slow client never stalls another.
//!
//! ## Architecture
//!
//! ```text
//!      TCP Listener (main.rs)
//!               │ accept()
//!               ▼
//!      spawn one task per client
//!               │
//!               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │ Read bytes  │───>│ Parse RESP  │───>│ Execute cmd │     │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘     │
//! │                                               ▼             │
//! │                                        ┌─────────────┐      │
//! │                                        │ Send reply  │      │
//! │                                        └─────────────┘      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Pipelined requests are answered in order. The handler is generic over the
//! stream type, which lets tests drive it with an in-memory mock.
//!
//! ## Example
//!
//! ```ignore
//! use bnkv::connection::{handle_connection, ConnectionStats};
//! use bnkv::commands::CommandHandler;
//! use bnkv::storage::StorageEngine;
//! use std::sync::Arc;
//!
//! let storage = Arc::new(StorageEngine::new());
//! let stats = Arc::new(ConnectionStats::new());
//!
//! let (stream, addr) = listener.accept().await?;
//! let handler = CommandHandler::new(Arc::clone(&storage));
//! tokio::spawn(handle_connection(stream, addr, handler, Arc::clone(&stats)));
//! ```

pub mod handler;

pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
