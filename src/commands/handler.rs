//! Command Handler
//!
//! Receives parsed RESP requests, validates them against the command table
//! and executes them against the decimal engine or the store.
//!
//! ## Decimal Commands
//!
//! - `BN.GET key [digits]` - Read a decimal, optionally rescaled
//! - `BN.INCR key` / `BN.DECR key` - Add or subtract one
//! - `BN.INCRBY key delta` / `BN.DECRBY key delta` - Add or subtract a decimal
//! - `BN.HGET container field [digits]` - Read a decimal hash field
//! - `BN.HINCR` / `BN.HDECR container field` - Add or subtract one on a hash field
//! - `BN.HINCRBY` / `BN.HDECRBY container field delta` - Add or subtract on a hash field
//! - `BN.ADD` / `BN.SUB` / `BN.MUL` / `BN.DIV lhs rhs` - Stateless arithmetic
//! - `BN.TO_FIXED value digits` - Rescale to a fixed number of fractional digits
//!
//! ## Host Commands
//!
//! - `GET`, `SET`, `DEL`, `EXISTS`, `TYPE`
//! - `HGET`, `HSET`, `HDEL`, `HGETALL`
//! - `PING`, `ECHO`, `DBSIZE`, `FLUSHDB`, `FLUSHALL`, `COMMAND`, `QUIT`
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │   lookup    │───>│ arity check │───>│  dispatch() │     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! │                                          │          │       │
//! │                                          ▼          ▼       │
//! │                               DecimalEngine   StorageEngine │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Arity is checked before any argument is interpreted, and `digits`
//! arguments are validated before the store is touched.

use crate::decimal::{Decimal, DecimalError};
use crate::engine::{BinaryOp, DecimalEngine, EngineError, Sign};
use crate::protocol::RespValue;
use crate::storage::{KeyRef, StorageEngine, StoreError};
use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Reply for values that are not decimals, shared with the store's type errors.
const WRONG_TYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

/// Arity of a command, not counting the command name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    /// Lower-case command name
    pub name: &'static str,
    pub min_args: usize,
    /// `None` means variadic
    pub max_args: Option<usize>,
}

const fn spec(name: &'static str, min_args: usize, max_args: Option<usize>) -> CommandSpec {
    CommandSpec {
        name,
        min_args,
        max_args,
    }
}

/// Every command the server understands.
pub const COMMANDS: &[CommandSpec] = &[
    spec("bn.get", 1, Some(2)),
    spec("bn.incr", 1, Some(1)),
    spec("bn.decr", 1, Some(1)),
    spec("bn.incrby", 2, Some(2)),
    spec("bn.decrby", 2, Some(2)),
    spec("bn.hget", 2, Some(3)),
    spec("bn.hincr", 2, Some(2)),
    spec("bn.hdecr", 2, Some(2)),
    spec("bn.hincrby", 3, Some(3)),
    spec("bn.hdecrby", 3, Some(3)),
    spec("bn.add", 2, Some(2)),
    spec("bn.sub", 2, Some(2)),
    spec("bn.mul", 2, Some(2)),
    spec("bn.div", 2, Some(2)),
    spec("bn.to_fixed", 2, Some(2)),
    spec("get", 1, Some(1)),
    spec("set", 2, Some(2)),
    spec("del", 1, None),
    spec("exists", 1, None),
    spec("type", 1, Some(1)),
    spec("hget", 2, Some(2)),
    spec("hset", 3, None),
    spec("hdel", 2, None),
    spec("hgetall", 1, Some(1)),
    spec("ping", 0, Some(1)),
    spec("echo", 1, Some(1)),
    spec("dbsize", 0, Some(0)),
    spec("flushdb", 0, Some(1)),
    spec("flushall", 0, Some(1)),
    spec("command", 0, None),
    spec("quit", 0, Some(0)),
];

impl CommandSpec {
    /// Finds a command by name, ignoring ASCII case.
    pub fn lookup(name: &str) -> Option<&'static CommandSpec> {
        COMMANDS.iter().find(|spec| spec.name.eq_ignore_ascii_case(name))
    }

    /// Returns true if `count` arguments are acceptable.
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.map_or(true, |max| count <= max)
    }
}

/// Errors produced while executing a command.
///
/// The display text is the error reply sent to the client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("ERR wrong number of arguments for '{0}' command")]
    Arity(&'static str),

    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),

    #[error("ERR invalid command format")]
    InvalidFormat,

    #[error("ERR invalid argument")]
    InvalidArgument,

    #[error("ERR invalid precision parameters")]
    InvalidPrecision,

    #[error("{}", engine_reply(.0))]
    Engine(#[from] EngineError),
}

impl From<StoreError> for CommandError {
    fn from(err: StoreError) -> Self {
        CommandError::Engine(err.into())
    }
}

impl From<CommandError> for RespValue {
    fn from(err: CommandError) -> Self {
        RespValue::error(err.to_string())
    }
}

fn engine_reply(err: &EngineError) -> String {
    match err {
        EngineError::Decimal(DecimalError::Conversion) => WRONG_TYPE.to_string(),
        EngineError::Decimal(DecimalError::LiteralTooLong { .. }) => {
            "ERR decimal literal too long".to_string()
        }
        EngineError::Decimal(DecimalError::InvalidRescale { digits }) => {
            format!("ERR invalid rescale to {} fractional digits", digits)
        }
        EngineError::Decimal(err) => format!("ERR {}", err),
        EngineError::Store(err) => err.to_string(),
    }
}

/// Returns true if the request is a `QUIT` command.
pub fn is_quit(command: &RespValue) -> bool {
    match command {
        RespValue::Array(args) => args
            .first()
            .and_then(RespValue::as_bytes)
            .is_some_and(|name| name.eq_ignore_ascii_case(b"quit")),
        _ => false,
    }
}

/// Handles commands by dispatching them to the decimal engine or the store.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    storage: Arc<StorageEngine>,
    engine: DecimalEngine<Arc<StorageEngine>>,
}

impl CommandHandler {
    /// Creates a handler over the given store.
    pub fn new(storage: Arc<StorageEngine>) -> Self {
        let engine = DecimalEngine::new(Arc::clone(&storage));
        Self { storage, engine }
    }

    /// Executes a command and returns the reply.
    pub fn execute(&self, command: RespValue) -> RespValue {
        let name = command_name(&command).unwrap_or_default();

        match self.try_execute(command) {
            Ok(reply) => reply,
            Err(err) => {
                debug!(command = %name, error = %err, "Command failed");
                err.into()
            }
        }
    }

    fn try_execute(&self, command: RespValue) -> Result<RespValue, CommandError> {
        let mut words = command.into_array().ok_or(CommandError::InvalidFormat)?.into_iter();

        let name = words.next().ok_or(CommandError::InvalidFormat)?;
        let name = name.as_str().ok_or(CommandError::InvalidFormat)?;
        let spec = CommandSpec::lookup(name)
            .ok_or_else(|| CommandError::UnknownCommand(name.to_string()))?;

        let args: Vec<Bytes> = words
            .map(into_bytes)
            .collect::<Option<_>>()
            .ok_or(CommandError::InvalidArgument)?;
        if !spec.accepts(args.len()) {
            return Err(CommandError::Arity(spec.name));
        }

        self.dispatch(spec, &args)
    }

    fn dispatch(&self, spec: &CommandSpec, args: &[Bytes]) -> Result<RespValue, CommandError> {
        match spec.name {
            // Decimal commands
            "bn.get" => self.bn_get(KeyRef::flat(&args[0]), args.get(1)),
            "bn.hget" => self.bn_get(KeyRef::field(&args[0], &args[1]), args.get(2)),
            "bn.incr" => self.bn_incr(KeyRef::flat(&args[0]), Sign::Plus),
            "bn.decr" => self.bn_incr(KeyRef::flat(&args[0]), Sign::Minus),
            "bn.hincr" => self.bn_incr(KeyRef::field(&args[0], &args[1]), Sign::Plus),
            "bn.hdecr" => self.bn_incr(KeyRef::field(&args[0], &args[1]), Sign::Minus),
            "bn.incrby" => self.bn_incrby(KeyRef::flat(&args[0]), &args[1], Sign::Plus),
            "bn.decrby" => self.bn_incrby(KeyRef::flat(&args[0]), &args[1], Sign::Minus),
            "bn.hincrby" => self.bn_incrby(KeyRef::field(&args[0], &args[1]), &args[2], Sign::Plus),
            "bn.hdecrby" => self.bn_incrby(KeyRef::field(&args[0], &args[1]), &args[2], Sign::Minus),
            "bn.add" => self.bn_apply(BinaryOp::Add, args),
            "bn.sub" => self.bn_apply(BinaryOp::Sub, args),
            "bn.mul" => self.bn_apply(BinaryOp::Mul, args),
            "bn.div" => self.bn_apply(BinaryOp::Div, args),
            "bn.to_fixed" => self.bn_to_fixed(args),

            // Host commands
            "get" => Ok(optional(self.storage.get(&args[0])?)),
            "set" => {
                self.storage.set(args[0].clone(), args[1].clone())?;
                Ok(RespValue::ok())
            }
            "del" => Ok(RespValue::integer(self.storage.delete_many(args) as i64)),
            "exists" => Ok(RespValue::integer(self.storage.exists_many(args) as i64)),
            "type" => Ok(RespValue::simple_string(self.storage.key_type(&args[0]))),
            "hget" => Ok(optional(self.storage.hget(&args[0], &args[1])?)),
            "hset" => self.hset(args),
            "hdel" => Ok(RespValue::integer(self.storage.hdel(&args[0], &args[1..])? as i64)),
            "hgetall" => self.hgetall(&args[0]),
            "ping" => Ok(args.first().map_or_else(RespValue::pong, |msg| RespValue::bulk_string(msg.clone()))),
            "echo" => Ok(RespValue::bulk_string(args[0].clone())),
            "dbsize" => Ok(RespValue::integer(self.storage.len() as i64)),
            "flushdb" | "flushall" => {
                self.storage.flush();
                Ok(RespValue::ok())
            }
            "command" => Ok(RespValue::array(
                COMMANDS.iter().map(|command| RespValue::bulk_string(command.name)).collect(),
            )),
            "quit" => Ok(RespValue::ok()),
            other => Err(CommandError::UnknownCommand(other.to_string())),
        }
    }

    // ========================================================================
    // Decimal commands
    // ========================================================================

    /// BN.GET key [digits] / BN.HGET container field [digits]
    fn bn_get(&self, key: KeyRef<'_>, digits: Option<&Bytes>) -> Result<RespValue, CommandError> {
        let digits = digits.map(|d| parse_digits(d)).transpose()?.unwrap_or(0);
        Ok(optional(self.engine.get(&key, digits)?))
    }

    /// BN.INCR / BN.DECR / BN.HINCR / BN.HDECR
    fn bn_incr(&self, key: KeyRef<'_>, sign: Sign) -> Result<RespValue, CommandError> {
        let value = self.engine.increment(&key, &Decimal::one(), sign)?;
        Ok(RespValue::bulk_string(value))
    }

    /// BN.INCRBY / BN.DECRBY / BN.HINCRBY / BN.HDECRBY
    fn bn_incrby(&self, key: KeyRef<'_>, delta: &[u8], sign: Sign) -> Result<RespValue, CommandError> {
        let value = self.engine.increment_by(&key, delta, sign)?;
        Ok(RespValue::bulk_string(value))
    }

    /// BN.ADD / BN.SUB / BN.MUL / BN.DIV lhs rhs
    fn bn_apply(&self, op: BinaryOp, args: &[Bytes]) -> Result<RespValue, CommandError> {
        let value = self.engine.apply(op, &args[0], &args[1])?;
        Ok(RespValue::bulk_string(value))
    }

    /// BN.TO_FIXED value digits
    fn bn_to_fixed(&self, args: &[Bytes]) -> Result<RespValue, CommandError> {
        let digits = parse_digits(&args[1])?;
        let value = self.engine.fixed_point(&args[0], digits)?;
        Ok(RespValue::bulk_string(value))
    }

    // ========================================================================
    // Hash commands
    // ========================================================================

    /// HSET container field value [field value ...]
    fn hset(&self, args: &[Bytes]) -> Result<RespValue, CommandError> {
        let pairs = &args[1..];
        if pairs.len() % 2 != 0 {
            return Err(CommandError::Arity("hset"));
        }

        let mut created = 0;
        for pair in pairs.chunks_exact(2) {
            if self.storage.hset(args[0].clone(), pair[0].clone(), pair[1].clone())? {
                created += 1;
            }
        }
        Ok(RespValue::integer(created))
    }

    /// HGETALL container
    fn hgetall(&self, container: &[u8]) -> Result<RespValue, CommandError> {
        let pairs = self.storage.hgetall(container)?;
        let mut values = Vec::with_capacity(pairs.len() * 2);
        for (field, value) in pairs {
            values.push(RespValue::bulk_string(field));
            values.push(RespValue::bulk_string(value));
        }
        Ok(RespValue::array(values))
    }
}

/// Lower-cased command name of a request, for logging.
fn command_name(command: &RespValue) -> Option<String> {
    match command {
        RespValue::Array(args) => args.first().and_then(RespValue::as_str).map(str::to_lowercase),
        _ => None,
    }
}

fn into_bytes(value: RespValue) -> Option<Bytes> {
    match value {
        RespValue::BulkString(b) => Some(b),
        RespValue::SimpleString(s) => Some(Bytes::from(s)),
        RespValue::Integer(n) => Some(Bytes::from(n.to_string())),
        _ => None,
    }
}

/// Parses a `digits` argument as a base-10 signed integer.
fn parse_digits(arg: &[u8]) -> Result<i64, CommandError> {
    std::str::from_utf8(arg)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(CommandError::InvalidPrecision)
}

fn optional(value: Option<impl Into<Bytes>>) -> RespValue {
    match value {
        Some(value) => RespValue::bulk_string(value),
        None => RespValue::null(),
    }
}
