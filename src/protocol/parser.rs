//! Incremental RESP Parser
//!
//! The parser reads from a buffer and returns either:
//! - `Ok(Some((value, consumed)))` - a complete value, `consumed` bytes were used
//! - `Ok(None)` - the message is incomplete, wait for more data
//! - `Err(ParseError)` - invalid protocol data
//!
//! The connection layer appends network data to a buffer, calls `parse()`,
//! and advances the buffer by `consumed` bytes once a value is complete.
//!
//! Besides RESP arrays, plain text lines (`BN.GET acct\r\n`) are accepted
//! as inline commands, the way `redis-cli` and telnet sessions send them.

use crate::protocol::types::{prefix, RespValue, CRLF};
use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur during RESP parsing.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// Invalid integer or length line
    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// Invalid UTF-8 in a line-oriented value
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),

    /// Bulk string length is negative (but not -1 for null)
    #[error("invalid bulk string length: {0}")]
    InvalidBulkLength(i64),

    /// Array length is negative (but not -1 for null)
    #[error("invalid array length: {0}")]
    InvalidArrayLength(i64),

    /// Protocol violation (missing CRLF, etc.)
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// The message exceeds maximum allowed size
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum size for a single bulk string (512 MB, same as Redis)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum array nesting depth
pub const MAX_NESTING_DEPTH: usize = 32;

type Parsed = ParseResult<Option<(RespValue, usize)>>;

/// An incremental RESP parser.
///
/// # Example
///
/// ```
/// use bnkv::protocol::{RespParser, RespValue};
///
/// let mut parser = RespParser::new();
/// let (value, consumed) = parser.parse(b"*2\r\n$6\r\nBN.GET\r\n$4\r\nacct\r\n").unwrap().unwrap();
/// assert_eq!(value, RespValue::command(["BN.GET", "acct"]));
/// assert_eq!(consumed, 26);
/// ```
#[derive(Debug, Default)]
pub struct RespParser {
    depth: usize,
}

impl RespParser {
    pub fn new() -> Self {
        Self { depth: 0 }
    }

    /// Attempts to parse one RESP value from the start of `buf`.
    pub fn parse(&mut self, buf: &[u8]) -> Parsed {
        self.depth = 0;
        self.parse_value(buf)
    }

    fn parse_value(&mut self, buf: &[u8]) -> Parsed {
        let Some(&first) = buf.first() else {
            return Ok(None);
        };

        match first {
            prefix::SIMPLE_STRING | prefix::ERROR => parse_status_line(buf),
            prefix::INTEGER => parse_integer(buf),
            prefix::BULK_STRING => parse_bulk_string(buf),
            prefix::ARRAY => self.parse_array(buf),
            _ => parse_inline(buf),
        }
    }

    /// Parses an array: `*<count>\r\n<elements...>`
    fn parse_array(&mut self, buf: &[u8]) -> Parsed {
        let Some((line, mut consumed)) = read_line(buf) else {
            return Ok(None);
        };

        let count = parse_number(line)?;
        if count == -1 {
            return Ok(Some((RespValue::Null, consumed)));
        }
        if count < 0 {
            return Err(ParseError::InvalidArrayLength(count));
        }

        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ParseError::ProtocolError(format!(
                "maximum nesting depth exceeded: {}",
                MAX_NESTING_DEPTH
            )));
        }

        // The count is untrusted until the elements actually arrive.
        let count = count as usize;
        let mut elements = Vec::with_capacity(count.min(64));

        self.depth += 1;
        for _ in 0..count {
            match self.parse_value(&buf[consumed..]) {
                Ok(Some((value, used))) => {
                    elements.push(value);
                    consumed += used;
                }
                other => {
                    self.depth -= 1;
                    return other;
                }
            }
        }
        self.depth -= 1;

        Ok(Some((RespValue::Array(elements), consumed)))
    }
}

/// Parses a simple string `+<text>\r\n` or an error `-<text>\r\n`.
fn parse_status_line(buf: &[u8]) -> Parsed {
    let Some((line, consumed)) = read_line(buf) else {
        return Ok(None);
    };

    let text = std::str::from_utf8(line)
        .map_err(|e| ParseError::InvalidUtf8(e.to_string()))?
        .to_string();

    let value = if buf[0] == prefix::ERROR {
        RespValue::Error(text)
    } else {
        RespValue::SimpleString(text)
    };
    Ok(Some((value, consumed)))
}

/// Parses an integer: `:<integer>\r\n`
fn parse_integer(buf: &[u8]) -> Parsed {
    match read_line(buf) {
        Some((line, consumed)) => Ok(Some((RespValue::Integer(parse_number(line)?), consumed))),
        None => Ok(None),
    }
}

/// Parses a bulk string: `$<length>\r\n<data>\r\n`
fn parse_bulk_string(buf: &[u8]) -> Parsed {
    let Some((line, header)) = read_line(buf) else {
        return Ok(None);
    };

    let length = parse_number(line)?;
    if length == -1 {
        return Ok(Some((RespValue::Null, header)));
    }
    if length < 0 {
        return Err(ParseError::InvalidBulkLength(length));
    }

    let length = length as usize;
    if length > MAX_BULK_SIZE {
        return Err(ParseError::MessageTooLarge {
            size: length,
            max: MAX_BULK_SIZE,
        });
    }

    let end = header + length;
    if buf.len() < end + CRLF.len() {
        return Ok(None);
    }
    if &buf[end..end + CRLF.len()] != CRLF {
        return Err(ParseError::ProtocolError(
            "bulk string missing trailing CRLF".to_string(),
        ));
    }

    let data = Bytes::copy_from_slice(&buf[header..end]);
    Ok(Some((RespValue::BulkString(data), end + CRLF.len())))
}

/// Parses a whitespace-separated inline command line.
fn parse_inline(buf: &[u8]) -> Parsed {
    let Some(pos) = find_crlf(buf) else {
        return Ok(None);
    };

    let line = std::str::from_utf8(&buf[..pos]).map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;

    let words: Vec<RespValue> = line
        .split_whitespace()
        .map(|word| RespValue::BulkString(Bytes::copy_from_slice(word.as_bytes())))
        .collect();
    if words.is_empty() {
        return Err(ParseError::ProtocolError("empty inline command".to_string()));
    }

    Ok(Some((RespValue::Array(words), pos + CRLF.len())))
}

/// Returns the line after the prefix byte and the bytes consumed through CRLF.
fn read_line(buf: &[u8]) -> Option<(&[u8], usize)> {
    let pos = find_crlf(&buf[1..])?;
    Some((&buf[1..1 + pos], 1 + pos + CRLF.len()))
}

fn parse_number(line: &[u8]) -> ParseResult<i64> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ParseError::InvalidInteger(String::from_utf8_lossy(line).into_owned()))
}

/// Position of the first CRLF in `buf`.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

/// Parses a single RESP message from bytes.
pub fn parse_message(buf: &[u8]) -> Parsed {
    RespParser::new().parse(buf)
}
