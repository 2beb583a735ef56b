// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Streaming msgpack codec.
//!
//! The stream has no length prefix: a connection delivers arbitrary chunks
//! and the decoder yields each top-level value once all of its bytes have
//! arrived.
//!
//! Completeness is found by walking item headers forward from where the
//! previous call stopped, so each byte is looked at a bounded number of
//! times however finely the stream is chunked. Only a complete value is
//! handed to the real decoder.

use rmp::Marker;
use rmpv::Value;
use serde::Serialize;
use thiserror::Error;

/// The buffered bytes do not form a msgpack value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed msgpack stream: {0}")]
pub struct DecodeError(String);

/// Errors from encoding outbound messages.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
}

/// Incremental decoder over an unframed msgpack byte stream.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    buf: Vec<u8>,
    /// Bytes of the front value already walked.
    scanned: usize,
    /// Items still owed by each open array or map, innermost last.
    open: Vec<u64>,
}

/// What the next item header says about the bytes that follow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Header {
    /// Not enough bytes to size the item yet.
    Short,
    /// A scalar, string, binary or extension of this many bytes in total.
    Leaf(usize),
    /// An array or map header of this many bytes, followed by this many
    /// items (keys and values counted separately).
    Open(usize, u64),
    Reserved(u8),
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes read from the transport.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Number of bytes waiting for the rest of their value.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Pop the next complete value.
    ///
    /// Returns `Ok(None)` when the buffer is empty or ends partway through a
    /// value. On a decode failure the whole buffer is discarded so later,
    /// well-formed input can still be read.
    pub fn next_value(&mut self) -> Result<Option<Value>, DecodeError> {
        let end = match self.scan() {
            Ok(Some(end)) => end,
            Ok(None) => return Ok(None),
            Err(e) => {
                self.discard();
                return Err(e);
            }
        };

        let decoded = rmpv::decode::read_value(&mut &self.buf[..end]);
        match decoded {
            Ok(value) => {
                self.buf.drain(..end);
                self.scanned = 0;
                Ok(Some(value))
            }
            Err(e) => {
                self.discard();
                Err(DecodeError(e.to_string()))
            }
        }
    }

    /// Resume walking the front value. Returns its length once every byte
    /// of it is buffered.
    fn scan(&mut self) -> Result<Option<usize>, DecodeError> {
        loop {
            let rest = &self.buf[self.scanned..];
            let (len, items) = match header(rest) {
                Header::Short => return Ok(None),
                Header::Leaf(len) => (len, 0),
                Header::Open(len, items) => (len, items),
                Header::Reserved(byte) => {
                    return Err(DecodeError(format!("reserved marker {byte:#04x}")))
                }
            };
            if len > rest.len() {
                return Ok(None);
            }
            self.scanned += len;

            if items > 0 {
                self.open.push(items);
                continue;
            }
            // A finished item fills one slot of its container, which may
            // in turn finish that container.
            loop {
                match self.open.last_mut() {
                    None => return Ok(Some(self.scanned)),
                    Some(left) => {
                        *left -= 1;
                        if *left > 0 {
                            break;
                        }
                        self.open.pop();
                    }
                }
            }
        }
    }

    fn discard(&mut self) {
        self.buf.clear();
        self.scanned = 0;
        self.open.clear();
    }
}

/// Size the item whose marker starts `bytes`.
fn header(bytes: &[u8]) -> Header {
    let Some(&first) = bytes.first() else {
        return Header::Short;
    };
    let length = |width: usize| {
        bytes.get(1..1 + width).map(|b| b.iter().fold(0u64, |acc, &x| (acc << 8) | u64::from(x)))
    };
    // Marker, length field, `extra` fixed bytes, then the payload.
    let sized = |width: usize, extra: usize| match length(width) {
        Some(len) => Header::Leaf(
            usize::try_from(len)
                .ok()
                .and_then(|n| n.checked_add(1 + width + extra))
                .unwrap_or(usize::MAX),
        ),
        None => Header::Short,
    };
    let counted = |width: usize, per_entry: u64| match length(width) {
        Some(n) => Header::Open(1 + width, n * per_entry),
        None => Header::Short,
    };

    match Marker::from_u8(first) {
        Marker::FixPos(_) | Marker::FixNeg(_) | Marker::Null | Marker::True | Marker::False => {
            Header::Leaf(1)
        }
        Marker::U8 | Marker::I8 => Header::Leaf(2),
        Marker::U16 | Marker::I16 => Header::Leaf(3),
        Marker::U32 | Marker::I32 | Marker::F32 => Header::Leaf(5),
        Marker::U64 | Marker::I64 | Marker::F64 => Header::Leaf(9),
        Marker::FixStr(n) => Header::Leaf(1 + usize::from(n)),
        Marker::Str8 | Marker::Bin8 => sized(1, 0),
        Marker::Str16 | Marker::Bin16 => sized(2, 0),
        Marker::Str32 | Marker::Bin32 => sized(4, 0),
        Marker::FixExt1 => Header::Leaf(3),
        Marker::FixExt2 => Header::Leaf(4),
        Marker::FixExt4 => Header::Leaf(6),
        Marker::FixExt8 => Header::Leaf(10),
        Marker::FixExt16 => Header::Leaf(18),
        Marker::Ext8 => sized(1, 1),
        Marker::Ext16 => sized(2, 1),
        Marker::Ext32 => sized(4, 1),
        Marker::FixArray(n) => Header::Open(1, u64::from(n)),
        Marker::Array16 => counted(2, 1),
        Marker::Array32 => counted(4, 1),
        Marker::FixMap(n) => Header::Open(1, 2 * u64::from(n)),
        Marker::Map16 => counted(2, 2),
        Marker::Map32 => counted(4, 2),
        Marker::Reserved => Header::Reserved(first),
    }
}

/// Encode a message as a msgpack map (struct fields by name).
pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, CodecError> {
    Ok(rmp_serde::to_vec_named(msg)?)
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
