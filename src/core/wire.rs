//! Big-endian wire helpers
//!
//! Every multi-byte field in an XDBF container is stored big-endian regardless
//! of host byte order. Records are decoded through [`ByteReader`], a bounds-checked
//! cursor over one entry's bytes, and encoded by appending `to_be_bytes()` output
//! to a `Vec<u8>`.
//!
//! Strings come in two flavours:
//! - UTF-16BE, null-terminated (profile records, setting values)
//! - UTF-8 with a u16 length prefix (title metadata string tables)

use crate::error::{Result, XdbfError};
use thiserror::Error;

/// Low-level decode failure inside a single record
///
/// Views attach the section and id of the failing entry and surface it as
/// `XdbfError::CorruptRecord`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("unexpected end of record: need {needed} bytes, {remaining} remaining")]
    UnexpectedEnd { needed: usize, remaining: usize },

    #[error("string is missing its null terminator")]
    MissingTerminator,

    #[error("odd UTF-16 byte length: {0}")]
    OddLength(usize),

    #[error("invalid UTF-16 sequence")]
    InvalidUtf16,

    #[error("invalid UTF-8 sequence")]
    InvalidUtf8,

    #[error("unknown value type tag: {0:#04x}")]
    UnknownType(u8),

    #[error("unexpected record magic: {0:#010x}")]
    BadMagic(u32),

    #[error("unexpected header size: expected {expected:#x}, found {found:#x}")]
    HeaderSize { expected: u32, found: u32 },

    #[error("id {0:#x} out of range")]
    IdOutOfRange(u64),
}

pub type WireResult<T> = std::result::Result<T, WireError>;

/// Bounds-checked big-endian cursor
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        ByteReader { bytes, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    /// Take the next `n` bytes and advance
    pub fn take(&mut self, n: usize) -> WireResult<&'a [u8]> {
        if n > self.remaining() {
            return Err(WireError::UnexpectedEnd {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn skip(&mut self, n: usize) -> WireResult<()> {
        self.take(n).map(|_| ())
    }

    fn array<const N: usize>(&mut self) -> WireResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> WireResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> WireResult<u16> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    pub fn read_u32(&mut self) -> WireResult<u32> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    pub fn read_u64(&mut self) -> WireResult<u64> {
        Ok(u64::from_be_bytes(self.array()?))
    }

    /// Read a null-terminated UTF-16BE string, consuming the terminator
    ///
    /// The end is found by scanning for a zero code unit; the cursor is left on
    /// the first byte after the terminator so the next string can follow directly.
    pub fn read_utf16_cstr(&mut self) -> WireResult<String> {
        let mut units = Vec::new();
        loop {
            if self.remaining() < 2 {
                return Err(WireError::MissingTerminator);
            }
            let unit = self.read_u16()?;
            if unit == 0 {
                break;
            }
            units.push(unit);
        }
        String::from_utf16(&units).map_err(|_| WireError::InvalidUtf16)
    }

    /// Bytes from the cursor to the end of the record
    pub fn rest(&mut self) -> &'a [u8] {
        let slice = &self.bytes[self.pos..];
        self.pos = self.bytes.len();
        slice
    }
}

/// Append `s` as UTF-16BE code units followed by a zero terminator
///
/// A string with an interior NUL would end early on decode, so it is
/// rejected and `out` is left untouched.
pub fn put_utf16_cstr(out: &mut Vec<u8>, s: &str) -> Result<()> {
    check_cstr(s)?;
    for unit in s.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out.extend_from_slice(&0u16.to_be_bytes());
    Ok(())
}

/// Reject strings that cannot be stored null-terminated
pub fn check_cstr(s: &str) -> Result<()> {
    if s.contains('\0') {
        return Err(XdbfError::InvalidString(s.to_string()));
    }
    Ok(())
}

/// Encoded size of `s` as a null-terminated UTF-16 string
pub fn utf16_cstr_len(s: &str) -> usize {
    (s.encode_utf16().count() + 1) * 2
}

/// Decode UTF-16BE bytes, stopping at the first zero code unit if present
pub fn decode_utf16_be(bytes: &[u8]) -> WireResult<String> {
    if bytes.len() % 2 != 0 {
        return Err(WireError::OddLength(bytes.len()));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .take_while(|&unit| unit != 0)
        .collect();
    String::from_utf16(&units).map_err(|_| WireError::InvalidUtf16)
}

/// Convert a length to the u32 used on the wire
pub fn wire_len(len: usize) -> Option<u32> {
    u32::try_from(len).ok()
}
