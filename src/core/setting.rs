//! Typed profile settings
//!
//! A setting is one typed value keyed by a 32-bit setting id. The id itself
//! carries the mandated value type and maximum size:
//!
//! ```text
//! bits 28-31  value type (UserDataType)
//! bits 16-27  maximum encoded size in bytes
//! bits  0-15  index
//! ```
//!
//! Stored record layout (big-endian):
//!
//! ```text
//! 0x00 setting_id u32
//! 0x04 reserved   u32
//! 0x08 type       u8
//! 0x09 reserved   [u8; 7]
//! 0x10 payload    [u8; 8]   scalar value, or (byte_length u32, 0 u32)
//! 0x18 extra      [u8]      UTF-16BE string or binary blob
//! ```
//!
//! The type tag is a single byte; the seven bytes after it are always zero.
//! Unicode values are stored null-terminated, so they may not contain NUL.

use crate::error::{Result, XdbfError};
use crate::time::filetime_to_datetime;
use crate::wire::{check_cstr, put_utf16_cstr, wire_len, ByteReader, WireError, WireResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of the fixed part of a setting record
pub const SETTING_HEADER_SIZE: usize = 24;

/// Wire type tag of a setting value
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserDataType {
    Context = 0,
    Int32 = 1,
    Int64 = 2,
    Double = 3,
    Unicode = 4,
    Float = 5,
    Binary = 6,
    DateTime = 7,
    Null = 0xFF,
}

impl UserDataType {
    /// Convert from the wire tag
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(UserDataType::Context),
            1 => Some(UserDataType::Int32),
            2 => Some(UserDataType::Int64),
            3 => Some(UserDataType::Double),
            4 => Some(UserDataType::Unicode),
            5 => Some(UserDataType::Float),
            6 => Some(UserDataType::Binary),
            7 => Some(UserDataType::DateTime),
            0xFF => Some(UserDataType::Null),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            UserDataType::Context => "Context",
            UserDataType::Int32 => "Int32",
            UserDataType::Int64 => "Int64",
            UserDataType::Double => "Double",
            UserDataType::Unicode => "Unicode",
            UserDataType::Float => "Float",
            UserDataType::Binary => "Binary",
            UserDataType::DateTime => "DateTime",
            UserDataType::Null => "Null",
        }
    }
}

impl fmt::Display for UserDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Setting identifier with its packed type and size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SettingId(pub u32);

impl SettingId {
    pub const PERMISSIONS: SettingId = SettingId(0x1004_0000);
    pub const GAMER_TYPE: SettingId = SettingId(0x1004_0001);
    pub const GAMER_YAXIS_INVERSION: SettingId = SettingId(0x1004_0002);
    pub const OPTION_CONTROLLER_VIBRATION: SettingId = SettingId(0x1004_0003);
    pub const GAMERCARD_ZONE: SettingId = SettingId(0x1004_0004);
    pub const GAMERCARD_REGION: SettingId = SettingId(0x1004_0005);
    pub const GAMERCARD_CRED: SettingId = SettingId(0x1004_0006);
    pub const GAMERCARD_REP: SettingId = SettingId(0x5004_000B);
    pub const GAMERCARD_PICTURE_KEY: SettingId = SettingId(0x4064_000F);
    pub const GAMERCARD_MOTTO: SettingId = SettingId(0x402C_0011);
    pub const GAMERCARD_TITLES_PLAYED: SettingId = SettingId(0x1004_0012);
    pub const GAMERCARD_ACHIEVEMENTS_EARNED: SettingId = SettingId(0x1004_0013);
    pub const GAMER_DIFFICULTY: SettingId = SettingId(0x1004_0015);
    pub const GAMER_CONTROL_SENSITIVITY: SettingId = SettingId(0x1004_0018);
    pub const GAMER_PREFERRED_COLOR_FIRST: SettingId = SettingId(0x1004_001D);
    pub const GAMER_PREFERRED_COLOR_SECOND: SettingId = SettingId(0x1004_001E);
    pub const GAMERCARD_AVATAR_INFO_1: SettingId = SettingId(0x63E8_0044);
    pub const TITLE_SPECIFIC1: SettingId = SettingId(0x63E8_3FFF);
    pub const TITLE_SPECIFIC2: SettingId = SettingId(0x63E8_3FFE);
    pub const TITLE_SPECIFIC3: SettingId = SettingId(0x63E8_3FFD);

    /// Pack a setting id from its parts
    pub const fn from_parts(value_type: UserDataType, max_size: u16, index: u16) -> Self {
        SettingId(
            ((value_type as u32 & 0xF) << 28) | ((max_size as u32 & 0xFFF) << 16) | index as u32,
        )
    }

    pub fn raw(&self) -> u32 {
        self.0
    }

    /// Type every value stored under this id must have
    pub fn mandated_type(&self) -> Option<UserDataType> {
        UserDataType::from_u8(((self.0 >> 28) & 0xF) as u8)
    }

    /// Maximum encoded value size in bytes
    pub fn max_size(&self) -> u16 {
        ((self.0 >> 16) & 0xFFF) as u16
    }

    pub fn index(&self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }

    /// Title-specific slots live in the title's own profile, not the dashboard's
    pub fn is_title_specific(&self) -> bool {
        matches!(
            *self,
            SettingId::TITLE_SPECIFIC1 | SettingId::TITLE_SPECIFIC2 | SettingId::TITLE_SPECIFIC3
        )
    }
}

impl fmt::Display for SettingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010X}", self.0)
    }
}

/// A setting value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SettingValue {
    Null,
    Int32(i32),
    Int64(i64),
    Double(f64),
    Unicode(String),
    Float(f32),
    Binary(Vec<u8>),
    /// FILETIME ticks
    DateTime(i64),
}

impl SettingValue {
    pub fn value_type(&self) -> UserDataType {
        match self {
            SettingValue::Null => UserDataType::Null,
            SettingValue::Int32(_) => UserDataType::Int32,
            SettingValue::Int64(_) => UserDataType::Int64,
            SettingValue::Double(_) => UserDataType::Double,
            SettingValue::Unicode(_) => UserDataType::Unicode,
            SettingValue::Float(_) => UserDataType::Float,
            SettingValue::Binary(_) => UserDataType::Binary,
            SettingValue::DateTime(_) => UserDataType::DateTime,
        }
    }
}

/// One typed setting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    id: SettingId,
    value: SettingValue,
}

impl Setting {
    /// Create a setting, checking the value against the id's mandated type
    ///
    /// DateTime and Int64 are wire aliases and are accepted for each other;
    /// an Int64 given for a DateTime id is stored as DateTime. `Null` clears a
    /// setting and is accepted for any id.
    pub fn new(id: SettingId, value: SettingValue) -> Result<Self> {
        let value = conform(id, value)?;
        Ok(Setting { id, value })
    }

    /// Replace the value, with the same type check as [`Setting::new`]
    pub fn set(&mut self, value: SettingValue) -> Result<()> {
        self.value = conform(self.id, value)?;
        Ok(())
    }

    /// Re-check the value against the mandated type
    ///
    /// Decoded settings are not checked, so a record read from disk may carry
    /// a value of the wrong type.
    pub fn validate(&self) -> Result<()> {
        conform(self.id, self.value.clone()).map(|_| ())
    }

    pub fn id(&self) -> SettingId {
        self.id
    }

    pub fn value(&self) -> &SettingValue {
        &self.value
    }

    pub fn into_value(self) -> SettingValue {
        self.value
    }

    pub fn is_title_specific(&self) -> bool {
        self.id.is_title_specific()
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self.value {
            SettingValue::Int32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.value {
            SettingValue::Int64(v) | SettingValue::DateTime(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self.value {
            SettingValue::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.value {
            SettingValue::Double(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            SettingValue::Unicode(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.value {
            SettingValue::Binary(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self.value {
            SettingValue::DateTime(v) => filetime_to_datetime(u64::try_from(v).ok()?),
            _ => None,
        }
    }

    /// Encode the stored record
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut payload = [0u8; 8];
        let mut extra = Vec::new();

        match &self.value {
            SettingValue::Null => {}
            SettingValue::Int32(v) => payload[..4].copy_from_slice(&v.to_be_bytes()),
            SettingValue::Int64(v) | SettingValue::DateTime(v) => {
                payload.copy_from_slice(&v.to_be_bytes())
            }
            SettingValue::Double(v) => payload.copy_from_slice(&v.to_bits().to_be_bytes()),
            SettingValue::Float(v) => payload[..4].copy_from_slice(&v.to_bits().to_be_bytes()),
            SettingValue::Unicode(s) => put_utf16_cstr(&mut extra, s)?,
            SettingValue::Binary(b) => extra.extend_from_slice(b),
        }

        if matches!(self.value, SettingValue::Unicode(_) | SettingValue::Binary(_)) {
            let length = wire_len(extra.len()).ok_or(XdbfError::RecordTooLarge(extra.len()))?;
            payload[..4].copy_from_slice(&length.to_be_bytes());
        }

        let mut bytes = Vec::with_capacity(SETTING_HEADER_SIZE + extra.len());
        bytes.extend_from_slice(&self.id.0.to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.push(self.value.value_type() as u8);
        bytes.extend_from_slice(&[0u8; 7]);
        bytes.extend_from_slice(&payload);
        bytes.extend_from_slice(&extra);
        Ok(bytes)
    }

    /// Decode a stored record
    ///
    /// String and binary payloads are copied using the recorded byte length.
    pub fn from_bytes(bytes: &[u8]) -> WireResult<Self> {
        let mut reader = ByteReader::new(bytes);
        let id = SettingId(reader.read_u32()?);
        reader.skip(4)?;
        let tag = reader.read_u8()?;
        reader.skip(7)?;

        let mut payload = ByteReader::new(reader.take(8)?);
        let value = match UserDataType::from_u8(tag) {
            Some(UserDataType::Null) => SettingValue::Null,
            Some(UserDataType::Int32) => SettingValue::Int32(payload.read_u32()? as i32),
            Some(UserDataType::Int64) => SettingValue::Int64(payload.read_u64()? as i64),
            Some(UserDataType::DateTime) => SettingValue::DateTime(payload.read_u64()? as i64),
            Some(UserDataType::Double) => SettingValue::Double(f64::from_bits(payload.read_u64()?)),
            Some(UserDataType::Float) => SettingValue::Float(f32::from_bits(payload.read_u32()?)),
            Some(UserDataType::Unicode) => {
                let length = payload.read_u32()? as usize;
                let data = reader.take(length)?;
                SettingValue::Unicode(crate::wire::decode_utf16_be(data)?)
            }
            Some(UserDataType::Binary) => {
                let length = payload.read_u32()? as usize;
                SettingValue::Binary(reader.take(length)?.to_vec())
            }
            Some(UserDataType::Context) | None => return Err(WireError::UnknownType(tag)),
        };

        Ok(Setting { id, value })
    }
}

fn conform(id: SettingId, value: SettingValue) -> Result<SettingValue> {
    if let SettingValue::Unicode(s) = &value {
        check_cstr(s)?;
    }

    let found = value.value_type();
    let expected = id.mandated_type();

    match (expected, value) {
        (_, SettingValue::Null) => Ok(SettingValue::Null),
        (Some(UserDataType::DateTime), SettingValue::Int64(v)) => Ok(SettingValue::DateTime(v)),
        (Some(UserDataType::Int64), value @ SettingValue::DateTime(_)) => Ok(value),
        (Some(expected), value) if expected == found => Ok(value),
        (expected, _) => Err(XdbfError::TypeMismatch {
            setting_id: id.0,
            expected: expected.map(|t| t.name()).unwrap_or("invalid"),
            found: found.name(),
        }),
    }
}
