//! Achievement records
//!
//! Profile layout (big-endian), followed by three back-to-back
//! null-terminated UTF-16BE strings: label, description, unachieved
//! description.
//!
//! ```text
//! 0x00 struct_size u32  (always 0x1C)
//! 0x04 id          u32
//! 0x08 image_id    u32
//! 0x0C gamerscore  u32
//! 0x10 flags       u32
//! 0x14 unlock_time u64  (FILETIME)
//! ```

use crate::error::{Result, XdbfError};
use crate::time::{filetime_to_datetime, host_filetime_now};
use crate::wire::{put_utf16_cstr, utf16_cstr_len, wire_len, ByteReader, WireError, WireResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Size of the fixed part of a profile achievement record
pub const ACHIEVEMENT_HEADER_SIZE: usize = 0x1C;

/// Bit layout of [`Achievement::flags`]
pub mod flags {
    pub const KIND_MASK: u32 = 0x7;
    pub const SHOW_UNACHIEVED: u32 = 0x8;
    pub const ACHIEVED_ONLINE: u32 = 0x10000;
    pub const ACHIEVED: u32 = 0x20000;
    pub const NOT_ACHIEVABLE: u32 = 0x40000;
    pub const WAS_NOT_ACHIEVABLE: u32 = 0x80000;
    pub const PLATFORM_MASK: u32 = 0x700000;
    pub const PLATFORM_SHIFT: u32 = 20;
    pub const COLORIZABLE: u32 = 0x1000000;
}

/// Achievement kind (flag bits 0-2)
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AchievementKind {
    Completion = 1,
    Leveling = 2,
    Unlock = 3,
    Event = 4,
    Tournament = 5,
    Checkpoint = 6,
    Other = 7,
}

impl AchievementKind {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(AchievementKind::Completion),
            2 => Some(AchievementKind::Leveling),
            3 => Some(AchievementKind::Unlock),
            4 => Some(AchievementKind::Event),
            5 => Some(AchievementKind::Tournament),
            6 => Some(AchievementKind::Checkpoint),
            7 => Some(AchievementKind::Other),
            _ => None,
        }
    }
}

/// Platform the achievement belongs to (flag bits 20-22)
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AchievementPlatform {
    X360 = 1,
    Pc = 2,
    Mobile = 3,
    WebGames = 4,
}

impl AchievementPlatform {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(AchievementPlatform::X360),
            2 => Some(AchievementPlatform::Pc),
            3 => Some(AchievementPlatform::Mobile),
            4 => Some(AchievementPlatform::WebGames),
            _ => None,
        }
    }
}

/// One achievement with its unlock state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: u16,
    pub label: String,
    pub description: String,
    pub unachieved_description: String,
    pub image_id: u32,
    pub gamerscore: u32,
    pub flags: u32,
    /// FILETIME, zero while locked
    pub unlock_time: u64,
}

impl Achievement {
    pub fn new(id: u16, kind: AchievementKind, gamerscore: u32) -> Self {
        Achievement {
            id,
            gamerscore,
            flags: kind as u32,
            ..Default::default()
        }
    }

    /// Kind from bits 0-2, `None` when the bits hold zero
    pub fn kind(&self) -> Option<AchievementKind> {
        AchievementKind::from_u32(self.flags & flags::KIND_MASK)
    }

    /// Replace the kind bits, leaving every other flag alone
    pub fn set_kind(&mut self, kind: AchievementKind) {
        self.flags = (self.flags & !flags::KIND_MASK) | kind as u32;
    }

    pub fn platform(&self) -> Option<AchievementPlatform> {
        AchievementPlatform::from_u32((self.flags & flags::PLATFORM_MASK) >> flags::PLATFORM_SHIFT)
    }

    pub fn set_platform(&mut self, platform: AchievementPlatform) {
        self.flags = (self.flags & !flags::PLATFORM_MASK)
            | ((platform as u32) << flags::PLATFORM_SHIFT);
    }

    pub fn shows_unachieved(&self) -> bool {
        self.flags & flags::SHOW_UNACHIEVED != 0
    }

    pub fn is_colorizable(&self) -> bool {
        self.flags & flags::COLORIZABLE != 0
    }

    /// Unlockable unless marked not achievable, but an achievement that was
    /// unlockable before being marked stays eligible
    pub fn is_unlockable(&self) -> bool {
        self.flags & flags::NOT_ACHIEVABLE == 0 || self.flags & flags::WAS_NOT_ACHIEVABLE != 0
    }

    pub fn is_unlocked(&self) -> bool {
        self.flags & flags::ACHIEVED != 0
    }

    pub fn is_unlocked_online(&self) -> bool {
        self.flags & flags::ACHIEVED_ONLINE != 0
    }

    /// Mark achieved and stamp the unlock time
    ///
    /// The timestamp is re-stamped even if the achievement was already
    /// unlocked. Does nothing when the achievement is not unlockable.
    pub fn unlock(&mut self, online: bool) {
        if !self.is_unlockable() {
            return;
        }

        self.flags |= flags::ACHIEVED;
        if online {
            self.flags |= flags::ACHIEVED_ONLINE;
        }

        self.unlock_time = host_filetime_now();
    }

    /// Clear both achieved bits and the unlock time
    pub fn lock(&mut self) {
        self.flags &= !(flags::ACHIEVED | flags::ACHIEVED_ONLINE);
        self.unlock_time = 0;
    }

    pub fn unlock_time_utc(&self) -> Option<DateTime<Utc>> {
        if self.unlock_time == 0 {
            return None;
        }
        filetime_to_datetime(self.unlock_time)
    }

    /// Encoded size of the profile record
    pub fn encoded_len(&self) -> usize {
        ACHIEVEMENT_HEADER_SIZE
            + utf16_cstr_len(&self.label)
            + utf16_cstr_len(&self.description)
            + utf16_cstr_len(&self.unachieved_description)
    }

    /// Encode the profile record
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let len = self.encoded_len();
        wire_len(len).ok_or(XdbfError::RecordTooLarge(len))?;

        let mut bytes = Vec::with_capacity(len);
        bytes.extend_from_slice(&(ACHIEVEMENT_HEADER_SIZE as u32).to_be_bytes());
        bytes.extend_from_slice(&u32::from(self.id).to_be_bytes());
        bytes.extend_from_slice(&self.image_id.to_be_bytes());
        bytes.extend_from_slice(&self.gamerscore.to_be_bytes());
        bytes.extend_from_slice(&self.flags.to_be_bytes());
        bytes.extend_from_slice(&self.unlock_time.to_be_bytes());
        put_utf16_cstr(&mut bytes, &self.label)?;
        put_utf16_cstr(&mut bytes, &self.description)?;
        put_utf16_cstr(&mut bytes, &self.unachieved_description)?;
        Ok(bytes)
    }

    /// Decode a profile record
    pub fn from_bytes(bytes: &[u8]) -> WireResult<Self> {
        let mut reader = ByteReader::new(bytes);
        let struct_size = reader.read_u32()?;
        if struct_size != ACHIEVEMENT_HEADER_SIZE as u32 {
            return Err(WireError::HeaderSize {
                expected: ACHIEVEMENT_HEADER_SIZE as u32,
                found: struct_size,
            });
        }
        let raw_id = reader.read_u32()?;
        let id = u16::try_from(raw_id).map_err(|_| WireError::IdOutOfRange(u64::from(raw_id)))?;
        let image_id = reader.read_u32()?;
        let gamerscore = reader.read_u32()?;
        let flags = reader.read_u32()?;
        let unlock_time = reader.read_u64()?;

        let label = reader.read_utf16_cstr()?;
        let description = reader.read_utf16_cstr()?;
        let unachieved_description = reader.read_utf16_cstr()?;

        Ok(Achievement {
            id,
            label,
            description,
            unachieved_description,
            image_id,
            gamerscore,
            flags,
            unlock_time,
        })
    }
}
