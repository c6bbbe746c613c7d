//! Title-played records
//!
//! Per-title aggregate statistics kept in the dashboard profile. Layout
//! (big-endian), followed by the null-terminated UTF-16BE title name:
//!
//! ```text
//! 0x00 title_id                   u32
//! 0x04 achievements_possible      u32
//! 0x08 achievements_earned        u32
//! 0x0C gamerscore_total           u32
//! 0x10 gamerscore_earned          u32
//! 0x14 reserved_achievement_count u16
//! 0x16 all_avatar_awards          (earned u8, possible u8)
//! 0x18 male_avatar_awards         (earned u8, possible u8)
//! 0x1A female_avatar_awards       (earned u8, possible u8)
//! 0x1C reserved_flags             u32
//! 0x20 last_played                u64  (FILETIME)
//! ```
//!
//! Each avatar award counter is two bytes wide, one `u8` per field, which
//! keeps the fixed part at 0x28 bytes.

use crate::error::{Result, XdbfError};
use crate::time::{filetime_to_datetime, host_filetime_now};
use crate::wire::{put_utf16_cstr, utf16_cstr_len, wire_len, ByteReader, WireResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Size of the fixed part of a title-played record
pub const TITLE_HEADER_SIZE: usize = 0x28;

/// Earned/possible pair for avatar awards
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarAwardCounter {
    pub earned: u8,
    pub possible: u8,
}

/// Play statistics for one title
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitlePlayed {
    pub title_id: u32,
    pub title_name: String,
    pub achievements_possible: u32,
    pub achievements_earned: u32,
    pub gamerscore_total: u32,
    pub gamerscore_earned: u32,
    pub reserved_achievement_count: u16,
    pub all_avatar_awards: AvatarAwardCounter,
    pub male_avatar_awards: AvatarAwardCounter,
    pub female_avatar_awards: AvatarAwardCounter,
    pub reserved_flags: u32,
    /// FILETIME
    pub last_played: u64,
}

impl TitlePlayed {
    pub fn new(title_id: u32, title_name: impl Into<String>) -> Self {
        TitlePlayed {
            title_id,
            title_name: title_name.into(),
            ..Default::default()
        }
    }

    /// Stamp `last_played` with the current host time
    pub fn touch(&mut self) {
        self.last_played = host_filetime_now();
    }

    pub fn last_played_utc(&self) -> Option<DateTime<Utc>> {
        if self.last_played == 0 {
            return None;
        }
        filetime_to_datetime(self.last_played)
    }

    pub fn encoded_len(&self) -> usize {
        TITLE_HEADER_SIZE + utf16_cstr_len(&self.title_name)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let len = self.encoded_len();
        wire_len(len).ok_or(XdbfError::RecordTooLarge(len))?;

        let mut bytes = Vec::with_capacity(len);
        bytes.extend_from_slice(&self.title_id.to_be_bytes());
        bytes.extend_from_slice(&self.achievements_possible.to_be_bytes());
        bytes.extend_from_slice(&self.achievements_earned.to_be_bytes());
        bytes.extend_from_slice(&self.gamerscore_total.to_be_bytes());
        bytes.extend_from_slice(&self.gamerscore_earned.to_be_bytes());
        bytes.extend_from_slice(&self.reserved_achievement_count.to_be_bytes());
        for counter in [
            self.all_avatar_awards,
            self.male_avatar_awards,
            self.female_avatar_awards,
        ] {
            bytes.push(counter.earned);
            bytes.push(counter.possible);
        }
        bytes.extend_from_slice(&self.reserved_flags.to_be_bytes());
        bytes.extend_from_slice(&self.last_played.to_be_bytes());
        put_utf16_cstr(&mut bytes, &self.title_name)?;
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> WireResult<Self> {
        let mut reader = ByteReader::new(bytes);
        let title_id = reader.read_u32()?;
        let achievements_possible = reader.read_u32()?;
        let achievements_earned = reader.read_u32()?;
        let gamerscore_total = reader.read_u32()?;
        let gamerscore_earned = reader.read_u32()?;
        let reserved_achievement_count = reader.read_u16()?;

        let mut counter = || -> WireResult<AvatarAwardCounter> {
            Ok(AvatarAwardCounter {
                earned: reader.read_u8()?,
                possible: reader.read_u8()?,
            })
        };
        let all_avatar_awards = counter()?;
        let male_avatar_awards = counter()?;
        let female_avatar_awards = counter()?;

        let reserved_flags = reader.read_u32()?;
        let last_played = reader.read_u64()?;
        let title_name = reader.read_utf16_cstr()?;

        Ok(TitlePlayed {
            title_id,
            title_name,
            achievements_possible,
            achievements_earned,
            gamerscore_total,
            gamerscore_earned,
            reserved_achievement_count,
            all_avatar_awards,
            male_avatar_awards,
            female_avatar_awards,
            reserved_flags,
            last_played,
        })
    }
}
