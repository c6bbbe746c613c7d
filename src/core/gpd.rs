//! Profile (GPD) containers
//!
//! A GPD container holds one player's data for one title, or for the
//! dashboard: achievements with unlock state, typed settings, titles played,
//! images and strings. [`Profile`] is a read/write view that decodes records
//! on demand and writes changes straight back into the container.

use crate::achievement::Achievement;
use crate::container::Container;
use crate::error::{Result, XdbfError};
use crate::setting::{Setting, SettingId};
use crate::title::TitlePlayed;
use crate::wire::{put_utf16_cstr, ByteReader};
use tracing::{debug, trace};

/// Section numbers used by GPD containers
pub mod section {
    pub const ACHIEVEMENT: u16 = 1;
    pub const IMAGE: u16 = 2;
    pub const SETTING: u16 = 3;
    pub const TITLE: u16 = 4;
    pub const STRING: u16 = 5;
    pub const PROTECTED_ACHIEVEMENT: u16 = 6;
}

/// Entry ids the console reserves for sync bookkeeping
pub const SYNC_LIST_ID: u64 = 0x1_0000_0000;
pub const SYNC_DATA_ID: u64 = 0x2_0000_0000;

/// Dashboard title id
pub const DASHBOARD_TITLE_ID: u32 = 0xFFFE_07D1;

/// True for reserved sync-record ids
pub fn is_sync_id(id: u64) -> bool {
    id == SYNC_LIST_ID || id == SYNC_DATA_ID
}

/// Read/write view of a profile container for one title
#[derive(Debug)]
pub struct Profile<'a> {
    container: &'a mut Container,
    title_id: u32,
}

impl<'a> Profile<'a> {
    pub fn new(container: &'a mut Container, title_id: u32) -> Self {
        Profile {
            container,
            title_id,
        }
    }

    pub fn title_id(&self) -> u32 {
        self.title_id
    }

    pub fn is_dashboard(&self) -> bool {
        self.title_id == DASHBOARD_TITLE_ID
    }

    pub fn container(&self) -> &Container {
        self.container
    }

    /// Ids of the records in `section`, excluding sync records
    fn record_ids(&self, section: u16) -> Vec<u64> {
        self.container
            .directory()
            .entries_in(section)
            .map(|entry| entry.id)
            .filter(|id| !is_sync_id(*id))
            .collect()
    }

    fn decode_all<T>(
        &self,
        section: u16,
        decode: impl Fn(&[u8]) -> crate::wire::WireResult<T>,
    ) -> Result<Vec<T>> {
        let ids = self.record_ids(section);
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.container.decode_entry(section, id, &decode)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn store(&mut self, section: u16, id: u64, bytes: &[u8]) -> Result<()> {
        let entry = self.container.update_entry(section, id, bytes)?;
        trace!(
            "Stored record ({}, {:#x}) at {} ({} bytes)",
            section,
            id,
            entry.offset,
            entry.length
        );
        Ok(())
    }

    // Achievements

    pub fn achievement(&self, id: u16) -> Result<Option<Achievement>> {
        self.container
            .decode_entry(section::ACHIEVEMENT, u64::from(id), Achievement::from_bytes)
    }

    pub fn achievements(&self) -> Result<Vec<Achievement>> {
        self.decode_all(section::ACHIEVEMENT, Achievement::from_bytes)
    }

    pub fn update_achievement(&mut self, achievement: &Achievement) -> Result<()> {
        let bytes = achievement.to_bytes()?;
        self.store(section::ACHIEVEMENT, u64::from(achievement.id), &bytes)
    }

    /// Unlock an achievement and store it
    ///
    /// Returns `false` when the achievement does not exist or cannot be
    /// unlocked; the container is unchanged in both cases.
    pub fn unlock_achievement(&mut self, id: u16, online: bool) -> Result<bool> {
        let Some(mut achievement) = self.achievement(id)? else {
            return Ok(false);
        };
        if !achievement.is_unlockable() {
            debug!("Achievement {} of title {:#010x} is not unlockable", id, self.title_id);
            return Ok(false);
        }

        achievement.unlock(online);
        self.update_achievement(&achievement)?;
        debug!(
            "Unlocked achievement {} of title {:#010x} (online: {})",
            id, self.title_id, online
        );
        Ok(true)
    }

    /// Lock an achievement and store it
    pub fn lock_achievement(&mut self, id: u16) -> Result<()> {
        let mut achievement = self.achievement(id)?.ok_or(XdbfError::EntryNotFound {
            section: section::ACHIEVEMENT,
            id: u64::from(id),
        })?;
        achievement.lock();
        self.update_achievement(&achievement)
    }

    /// Sum of gamerscore over unlocked achievements
    pub fn gamerscore_earned(&self) -> Result<u32> {
        Ok(self
            .achievements()?
            .iter()
            .filter(|a| a.is_unlocked())
            .map(|a| a.gamerscore)
            .sum())
    }

    // Settings

    pub fn setting(&self, id: SettingId) -> Result<Option<Setting>> {
        self.container
            .decode_entry(section::SETTING, u64::from(id.raw()), Setting::from_bytes)
    }

    pub fn settings(&self) -> Result<Vec<Setting>> {
        self.decode_all(section::SETTING, Setting::from_bytes)
    }

    /// Store a setting after checking its value against the mandated type
    pub fn update_setting(&mut self, setting: &Setting) -> Result<()> {
        let checked = Setting::new(setting.id(), setting.value().clone())?;
        let bytes = checked.to_bytes()?;
        self.store(section::SETTING, u64::from(checked.id().raw()), &bytes)
    }

    pub fn remove_setting(&mut self, id: SettingId) -> Result<()> {
        self.container
            .remove_entry(section::SETTING, u64::from(id.raw()))
            .map(|_| ())
    }

    // Titles played

    pub fn title(&self, title_id: u32) -> Result<Option<TitlePlayed>> {
        self.container
            .decode_entry(section::TITLE, u64::from(title_id), TitlePlayed::from_bytes)
    }

    pub fn titles(&self) -> Result<Vec<TitlePlayed>> {
        self.decode_all(section::TITLE, TitlePlayed::from_bytes)
    }

    pub fn update_title(&mut self, title: &TitlePlayed) -> Result<()> {
        let bytes = title.to_bytes()?;
        self.store(section::TITLE, u64::from(title.title_id), &bytes)
    }

    // Images and strings

    pub fn image(&self, id: u64) -> Option<&[u8]> {
        self.container.data(section::IMAGE, id)
    }

    pub fn update_image(&mut self, id: u64, bytes: &[u8]) -> Result<()> {
        self.store(section::IMAGE, id, bytes)
    }

    pub fn string(&self, id: u64) -> Result<Option<String>> {
        self.container
            .decode_entry(section::STRING, id, |bytes| ByteReader::new(bytes).read_utf16_cstr())
    }

    pub fn update_string(&mut self, id: u64, text: &str) -> Result<()> {
        let mut bytes = Vec::new();
        put_utf16_cstr(&mut bytes, text)?;
        self.store(section::STRING, id, &bytes)
    }
}
