//! Title metadata (SPA) containers
//!
//! An SPA container describes a title: its localized string tables, the
//! achievement definitions that reference them, the default language, the
//! title header and the title icon. Each metadata record starts with a
//! common big-endian header:
//!
//! ```text
//! magic   u32  ("XACH", "XSTR", "XSTC", "XTHD")
//! version u32
//! size    u32  (bytes following this field)
//! ```

use crate::achievement::Achievement;
use crate::container::Container;
use crate::error::{Result, XdbfError};
use crate::wire::{wire_len, ByteReader, WireError, WireResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Section numbers used by SPA containers
pub mod section {
    pub const METADATA: u16 = 1;
    pub const IMAGE: u16 = 2;
    pub const STRING_TABLE: u16 = 3;
}

/// "XACH"
pub const XACH_MAGIC: u32 = 0x5841_4348;
/// "XSTR"
pub const XSTR_MAGIC: u32 = 0x5853_5452;
/// "XSTC"
pub const XSTC_MAGIC: u32 = 0x5853_5443;
/// "XTHD"
pub const XTHD_MAGIC: u32 = 0x5854_4844;

/// Id of the title icon in the image section and of the title name string
pub const TITLE_RESOURCE_ID: u16 = 0x8000;

const SECTION_VERSION: u32 = 1;
const SECTION_HEADER_SIZE: usize = 12;
const XACH_ENTRY_SIZE: usize = 36;

/// String table language, also the entry id of its XSTR record
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    English = 1,
    Japanese = 2,
    German = 3,
    French = 4,
    Spanish = 5,
    Italian = 6,
    Korean = 7,
    TraditionalChinese = 8,
    Portuguese = 9,
    SimplifiedChinese = 10,
    Polish = 11,
    Russian = 12,
}

impl Language {
    pub const ALL: [Language; 12] = [
        Language::English,
        Language::Japanese,
        Language::German,
        Language::French,
        Language::Spanish,
        Language::Italian,
        Language::Korean,
        Language::TraditionalChinese,
        Language::Portuguese,
        Language::SimplifiedChinese,
        Language::Polish,
        Language::Russian,
    ];

    pub fn from_u32(value: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|lang| *lang as u32 == value)
    }

    /// Entry id of this language's string table
    pub fn entry_id(&self) -> u64 {
        *self as u64
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Read the common section header and return a reader bounded to the body
fn open_section<'a>(reader: &mut ByteReader<'a>, magic: u32) -> WireResult<ByteReader<'a>> {
    let found = reader.read_u32()?;
    if found != magic {
        return Err(WireError::BadMagic(found));
    }
    let _version = reader.read_u32()?;
    let size = reader.read_u32()? as usize;
    Ok(ByteReader::new(reader.take(size)?))
}

/// Prefix `body` with the common section header
fn close_section(magic: u32, body: Vec<u8>) -> Result<Vec<u8>> {
    let size = wire_len(body.len()).ok_or(XdbfError::RecordTooLarge(body.len()))?;
    let mut bytes = Vec::with_capacity(SECTION_HEADER_SIZE + body.len());
    bytes.extend_from_slice(&magic.to_be_bytes());
    bytes.extend_from_slice(&SECTION_VERSION.to_be_bytes());
    bytes.extend_from_slice(&size.to_be_bytes());
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

fn wire_count(count: usize) -> Result<u16> {
    u16::try_from(count).map_err(|_| XdbfError::RecordTooLarge(count))
}

/// Localized strings for one language (XSTR)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringTable {
    /// (string id, text) in record order
    pub strings: Vec<(u16, String)>,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, string_id: u16) -> Option<&str> {
        self.strings
            .iter()
            .find(|(id, _)| *id == string_id)
            .map(|(_, text)| text.as_str())
    }

    /// Insert or replace a string
    pub fn set(&mut self, string_id: u16, text: impl Into<String>) {
        let text = text.into();
        match self.strings.iter_mut().find(|(id, _)| *id == string_id) {
            Some(slot) => slot.1 = text,
            None => self.strings.push((string_id, text)),
        }
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        body.extend_from_slice(&wire_count(self.strings.len())?.to_be_bytes());
        for (id, text) in &self.strings {
            body.extend_from_slice(&id.to_be_bytes());
            body.extend_from_slice(&wire_count(text.len())?.to_be_bytes());
            body.extend_from_slice(text.as_bytes());
        }
        close_section(XSTR_MAGIC, body)
    }

    pub fn from_bytes(bytes: &[u8]) -> WireResult<Self> {
        let mut body = open_section(&mut ByteReader::new(bytes), XSTR_MAGIC)?;
        let count = body.read_u16()?;
        let mut strings = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let id = body.read_u16()?;
            let len = body.read_u16()? as usize;
            let text = std::str::from_utf8(body.take(len)?).map_err(|_| WireError::InvalidUtf8)?;
            strings.push((id, text.to_string()));
        }
        Ok(StringTable { strings })
    }
}

/// Achievement definition as stored in title metadata
///
/// Text is referenced by string id and resolved per language.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementDefinition {
    pub id: u16,
    pub label_id: u16,
    pub description_id: u16,
    pub unachieved_id: u16,
    pub image_id: u32,
    pub gamerscore: u16,
    pub flags: u32,
}

impl AchievementDefinition {
    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.id.to_be_bytes());
        out.extend_from_slice(&self.label_id.to_be_bytes());
        out.extend_from_slice(&self.description_id.to_be_bytes());
        out.extend_from_slice(&self.unachieved_id.to_be_bytes());
        out.extend_from_slice(&self.image_id.to_be_bytes());
        out.extend_from_slice(&self.gamerscore.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&self.flags.to_be_bytes());
        out.extend_from_slice(&[0u8; 16]);
    }

    fn read(reader: &mut ByteReader<'_>) -> WireResult<Self> {
        let mut entry = ByteReader::new(reader.take(XACH_ENTRY_SIZE)?);
        let id = entry.read_u16()?;
        let label_id = entry.read_u16()?;
        let description_id = entry.read_u16()?;
        let unachieved_id = entry.read_u16()?;
        let image_id = entry.read_u32()?;
        let gamerscore = entry.read_u16()?;
        entry.skip(2)?;
        let flags = entry.read_u32()?;
        Ok(AchievementDefinition {
            id,
            label_id,
            description_id,
            unachieved_id,
            image_id,
            gamerscore,
            flags,
        })
    }

    /// Resolve against a string table; missing strings become empty
    pub fn localize(&self, strings: &StringTable) -> Achievement {
        let text = |id: u16| strings.get(id).unwrap_or_default().to_string();
        Achievement {
            id: self.id,
            label: text(self.label_id),
            description: text(self.description_id),
            unachieved_description: text(self.unachieved_id),
            image_id: self.image_id,
            gamerscore: u32::from(self.gamerscore),
            flags: self.flags,
            unlock_time: 0,
        }
    }
}

/// Achievement definitions (XACH)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementTable {
    pub achievements: Vec<AchievementDefinition>,
}

impl AchievementTable {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut body = Vec::with_capacity(2 + self.achievements.len() * XACH_ENTRY_SIZE);
        body.extend_from_slice(&wire_count(self.achievements.len())?.to_be_bytes());
        for achievement in &self.achievements {
            achievement.write(&mut body);
        }
        close_section(XACH_MAGIC, body)
    }

    pub fn from_bytes(bytes: &[u8]) -> WireResult<Self> {
        let mut body = open_section(&mut ByteReader::new(bytes), XACH_MAGIC)?;
        let count = body.read_u16()?;
        let achievements = (0..count)
            .map(|_| AchievementDefinition::read(&mut body))
            .collect::<WireResult<Vec<_>>>()?;
        Ok(AchievementTable { achievements })
    }
}

/// Language configuration (XSTC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageInfo {
    /// Raw language number; unknown values are kept as-is
    pub default_language: u32,
}

impl LanguageInfo {
    pub fn new(default_language: Language) -> Self {
        LanguageInfo {
            default_language: default_language as u32,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        close_section(XSTC_MAGIC, self.default_language.to_be_bytes().to_vec())
    }

    pub fn from_bytes(bytes: &[u8]) -> WireResult<Self> {
        let mut body = open_section(&mut ByteReader::new(bytes), XSTC_MAGIC)?;
        Ok(LanguageInfo {
            default_language: body.read_u32()?,
        })
    }
}

/// Title identity and version (XTHD)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleHeader {
    pub title_id: u32,
    pub title_type: u32,
    pub version_major: u16,
    pub version_minor: u16,
    pub version_build: u16,
    pub version_revision: u16,
}

impl TitleHeader {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut body = Vec::with_capacity(28);
        body.extend_from_slice(&self.title_id.to_be_bytes());
        body.extend_from_slice(&self.title_type.to_be_bytes());
        body.extend_from_slice(&self.version_major.to_be_bytes());
        body.extend_from_slice(&self.version_minor.to_be_bytes());
        body.extend_from_slice(&self.version_build.to_be_bytes());
        body.extend_from_slice(&self.version_revision.to_be_bytes());
        body.extend_from_slice(&[0u8; 12]);
        close_section(XTHD_MAGIC, body)
    }

    pub fn from_bytes(bytes: &[u8]) -> WireResult<Self> {
        let mut body = open_section(&mut ByteReader::new(bytes), XTHD_MAGIC)?;
        Ok(TitleHeader {
            title_id: body.read_u32()?,
            title_type: body.read_u32()?,
            version_major: body.read_u16()?,
            version_minor: body.read_u16()?,
            version_build: body.read_u16()?,
            version_revision: body.read_u16()?,
        })
    }
}

/// Read-only view of a title metadata container
#[derive(Debug, Clone, Copy)]
pub struct TitleMetadata<'a> {
    container: &'a Container,
}

impl<'a> TitleMetadata<'a> {
    pub fn new(container: &'a Container) -> Self {
        TitleMetadata { container }
    }

    pub fn container(&self) -> &'a Container {
        self.container
    }

    /// String table for `language`, `None` when the title has no such table
    pub fn string_table(&self, language: Language) -> Result<Option<StringTable>> {
        self.container.decode_entry(
            section::STRING_TABLE,
            language.entry_id(),
            StringTable::from_bytes,
        )
    }

    pub fn string(&self, language: Language, string_id: u16) -> Result<Option<String>> {
        Ok(self
            .string_table(language)?
            .and_then(|table| table.get(string_id).map(str::to_string)))
    }

    /// Raw achievement definitions, empty when the title has none
    pub fn achievement_definitions(&self) -> Result<Vec<AchievementDefinition>> {
        Ok(self
            .container
            .decode_entry(section::METADATA, XACH_MAGIC as u64, AchievementTable::from_bytes)?
            .map(|table| table.achievements)
            .unwrap_or_default())
    }

    /// Achievements with text resolved in `language`
    pub fn achievements(&self, language: Language) -> Result<Vec<Achievement>> {
        let definitions = self.achievement_definitions()?;
        if definitions.is_empty() {
            return Ok(Vec::new());
        }

        let strings = self.string_table(language)?.unwrap_or_default();
        Ok(definitions
            .iter()
            .map(|definition| definition.localize(&strings))
            .collect())
    }

    /// Title icon bytes
    pub fn icon(&self) -> Option<&'a [u8]> {
        self.container
            .data(section::IMAGE, u64::from(TITLE_RESOURCE_ID))
    }

    /// Image referenced by an achievement's `image_id`
    pub fn image(&self, image_id: u32) -> Option<&'a [u8]> {
        self.container.data(section::IMAGE, u64::from(image_id))
    }

    /// Default language, English when unset or unreadable
    pub fn default_language(&self) -> Language {
        let info = match self.container.decode_entry(
            section::METADATA,
            XSTC_MAGIC as u64,
            LanguageInfo::from_bytes,
        ) {
            Ok(Some(info)) => info,
            Ok(None) => return Language::English,
            Err(e) => {
                warn!("Ignoring unreadable language record: {}", e);
                return Language::English;
            }
        };

        Language::from_u32(info.default_language).unwrap_or_else(|| {
            warn!("Unknown default language {}", info.default_language);
            Language::English
        })
    }

    /// Title name in the default language
    pub fn title_name(&self) -> Result<Option<String>> {
        self.string(self.default_language(), TITLE_RESOURCE_ID)
    }

    pub fn title_data(&self) -> Result<Option<TitleHeader>> {
        self.container
            .decode_entry(section::METADATA, XTHD_MAGIC as u64, TitleHeader::from_bytes)
    }
}
