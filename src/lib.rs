//! # xdbf-rs - XDBF Container Codec
//!
//! `xdbf-rs` reads and writes XDBF containers, the big-endian format used for
//! console player profiles (GPD) and title metadata (SPA):
//!
//! - **Whole-container codec** with exact-size writes and failure-atomic reads
//! - **Entry directory** with best-fit reuse of freed space in the data blob
//! - **Typed records**: settings, achievements, titles played
//! - **Views**: [`Profile`] for read/write profile access, [`TitleMetadata`]
//!   for localized title metadata
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use xdbf_rs::{Container, Profile, Result, Setting, SettingId, SettingValue};
//!
//! # fn main() -> Result<()> {
//! # let bytes: Vec<u8> = Vec::new();
//! let mut container = Container::from_bytes(&bytes)?;
//!
//! {
//!     let mut profile = Profile::new(&mut container, 0x4D53_07E6);
//!     profile.unlock_achievement(3, true)?;
//!
//!     let motto = Setting::new(
//!         SettingId::GAMERCARD_MOTTO,
//!         SettingValue::Unicode("one more game".into()),
//!     )?;
//!     profile.update_setting(&motto)?;
//! }
//!
//! let mut out = vec![0u8; container.required_size()];
//! container.write_to(&mut out)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Title Metadata
//!
//! ```rust,no_run
//! use xdbf_rs::{Container, Language, Result, TitleMetadata};
//!
//! # fn main() -> Result<()> {
//! # let bytes: Vec<u8> = Vec::new();
//! let container = Container::from_bytes(&bytes)?;
//! let spa = TitleMetadata::new(&container);
//!
//! println!("{:?}", spa.title_name()?);
//! for achievement in spa.achievements(Language::English)? {
//!     println!("{} ({}G)", achievement.label, achievement.gamerscore);
//! }
//! # Ok(())
//! # }
//! ```

pub mod core;

// Re-export core modules internally so crate:: paths in core still work
#[allow(unused_imports)]
pub(crate) use crate::core::{
    achievement, allocator, config, container, directory, error, gpd, header, setting, spa, time,
    title, wire,
};

pub use crate::core::{
    achievement::{Achievement, AchievementKind, AchievementPlatform},
    allocator::{Extent, FreeList},
    config::ContainerConfig,
    container::Container,
    directory::{Directory, Entry, EntryKey},
    error::{Result, XdbfError},
    gpd::Profile,
    header::Header,
    setting::{Setting, SettingId, SettingValue, UserDataType},
    spa::{
        AchievementDefinition, AchievementTable, Language, LanguageInfo, StringTable,
        TitleHeader, TitleMetadata,
    },
    title::{AvatarAwardCounter, TitlePlayed},
    wire::WireError,
};
