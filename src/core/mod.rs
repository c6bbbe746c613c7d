//! XDBF container format
//!
//! Big-endian container used for console profile (GPD) and title metadata
//! (SPA) files.
//!
//! ## Storage layer
//!
//! - [`header`] - 24-byte container header with magic number and table sizes
//! - [`allocator`] - Free-space tracking over the data blob
//! - [`directory`] - Entry directory keyed by (section, id)
//! - [`container`] - Whole-container read and write
//! - [`wire`] - Big-endian cursor and string helpers
//!
//! ## Records and views
//!
//! - [`setting`], [`achievement`], [`title`] - Profile record codecs
//! - [`gpd`] - Read/write profile view
//! - [`spa`] - Read-only title metadata view and section codecs
//!
//! ## Ambient
//!
//! - [`error`] - Error types
//! - [`config`] - Container configuration (TOML loadable)
//! - [`time`] - FILETIME conversions

pub mod achievement;
pub mod allocator;
pub mod config;
pub mod container;
pub mod directory;
pub mod error;
pub mod gpd;
pub mod header;
pub mod setting;
pub mod spa;
pub mod time;
pub mod title;
pub mod wire;

pub use container::Container;
pub use error::{Result, XdbfError};
