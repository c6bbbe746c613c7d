//! Codec configuration
//!
//! Tunables for the free-range allocator and for how new containers are laid
//! out. Defaults match what the console itself writes; configs can also be
//! loaded from TOML:
//!
//! ```toml
//! min_split_size = 16
//! entry_table_reserve = 32
//! end_marker = true
//! ```

use crate::error::{Result, XdbfError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default minimum size of a leftover free range worth keeping apart
pub const DEFAULT_MIN_SPLIT_SIZE: u32 = 8;

/// Container configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Smallest leftover (bytes) the allocator prefers to leave behind when it
    /// splits a free range. Ranges that would leave a smaller sliver are only
    /// used when nothing else fits.
    pub min_split_size: u32,

    /// Empty entry slots reserved in the table of a newly created container
    pub entry_table_reserve: u32,

    /// Emit the end-of-data marker as the last free table slot
    pub end_marker: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        ContainerConfig {
            min_split_size: DEFAULT_MIN_SPLIT_SIZE,
            entry_table_reserve: 0,
            end_marker: true,
        }
    }
}

impl ContainerConfig {
    /// Config producing the most compact output: no reserved slots, no marker
    pub fn compact() -> Self {
        ContainerConfig {
            entry_table_reserve: 0,
            end_marker: false,
            ..Default::default()
        }
    }

    /// Parse a config from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| XdbfError::Config(e.to_string()))
    }

    /// Load a config from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Serialize to TOML text
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| XdbfError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ContainerConfig::default();
        assert_eq!(config.min_split_size, DEFAULT_MIN_SPLIT_SIZE);
        assert_eq!(config.entry_table_reserve, 0);
        assert!(config.end_marker);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = ContainerConfig::from_toml_str("min_split_size = 32").unwrap();
        assert_eq!(config.min_split_size, 32);
        assert!(config.end_marker);
    }

    #[test]
    fn test_invalid_toml() {
        let result = ContainerConfig::from_toml_str("min_split_size = \"big\"");
        assert!(matches!(result, Err(XdbfError::Config(_))));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ContainerConfig {
            min_split_size: 4,
            entry_table_reserve: 16,
            end_marker: false,
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(ContainerConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "entry_table_reserve = 8\nend_marker = false").unwrap();

        let config = ContainerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.entry_table_reserve, 8);
        assert!(!config.end_marker);
        assert_eq!(config.min_split_size, DEFAULT_MIN_SPLIT_SIZE);
    }

    #[test]
    fn test_missing_file() {
        let result = ContainerConfig::from_file("/nonexistent/xdbf.toml");
        assert!(matches!(result, Err(XdbfError::Io(_))));
    }
}
