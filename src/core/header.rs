use crate::error::{Result, XdbfError};
use serde::{Deserialize, Serialize};

/// "XDBF"
pub const MAGIC: u32 = 0x5844_4246;
pub const VERSION: u32 = 1;

pub const HEADER_SIZE: usize = 24;
/// section u16 + id u64 + offset u32 + length u32
pub const ENTRY_SLOT_SIZE: usize = 18;
/// offset u32 + length u32
pub const FREE_SLOT_SIZE: usize = 8;

/// Container header
///
/// Sits at byte 0 and sizes the two tables that follow it. Each table has a
/// slot capacity and a used count; slots past the used count are padding and
/// the data blob starts right after the last free-table slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Magic number: "XDBF"
    pub magic: u32,

    /// Format version
    pub version: u32,

    /// Number of entry table slots
    pub entry_capacity: u32,

    /// Number of entry slots in use
    pub entry_count: u32,

    /// Number of free table slots
    pub free_capacity: u32,

    /// Number of free slots in use
    pub free_count: u32,
}

impl Header {
    /// Create a new header with default values
    pub fn new() -> Self {
        Header {
            magic: MAGIC,
            version: VERSION,
            entry_capacity: 0,
            entry_count: 0,
            free_capacity: 0,
            free_count: 0,
        }
    }

    /// Validate the header magic, version and table counts
    pub fn validate(&self) -> Result<()> {
        if self.magic != MAGIC {
            return Err(XdbfError::InvalidMagic(self.magic));
        }

        // Check version compatibility (exact match)
        if self.version != VERSION {
            return Err(XdbfError::UnsupportedVersion(self.version));
        }

        if self.entry_count > self.entry_capacity {
            return Err(XdbfError::MalformedTable(format!(
                "entry count ({}) exceeds entry table capacity ({})",
                self.entry_count, self.entry_capacity
            )));
        }

        if self.free_count > self.free_capacity {
            return Err(XdbfError::MalformedTable(format!(
                "free count ({}) exceeds free table capacity ({})",
                self.free_count, self.free_capacity
            )));
        }

        Ok(())
    }

    /// Byte offset where the data blob starts
    pub fn data_offset(&self) -> usize {
        HEADER_SIZE
            + self.entry_capacity as usize * ENTRY_SLOT_SIZE
            + self.free_capacity as usize * FREE_SLOT_SIZE
    }

    /// Serialize header to bytes
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        let fields = [
            self.magic,
            self.version,
            self.entry_capacity,
            self.entry_count,
            self.free_capacity,
            self.free_count,
        ];
        for (chunk, field) in bytes.chunks_exact_mut(4).zip(fields) {
            chunk.copy_from_slice(&field.to_be_bytes());
        }
        bytes
    }

    /// Deserialize and validate a header from the start of `bytes`
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(XdbfError::Truncated {
                needed: HEADER_SIZE,
                available: bytes.len(),
            });
        }

        let field = |index: usize| {
            let start = index * 4;
            u32::from_be_bytes([
                bytes[start],
                bytes[start + 1],
                bytes[start + 2],
                bytes[start + 3],
            ])
        };

        let header = Header {
            magic: field(0),
            version: field(1),
            entry_capacity: field(2),
            entry_count: field(3),
            free_capacity: field(4),
            free_count: field(5),
        };

        header.validate()?;

        Ok(header)
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_creation() {
        let header = Header::new();
        assert_eq!(header.magic, MAGIC);
        assert_eq!(header.version, VERSION);
        assert_eq!(header.data_offset(), HEADER_SIZE);
        assert!(header.validate().is_ok());
    }

    #[test]
    fn test_magic_is_ascii_xdbf() {
        assert_eq!(&MAGIC.to_be_bytes(), b"XDBF");
        assert_eq!(&Header::new().to_bytes()[..4], b"XDBF");
    }

    #[test]
    fn test_invalid_magic() {
        let mut header = Header::new();
        header.magic = 0x4445_4144;
        let err = header.validate().unwrap_err();
        assert!(matches!(err, XdbfError::InvalidMagic(0x4445_4144)));
        assert!(err.is_malformed_header());
    }

    #[test]
    fn test_invalid_version() {
        let mut header = Header::new();
        header.version = 2;
        let err = header.validate().unwrap_err();
        assert!(matches!(err, XdbfError::UnsupportedVersion(2)));
        assert!(err.is_malformed_header());
    }

    #[test]
    fn test_count_exceeds_capacity() {
        let mut header = Header::new();
        header.entry_capacity = 4;
        header.entry_count = 5;
        assert!(matches!(
            header.validate(),
            Err(XdbfError::MalformedTable(_))
        ));

        let mut header = Header::new();
        header.free_count = 1;
        assert!(matches!(
            header.validate(),
            Err(XdbfError::MalformedTable(_))
        ));
    }

    #[test]
    fn test_header_serialization() {
        let header = Header {
            entry_capacity: 512,
            entry_count: 17,
            free_capacity: 512,
            free_count: 3,
            ..Header::new()
        };

        let bytes = header.to_bytes();
        assert_eq!(&bytes[8..12], &[0, 0, 2, 0]);
        assert_eq!(&bytes[12..16], &[0, 0, 0, 17]);

        let deserialized = Header::from_bytes(&bytes).unwrap();
        assert_eq!(deserialized, header);
        assert_eq!(
            deserialized.data_offset(),
            HEADER_SIZE + 512 * ENTRY_SLOT_SIZE + 512 * FREE_SLOT_SIZE
        );
    }

    #[test]
    fn test_truncated_header() {
        let bytes = Header::new().to_bytes();
        assert!(matches!(
            Header::from_bytes(&bytes[..10]),
            Err(XdbfError::Truncated {
                needed: HEADER_SIZE,
                available: 10
            })
        ));
    }
}
