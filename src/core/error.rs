use thiserror::Error;

#[derive(Error, Debug)]
pub enum XdbfError {
    #[error("Invalid magic number in header: {0:#010x}")]
    InvalidMagic(u32),

    #[error("Unsupported format version: {0}")]
    UnsupportedVersion(u32),

    #[error("Truncated container: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("Malformed table: {0}")]
    MalformedTable(String),

    #[error("Entry not found: section {section}, id {id:#x}")]
    EntryNotFound { section: u16, id: u64 },

    #[error("Insufficient capacity: need {required} bytes, buffer holds {available}")]
    InsufficientCapacity { required: usize, available: usize },

    #[error("Type mismatch for setting {setting_id:#010x}: expected {expected}, found {found}")]
    TypeMismatch {
        setting_id: u32,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Corrupt record: section {section}, id {id:#x}: {reason}")]
    CorruptRecord {
        section: u16,
        id: u64,
        reason: String,
    },

    #[error("Record too large for the wire format: {0} bytes")]
    RecordTooLarge(usize),

    #[error("String cannot be stored null-terminated: {0:?}")]
    InvalidString(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl XdbfError {
    /// True for the errors `Container::read` reports on a bad magic or version
    pub fn is_malformed_header(&self) -> bool {
        matches!(
            self,
            XdbfError::InvalidMagic(_) | XdbfError::UnsupportedVersion(_)
        )
    }

    pub(crate) fn corrupt(section: u16, id: u64, reason: impl Into<String>) -> Self {
        XdbfError::CorruptRecord {
            section,
            id,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, XdbfError>;
