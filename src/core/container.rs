//! XDBF container codec
//!
//! Parses and serializes the whole container as one unit:
//!
//! ```text
//! [header: 24 bytes]
//! [entry table: entry_capacity x 18 bytes]
//! [free table:  free_capacity  x  8 bytes]
//! [data blob:   rest of the buffer]
//! ```
//!
//! Reading only validates structure; record contents are decoded lazily by
//! the views in `spa` and `gpd`.

use crate::allocator::Extent;
use crate::config::ContainerConfig;
use crate::directory::{Directory, Entry};
use crate::error::{Result, XdbfError};
use crate::header::{Header, ENTRY_SLOT_SIZE, FREE_SLOT_SIZE, HEADER_SIZE};
use crate::wire::{ByteReader, WireError, WireResult};
use tracing::{debug, warn};

/// An XDBF container: header, entry directory, free list and data blob
#[derive(Debug, Clone)]
pub struct Container {
    directory: Directory,

    /// Entry table slots declared on disk (at least the entry count)
    entry_capacity: u32,

    /// Free table slots declared on disk (at least the free count)
    free_capacity: u32,

    /// Whether the free table ends with the end-of-data marker
    end_marker: bool,

    config: ContainerConfig,
}

impl Container {
    /// Create an empty container with the default configuration
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    /// Create an empty container
    pub fn with_config(config: ContainerConfig) -> Self {
        Container {
            directory: Directory::new(config.min_split_size),
            entry_capacity: config.entry_table_reserve,
            free_capacity: 0,
            end_marker: config.end_marker,
            config,
        }
    }

    /// Parse a container with the default configuration
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes_with_config(bytes, ContainerConfig::default())
    }

    pub fn from_bytes_with_config(bytes: &[u8], config: ContainerConfig) -> Result<Self> {
        let header = Header::from_bytes(bytes)?;

        let data_offset = header.data_offset();
        if bytes.len() < data_offset {
            return Err(XdbfError::Truncated {
                needed: data_offset,
                available: bytes.len(),
            });
        }

        let table_err = |e: WireError| XdbfError::MalformedTable(format!("table slot: {}", e));

        let mut entry_table = ByteReader::new(&bytes[HEADER_SIZE..]);
        let mut entries = Vec::with_capacity(header.entry_count as usize);
        for _ in 0..header.entry_count {
            entries.push(Entry {
                section: entry_table.read_u16().map_err(table_err)?,
                id: entry_table.read_u64().map_err(table_err)?,
                offset: entry_table.read_u32().map_err(table_err)?,
                length: entry_table.read_u32().map_err(table_err)?,
            });
        }

        let free_start = HEADER_SIZE + header.entry_capacity as usize * ENTRY_SLOT_SIZE;
        let mut free_table = ByteReader::new(&bytes[free_start..]);
        let mut free_ranges = Vec::with_capacity(header.free_count as usize);
        for _ in 0..header.free_count {
            free_ranges.push(Extent::new(
                free_table.read_u32().map_err(table_err)?,
                free_table.read_u32().map_err(table_err)?,
            ));
        }

        let blob = bytes[data_offset..].to_vec();
        if blob.len() > u32::MAX as usize {
            return Err(XdbfError::MalformedTable(format!(
                "data blob of {} bytes exceeds the 32-bit offset range",
                blob.len()
            )));
        }

        let end_marker = match free_ranges.last() {
            Some(last) if is_end_marker(last, blob.len()) => {
                free_ranges.pop();
                true
            }
            _ => false,
        };

        let directory =
            Directory::from_parts(entries, free_ranges, blob, config.min_split_size)?;

        debug!(
            "Read container: {} entries, {} free ranges, {} data bytes",
            directory.len(),
            directory.free_range_count(),
            directory.blob_len()
        );

        Ok(Container {
            directory,
            entry_capacity: header.entry_capacity,
            free_capacity: header.free_capacity,
            end_marker,
            config,
        })
    }

    /// Replace this container's contents with the parsed `bytes`
    ///
    /// On failure the container is left exactly as it was.
    pub fn read(&mut self, bytes: &[u8]) -> Result<()> {
        match Self::from_bytes_with_config(bytes, self.config.clone()) {
            Ok(parsed) => {
                *self = parsed;
                Ok(())
            }
            Err(e) => {
                warn!("Rejected container of {} bytes: {}", bytes.len(), e);
                Err(e)
            }
        }
    }

    /// Header this container serializes with
    pub fn header(&self) -> Header {
        let entry_count = self.directory.len() as u32;
        let free_count = self.directory.free_range_count() as u32 + u32::from(self.end_marker);

        Header {
            entry_capacity: self.entry_capacity.max(entry_count),
            entry_count,
            free_capacity: self.free_capacity.max(free_count),
            free_count,
            ..Header::new()
        }
    }

    /// Exact size of the serialized container
    pub fn required_size(&self) -> usize {
        self.header().data_offset() + self.directory.blob_len()
    }

    /// Serialize into `buf`, returning the number of bytes written
    ///
    /// Fails with `InsufficientCapacity` carrying the exact required size when
    /// `buf` is too small; nothing is written in that case.
    pub fn write_to(&self, buf: &mut [u8]) -> Result<usize> {
        let header = self.header();
        let required = header.data_offset() + self.directory.blob_len();
        if buf.len() < required {
            return Err(XdbfError::InsufficientCapacity {
                required,
                available: buf.len(),
            });
        }

        self.serialize_into(&header, &mut buf[..required]);

        debug!(
            "Wrote container: {} entries, {} free ranges, {} bytes",
            header.entry_count, header.free_count, required
        );

        Ok(required)
    }

    /// Serialize into a freshly allocated buffer
    pub fn to_bytes(&self) -> Vec<u8> {
        let header = self.header();
        let mut bytes = vec![0u8; header.data_offset() + self.directory.blob_len()];
        self.serialize_into(&header, &mut bytes);
        bytes
    }

    fn serialize_into(&self, header: &Header, out: &mut [u8]) {
        out[..HEADER_SIZE].copy_from_slice(&header.to_bytes());

        let mut pos = HEADER_SIZE;
        for entry in self.directory.entries() {
            let slot = &mut out[pos..pos + ENTRY_SLOT_SIZE];
            slot[0..2].copy_from_slice(&entry.section.to_be_bytes());
            slot[2..10].copy_from_slice(&entry.id.to_be_bytes());
            slot[10..14].copy_from_slice(&entry.offset.to_be_bytes());
            slot[14..18].copy_from_slice(&entry.length.to_be_bytes());
            pos += ENTRY_SLOT_SIZE;
        }

        let free_start = HEADER_SIZE + header.entry_capacity as usize * ENTRY_SLOT_SIZE;
        out[pos..free_start].fill(0);
        pos = free_start;

        let blob_len = self.directory.blob_len() as u32;
        let marker = self
            .end_marker
            .then(|| Extent::new(blob_len, u32::MAX - blob_len));
        for range in self.directory.free_ranges().copied().chain(marker) {
            out[pos..pos + 4].copy_from_slice(&range.offset.to_be_bytes());
            out[pos + 4..pos + FREE_SLOT_SIZE].copy_from_slice(&range.length.to_be_bytes());
            pos += FREE_SLOT_SIZE;
        }

        let data_offset = header.data_offset();
        out[pos..data_offset].fill(0);
        out[data_offset..].copy_from_slice(self.directory.blob());
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn directory_mut(&mut self) -> &mut Directory {
        &mut self.directory
    }

    /// Find the entry for a key
    pub fn entry(&self, section: u16, id: u64) -> Option<&Entry> {
        self.directory.lookup(section, id)
    }

    /// Bytes stored under a key
    pub fn data(&self, section: u16, id: u64) -> Option<&[u8]> {
        self.directory.get(section, id)
    }

    /// Store `bytes` under a key, creating or replacing the entry
    pub fn update_entry(&mut self, section: u16, id: u64, bytes: &[u8]) -> Result<Entry> {
        self.directory.update(section, id, bytes)
    }

    pub fn remove_entry(&mut self, section: u16, id: u64) -> Result<Entry> {
        self.directory.remove(section, id)
    }

    pub fn entries(&self) -> &[Entry] {
        self.directory.entries()
    }

    /// Decode the record stored under a key
    ///
    /// Absent keys are `Ok(None)`; a record that fails to decode is reported
    /// as `CorruptRecord` for that key only.
    pub(crate) fn decode_entry<T>(
        &self,
        section: u16,
        id: u64,
        decode: impl FnOnce(&[u8]) -> WireResult<T>,
    ) -> Result<Option<T>> {
        let Some(bytes) = self.directory.get(section, id) else {
            return Ok(None);
        };
        decode(bytes).map(Some).map_err(|e| {
            warn!("Corrupt record ({}, {:#x}): {}", section, id, e);
            XdbfError::corrupt(section, id, e.to_string())
        })
    }

    pub fn has_end_marker(&self) -> bool {
        self.end_marker
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.directory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directory.is_empty()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

fn is_end_marker(range: &Extent, blob_len: usize) -> bool {
    range.offset as usize == blob_len && range.length == u32::MAX - range.offset
}
