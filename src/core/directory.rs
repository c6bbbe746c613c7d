//! Entry directory
//!
//! Maps `(section, id)` keys to byte ranges of one flat data blob. The blob
//! is owned here together with the free list, so every change of space
//! (allocate, free, relocate on resize) goes through one place.

use crate::allocator::{Extent, FreeList};
use crate::error::{Result, XdbfError};
use crate::wire::wire_len;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Directory key: section tag plus an id unique within that section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryKey {
    pub section: u16,
    pub id: u64,
}

impl EntryKey {
    pub fn new(section: u16, id: u64) -> Self {
        EntryKey { section, id }
    }
}

/// One stored record: key plus its span inside the blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub section: u16,
    pub id: u64,
    pub offset: u32,
    pub length: u32,
}

impl Entry {
    pub fn key(&self) -> EntryKey {
        EntryKey::new(self.section, self.id)
    }

    pub fn extent(&self) -> Extent {
        Extent::new(self.offset, self.length)
    }
}

/// Entry directory with its backing blob and free list
#[derive(Debug, Clone, Default)]
pub struct Directory {
    /// Entries in table order
    entries: Vec<Entry>,

    /// Key -> position in `entries`
    index: AHashMap<EntryKey, usize>,

    free: FreeList,

    blob: Vec<u8>,
}

impl Directory {
    /// Create an empty directory
    pub fn new(min_split_size: u32) -> Self {
        Directory {
            entries: Vec::new(),
            index: AHashMap::new(),
            free: FreeList::new(min_split_size),
            blob: Vec::new(),
        }
    }

    /// Assemble a directory from parsed tables
    ///
    /// Checks that every span lies inside the blob, that keys are unique and
    /// that no two spans (entries or free ranges) share a byte. Free ranges
    /// must be non-empty and listed in ascending offset order.
    pub fn from_parts(
        entries: Vec<Entry>,
        free_ranges: Vec<Extent>,
        blob: Vec<u8>,
        min_split_size: u32,
    ) -> Result<Self> {
        let blob_len = blob.len() as u64;
        let mut index = AHashMap::with_capacity(entries.len());
        let mut spans: Vec<(Extent, bool)> = Vec::with_capacity(entries.len() + free_ranges.len());

        for (slot, entry) in entries.iter().enumerate() {
            if entry.extent().end() > blob_len {
                return Err(XdbfError::MalformedTable(format!(
                    "entry ({}, {:#x}) spans {}..{} beyond data of {} bytes",
                    entry.section,
                    entry.id,
                    entry.offset,
                    entry.extent().end(),
                    blob_len
                )));
            }
            if index.insert(entry.key(), slot).is_some() {
                return Err(XdbfError::MalformedTable(format!(
                    "duplicate entry ({}, {:#x})",
                    entry.section, entry.id
                )));
            }
            if entry.length > 0 {
                spans.push((entry.extent(), false));
            }
        }

        let mut free = FreeList::new(min_split_size);
        let mut previous: Option<u32> = None;
        for range in free_ranges {
            if range.length == 0 {
                return Err(XdbfError::MalformedTable(format!(
                    "empty free range at {}",
                    range.offset
                )));
            }
            if previous.is_some_and(|offset| range.offset <= offset) {
                return Err(XdbfError::MalformedTable(format!(
                    "free range at {} out of order",
                    range.offset
                )));
            }
            previous = Some(range.offset);
            if range.end() > blob_len {
                return Err(XdbfError::MalformedTable(format!(
                    "free range {}..{} beyond data of {} bytes",
                    range.offset,
                    range.end(),
                    blob_len
                )));
            }
            spans.push((range, true));
            free.insert_raw(range);
        }

        spans.sort_by_key(|(extent, _)| extent.offset);
        for pair in spans.windows(2) {
            let (a, a_free) = pair[0];
            let (b, b_free) = pair[1];
            if a.overlaps(&b) {
                return Err(XdbfError::MalformedTable(format!(
                    "{} {}..{} overlaps {} {}..{}",
                    if a_free { "free range" } else { "entry" },
                    a.offset,
                    a.end(),
                    if b_free { "free range" } else { "entry" },
                    b.offset,
                    b.end()
                )));
            }
        }

        Ok(Directory {
            entries,
            index,
            free,
            blob,
        })
    }

    /// Find the entry for a key
    pub fn lookup(&self, section: u16, id: u64) -> Option<&Entry> {
        self.index
            .get(&EntryKey::new(section, id))
            .map(|&slot| &self.entries[slot])
    }

    /// Bytes of an entry
    pub fn data(&self, entry: &Entry) -> &[u8] {
        let start = entry.offset as usize;
        &self.blob[start..start + entry.length as usize]
    }

    /// Bytes stored under a key
    pub fn get(&self, section: u16, id: u64) -> Option<&[u8]> {
        self.lookup(section, id).map(|entry| self.data(entry))
    }

    /// Reserve `size` bytes of blob space and return the offset
    ///
    /// Reuses the best-fitting free range when one exists, otherwise extends
    /// the blob at its end.
    pub fn allocate(&mut self, size: u32) -> Result<u32> {
        if let Some(offset) = self.free.take(size) {
            return Ok(offset);
        }

        self.ensure_growable(size)?;
        let offset = self.blob.len() as u32;
        self.blob.resize(self.blob.len() + size as usize, 0);
        trace!("Grew data blob by {} bytes to {}", size, self.blob.len());
        Ok(offset)
    }

    /// Return a span to the free list
    pub fn free(&mut self, offset: u32, length: u32) {
        self.free.release(Extent::new(offset, length));
    }

    /// Store `bytes` under a key, creating or replacing the entry
    ///
    /// Same-length payloads are overwritten in place. Anything else frees the
    /// old span and moves the entry to a freshly allocated one.
    pub fn update(&mut self, section: u16, id: u64, bytes: &[u8]) -> Result<Entry> {
        let length = wire_len(bytes.len()).ok_or(XdbfError::RecordTooLarge(bytes.len()))?;
        let key = EntryKey::new(section, id);

        let slot = match self.index.get(&key).copied() {
            Some(slot) => {
                let entry = self.entries[slot];
                if entry.length == length {
                    let start = entry.offset as usize;
                    self.blob[start..start + bytes.len()].copy_from_slice(bytes);
                    trace!("Updated entry ({}, {:#x}) in place", section, id);
                    return Ok(entry);
                }

                // Check before freeing so a failed grow leaves the entry intact
                if self.free.best_fit(length).is_none() {
                    self.ensure_growable(length)?;
                }
                self.free(entry.offset, entry.length);
                Some(slot)
            }
            None => None,
        };

        let offset = self.allocate(length)?;
        let start = offset as usize;
        self.blob[start..start + bytes.len()].copy_from_slice(bytes);

        let entry = Entry {
            section,
            id,
            offset,
            length,
        };

        match slot {
            Some(slot) => {
                trace!(
                    "Relocated entry ({}, {:#x}) from {} to {} ({} bytes)",
                    section,
                    id,
                    self.entries[slot].offset,
                    offset,
                    length
                );
                self.entries[slot] = entry;
            }
            None => {
                trace!("Added entry ({}, {:#x}) at {} ({} bytes)", section, id, offset, length);
                self.index.insert(key, self.entries.len());
                self.entries.push(entry);
            }
        }

        Ok(entry)
    }

    /// Drop an entry and free its span
    pub fn remove(&mut self, section: u16, id: u64) -> Result<Entry> {
        let slot = self
            .index
            .remove(&EntryKey::new(section, id))
            .ok_or(XdbfError::EntryNotFound { section, id })?;

        let entry = self.entries.remove(slot);
        self.free(entry.offset, entry.length);

        for position in self.index.values_mut() {
            if *position > slot {
                *position -= 1;
            }
        }

        trace!("Removed entry ({}, {:#x})", section, id);
        Ok(entry)
    }

    fn ensure_growable(&self, size: u32) -> Result<()> {
        let new_len = self.blob.len() as u64 + u64::from(size);
        if new_len > u64::from(u32::MAX) {
            return Err(XdbfError::RecordTooLarge(size as usize));
        }
        Ok(())
    }

    /// All entries in table order
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Entries of one section in table order
    pub fn entries_in(&self, section: u16) -> impl Iterator<Item = &Entry> + '_ {
        self.entries
            .iter()
            .filter(move |entry| entry.section == section)
    }

    /// Free ranges sorted by offset
    pub fn free_ranges(&self) -> impl Iterator<Item = &Extent> + '_ {
        self.free.iter()
    }

    pub fn free_range_count(&self) -> usize {
        self.free.extent_count()
    }

    pub fn free_bytes(&self) -> u64 {
        self.free.free_bytes()
    }

    pub fn fragmentation_score(&self) -> f64 {
        self.free.fragmentation_score()
    }

    pub fn blob(&self) -> &[u8] {
        &self.blob
    }

    pub fn blob_len(&self) -> usize {
        self.blob.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
