//! Free-range tracking for the data blob
//!
//! Uses B-tree-based extent tracking with automatic coalescing.
//! Each extent represents a contiguous byte range inside the blob.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::trace;

/// A contiguous byte range `[offset, offset + length)` in the data blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Extent {
    /// Starting byte offset
    pub offset: u32,
    /// Number of bytes
    pub length: u32,
}

impl Extent {
    pub fn new(offset: u32, length: u32) -> Self {
        Extent { offset, length }
    }

    /// One past the last byte, widened so `offset + length` cannot overflow
    pub fn end(&self) -> u64 {
        u64::from(self.offset) + u64::from(self.length)
    }

    /// Check if this extent contains a byte offset
    pub fn contains(&self, offset: u32) -> bool {
        offset >= self.offset && u64::from(offset) < self.end()
    }

    /// Check if this extent is adjacent to another (can be coalesced)
    pub fn is_adjacent(&self, other: &Extent) -> bool {
        self.end() == u64::from(other.offset) || other.end() == u64::from(self.offset)
    }

    /// Check if two extents share at least one byte
    pub fn overlaps(&self, other: &Extent) -> bool {
        u64::from(self.offset) < other.end() && u64::from(other.offset) < self.end()
    }

    /// Coalesce two adjacent extents
    pub fn coalesce(&self, other: &Extent) -> Option<Extent> {
        if !self.is_adjacent(other) {
            return None;
        }

        let new_start = self.offset.min(other.offset);
        let new_end = self.end().max(other.end());

        Some(Extent {
            offset: new_start,
            length: (new_end - u64::from(new_start)) as u32,
        })
    }
}

/// Free list of reclaimed blob ranges
///
/// Free extents are indexed by offset, so iteration is always sorted and
/// neighbours are found with a range query. Allocation is best-fit:
/// - the smallest range that fits wins, so larger ranges stay intact
/// - ranges that would leave a sliver below `min_split_size` are passed over
///   while a cleaner fit exists
/// - the leftover of a split is always re-inserted, so every byte stays
///   accounted for
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FreeList {
    free_extents: BTreeMap<u32, Extent>,

    /// Total free bytes across all extents
    free_bytes: u64,

    min_split_size: u32,
}

impl FreeList {
    pub fn new(min_split_size: u32) -> Self {
        FreeList {
            free_extents: BTreeMap::new(),
            free_bytes: 0,
            min_split_size,
        }
    }

    /// Insert a range exactly as given, without coalescing
    ///
    /// Used when loading a free table from disk so an unmodified container
    /// serializes back to the same bytes. Overlap checks are the caller's job.
    pub(crate) fn insert_raw(&mut self, extent: Extent) {
        if extent.length == 0 {
            return;
        }
        self.free_bytes += u64::from(extent.length);
        self.free_extents.insert(extent.offset, extent);
    }

    /// Pick the range best-fit allocation would use for `size` bytes
    pub fn best_fit(&self, size: u32) -> Option<Extent> {
        let fitting = self
            .free_extents
            .values()
            .filter(move |extent| extent.length >= size);

        let min_split = self.min_split_size;
        let clean = fitting
            .clone()
            .filter(|extent| {
                let leftover = extent.length - size;
                leftover == 0 || leftover >= min_split
            })
            .min_by_key(|extent| extent.length);

        clean
            .or_else(|| fitting.min_by_key(|extent| extent.length))
            .copied()
    }

    /// Take `size` bytes from the best-fitting free range
    ///
    /// Returns the offset of the allocated span, or `None` when no range is
    /// large enough and the caller has to grow the blob.
    pub fn take(&mut self, size: u32) -> Option<u32> {
        if size == 0 {
            return None;
        }

        let extent = self.best_fit(size)?;
        self.free_extents.remove(&extent.offset);
        self.free_bytes -= u64::from(extent.length);

        let remaining_length = extent.length - size;
        if remaining_length > 0 {
            let remaining = Extent::new(extent.offset + size, remaining_length);
            self.free_extents.insert(remaining.offset, remaining);
            self.free_bytes += u64::from(remaining_length);
        }

        trace!(
            "Allocated {} bytes at {} from free range of {}",
            size,
            extent.offset,
            extent.length
        );

        Some(extent.offset)
    }

    /// Return a range to the free list, merging with adjacent neighbours
    pub fn release(&mut self, extent: Extent) {
        if extent.length == 0 {
            return;
        }
        self.free_bytes += u64::from(extent.length);
        self.insert_and_coalesce(extent);
    }

    /// Insert a free extent and coalesce with adjacent extents
    fn insert_and_coalesce(&mut self, mut extent: Extent) {
        // Next extent (by offset) must start exactly where this one ends
        if let Ok(next_start) = u32::try_from(extent.end()) {
            if let Some(next_extent) = self.free_extents.get(&next_start).copied() {
                if let Some(merged) = extent.coalesce(&next_extent) {
                    extent = merged;
                    self.free_extents.remove(&next_start);
                }
            }
        }

        // Previous extent (by offset)
        if let Some((&prev_start, &prev_extent)) =
            self.free_extents.range(..extent.offset).next_back()
        {
            if let Some(merged) = prev_extent.coalesce(&extent) {
                extent = merged;
                self.free_extents.remove(&prev_start);
            }
        }

        self.free_extents.insert(extent.offset, extent);
    }

    /// Free extents in offset order
    pub fn iter(&self) -> impl Iterator<Item = &Extent> + '_ {
        self.free_extents.values()
    }

    /// Check if a byte offset lies inside any free range
    pub fn is_free(&self, offset: u32) -> bool {
        self.free_extents
            .range(..=offset)
            .next_back()
            .map(|(_, extent)| extent.contains(offset))
            .unwrap_or(false)
    }

    /// Get current number of free extents (fragmentation indicator)
    pub fn extent_count(&self) -> usize {
        self.free_extents.len()
    }

    pub fn free_bytes(&self) -> u64 {
        self.free_bytes
    }

    pub fn min_split_size(&self) -> u32 {
        self.min_split_size
    }

    pub fn is_empty(&self) -> bool {
        self.free_extents.is_empty()
    }

    /// Fragmentation score (0.0 = all free space contiguous)
    pub fn fragmentation_score(&self) -> f64 {
        if self.free_bytes == 0 {
            return 0.0;
        }

        let extent_count = self.free_extents.len();

        // Normalize: one extent is perfect, one extent per free byte is worst
        (extent_count as f64 - 1.0) / (self.free_bytes as f64).max(1.0)
    }
}
