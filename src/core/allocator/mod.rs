//! Space management for the data blob
//!
//! Entries and free ranges are plain `(offset, length)` pairs into one owned
//! byte buffer. Reclaimed ranges live in a [`FreeList`] that hands them back
//! out best-fit and merges neighbours as they are released.

pub mod extent;

pub use extent::{Extent, FreeList};
