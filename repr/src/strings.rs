//! String tables
//!
//! Names and link targets are deduplicated byte strings. A string table is a
//! single region holding `count + 1` little-endian `u32` offsets followed by
//! the byte pool; string `k` is `pool[offsets[k]..offsets[k + 1]]`. Offsets
//! are relative to the pool, non-decreasing, and the final offset equals the
//! pool length, so every string read is bounded by construction.

use zerocopy::{AsBytes, FromBytes, Unaligned};

/// An element of a string table's offset array
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, AsBytes, FromBytes, Unaligned)]
#[repr(C, packed)]
pub struct Offset(pub u32);

/// The position of a string within a string table
///
/// The link index stores these biased by `link_index_offset`: subtract the
/// bias to index the links table.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, AsBytes, FromBytes, Unaligned)]
#[repr(C, packed)]
pub struct Idx(pub u32);
