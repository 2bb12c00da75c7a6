//! Chunk records
//!
//! A regular file's content is the concatenation of its chunks, each naming
//! a byte range in the logical compressed-block space. The chunk index maps
//! a regular-file inode `i` to the half-open range
//! `[chunk_index[i'], chunk_index[i' + 1])` of chunk records, where
//! `i' = i - chunk_index_offset`. Identical content shares chunk records
//! between files; a file's size is the sum of its chunks' sizes.

use zerocopy::{AsBytes, FromBytes, Unaligned};

/// A single chunk of regular-file content
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, AsBytes, FromBytes, Unaligned)]
#[repr(C, packed)]
pub struct Chunk {
    /// The logical block holding the chunk's bytes
    pub block: u32,
    /// The byte offset of the chunk within the block
    pub offset: u32,
    /// The byte length of the chunk
    pub size: u32,
}

/// An element of the chunk index: the position of a chunk in the chunks
/// table
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, AsBytes, FromBytes, Unaligned)]
#[repr(C, packed)]
pub struct Idx(pub u32);
