//! The record header
//!
//! A frozen record starts with a fixed-size header naming the schema version
//! and the extent of every table. The payload carries no pointers; all
//! cross-references are indices into the tables the header describes.
//!
//! To open a record, read the header, check magic and version, then check
//! that every descriptor's `[offset, offset + len)` range lies within the
//! buffer and that `len` agrees with `count` elements of the table's element
//! type. In pseudocode:
//!
//! ```text
//! header = read_header(offset=0)
//! if header.magic != MAGIC { reject }
//! if header.version != (1, 0) { reject }
//! for desc in header.tables {
//!     if desc.offset + desc.len > buffer.len { reject }
//!     if desc.len != desc.count * elem_size { reject }
//! }
//! ```
//!
//! The two offsets partition the inode space: inodes below
//! `chunk_index_offset` are directories, inodes in
//! `[chunk_index_offset, link_index_offset)` are regular files, and inodes
//! from `link_index_offset` up are symlinks and other special types.

use std::mem;
use zerocopy::{AsBytes, FromBytes, Unaligned};

/// The magic constant which marks a frozen metadata record (`"DWFZ"`)
pub const MAGIC: u32 = 0x5a46_5744;

/// The supported major version of the record schema
pub const VERSION_MAJOR: u16 = 1;
/// The supported minor version of the record schema
pub const VERSION_MINOR: u16 = 0;

/// The extent of one table within the record
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, AsBytes, FromBytes, Unaligned)]
#[repr(C, packed)]
pub struct TableDesc {
    /// The byte offset of the table from the start of the record
    pub offset: u64,
    /// The byte length of the table
    pub len: u64,
    /// The number of elements in the table. For string tables this is the
    /// number of strings, not the number of pool bytes
    pub count: u32,
}

/// The header at the start of every frozen record
#[derive(Debug, Copy, Clone, PartialEq, Eq, AsBytes, FromBytes, Unaligned)]
#[repr(C, packed)]
pub struct Header {
    /// Must match [`MAGIC`](constant.MAGIC.html) to be considered a record
    pub magic: u32,
    /// The major version of the record schema. Should always equal
    /// [`VERSION_MAJOR`](constant.VERSION_MAJOR.html)
    pub version_major: u16,
    /// The minor version of the record schema. Should always equal
    /// [`VERSION_MINOR`](constant.VERSION_MINOR.html)
    pub version_minor: u16,
    /// The first regular-file inode. Inodes below this are directories
    pub chunk_index_offset: u32,
    /// The first symlink inode, and the bias applied to link index values
    pub link_index_offset: u32,
    /// Chunk records, in regular-file inode order
    pub chunks: TableDesc,
    /// One record per directory inode
    pub directories: TableDesc,
    /// The flat pool of entry records
    pub entries: TableDesc,
    /// Cumulative chunk counts per regular-file inode, one element past the
    /// last file as a sentinel
    pub chunk_index: TableDesc,
    /// Maps dense inode numbers to positions in the entries table
    pub entry_index: TableDesc,
    /// Maps symlink inodes to biased positions in the links table
    pub link_index: TableDesc,
    /// Deduplicated 16-bit mode words
    pub modes: TableDesc,
    /// Deduplicated basenames (string table)
    pub names: TableDesc,
    /// Deduplicated symlink targets (string table)
    pub links: TableDesc,
}

impl Header {
    pub const SIZE: usize = mem::size_of::<Header>();
}
