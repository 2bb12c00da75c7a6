use zerocopy::{AsBytes, FromBytes, Unaligned};

/// A directory record
///
/// The table is indexed by directory inode. Children occupy the contiguous
/// range `[first_entry, first_entry + entry_count)` of the entries table and
/// are sorted ascending by name, with no duplicate names, so lookups can
/// binary search the range.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, AsBytes, FromBytes, Unaligned)]
#[repr(C, packed)]
pub struct Directory {
    /// Position of the first child in the entries table
    pub first_entry: u32,
    /// Number of children
    pub entry_count: u32,
}
