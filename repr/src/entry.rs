use zerocopy::{AsBytes, FromBytes, Unaligned};

/// An entry record, describing a single filesystem object
///
/// Entries carry no data of their own; every attribute is an index into one
/// of the shared, deduplicated tables. The same record shape is used for
/// directories, regular files, symlinks and special files; the category is
/// encoded in the mode word and mirrored by the inode's numeric range.
#[derive(Debug, Copy, Clone, PartialEq, Eq, AsBytes, FromBytes, Unaligned)]
#[repr(C, packed)]
pub struct Entry {
    /// Index of the entry's basename in the names table. The root entry's
    /// name is the empty string
    pub name_index: u32,
    /// Index of the entry's mode word in the modes table
    pub mode_index: u16,
    /// The dense internal inode number. The externally visible inode is this
    /// plus the mount's inode offset
    pub inode: u32,
}

/// An element of the entry index: the position of an entry in the entries
/// table
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, AsBytes, FromBytes, Unaligned)]
#[repr(C, packed)]
pub struct Idx(pub u32);
