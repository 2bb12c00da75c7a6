use snafu::{IntoError, Snafu};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while opening a frozen metadata record
///
/// Opening is all-or-nothing; none of these can occur after a record has
/// been opened successfully. Lookups on an open record signal absence with
/// `None`, never with an error.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("record truncated: need {} bytes, buffer has {}", expected, actual))]
    Truncated { expected: usize, actual: usize },

    #[snafu(display(
        "unsupported record version {}.{}: only {}.{} is supported",
        major,
        minor,
        repr::header::VERSION_MAJOR,
        repr::header::VERSION_MINOR
    ))]
    UnsupportedVersion { major: u16, minor: u16 },

    #[snafu(display("malformed record: {}", source))]
    Malformed { source: LayoutError },
}

/// Structural inconsistencies detected by open-time validation
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum LayoutError {
    #[snafu(display(
        "magic mismatch: expected {:#x}, got {:#x}",
        repr::header::MAGIC,
        magic
    ))]
    BadMagic { magic: u32 },

    #[snafu(display(
        "{} table [{}, +{}] exceeds the {} byte buffer",
        table,
        offset,
        len,
        buffer_len
    ))]
    TableOutOfBounds {
        table: &'static str,
        offset: u64,
        len: u64,
        buffer_len: usize,
    },

    #[snafu(display(
        "{} table length {} does not hold {} elements of {} bytes",
        table,
        len,
        count,
        elem_size
    ))]
    CountMismatch {
        table: &'static str,
        len: u64,
        count: u32,
        elem_size: usize,
    },

    #[snafu(display("{} string table offsets are inconsistent", table))]
    BadStringOffsets { table: &'static str },

    #[snafu(display(
        "inode range offsets are inconsistent: chunk index offset {} > link index offset {}",
        chunk,
        link
    ))]
    BadInodeOffsets { chunk: u32, link: u32 },

    #[snafu(display(
        "{} index {} out of range (referenced at position {})",
        table,
        index,
        at
    ))]
    DanglingIndex {
        table: &'static str,
        index: u32,
        at: u32,
    },

    #[snafu(display(
        "entry {} mode {:o} disagrees with its inode {} range",
        entry,
        mode,
        inode
    ))]
    KindMismatch { entry: u32, mode: u16, inode: u32 },

    #[snafu(display(
        "directory inode {} children [{}, +{}) exceed the entries table ({} entries)",
        inode,
        first_entry,
        entry_count,
        entries
    ))]
    DirectoryOutOfBounds {
        inode: u32,
        first_entry: u32,
        entry_count: u32,
        entries: u32,
    },

    #[snafu(display("directory inode {} children are not sorted by name", inode))]
    UnsortedDirectory { inode: u32 },

    #[snafu(display("entry index does not name a root directory with inode 0"))]
    BadRoot,

    #[snafu(display("chunk index has {} elements, expected {}", actual, expected))]
    ChunkIndexCount { expected: usize, actual: usize },

    #[snafu(display("chunk index decreases at position {}", index))]
    ChunkIndexNotMonotonic { index: u32 },
}

impl From<LayoutError> for Error {
    fn from(e: LayoutError) -> Self {
        Malformed.into_error(e)
    }
}
