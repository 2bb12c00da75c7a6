//! Metadata core for a read-only, deduplicating, compressed filesystem
//! image.
//!
//! The metadata of an image is a frozen, pointer-free record embedded at the
//! tail of the image: nine interned tables plus two inode-range offsets,
//! described in the [`repr`](../repr/index.html) crate. [`Metadata`] opens
//! such a record over any immutable byte buffer (owned or memory-mapped),
//! validates it once, and then resolves names, enumerates directories, stats
//! entries, reads symlink targets and locates the chunk ranges of regular
//! files without copying any table data.
//!
//! Fetching and decompressing the chunk byte ranges themselves is the block
//! layer's job; this crate never performs I/O of its own.

use slog::Drain;

pub mod errors;
mod dump;
mod metadata;
mod record;

#[cfg(test)]
mod fixture;

pub use crate::errors::{Error, Result};
pub use crate::metadata::{Attr, Chunks, Directory, Entries, Entry, EntryKind, Metadata, Options};
pub use repr::chunk::Chunk;
pub use repr::Mode;

fn default_logger() -> slog::Logger {
    slog::Logger::root(slog_stdlog::StdLog.fuse(), slog::o!())
}
