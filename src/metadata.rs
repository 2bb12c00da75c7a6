//! Entry resolution, directory lookup and path walking

use crate::errors::Result;
use crate::record::{Record, Tables};
use bstr::{BStr, ByteSlice};
use chrono::Utc;
use repr::chunk::Chunk;
use repr::Mode;
use slog::Logger;
use std::cmp::Ordering;
use std::fmt;

/// An open metadata record
///
/// All operations take `&self`; a `Metadata` can be shared by any number of
/// threads without synchronization. Entry and directory views borrow the
/// record and cannot outlive it.
#[derive(Debug)]
pub struct Metadata<B> {
    record: Record<B>,
    root: repr::entry::Entry,
    inode_offset: u64,
    defaults: Attr,
}

/// Caller-supplied parameters for opening a record
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Added to every internal inode to form the externally visible inode,
    /// so the image's dense inode space cannot collide with peer mounts
    pub inode_offset: u64,
    /// Attribute fields the record does not carry (owner, group, times).
    /// `None` falls back to [`Attr::stat_defaults`]
    pub defaults: Option<Attr>,
}

impl<B: AsRef<[u8]>> Metadata<B> {
    /// Open a record with the default logger
    pub fn new(data: B, inode_offset: u64) -> Result<Self> {
        Self::with_logger(data, inode_offset, crate::default_logger())
    }

    pub fn with_logger(data: B, inode_offset: u64, logger: Logger) -> Result<Self> {
        Self::with_options(
            data,
            Options {
                inode_offset,
                defaults: None,
            },
            logger,
        )
    }

    pub fn with_options(data: B, options: Options, logger: Logger) -> Result<Self> {
        let record = Record::open(data, &logger)?;
        let tables = record.tables();
        let root = tables.entries.get(tables.entry_index.get(0).0 as usize);
        Ok(Metadata {
            record,
            root,
            inode_offset: options.inode_offset,
            defaults: options.defaults.unwrap_or_else(Attr::stat_defaults),
        })
    }

    /// The size of the backing buffer in bytes
    pub fn size(&self) -> usize {
        self.record.size()
    }

    pub fn is_empty(&self) -> bool {
        self.record.is_empty()
    }

    /// The root directory entry
    pub fn root(&self) -> Entry<'_> {
        Entry::new(self.record.tables(), self.root)
    }

    /// Resolve an externally visible inode number
    ///
    /// Out-of-range inodes (including anything below the inode offset) are
    /// not an error; they simply name nothing.
    pub fn find_inode(&self, ino: u64) -> Option<Entry<'_>> {
        let tables = self.record.tables();
        let internal = ino.checked_sub(self.inode_offset)?;
        if internal >= tables.entry_index.len() as u64 {
            return None;
        }
        let pos = tables.entry_index.get(internal as usize);
        Some(Entry::new(tables, tables.entries.get(pos.0 as usize)))
    }

    /// Resolve a `/`-separated byte path relative to the root
    ///
    /// Leading, trailing and repeated slashes are tolerated. `.` and `..`
    /// are not interpreted; a caller needing them resolves them above this
    /// layer. Descending through a non-directory yields `None`.
    pub fn find_path<P: AsRef<[u8]>>(&self, path: P) -> Option<Entry<'_>> {
        self._find_path(path.as_ref())
    }

    fn _find_path(&self, path: &[u8]) -> Option<Entry<'_>> {
        let mut entry = self.root();
        for segment in path.split(|&b| b == b'/') {
            if segment.is_empty() {
                continue;
            }
            entry = entry.open_dir()?.lookup(segment)?;
        }
        Some(entry)
    }

    /// Look up `name` in the directory with the given external inode
    pub fn find_child(&self, ino: u64, name: &[u8]) -> Option<Entry<'_>> {
        self.find_inode(ino)?.open_dir()?.lookup(name)
    }

    /// Synthesize POSIX-style attributes for an entry
    ///
    /// The mode is exported read-only (write bits cleared); the stored mode
    /// word is untouched. Owner, group and times come from the defaults the
    /// record was opened with.
    pub fn getattr(&self, entry: Entry<'_>) -> Attr {
        let size = entry.size();
        Attr {
            mode: entry.mode().read_only(),
            size,
            ino: u64::from(entry.inode()) + self.inode_offset,
            blocks: (size + 511) / 512,
            ..self.defaults
        }
    }

    /// Depth-first pre-order traversal, root first
    ///
    /// The visitor is invoked exactly once per entry; children are visited
    /// in stored (name-sorted) order. The walker does no filtering.
    pub fn walk<'s, F>(&'s self, mut visitor: F)
    where
        F: FnMut(Entry<'s>),
    {
        walk_entry(self.root(), &mut visitor);
    }
}

fn walk_entry<'a, F>(entry: Entry<'a>, visitor: &mut F)
where
    F: FnMut(Entry<'a>),
{
    visitor(entry);
    if let Some(dir) = entry.open_dir() {
        for child in dir.entries() {
            walk_entry(child, visitor);
        }
    }
}

/// The category of an entry, derived from its mode word
///
/// Computed once per entry view; the inode's numeric range mirrors it and is
/// verified against it at open time.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    Regular,
    Symlink,
    Other,
}

impl EntryKind {
    fn of(mode: Mode) -> EntryKind {
        match mode & Mode::TYPE_MASK {
            Mode::TYPE_DIR => EntryKind::Directory,
            Mode::TYPE_FILE => EntryKind::Regular,
            Mode::TYPE_LINK => EntryKind::Symlink,
            _ => EntryKind::Other,
        }
    }
}

/// A single filesystem object within an open record
#[derive(Copy, Clone)]
pub struct Entry<'a> {
    tables: Tables<'a>,
    raw: repr::entry::Entry,
    kind: EntryKind,
}

impl<'a> Entry<'a> {
    pub(crate) fn new(tables: Tables<'a>, raw: repr::entry::Entry) -> Self {
        let mode = tables.modes.get(raw.mode_index as usize).mode();
        Entry {
            tables,
            raw,
            kind: EntryKind::of(mode),
        }
    }

    /// The dense internal inode number
    pub fn inode(&self) -> u32 {
        self.raw.inode
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// The entry's basename. Empty for the root
    pub fn name(&self) -> &'a BStr {
        self.tables.names.get(self.raw.name_index as usize).as_bstr()
    }

    /// The stored mode word, write bits included
    pub fn mode(&self) -> Mode {
        self.tables.modes.get(self.raw.mode_index as usize).mode()
    }

    /// Content size: the chunk-size sum for regular files, the target
    /// length for symlinks, zero otherwise
    pub fn size(&self) -> u64 {
        match self.kind {
            EntryKind::Regular => self.chunks().map(|chunk| u64::from(chunk.size)).sum(),
            EntryKind::Symlink => self.target_bytes().len() as u64,
            EntryKind::Directory | EntryKind::Other => 0,
        }
    }

    /// The symlink target, for symlink entries
    pub fn link_target(&self) -> Option<&'a BStr> {
        match self.kind {
            EntryKind::Symlink => Some(self.target_bytes().as_bstr()),
            _ => None,
        }
    }

    /// The chunk references making up a regular file's content, in order.
    /// Empty for anything that is not a regular file
    pub fn chunks(&self) -> Chunks<'a> {
        let (cur, end) = match self.kind {
            EntryKind::Regular => self.chunk_span(),
            _ => (0, 0),
        };
        Chunks {
            tables: self.tables,
            cur,
            end,
        }
    }

    /// The directory view, for directory entries
    pub fn open_dir(&self) -> Option<Directory<'a>> {
        if self.kind != EntryKind::Directory {
            return None;
        }
        let dir = self.tables.directories.get(self.raw.inode as usize);
        Some(Directory {
            tables: self.tables,
            first: dir.first_entry,
            count: dir.entry_count,
        })
    }

    /// Positions of this regular file's chunks in the chunks table
    pub(crate) fn chunk_span(&self) -> (u32, u32) {
        let i = (self.raw.inode - self.tables.chunk_index_offset) as usize;
        (
            self.tables.chunk_index.get(i).0,
            self.tables.chunk_index.get(i + 1).0,
        )
    }

    fn target_bytes(&self) -> &'a [u8] {
        let biased = self.tables.link_index.get(self.raw.inode as usize).0;
        self.tables
            .links
            .get((biased - self.tables.link_index_offset) as usize)
    }
}

impl PartialEq for Entry<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Entry<'_> {}

impl fmt::Debug for Entry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Entry")
            .field("inode", &self.inode())
            .field("name", &self.name())
            .field("kind", &self.kind)
            .finish()
    }
}

/// A directory's children: a sorted, contiguous range of the entries table
#[derive(Copy, Clone)]
pub struct Directory<'a> {
    tables: Tables<'a>,
    first: u32,
    count: u32,
}

impl<'a> Directory<'a> {
    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The child at `index` in stored (name-sorted) order
    pub fn get(&self, index: usize) -> Option<Entry<'a>> {
        if index >= self.len() {
            return None;
        }
        Some(Entry::new(
            self.tables,
            self.tables.entries.get(self.first as usize + index),
        ))
    }

    pub fn entries(&self) -> Entries<'a> {
        Entries {
            tables: self.tables,
            cur: self.first,
            end: self.first + self.count,
        }
    }

    /// Binary-search the children for an exact byte-wise name match
    pub fn lookup(&self, name: &[u8]) -> Option<Entry<'a>> {
        let first = self.first as usize;
        let mut lo = 0;
        let mut hi = self.count as usize;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let entry = self.tables.entries.get(first + mid);
            let entry_name = self.tables.names.get(entry.name_index as usize);
            match entry_name.cmp(&name) {
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
                Ordering::Equal => return Some(Entry::new(self.tables, entry)),
            }
        }
        None
    }
}

impl fmt::Debug for Directory<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Directory")
            .field("first", &self.first)
            .field("count", &self.count)
            .finish()
    }
}

/// Iterator over a directory's children
#[derive(Clone)]
pub struct Entries<'a> {
    tables: Tables<'a>,
    cur: u32,
    end: u32,
}

impl<'a> Iterator for Entries<'a> {
    type Item = Entry<'a>;

    fn next(&mut self) -> Option<Entry<'a>> {
        if self.cur == self.end {
            return None;
        }
        let entry = self.tables.entries.get(self.cur as usize);
        self.cur += 1;
        Some(Entry::new(self.tables, entry))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = (self.end - self.cur) as usize;
        (len, Some(len))
    }
}

impl ExactSizeIterator for Entries<'_> {}

/// Iterator over a regular file's chunk references
#[derive(Clone)]
pub struct Chunks<'a> {
    tables: Tables<'a>,
    cur: u32,
    end: u32,
}

impl Iterator for Chunks<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.cur == self.end {
            return None;
        }
        let chunk = self.tables.chunks.get(self.cur as usize);
        self.cur += 1;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = (self.end - self.cur) as usize;
        (len, Some(len))
    }
}

impl ExactSizeIterator for Chunks<'_> {}

/// POSIX-style attributes synthesized for an entry
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Attr {
    pub mode: Mode,
    pub size: u64,
    pub ino: u64,
    pub blocks: u64,
    pub uid: u32,
    pub gid: u32,
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
}

impl Attr {
    /// Defaults for the fields the record does not carry: the effective
    /// user and group of the calling process, and the current time for all
    /// three timestamps
    pub fn stat_defaults() -> Attr {
        let (uid, gid) = effective_ids();
        let now = Utc::now().timestamp();
        Attr {
            uid,
            gid,
            atime: now,
            mtime: now,
            ctime: now,
            ..Attr::default()
        }
    }
}

#[cfg(unix)]
fn effective_ids() -> (u32, u32) {
    // geteuid/getegid cannot fail
    unsafe { (libc::geteuid() as u32, libc::getegid() as u32) }
}

#[cfg(not(unix))]
fn effective_ids() -> (u32, u32) {
    (0, 0)
}
