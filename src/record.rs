//! The frozen record reader
//!
//! A record is consumed as a whole from one immutable byte buffer: the
//! header is read first, every table extent is checked against the buffer,
//! and the structural invariants (index bounds, sorted directories, a root
//! directory at entry index 0, monotonic chunk index) are verified once.
//! After a successful open, table views are plain reslices of the buffer and
//! perform no further validation; a record that opened is trusted for its
//! lifetime.

use crate::errors::{self, LayoutError, Result};
use repr::header::{self, Header, TableDesc};
use repr::Mode;
use slog::{error, info, Logger};
use snafu::ensure;
use std::mem;
use zerocopy::{FromBytes, LayoutVerified, Unaligned};

/// A validated frozen metadata record over an immutable byte buffer
#[derive(Debug)]
pub(crate) struct Record<B> {
    data: B,
    geo: Geometry,
}

impl<B: AsRef<[u8]>> Record<B> {
    pub(crate) fn open(data: B, logger: &Logger) -> Result<Self> {
        let geo = Geometry::parse(data.as_ref(), logger)?;
        Ok(Record { data, geo })
    }

    pub(crate) fn size(&self) -> usize {
        self.data.as_ref().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.data.as_ref().is_empty()
    }

    pub(crate) fn tables(&self) -> Tables<'_> {
        self.geo.tables(self.data.as_ref())
    }
}

/// Byte extents of every table, resolved from the header at open time
#[derive(Debug, Clone)]
struct Geometry {
    chunk_index_offset: u32,
    link_index_offset: u32,
    chunks: Extent,
    directories: Extent,
    entries: Extent,
    chunk_index: Extent,
    entry_index: Extent,
    link_index: Extent,
    modes: Extent,
    names: Extent,
    links: Extent,
}

#[derive(Debug, Copy, Clone)]
struct Extent {
    start: usize,
    len: usize,
    count: usize,
}

impl Geometry {
    fn parse(data: &[u8], logger: &Logger) -> Result<Geometry> {
        let actual = data.len();
        ensure!(
            actual >= Header::SIZE,
            errors::Truncated {
                expected: Header::SIZE,
                actual
            }
        );
        let header = match LayoutVerified::<_, Header>::new_unaligned_from_prefix(data) {
            Some((header, _)) => *header,
            None => {
                return errors::Truncated {
                    expected: Header::SIZE,
                    actual,
                }
                .fail()
            }
        };

        let magic = header.magic;
        if magic != header::MAGIC {
            return Err(LayoutError::BadMagic { magic }.into());
        }

        let (major, minor) = (header.version_major, header.version_minor);
        ensure!(
            (major, minor) == (header::VERSION_MAJOR, header::VERSION_MINOR),
            errors::UnsupportedVersion { major, minor }
        );

        let geo = Geometry::layout(&header, data)?;
        let tables = geo.tables(data);
        if let Err(e) = validate(&tables) {
            error!(logger, "metadata record failed validation: {}", e);
            return Err(e.into());
        }

        info!(logger, "opened metadata record";
            "size" => data.len(),
            "version_major" => major,
            "version_minor" => minor,
            "chunk_index_offset" => geo.chunk_index_offset,
            "link_index_offset" => geo.link_index_offset,
            "chunks" => tables.chunks.len(),
            "directories" => tables.directories.len(),
            "entries" => tables.entries.len(),
            "entry_index" => tables.entry_index.len(),
            "modes" => tables.modes.len(),
            "names" => tables.names.len(),
            "links" => tables.links.len()
        );

        Ok(geo)
    }

    fn layout(header: &Header, data: &[u8]) -> Result<Geometry, LayoutError> {
        let buffer_len = data.len();
        let chunk_index_offset = header.chunk_index_offset;
        let link_index_offset = header.link_index_offset;
        ensure!(
            chunk_index_offset <= link_index_offset,
            errors::BadInodeOffsets {
                chunk: chunk_index_offset,
                link: link_index_offset
            }
        );

        Ok(Geometry {
            chunk_index_offset,
            link_index_offset,
            chunks: fixed_extent::<repr::chunk::Chunk>(header.chunks, "chunks", buffer_len)?,
            directories: fixed_extent::<repr::directory::Directory>(
                header.directories,
                "directories",
                buffer_len,
            )?,
            entries: fixed_extent::<repr::entry::Entry>(header.entries, "entries", buffer_len)?,
            chunk_index: fixed_extent::<repr::chunk::Idx>(
                header.chunk_index,
                "chunk index",
                buffer_len,
            )?,
            entry_index: fixed_extent::<repr::entry::Idx>(
                header.entry_index,
                "entry index",
                buffer_len,
            )?,
            link_index: fixed_extent::<repr::strings::Idx>(
                header.link_index,
                "link index",
                buffer_len,
            )?,
            modes: fixed_extent::<repr::RawMode>(header.modes, "modes", buffer_len)?,
            names: string_extent(header.names, "names", data)?,
            links: string_extent(header.links, "links", data)?,
        })
    }

    fn tables<'a>(&self, data: &'a [u8]) -> Tables<'a> {
        Tables {
            chunks: Table::new(slice(data, self.chunks)),
            directories: Table::new(slice(data, self.directories)),
            entries: Table::new(slice(data, self.entries)),
            chunk_index: Table::new(slice(data, self.chunk_index)),
            entry_index: Table::new(slice(data, self.entry_index)),
            link_index: Table::new(slice(data, self.link_index)),
            modes: Table::new(slice(data, self.modes)),
            names: StringTable::new(slice(data, self.names), self.names.count),
            links: StringTable::new(slice(data, self.links), self.links.count),
            chunk_index_offset: self.chunk_index_offset,
            link_index_offset: self.link_index_offset,
        }
    }
}

fn slice(data: &[u8], ext: Extent) -> &[u8] {
    &data[ext.start..ext.start + ext.len]
}

fn fixed_extent<T>(desc: TableDesc, table: &'static str, buffer_len: usize) -> Result<Extent, LayoutError> {
    let offset = desc.offset;
    let len = desc.len;
    let count = desc.count;
    let elem_size = mem::size_of::<T>();
    ensure!(
        offset
            .checked_add(len)
            .map_or(false, |end| end <= buffer_len as u64),
        errors::TableOutOfBounds {
            table,
            offset,
            len,
            buffer_len
        }
    );
    ensure!(
        len == u64::from(count) * elem_size as u64,
        errors::CountMismatch {
            table,
            len,
            count,
            elem_size
        }
    );
    Ok(Extent {
        start: offset as usize,
        len: len as usize,
        count: count as usize,
    })
}

fn string_extent(desc: TableDesc, table: &'static str, data: &[u8]) -> Result<Extent, LayoutError> {
    let offset = desc.offset;
    let len = desc.len;
    let count = desc.count;
    ensure!(
        offset
            .checked_add(len)
            .map_or(false, |end| end <= data.len() as u64),
        errors::TableOutOfBounds {
            table,
            offset,
            len,
            buffer_len: data.len()
        }
    );
    let offsets_len = (u64::from(count) + 1) * 4;
    ensure!(
        len >= offsets_len,
        errors::CountMismatch {
            table,
            len,
            count,
            elem_size: 4usize
        }
    );

    let ext = Extent {
        start: offset as usize,
        len: len as usize,
        count: count as usize,
    };
    let strings = StringTable::new(slice(data, ext), ext.count);
    let mut prev = 0u32;
    for i in 0..=ext.count {
        let off = strings.offsets.get(i).0;
        ensure!(
            off >= prev && off as usize <= strings.pool.len(),
            errors::BadStringOffsets { table }
        );
        prev = off;
    }
    ensure!(
        prev as usize == strings.pool.len(),
        errors::BadStringOffsets { table }
    );

    Ok(ext)
}

/// Bounds-checked-by-construction views over all nine tables
///
/// `Copy` on purpose: entry and directory views embed a `Tables` so they
/// never outlive the record they alias.
#[derive(Debug, Copy, Clone)]
pub(crate) struct Tables<'a> {
    pub(crate) chunks: Table<'a, repr::chunk::Chunk>,
    pub(crate) directories: Table<'a, repr::directory::Directory>,
    pub(crate) entries: Table<'a, repr::entry::Entry>,
    pub(crate) chunk_index: Table<'a, repr::chunk::Idx>,
    pub(crate) entry_index: Table<'a, repr::entry::Idx>,
    pub(crate) link_index: Table<'a, repr::strings::Idx>,
    pub(crate) modes: Table<'a, repr::RawMode>,
    pub(crate) names: StringTable<'a>,
    pub(crate) links: StringTable<'a>,
    pub(crate) chunk_index_offset: u32,
    pub(crate) link_index_offset: u32,
}

/// A typed view over one fixed-width table
#[derive(Debug, Copy, Clone)]
pub(crate) struct Table<'a, T> {
    elems: &'a [T],
}

impl<'a, T: FromBytes + Unaligned + Copy> Table<'a, T> {
    /// `bytes` must be a whole number of elements; guaranteed by the extent
    /// checks at open
    fn new(bytes: &'a [u8]) -> Self {
        let elems = LayoutVerified::<_, [T]>::new_slice_unaligned(bytes)
            .expect("table extent was validated at open")
            .into_slice();
        Table { elems }
    }

    pub(crate) fn len(&self) -> usize {
        self.elems.len()
    }

    pub(crate) fn get(&self, index: usize) -> T {
        self.elems[index]
    }
}

/// A view over one string table: the offset array plus the byte pool
#[derive(Debug, Copy, Clone)]
pub(crate) struct StringTable<'a> {
    offsets: Table<'a, repr::strings::Offset>,
    pool: &'a [u8],
}

impl<'a> StringTable<'a> {
    fn new(bytes: &'a [u8], count: usize) -> Self {
        let (offsets, pool) = bytes.split_at((count + 1) * 4);
        StringTable {
            offsets: Table::new(offsets),
            pool,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub(crate) fn get(&self, index: usize) -> &'a [u8] {
        let start = self.offsets.get(index).0 as usize;
        let end = self.offsets.get(index + 1).0 as usize;
        &self.pool[start..end]
    }
}

/// Verify the structural invariants that every later lookup relies on
fn validate(t: &Tables) -> Result<(), LayoutError> {
    let n_regular = (t.link_index_offset - t.chunk_index_offset) as usize;
    ensure!(
        t.chunk_index.len() == n_regular + 1 || (n_regular == 0 && t.chunk_index.len() == 0),
        errors::ChunkIndexCount {
            expected: n_regular + 1,
            actual: t.chunk_index.len()
        }
    );
    let mut prev = 0u32;
    for i in 0..t.chunk_index.len() {
        let cur = t.chunk_index.get(i).0;
        ensure!(
            cur >= prev,
            errors::ChunkIndexNotMonotonic { index: i as u32 }
        );
        ensure!(
            cur as usize <= t.chunks.len(),
            errors::DanglingIndex {
                table: "chunks",
                index: cur,
                at: i as u32
            }
        );
        prev = cur;
    }

    for k in 0..t.entries.len() {
        let entry = t.entries.get(k);
        let at = k as u32;
        let name_index = entry.name_index;
        ensure!(
            (name_index as usize) < t.names.len(),
            errors::DanglingIndex {
                table: "names",
                index: name_index,
                at
            }
        );
        let mode_index = entry.mode_index;
        ensure!(
            (mode_index as usize) < t.modes.len(),
            errors::DanglingIndex {
                table: "modes",
                index: u32::from(mode_index),
                at
            }
        );

        let mode = t.modes.get(mode_index as usize).mode();
        let inode = entry.inode;
        let range_ok = match mode & Mode::TYPE_MASK {
            Mode::TYPE_DIR => {
                inode < t.chunk_index_offset && (inode as usize) < t.directories.len()
            }
            Mode::TYPE_FILE => t.chunk_index_offset <= inode && inode < t.link_index_offset,
            Mode::TYPE_LINK => {
                let indexed = inode >= t.link_index_offset && (inode as usize) < t.link_index.len();
                if indexed {
                    let biased = t.link_index.get(inode as usize).0;
                    let target = biased
                        .checked_sub(t.link_index_offset)
                        .map_or(t.links.len(), |i| i as usize);
                    ensure!(
                        target < t.links.len(),
                        errors::DanglingIndex {
                            table: "links",
                            index: biased,
                            at
                        }
                    );
                }
                indexed
            }
            _ => inode >= t.link_index_offset,
        };
        ensure!(
            range_ok,
            errors::KindMismatch {
                entry: at,
                mode: mode.bits(),
                inode
            }
        );
    }

    for d in 0..t.directories.len() {
        let dir = t.directories.get(d);
        let first_entry = dir.first_entry;
        let entry_count = dir.entry_count;
        let end = (first_entry as usize).checked_add(entry_count as usize);
        ensure!(
            end.map_or(false, |end| end <= t.entries.len()),
            errors::DirectoryOutOfBounds {
                inode: d as u32,
                first_entry,
                entry_count,
                entries: t.entries.len() as u32
            }
        );
        for i in 1..entry_count as usize {
            let prev = child_name(t, first_entry as usize + i - 1);
            let cur = child_name(t, first_entry as usize + i);
            ensure!(prev < cur, errors::UnsortedDirectory { inode: d as u32 });
        }
    }

    ensure!(t.entry_index.len() > 0, errors::BadRoot);
    for i in 0..t.entry_index.len() {
        let pos = t.entry_index.get(i).0;
        ensure!(
            (pos as usize) < t.entries.len(),
            errors::DanglingIndex {
                table: "entries",
                index: pos,
                at: i as u32
            }
        );
    }
    let root = t.entries.get(t.entry_index.get(0).0 as usize);
    let root_mode = t.modes.get(root.mode_index as usize).mode();
    ensure!(root_mode.is_dir() && root.inode == 0, errors::BadRoot);

    Ok(())
}

fn child_name<'a>(t: &Tables<'a>, pos: usize) -> &'a [u8] {
    let entry = t.entries.get(pos);
    t.names.get(entry.name_index as usize)
}
