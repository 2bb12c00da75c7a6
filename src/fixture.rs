//! Test fixtures: assemble frozen records in memory
//!
//! Does just enough of a writer's job to exercise the reader: inodes are
//! assigned per category (directories, then regular files, then the rest),
//! every directory's children are laid out contiguously in name order, and
//! the shared tables are interned.

use indexmap::IndexSet;
use repr::header::{Header, TableDesc, MAGIC, VERSION_MAJOR, VERSION_MINOR};
use std::collections::BTreeMap;
use std::convert::TryInto;
use zerocopy::{AsBytes, LayoutVerified};

pub(crate) enum Node {
    Dir(BTreeMap<Vec<u8>, Node>),
    File(Vec<repr::chunk::Chunk>),
    Link(Vec<u8>),
    Special(u16),
}

pub(crate) fn dir(children: Vec<(&str, Node)>) -> Node {
    Node::Dir(
        children
            .into_iter()
            .map(|(name, node)| (name.as_bytes().to_vec(), node))
            .collect(),
    )
}

pub(crate) fn file(chunks: Vec<(u32, u32, u32)>) -> Node {
    Node::File(
        chunks
            .into_iter()
            .map(|(block, offset, size)| repr::chunk::Chunk {
                block,
                offset,
                size,
            })
            .collect(),
    )
}

pub(crate) fn link(target: &str) -> Node {
    Node::Link(target.as_bytes().to_vec())
}

pub(crate) fn fifo() -> Node {
    Node::Special(0o010_644)
}

const MODE_DIR: u16 = 0o040_755;
const MODE_FILE: u16 = 0o100_644;
const MODE_LINK: u16 = 0o120_777;

fn mode_of(node: &Node) -> u16 {
    match node {
        Node::Dir(_) => MODE_DIR,
        Node::File(_) => MODE_FILE,
        Node::Link(_) => MODE_LINK,
        Node::Special(mode) => *mode,
    }
}

pub(crate) fn build(root: &Node) -> Vec<u8> {
    // flatten breadth-first; a directory's children are listed in name order
    let mut nodes: Vec<&Node> = vec![root];
    let mut children_of: Vec<Vec<(Vec<u8>, usize)>> = Vec::new();
    let mut i = 0;
    while i < nodes.len() {
        let node = nodes[i];
        let mut kids = Vec::new();
        if let Node::Dir(map) = node {
            for (name, child) in map {
                kids.push((name.clone(), nodes.len()));
                nodes.push(child);
            }
        }
        children_of.push(kids);
        i += 1;
    }

    let n_inodes = nodes.len();
    let n_dirs = nodes.iter().filter(|n| matches!(n, Node::Dir(_))).count() as u32;
    let n_files = nodes.iter().filter(|n| matches!(n, Node::File(_))).count() as u32;
    let chunk_index_offset = n_dirs;
    let link_index_offset = n_dirs + n_files;

    // dense inodes per category, in flattening order
    let mut inode_of = vec![0u32; n_inodes];
    let (mut next_dir, mut next_file, mut next_misc) = (0, chunk_index_offset, link_index_offset);
    for (idx, node) in nodes.iter().enumerate() {
        let next = match node {
            Node::Dir(_) => &mut next_dir,
            Node::File(_) => &mut next_file,
            Node::Link(_) | Node::Special(_) => &mut next_misc,
        };
        inode_of[idx] = *next;
        *next += 1;
    }

    let mut names: IndexSet<Vec<u8>> = IndexSet::new();
    let mut modes: IndexSet<u16> = IndexSet::new();
    let mut link_targets: IndexSet<Vec<u8>> = IndexSet::new();

    // entries: the root first, then every directory's children contiguously
    let mut entries: Vec<repr::entry::Entry> = Vec::new();
    let mut entry_pos = vec![0u32; n_inodes];
    let mut directories =
        vec![repr::directory::Directory::default(); chunk_index_offset as usize];

    let (root_name, _) = names.insert_full(Vec::new());
    let (root_mode, _) = modes.insert_full(mode_of(nodes[0]));
    entries.push(repr::entry::Entry {
        name_index: root_name as u32,
        mode_index: root_mode as u16,
        inode: inode_of[0],
    });

    for (idx, node) in nodes.iter().enumerate() {
        if !matches!(node, Node::Dir(_)) {
            continue;
        }
        let first_entry = entries.len() as u32;
        for (name, child_idx) in &children_of[idx] {
            let (name_index, _) = names.insert_full(name.clone());
            let (mode_index, _) = modes.insert_full(mode_of(nodes[*child_idx]));
            entry_pos[*child_idx] = entries.len() as u32;
            entries.push(repr::entry::Entry {
                name_index: name_index as u32,
                mode_index: mode_index as u16,
                inode: inode_of[*child_idx],
            });
        }
        directories[inode_of[idx] as usize] = repr::directory::Directory {
            first_entry,
            entry_count: children_of[idx].len() as u32,
        };
    }

    let mut entry_index = vec![repr::entry::Idx(0); n_inodes];
    for idx in 0..n_inodes {
        entry_index[inode_of[idx] as usize] = repr::entry::Idx(entry_pos[idx]);
    }

    // chunk data, files in inode order
    let mut chunks: Vec<repr::chunk::Chunk> = Vec::new();
    let mut chunk_index = vec![repr::chunk::Idx(0)];
    for node in &nodes {
        if let Node::File(file_chunks) = node {
            chunks.extend_from_slice(file_chunks);
            chunk_index.push(repr::chunk::Idx(chunks.len() as u32));
        }
    }

    let mut link_index = vec![repr::strings::Idx(link_index_offset); n_inodes];
    for (idx, node) in nodes.iter().enumerate() {
        if let Node::Link(target) = node {
            let (target_index, _) = link_targets.insert_full(target.clone());
            link_index[inode_of[idx] as usize] =
                repr::strings::Idx(target_index as u32 + link_index_offset);
        }
    }

    let mode_words: Vec<repr::RawMode> = modes.iter().map(|&bits| repr::RawMode(bits)).collect();

    let mut buf = vec![0u8; Header::SIZE];
    let header = Header {
        magic: MAGIC,
        version_major: VERSION_MAJOR,
        version_minor: VERSION_MINOR,
        chunk_index_offset,
        link_index_offset,
        chunks: append_table(&mut buf, &chunks),
        directories: append_table(&mut buf, &directories),
        entries: append_table(&mut buf, &entries),
        chunk_index: append_table(&mut buf, &chunk_index),
        entry_index: append_table(&mut buf, &entry_index),
        link_index: append_table(&mut buf, &link_index),
        modes: append_table(&mut buf, &mode_words),
        names: append_strings(&mut buf, &names),
        links: append_strings(&mut buf, &link_targets),
    };
    write_header(&mut buf, &header);
    buf
}

fn append_table<T: AsBytes>(buf: &mut Vec<u8>, items: &[T]) -> TableDesc {
    let offset = buf.len() as u64;
    for item in items {
        buf.extend_from_slice(item.as_bytes());
    }
    TableDesc {
        offset,
        len: buf.len() as u64 - offset,
        count: items.len().try_into().unwrap(),
    }
}

fn append_strings(buf: &mut Vec<u8>, strings: &IndexSet<Vec<u8>>) -> TableDesc {
    let offset = buf.len() as u64;
    let mut end = 0u32;
    buf.extend_from_slice(repr::strings::Offset(0).as_bytes());
    for s in strings {
        end += s.len() as u32;
        buf.extend_from_slice(repr::strings::Offset(end).as_bytes());
    }
    for s in strings {
        buf.extend_from_slice(s);
    }
    TableDesc {
        offset,
        len: buf.len() as u64 - offset,
        count: strings.len().try_into().unwrap(),
    }
}

pub(crate) fn read_header(buf: &[u8]) -> Header {
    let (header, _) = LayoutVerified::<_, Header>::new_unaligned_from_prefix(buf).unwrap();
    *header
}

pub(crate) fn write_header(buf: &mut [u8], header: &Header) {
    buf[..Header::SIZE].copy_from_slice(header.as_bytes());
}
