//! Human-readable rendering of the metadata tree
//!
//! Diagnostic output only; nothing here is on a lookup path.

use crate::metadata::{Directory, Entry, EntryKind, Metadata};
use std::io;

impl<B: AsRef<[u8]>> Metadata<B> {
    /// Render the whole tree to `out`, one entry per line, indented two
    /// spaces per level
    ///
    /// For every regular file, `chunk_cb` is invoked with the writer, the
    /// child indent and the file's inode, so a higher layer that can reach
    /// the chunk data may append detail lines of its own.
    pub fn dump<W, F>(&self, out: &mut W, mut chunk_cb: F) -> io::Result<()>
    where
        W: io::Write,
        F: FnMut(&mut W, &str, u32) -> io::Result<()>,
    {
        dump_entry(out, "", self.root(), &mut chunk_cb)
    }
}

fn dump_entry<W, F>(out: &mut W, indent: &str, entry: Entry<'_>, chunk_cb: &mut F) -> io::Result<()>
where
    W: io::Write,
    F: FnMut(&mut W, &str, u32) -> io::Result<()>,
{
    let inode = entry.inode();
    write!(out, "{}<inode:{}> {}", indent, inode, entry.mode())?;

    if inode > 0 {
        write!(out, " {}", entry.name())?;
    }

    let deeper = format!("{}  ", indent);
    match entry.kind() {
        EntryKind::Regular => {
            let (begin, end) = entry.chunk_span();
            writeln!(out, " [{}, {}] {}", begin, end, entry.size())?;
            chunk_cb(out, &deeper, inode)?;
        }
        EntryKind::Directory => {
            if let Some(dir) = entry.open_dir() {
                dump_dir(out, &deeper, dir, chunk_cb)?;
            }
        }
        EntryKind::Symlink => {
            if let Some(target) = entry.link_target() {
                writeln!(out, " -> {}", target)?;
            }
        }
        EntryKind::Other => {
            writeln!(out, " (unknown type)")?;
        }
    }

    Ok(())
}

fn dump_dir<W, F>(out: &mut W, indent: &str, dir: Directory<'_>, chunk_cb: &mut F) -> io::Result<()>
where
    W: io::Write,
    F: FnMut(&mut W, &str, u32) -> io::Result<()>,
{
    writeln!(out, "{}({}) entries", indent, dir.len())?;

    for child in dir.entries() {
        dump_entry(out, indent, child, chunk_cb)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::fixture::{self, dir, fifo, file, link};
    use crate::Metadata;

    fn render<B: AsRef<[u8]>>(meta: &Metadata<B>) -> String {
        let mut out = Vec::new();
        meta.dump(&mut out, |w, indent, inode| {
            use std::io::Write;
            writeln!(w, "{}chunk detail for inode {}", indent, inode)
        })
        .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn renders_every_entry_kind() {
        let buf = fixture::build(&dir(vec![
            ("file", file(vec![(0, 0, 5), (1, 0, 3)])),
            ("pipe", fifo()),
            ("sub", dir(vec![("z", link("../file"))])),
        ]));
        let meta = Metadata::new(buf.as_slice(), 0).unwrap();

        let expected = "\
<inode:0> ---drwxr-xr-x  (3) entries
  <inode:2> ----rw-r--r-- file [0, 2] 8
    chunk detail for inode 2
  <inode:3> ----rw-r--r-- pipe (unknown type)
  <inode:1> ---drwxr-xr-x sub    (1) entries
    <inode:4> ---lrwxrwxrwx z -> ../file
";
        assert_eq!(render(&meta), expected);
    }

    #[test]
    fn renders_a_bare_root() {
        let buf = fixture::build(&dir(vec![]));
        let meta = Metadata::new(buf.as_slice(), 0).unwrap();
        assert_eq!(render(&meta), "<inode:0> ---drwxr-xr-x  (0) entries\n");
    }

    #[test]
    fn sink_errors_propagate() {
        let buf = fixture::build(&dir(vec![("a", file(vec![]))]));
        let meta = Metadata::new(buf.as_slice(), 0).unwrap();
        let err = meta
            .dump(&mut std::io::sink(), |_, _, _| {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "boom"))
            })
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::Other);
    }
}
