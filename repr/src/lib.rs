//! A frozen metadata record consists of a positional header followed by nine
//! tables, packed together on a byte alignment:
//!
//! * [Header](header/index.html)
//! * [Chunks](chunk/index.html)
//! * [Directories](directory/index.html)
//! * [Entries](entry/index.html)
//! * Chunk index, entry index and link index (`u32` element tables)
//! * [Modes](struct.RawMode.html)
//! * [Names & Links](strings/index.html)
//!
//! Everything is little-endian and readable in place from an unaligned
//! buffer.

use bitflags::bitflags;
use zerocopy::{AsBytes, FromBytes, Unaligned};

use std::fmt;
use std::fmt::Write;

pub mod chunk;
pub mod directory;
pub mod entry;
pub mod header;
pub mod strings;

/// An element of the modes table: a deduplicated 16-bit mode word
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, AsBytes, FromBytes, Unaligned)]
#[repr(C, packed)]
pub struct RawMode(pub u16);

impl RawMode {
    pub fn mode(self) -> Mode {
        Mode::from_bits_truncate(self.0)
    }
}

bitflags! {
    #[derive(Default)]
    pub struct Mode: u16 {
        const OTHER_EXEC =  0o000_001;
        const OTHER_WRITE = 0o000_002;
        const OTHER_READ =  0o000_004;
        const GROUP_EXEC =  0o000_010;
        const GROUP_WRITE = 0o000_020;
        const GROUP_READ =  0o000_040;
        const USER_EXEC =   0o000_100;
        const USER_WRITE =  0o000_200;
        const USER_READ =   0o000_400;
        const BIT_STICKY =  0o001_000;
        const BIT_SGID =    0o002_000;
        const BIT_SUID =    0o004_000;

        const TYPE_FIFO =   0o010_000;
        const TYPE_CHAR =   0o020_000;
        const TYPE_DIR  =   0o040_000;
        const TYPE_BLOCK =  0o060_000;
        const TYPE_FILE =   0o100_000;
        const TYPE_LINK =   0o120_000;
        const TYPE_SOCKET = 0o140_000;
    }
}

impl Mode {
    pub const PERM_MASK: Mode = Mode { bits: 0o007_777 };
    pub const TYPE_MASK: Mode = Mode { bits: 0o170_000 };
    /// The owner/group/other write bits
    pub const WRITE_MASK: Mode = Mode { bits: 0o000_222 };
    pub const NONE: Mode = Mode { bits: 0 };

    /// This mode with all three write bits cleared
    pub fn read_only(self) -> Mode {
        self - Mode::WRITE_MASK
    }

    pub fn is_dir(self) -> bool {
        self & Mode::TYPE_MASK == Mode::TYPE_DIR
    }

    pub fn is_file(self) -> bool {
        self & Mode::TYPE_MASK == Mode::TYPE_FILE
    }

    pub fn is_link(self) -> bool {
        self & Mode::TYPE_MASK == Mode::TYPE_LINK
    }
}

impl fmt::Display for Mode {
    /// The 13-character mode string: setuid, setgid, sticky, type, then the
    /// three permission triples
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_char(if self.contains(Mode::BIT_SUID) {
            'U'
        } else {
            '-'
        })?;
        f.write_char(if self.contains(Mode::BIT_SGID) {
            'G'
        } else {
            '-'
        })?;
        f.write_char(if self.contains(Mode::BIT_STICKY) {
            'S'
        } else {
            '-'
        })?;

        let type_char = match *self & Mode::TYPE_MASK {
            Mode::TYPE_DIR => 'd',
            Mode::TYPE_LINK => 'l',
            _ => '-',
        };
        f.write_char(type_char)?;

        for &(read, write, exec) in &[
            (Mode::USER_READ, Mode::USER_WRITE, Mode::USER_EXEC),
            (Mode::GROUP_READ, Mode::GROUP_WRITE, Mode::GROUP_EXEC),
            (Mode::OTHER_READ, Mode::OTHER_WRITE, Mode::OTHER_EXEC),
        ] {
            f.write_char(if self.contains(read) { 'r' } else { '-' })?;
            f.write_char(if self.contains(write) { 'w' } else { '-' })?;
            f.write_char(if self.contains(exec) { 'x' } else { '-' })?;
        }

        Ok(())
    }
}

#[test]
fn mode_tests() {
    let mode = Mode { bits: 0o754 } | Mode::TYPE_FILE;
    assert_eq!(&format!("{}", mode), "----rwxr-xr--");
    let mode = Mode { bits: 0o755 } | Mode::TYPE_DIR;
    assert_eq!(&format!("{}", mode), "---drwxr-xr-x");
    let mode = Mode { bits: 0o777 } | Mode::TYPE_LINK | Mode::BIT_SUID;
    assert_eq!(&format!("{}", mode), "U--lrwxrwxrwx");
    let mode = Mode { bits: 0o644 } | Mode::TYPE_FIFO;
    assert_eq!(&format!("{}", mode), "----rw-r--r--");
}

#[test]
fn read_only_clears_write_bits() {
    let mode = Mode { bits: 0o664 } | Mode::TYPE_FILE | Mode::BIT_STICKY;
    let ro = mode.read_only();
    assert_eq!(ro & Mode::PERM_MASK, Mode { bits: 0o1444 });
    assert_eq!(ro & Mode::TYPE_MASK, Mode::TYPE_FILE);
    assert!(ro.contains(Mode::BIT_STICKY));
}
