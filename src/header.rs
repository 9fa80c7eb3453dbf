//! Header module for the unikmer binary format
//!
//! This module provides the header structure and the mode flag word of binary k-mer files.
//! The header identifies the format, selects the wire representation of the body and
//! records the single K shared by every code in the file.

use std::fmt;
use std::io::{ErrorKind, Read, Write};
use std::ops::{BitOr, BitOrAssign};

use byteorder::{BigEndian, ByteOrder};

use crate::error::{HeaderError, Result};
use crate::kmer::MAX_K;

/// Magic bytes identifying a binary k-mer file
pub const MAGIC: [u8; 8] = *b".unikmer";

/// Main version written by this crate
///
/// * `0` - legacy layout, no mode word
/// * `1` - a 32-bit mode word follows the version block
pub const MAIN_VERSION: i64 = 1;

/// Minor version of files storing every code in 8 bytes
pub const MINOR_VERSION_FIXED: i64 = 1;

/// Minor version of files storing every code in `(k + 3) / 4` bytes
pub const MINOR_VERSION_COMPACT: i64 = 2;

/// Size of the legacy header in bytes (magic + 3 x int64)
pub const SIZE_HEADER_LEGACY: usize = 32;

/// Size of the mode word in bytes
pub const SIZE_MODE: usize = 4;

/// Bit-set of file-level properties asserted by the producer
///
/// These are never verified against the body of the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Mode(u32);
impl Mode {
    /// Codes are bit-packed into `(k + 3) / 4` bytes
    pub const COMPACT: Mode = Mode(1);
    /// Every code is already in canonical form
    pub const CANONICAL: Mode = Mode(1 << 1);
    /// Codes appear in non-decreasing order
    pub const SORTED: Mode = Mode(1 << 2);

    #[must_use]
    pub fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[must_use]
    pub fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn contains(self, other: Mode) -> bool {
        self.0 & other.0 == other.0
    }

    /// Sets or clears the bits of `other`
    pub fn set(&mut self, other: Mode, value: bool) {
        if value {
            self.0 |= other.0;
        } else {
            self.0 &= !other.0;
        }
    }

    /// Builder-style variant of [`Mode::set`]
    #[must_use]
    pub fn with(mut self, other: Mode, value: bool) -> Self {
        self.set(other, value);
        self
    }

    #[must_use]
    pub fn is_compact(self) -> bool {
        self.contains(Self::COMPACT)
    }

    #[must_use]
    pub fn is_canonical(self) -> bool {
        self.contains(Self::CANONICAL)
    }

    #[must_use]
    pub fn is_sorted(self) -> bool {
        self.contains(Self::SORTED)
    }
}

impl BitOr for Mode {
    type Output = Mode;

    fn bitor(self, rhs: Mode) -> Mode {
        Mode(self.0 | rhs.0)
    }
}

impl BitOrAssign for Mode {
    fn bitor_assign(&mut self, rhs: Mode) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = [
            (Self::COMPACT, "compact"),
            (Self::CANONICAL, "canonical"),
            (Self::SORTED, "sorted"),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| name)
        .collect();
        if names.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&names.join(","))
        }
    }
}

/// Header structure for binary k-mer files
///
/// Layout (all integers big-endian):
///
/// | Offset | Size | Name          | Description                           |
/// | ------ | ---- | ------------- | ------------------------------------- |
/// | 0      | 8    | magic         | `.unikmer`                            |
/// | 8      | 8    | main_version  | 0 = legacy, 1 = with mode word        |
/// | 16     | 8    | minor_version | 1 = fixed 8-byte codes, 2 = compact   |
/// | 24     | 8    | k             | K of every code in the file           |
/// | 32     | 4    | mode          | [`Mode`] bits (main version 1 only)   |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub main_version: i64,
    pub minor_version: i64,
    pub k: u32,
    pub mode: Mode,
}
impl Header {
    /// Creates a header for the current format version
    ///
    /// The minor version is derived from [`Mode::COMPACT`].
    ///
    /// # Panics
    ///
    /// Panics in debug builds if `k` is not within `1..=32`.
    #[must_use]
    pub fn new(k: u32, mode: Mode) -> Self {
        debug_assert!(k >= 1 && k as usize <= MAX_K);
        Self {
            main_version: MAIN_VERSION,
            minor_version: if mode.is_compact() {
                MINOR_VERSION_COMPACT
            } else {
                MINOR_VERSION_FIXED
            },
            k,
            mode,
        }
    }

    /// Whether the body is bit-packed; decided by the minor version alone
    #[must_use]
    pub fn is_compact(&self) -> bool {
        self.minor_version == MINOR_VERSION_COMPACT
    }

    /// Number of bytes per code in the body
    #[must_use]
    pub fn record_size(&self) -> usize {
        if self.is_compact() {
            compact_size(self.k)
        } else {
            8
        }
    }

    /// Number of bytes taken by the header itself
    #[must_use]
    pub fn size(&self) -> usize {
        if self.main_version >= 1 {
            SIZE_HEADER_LEGACY + SIZE_MODE
        } else {
            SIZE_HEADER_LEGACY
        }
    }

    /// Parses the legacy 32-byte block
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The magic bytes are incorrect
    /// * The main version is not supported
    /// * K is outside of `1..=32`
    pub fn from_bytes(buffer: &[u8; SIZE_HEADER_LEGACY]) -> Result<Self> {
        let mut magic = [0u8; 8];
        magic.copy_from_slice(&buffer[0..8]);
        if magic != MAGIC {
            return Err(HeaderError::InvalidMagic(magic).into());
        }
        let main_version = BigEndian::read_i64(&buffer[8..16]);
        if !(0..=MAIN_VERSION).contains(&main_version) {
            return Err(HeaderError::UnsupportedVersion(main_version).into());
        }
        let minor_version = BigEndian::read_i64(&buffer[16..24]);
        let k = BigEndian::read_i64(&buffer[24..32]);
        if k < 1 || k > MAX_K as i64 {
            return Err(HeaderError::InvalidK(k).into());
        }
        let mode = if minor_version == MINOR_VERSION_COMPACT {
            Mode::COMPACT
        } else {
            Mode::empty()
        };
        Ok(Self {
            main_version,
            minor_version,
            k: k as u32,
            mode,
        })
    }

    /// Reads a header from a reader, including the mode word when the version has one
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buffer = [0u8; SIZE_HEADER_LEGACY];
        read_header_bytes(reader, &mut buffer)?;
        let mut header = Self::from_bytes(&buffer)?;
        if header.main_version >= 1 {
            let mut mode = [0u8; SIZE_MODE];
            read_header_bytes(reader, &mut mode)?;
            header.mode = Mode::from_bits(BigEndian::read_u32(&mode));
        }
        Ok(header)
    }

    /// Writes the header to a writer
    pub fn write_bytes<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut buffer = [0u8; SIZE_HEADER_LEGACY + SIZE_MODE];
        buffer[0..8].copy_from_slice(&MAGIC);
        BigEndian::write_i64(&mut buffer[8..16], self.main_version);
        BigEndian::write_i64(&mut buffer[16..24], self.minor_version);
        BigEndian::write_i64(&mut buffer[24..32], i64::from(self.k));
        BigEndian::write_u32(&mut buffer[32..36], self.mode.bits());
        writer.write_all(&buffer[..self.size()])?;
        Ok(())
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unikmer binary k-mer file v{}.{}, K={}, flags={}",
            self.main_version, self.minor_version, self.k, self.mode
        )
    }
}

/// Bytes per code in the compact representation: just enough for `2k` bits
#[must_use]
pub fn compact_size(k: u32) -> usize {
    (k as usize + 3) / 4
}

fn read_header_bytes<R: Read>(reader: &mut R, buffer: &mut [u8]) -> Result<()> {
    match reader.read_exact(buffer) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
            Err(HeaderError::Truncated(SIZE_HEADER_LEGACY + SIZE_MODE).into())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::Error;
    use anyhow::Result;
    use std::io::Cursor;

    #[test]
    fn test_compact_size() {
        assert_eq!(compact_size(1), 1);
        assert_eq!(compact_size(4), 1);
        assert_eq!(compact_size(5), 2);
        assert_eq!(compact_size(16), 4);
        assert_eq!(compact_size(31), 8);
        assert_eq!(compact_size(32), 8);
    }

    #[test]
    fn test_minor_version_from_mode() {
        assert_eq!(Header::new(21, Mode::COMPACT).minor_version, 2);
        assert_eq!(Header::new(21, Mode::CANONICAL).minor_version, 1);
        assert_eq!(Header::new(21, Mode::COMPACT).record_size(), 6);
        assert_eq!(Header::new(21, Mode::empty()).record_size(), 8);
    }

    #[test]
    fn test_header_layout() -> Result<()> {
        let header = Header::new(31, Mode::COMPACT | Mode::SORTED);
        let mut buffer = Vec::new();
        header.write_bytes(&mut buffer)?;
        assert_eq!(buffer.len(), header.size());
        assert_eq!(&buffer[0..8], b".unikmer");
        assert_eq!(&buffer[8..16], &1i64.to_be_bytes());
        assert_eq!(&buffer[16..24], &2i64.to_be_bytes());
        assert_eq!(&buffer[24..32], &31i64.to_be_bytes());
        assert_eq!(&buffer[32..36], &5u32.to_be_bytes());

        let parsed = Header::from_reader(&mut Cursor::new(buffer))?;
        assert_eq!(parsed, header);
        Ok(())
    }

    #[test]
    fn test_legacy_header() -> Result<()> {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&MAGIC);
        buffer.extend_from_slice(&0i64.to_be_bytes());
        buffer.extend_from_slice(&2i64.to_be_bytes());
        buffer.extend_from_slice(&23i64.to_be_bytes());
        let header = Header::from_reader(&mut Cursor::new(buffer))?;
        assert_eq!(header.size(), SIZE_HEADER_LEGACY);
        assert_eq!(header.k, 23);
        assert!(header.is_compact());
        assert!(!header.mode.is_canonical());
        Ok(())
    }

    #[test]
    fn test_bad_magic() {
        let mut buffer = [0u8; SIZE_HEADER_LEGACY];
        buffer[0..8].copy_from_slice(b"BSEQ\0\0\0\0");
        match Header::from_bytes(&buffer) {
            Err(Error::HeaderError(HeaderError::InvalidMagic(magic))) => {
                assert_eq!(&magic, b"BSEQ\0\0\0\0");
            }
            other => panic!("expected invalid magic, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_version_and_k() {
        let mut buffer = [0u8; SIZE_HEADER_LEGACY];
        buffer[0..8].copy_from_slice(&MAGIC);
        BigEndian::write_i64(&mut buffer[8..16], 7);
        BigEndian::write_i64(&mut buffer[24..32], 4);
        assert!(matches!(
            Header::from_bytes(&buffer),
            Err(Error::HeaderError(HeaderError::UnsupportedVersion(7)))
        ));

        BigEndian::write_i64(&mut buffer[8..16], 0);
        BigEndian::write_i64(&mut buffer[24..32], 33);
        assert!(matches!(
            Header::from_bytes(&buffer),
            Err(Error::HeaderError(HeaderError::InvalidK(33)))
        ));
    }

    #[test]
    fn test_truncated_header() {
        for len in [0, 5, 32, 35] {
            let mut buffer = Vec::new();
            Header::new(4, Mode::empty()).write_bytes(&mut buffer).unwrap();
            buffer.truncate(len);
            let err = Header::from_reader(&mut Cursor::new(buffer)).unwrap_err();
            assert!(err.is_invalid_format(), "{err:?}");
        }
    }

    #[test]
    fn test_mode() {
        let mut mode = Mode::empty();
        assert_eq!(mode.to_string(), "none");
        mode |= Mode::CANONICAL;
        mode.set(Mode::SORTED, true);
        assert!(mode.is_canonical() && mode.is_sorted() && !mode.is_compact());
        assert_eq!(mode.to_string(), "canonical,sorted");
        mode.set(Mode::SORTED, false);
        assert_eq!(mode, Mode::CANONICAL);
        assert_eq!(Mode::empty().with(Mode::COMPACT, true).bits(), 1);
    }
}
