//! Binary k-mer file writer
//!
//! The header is written lazily: on the first call to [`Writer::write`], or on
//! [`Writer::flush`]/[`Writer::finish`] when nothing was written, so that an empty
//! set still produces a valid header-only file.
//!
//! No trailing record count or checksum is written after the body.

use std::io::Write;

use byteorder::{BigEndian, ByteOrder};

use crate::error::{Result, WriteError};
use crate::header::{Header, Mode};
use crate::kmer::{check_k, KmerCode};

/// Builder for [`Writer`] instances
///
/// # Examples
///
/// ```
/// # use unikmer::{Result, WriterBuilder};
/// # fn main() -> Result<()> {
/// let mut writer = WriterBuilder::default()
///     .k(4)
///     .compact(true)
///     .canonical(true)
///     .build(Vec::new())?;
/// writer.write_kmer(b"ACGT")?;
/// let bytes = writer.finish()?;
/// assert_eq!(bytes.len(), 36 + 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct WriterBuilder {
    /// Required K of every code
    k: Option<usize>,
    /// Mode flags
    mode: Mode,
}
impl WriterBuilder {
    #[must_use]
    pub fn k(mut self, k: usize) -> Self {
        self.k = Some(k);
        self
    }

    #[must_use]
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn compact(mut self, compact: bool) -> Self {
        self.mode.set(Mode::COMPACT, compact);
        self
    }

    #[must_use]
    pub fn canonical(mut self, canonical: bool) -> Self {
        self.mode.set(Mode::CANONICAL, canonical);
        self
    }

    #[must_use]
    pub fn sorted(mut self, sorted: bool) -> Self {
        self.mode.set(Mode::SORTED, sorted);
        self
    }

    pub fn build<W: Write>(self, inner: W) -> Result<Writer<W>> {
        let Some(k) = self.k else {
            return Err(WriteError::MissingK.into());
        };
        Writer::new(inner, k, self.mode)
    }
}

/// Writer of binary k-mer files
///
/// Every code written must share the K of the writer.
pub struct Writer<W: Write> {
    /// Inner writer
    inner: W,

    /// Header of the file
    header: Header,

    /// Whether the header has been emitted yet
    header_written: bool,

    /// Reusable big-endian record buffer
    buffer: [u8; 8],

    /// Number of bytes per record
    record_size: usize,

    /// Number of records written
    records_written: u64,
}
impl<W: Write> Writer<W> {
    /// Creates a writer; nothing is written until the first code or flush
    pub fn new(inner: W, k: usize, mode: Mode) -> Result<Self> {
        let k = check_k(k)?;
        let header = Header::new(k, mode);
        Ok(Self {
            inner,
            header,
            header_written: false,
            buffer: [0u8; 8],
            record_size: header.record_size(),
            records_written: 0,
        })
    }

    fn ensure_header(&mut self) -> Result<()> {
        if !self.header_written {
            self.header.write_bytes(&mut self.inner)?;
            self.header_written = true;
        }
        Ok(())
    }

    /// Writes one code
    pub fn write(&mut self, kmer: KmerCode) -> Result<()> {
        if kmer.k() != self.header.k {
            return Err(WriteError::KMismatch {
                expected: self.header.k,
                got: kmer.k(),
            }
            .into());
        }
        self.ensure_header()?;
        BigEndian::write_u64(&mut self.buffer, kmer.code());
        self.inner.write_all(&self.buffer[8 - self.record_size..])?;
        self.records_written += 1;
        Ok(())
    }

    /// Encodes a k-mer given as bases and writes it
    pub fn write_kmer(&mut self, kmer: &[u8]) -> Result<()> {
        let code = KmerCode::encode(kmer)?;
        self.write(code)
    }

    pub fn header(&self) -> Header {
        self.header
    }

    pub fn k(&self) -> u32 {
        self.header.k
    }

    /// Number of codes written so far
    pub fn num_written(&self) -> u64 {
        self.records_written
    }

    /// Emits the header if still pending and flushes the inner writer
    pub fn flush(&mut self) -> Result<()> {
        self.ensure_header()?;
        self.inner.flush()?;
        Ok(())
    }

    /// Flushes and returns the inner writer
    pub fn finish(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.inner)
    }

    /// Gets a mutable reference to the underlying writer
    pub fn by_ref(&mut self) -> &mut W {
        &mut self.inner
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::header::{SIZE_HEADER_LEGACY, SIZE_MODE};
    use crate::{Error, Reader};
    use anyhow::Result;
    use std::io::Cursor;

    const SIZE_HEADER: usize = SIZE_HEADER_LEGACY + SIZE_MODE;

    #[test]
    fn test_lazy_header() -> Result<()> {
        let mut writer = Writer::new(Vec::new(), 4, Mode::empty())?;
        assert!(writer.by_ref().is_empty());
        writer.write_kmer(b"ACGT")?;
        assert_eq!(writer.by_ref().len(), SIZE_HEADER + 8);
        Ok(())
    }

    #[test]
    fn test_empty_writer_is_header_only() -> Result<()> {
        let writer = Writer::new(Vec::new(), 4, Mode::COMPACT)?;
        let bytes = writer.finish()?;
        assert_eq!(bytes.len(), SIZE_HEADER);
        let mut reader = Reader::new(Cursor::new(bytes))?;
        assert_eq!(reader.k(), 4);
        assert!(reader.read()?.is_none());
        Ok(())
    }

    #[test]
    fn test_flush_does_not_repeat_header() -> Result<()> {
        let mut writer = Writer::new(Vec::new(), 4, Mode::empty())?;
        writer.flush()?;
        writer.flush()?;
        writer.write_kmer(b"TTTT")?;
        let bytes = writer.finish()?;
        assert_eq!(bytes.len(), SIZE_HEADER + 8);
        Ok(())
    }

    #[test]
    fn test_compact_bytes() -> Result<()> {
        let mut writer = WriterBuilder::default().k(5).compact(true).build(Vec::new())?;
        writer.write(KmerCode::new(0x03FF, 5))?;
        assert_eq!(writer.num_written(), 1);
        let bytes = writer.finish()?;
        assert_eq!(&bytes[SIZE_HEADER..], &[0x03, 0xFF]);
        Ok(())
    }

    #[test]
    fn test_k_mismatch() -> Result<()> {
        let mut writer = Writer::new(Vec::new(), 4, Mode::empty())?;
        let err = writer.write_kmer(b"ACG").unwrap_err();
        assert!(matches!(
            err,
            Error::WriteError(WriteError::KMismatch {
                expected: 4,
                got: 3
            })
        ));
        assert!(err.is_k_mismatch());
        assert_eq!(writer.num_written(), 0);
        Ok(())
    }

    #[test]
    fn test_builder_requires_k() {
        assert!(matches!(
            WriterBuilder::default().build(Vec::new()),
            Err(Error::WriteError(WriteError::MissingK))
        ));
        assert!(WriterBuilder::default().k(33).build(Vec::new()).is_err());
    }

    #[test]
    fn test_builder_mode() -> Result<()> {
        let writer = WriterBuilder::default()
            .k(12)
            .canonical(true)
            .sorted(true)
            .build(Vec::new())?;
        let mode = writer.header().mode;
        assert!(mode.is_canonical() && mode.is_sorted() && !mode.is_compact());
        assert_eq!(writer.header().minor_version, 1);
        Ok(())
    }

    #[test]
    fn test_to_path() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("test_to_path.unik");
        let inner = std::fs::File::create(&path).map(std::io::BufWriter::new)?;
        let mut writer = Writer::new(inner, 3, Mode::COMPACT)?;
        writer.write_kmer(b"GAT")?;
        writer.flush()?;
        drop(writer);

        let reader = Reader::new(std::fs::File::open(&path).map(std::io::BufReader::new)?)?;
        let codes = reader.collect::<crate::Result<Vec<_>>>()?;
        assert_eq!(codes, vec![KmerCode::encode(b"GAT")?]);
        Ok(())
    }
}
