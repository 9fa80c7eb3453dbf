//! Streaming reader for binary k-mer files
//!
//! The reader validates the header once on construction and then yields one
//! [`KmerCode`] per call. The body representation (fixed 8-byte or compact) is
//! chosen from the minor version of the header only.

use std::io::{ErrorKind, Read};

use byteorder::{BigEndian, ByteOrder};

use crate::error::{ReadError, Result};
use crate::header::{Header, Mode};
use crate::kmer::KmerCode;

#[derive(Debug)]
pub struct Reader<R: Read> {
    /// Inner reader
    inner: R,

    /// Header of the file
    header: Header,

    /// Reusable 8-byte record buffer; compact records fill its low bytes
    buffer: [u8; 8],

    /// Number of bytes per record
    record_size: usize,

    /// Number of records read
    n_processed: u64,
}
impl<R: Read> Reader<R> {
    /// Reads and validates the header, leaving the stream at the first code
    pub fn new(mut inner: R) -> Result<Self> {
        let header = Header::from_reader(&mut inner)?;
        Ok(Self {
            inner,
            header,
            buffer: [0u8; 8],
            record_size: header.record_size(),
            n_processed: 0,
        })
    }

    /// Reads the next code
    ///
    /// Returns `Ok(None)` on a clean end of stream, i.e. when the stream ends
    /// exactly on a record boundary. A record cut short is an error.
    pub fn read(&mut self) -> Result<Option<KmerCode>> {
        let offset = 8 - self.record_size;
        let got = fill(&mut self.inner, &mut self.buffer[offset..])?;
        if got == 0 {
            return Ok(None);
        }
        if got < self.record_size {
            return Err(ReadError::TruncatedRecord {
                index: self.n_processed,
                got,
                expected: self.record_size,
            }
            .into());
        }
        self.n_processed += 1;
        let code = BigEndian::read_u64(&self.buffer);
        Ok(Some(KmerCode::new(code, self.header.k)))
    }

    pub fn header(&self) -> Header {
        self.header
    }

    pub fn k(&self) -> u32 {
        self.header.k
    }

    pub fn mode(&self) -> Mode {
        self.header.mode
    }

    /// Number of codes read so far
    pub fn n_processed(&self) -> u64 {
        self.n_processed
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Iterator for Reader<R> {
    type Item = Result<KmerCode>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read().transpose()
    }
}

/// Reads until `buf` is full or the stream ends, returning the number of bytes read
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut got = 0;
    while got < buf.len() {
        match reader.read(&mut buf[got..]) {
            Ok(0) => break,
            Ok(n) => got += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(got)
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::header::MAGIC;
    use crate::{Error, HeaderError};
    use anyhow::Result;
    use std::io::Cursor;

    fn legacy_file(minor: i64, k: i64, body: &[u8]) -> Vec<u8> {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&MAGIC);
        buffer.extend_from_slice(&0i64.to_be_bytes());
        buffer.extend_from_slice(&minor.to_be_bytes());
        buffer.extend_from_slice(&k.to_be_bytes());
        buffer.extend_from_slice(body);
        buffer
    }

    #[test]
    fn test_read_fixed() -> Result<()> {
        let mut body = Vec::new();
        body.extend_from_slice(&27u64.to_be_bytes());
        body.extend_from_slice(&0u64.to_be_bytes());
        let mut reader = Reader::new(Cursor::new(legacy_file(1, 3, &body)))?;
        assert_eq!(reader.k(), 3);
        assert_eq!(reader.read()?, Some(KmerCode::new(27, 3)));
        assert_eq!(reader.read()?, Some(KmerCode::new(0, 3)));
        assert_eq!(reader.read()?, None);
        assert_eq!(reader.n_processed(), 2);
        Ok(())
    }

    #[test]
    fn test_read_compact() -> Result<()> {
        // k = 5 -> 2 bytes per code
        let body = [0x01, 0x02, 0x03, 0xFF];
        let reader = Reader::new(Cursor::new(legacy_file(2, 5, &body)))?;
        let codes = reader.map(|r| r.map(|c| c.code())).collect::<crate::Result<Vec<_>>>()?;
        assert_eq!(codes, vec![0x0102, 0x03FF]);
        Ok(())
    }

    #[test]
    fn test_read_empty_body() -> Result<()> {
        let mut reader = Reader::new(Cursor::new(legacy_file(2, 5, &[])))?;
        assert!(reader.read()?.is_none());
        assert!(reader.next().is_none());
        Ok(())
    }

    #[test]
    fn test_truncated_record() -> Result<()> {
        let mut reader = Reader::new(Cursor::new(legacy_file(1, 8, &[0, 0, 0, 1, 2])))?;
        match reader.read() {
            Err(Error::ReadError(ReadError::TruncatedRecord {
                index,
                got,
                expected,
            })) => {
                assert_eq!((index, got, expected), (0, 5, 8));
            }
            other => panic!("expected truncated record, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_invalid_magic() {
        let mut data = legacy_file(1, 3, &[0u8; 8]);
        data[1] = b'U';
        assert!(matches!(
            Reader::new(Cursor::new(data)),
            Err(Error::HeaderError(HeaderError::InvalidMagic(_)))
        ));
    }

    #[test]
    fn test_empty_stream_is_not_empty_set() {
        let err = Reader::new(Cursor::new(Vec::new())).unwrap_err();
        assert!(err.is_invalid_format());
    }
}
