//! Sequence records fed in by an external FASTA/FASTQ reader
//!
//! The k-mer operations never parse sequence files themselves; anything that can
//! hand out [`SequenceRecord`]s one at a time implements [`SequenceSource`].

use auto_impl::auto_impl;

use crate::error::Result;

/// One named sequence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceRecord {
    /// Identifier (first word of the header line)
    pub id: String,
    /// Raw bases, without line breaks
    pub seq: Vec<u8>,
}
impl SequenceRecord {
    pub fn new(id: impl Into<String>, seq: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            seq: seq.into(),
        }
    }
}

/// A stream of sequence records
#[auto_impl(&mut, Box)]
pub trait SequenceSource {
    /// Returns the next record, `None` at the end of the stream
    fn next_record(&mut self) -> Option<Result<SequenceRecord>>;
}

/// In-memory source, mostly useful for tests and small references
#[derive(Debug, Clone, Default)]
pub struct RecordList {
    records: std::vec::IntoIter<SequenceRecord>,
}
impl RecordList {
    #[must_use]
    pub fn new(records: Vec<SequenceRecord>) -> Self {
        Self {
            records: records.into_iter(),
        }
    }
}

impl SequenceSource for RecordList {
    fn next_record(&mut self) -> Option<Result<SequenceRecord>> {
        self.records.next().map(Ok)
    }
}

impl FromIterator<SequenceRecord> for RecordList {
    fn from_iter<T: IntoIterator<Item = SequenceRecord>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
