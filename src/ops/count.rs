use std::io::Write;

use rustc_hash::FxHashSet;
use tracing::info;

use crate::error::Result;
use crate::header::Mode;
use crate::kmer::{check_k, KmerCode, Kmers};
use crate::nucleotide::reverse_complement;
use crate::sequence::SequenceSource;
use crate::writer::WriterBuilder;

/// Options for [`count`]
#[derive(Debug, Clone, Copy)]
pub struct CountOptions {
    /// k-mer length, `1..=32`
    pub k: usize,
    /// Let k-mer windows wrap around the end of each sequence
    pub circular: bool,
    /// Store canonical k-mers and only scan the forward strand
    pub canonical: bool,
    /// Write the codes in ascending order
    pub sort: bool,
    /// Write the output in the compact representation
    pub compact: bool,
}
impl CountOptions {
    #[must_use]
    pub fn new(k: usize) -> Self {
        Self {
            k,
            circular: false,
            canonical: false,
            sort: false,
            compact: false,
        }
    }

    #[must_use]
    pub fn circular(mut self, circular: bool) -> Self {
        self.circular = circular;
        self
    }

    #[must_use]
    pub fn canonical(mut self, canonical: bool) -> Self {
        self.canonical = canonical;
        self
    }

    #[must_use]
    pub fn sort(mut self, sort: bool) -> Self {
        self.sort = sort;
        self
    }

    #[must_use]
    pub fn compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }

    /// Mode flags asserted by the output file
    #[must_use]
    pub fn mode(&self) -> Mode {
        Mode::empty()
            .with(Mode::COMPACT, self.compact)
            .with(Mode::CANONICAL, self.canonical)
            .with(Mode::SORTED, self.sort)
    }
}

/// Outcome of a [`count`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountSummary {
    /// Sequence records processed
    pub n_records: u64,
    /// Distinct codes written
    pub written: u64,
}

/// Builds the set of distinct k-mers of every record in `sources`
///
/// Without `canonical` both strands of each record are scanned. Unsorted output
/// is streamed in first-seen order; sorted output is buffered until every source
/// is consumed.
///
/// # Errors
///
/// * [`KmerError::UnsupportedK`](crate::KmerError::UnsupportedK) if `k` is outside `1..=32`
/// * [`KmerError::InvalidKmer`](crate::KmerError::InvalidKmer) on a base outside `ACGT`
pub fn count<I, S, W>(sources: I, out: W, options: CountOptions) -> Result<CountSummary>
where
    I: IntoIterator<Item = Result<S>>,
    S: SequenceSource,
    W: Write,
{
    let k = check_k(options.k)?;
    let mut writer = WriterBuilder::default()
        .k(options.k)
        .mode(options.mode())
        .build(out)?;

    let mut seen = FxHashSet::default();
    let mut sorted = Vec::new();
    let mut n_records = 0;
    let mut rc = Vec::new();
    for source in sources {
        let mut source = source?;
        while let Some(record) = source.next_record() {
            let record = record?;
            n_records += 1;
            info!("processing sequence: {}", record.id);
            let mut emit = |kmer: KmerCode| -> Result<()> {
                if seen.insert(kmer.code()) {
                    if options.sort {
                        sorted.push(kmer.code());
                    } else {
                        writer.write(kmer)?;
                    }
                }
                Ok(())
            };

            scan(&record.seq, &options, &mut emit)?;
            if !options.canonical {
                info!("processing reverse complement sequence: {}", record.id);
                reverse_complement(&record.seq, &mut rc);
                scan(&rc, &options, &mut emit)?;
            }
        }
    }

    if options.sort {
        info!("sorting {} k-mers", sorted.len());
        sorted.sort_unstable();
        for code in sorted {
            writer.write(KmerCode::new(code, k))?;
        }
    }
    writer.flush()?;
    let written = writer.num_written();
    info!("{written} unique k-mers saved");

    Ok(CountSummary { n_records, written })
}

fn scan<F>(seq: &[u8], options: &CountOptions, emit: &mut F) -> Result<()>
where
    F: FnMut(KmerCode) -> Result<()>,
{
    for kmer in Kmers::new(seq, options.k, options.circular)? {
        let kmer = kmer?;
        emit(if options.canonical {
            kmer.canonical()
        } else {
            kmer
        })?;
    }
    Ok(())
}
