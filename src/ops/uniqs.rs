use std::io::{Read, Write};

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::info;

use super::{Expected, Input};
use crate::error::{Result, SetError};
use crate::kmer::Kmers;
use crate::reader::Reader;
use crate::sequence::{SequenceRecord, SequenceSource};

/// Options for [`uniqs`]
#[derive(Debug, Clone, Copy)]
pub struct UniqsOptions {
    /// Minimum length of a reported region
    pub min_len: usize,
    /// Let k-mer windows wrap around the end of each genome sequence
    pub circular: bool,
    /// Keep k-mers that occur more than once in the genome as region anchors
    pub allow_multiple_mapped: bool,
    /// Write FASTA records instead of BED3 lines
    pub output_fasta: bool,
    /// Line width of FASTA sequences
    pub line_width: usize,
}
impl Default for UniqsOptions {
    fn default() -> Self {
        Self {
            min_len: 200,
            circular: false,
            allow_multiple_mapped: false,
            output_fasta: false,
            line_width: 60,
        }
    }
}
impl UniqsOptions {
    #[must_use]
    pub fn min_len(mut self, min_len: usize) -> Self {
        self.min_len = min_len;
        self
    }

    #[must_use]
    pub fn circular(mut self, circular: bool) -> Self {
        self.circular = circular;
        self
    }

    #[must_use]
    pub fn allow_multiple_mapped(mut self, allow: bool) -> Self {
        self.allow_multiple_mapped = allow;
        self
    }

    #[must_use]
    pub fn output_fasta(mut self, output_fasta: bool) -> Self {
        self.output_fasta = output_fasta;
        self
    }
}

/// Outcome of a [`uniqs`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniqsSummary {
    /// Distinct canonical k-mers loaded from the inputs
    pub n_kmers: usize,
    /// Distinct canonical k-mers found at two or more genome positions
    pub n_multiple_mapped: usize,
    /// Number of regions written
    pub n_regions: u64,
}

/// Maps a k-mer set back onto a genome and writes the regions it covers
///
/// A region is a maximal run of genome positions whose canonical k-mer is in the
/// set (and, unless `allow_multiple_mapped` is set, occurs once in the genome).
/// The run only opens after `k` consecutive such positions; it is written as a
/// 0-based half-open `[start, end)` interval when its length reaches `min_len`.
///
/// `genome` is called once per pass over the genome: twice when multiple-mapped
/// k-mers are filtered out, once otherwise.
pub fn uniqs<I, R, F, S, W>(
    inputs: I,
    mut genome: F,
    mut out: W,
    options: UniqsOptions,
) -> Result<UniqsSummary>
where
    I: IntoIterator<Item = Result<Input<R>>>,
    R: Read,
    F: FnMut() -> Result<S>,
    S: SequenceSource,
    W: Write,
{
    let (k, kmers) = load_kmers(inputs)?;
    info!("{} k-mers loaded", kmers.len());

    let multiple = if options.allow_multiple_mapped {
        FxHashSet::default()
    } else {
        info!("pre-read genome");
        let multiple = multiple_mapped(genome()?, k, options.circular)?;
        info!("{} k-mers in genome are multiple mapped", multiple.len());
        multiple
    };

    info!("read genome");
    let mut regions = RegionWriter::new(&mut out, options);
    let mut source = genome()?;
    while let Some(record) = source.next_record() {
        let record = record?;
        info!("process sequence: {}", record.id);

        let mut run = 0;
        let mut start = None;
        let mut pos = 0;
        for kmer in Kmers::new(&record.seq, k, options.circular)? {
            let code = kmer?.canonical().code();
            if kmers.contains(&code) && !multiple.contains(&code) {
                run += 1;
                if run == k {
                    start = Some(pos);
                }
            } else {
                if let Some(start) = start.take() {
                    regions.write(&record, start, pos)?;
                }
                run = 0;
            }
            pos += 1;
        }
        if let Some(start) = start {
            regions.write(&record, start, pos)?;
        }
    }
    let n_regions = regions.written;
    out.flush()?;

    Ok(UniqsSummary {
        n_kmers: kmers.len(),
        n_multiple_mapped: multiple.len(),
        n_regions,
    })
}

/// Loads the canonical codes of every input into one set
fn load_kmers<I, R>(inputs: I) -> Result<(usize, FxHashSet<u64>)>
where
    I: IntoIterator<Item = Result<Input<R>>>,
    R: Read,
{
    let mut expected: Option<Expected> = None;
    let mut kmers = FxHashSet::default();
    for (i, input) in inputs.into_iter().enumerate() {
        let input = input?;
        info!("read file ({}): {}", i + 1, input.name);
        let reader = Reader::new(input.reader)?;
        let header = reader.header();
        match expected {
            None => {
                info!(
                    "flag of canonical is {}",
                    if header.mode.is_canonical() { "on" } else { "off" }
                );
                expected = Some(Expected::of(&header));
            }
            Some(expected) => expected.check(&input.name, &header)?,
        }
        if header.mode.is_canonical() {
            for kmer in reader {
                kmers.insert(kmer?.code());
            }
        } else {
            for kmer in reader {
                kmers.insert(kmer?.canonical().code());
            }
        }
    }
    let Some(expected) = expected else {
        return Err(SetError::NoInputs.into());
    };
    Ok((expected.k as usize, kmers))
}

/// Canonical codes occurring at two or more positions of the genome
fn multiple_mapped<S: SequenceSource>(
    mut source: S,
    k: usize,
    circular: bool,
) -> Result<FxHashSet<u64>> {
    // code -> seen more than once
    let mut counts: FxHashMap<u64, bool> = FxHashMap::default();
    while let Some(record) = source.next_record() {
        let record = record?;
        info!("process sequence: {}", record.id);
        for kmer in Kmers::new(&record.seq, k, circular)? {
            counts
                .entry(kmer?.canonical().code())
                .and_modify(|twice| *twice = true)
                .or_insert(false);
        }
    }
    info!("{} k-mers loaded from genome", counts.len());
    Ok(counts
        .into_iter()
        .filter_map(|(code, twice)| twice.then_some(code))
        .collect())
}

/// Formats regions as BED3 lines or FASTA records
struct RegionWriter<'a, W: Write> {
    out: &'a mut W,
    options: UniqsOptions,
    written: u64,
}
impl<'a, W: Write> RegionWriter<'a, W> {
    fn new(out: &'a mut W, options: UniqsOptions) -> Self {
        Self {
            out,
            options,
            written: 0,
        }
    }

    /// Writes `[start, end)` of `record` if it is long enough
    fn write(&mut self, record: &SequenceRecord, start: usize, end: usize) -> Result<()> {
        if end - start < self.options.min_len {
            return Ok(());
        }
        let mut ibuf = itoa::Buffer::new();
        if self.options.output_fasta {
            self.out.write_all(b">")?;
            self.out.write_all(record.id.as_bytes())?;
            self.out.write_all(b":")?;
            self.out.write_all(ibuf.format(start + 1).as_bytes())?;
            self.out.write_all(b"-")?;
            self.out.write_all(ibuf.format(end).as_bytes())?;
            self.out.write_all(b"\n")?;
            for line in record.seq[start..end].chunks(self.options.line_width.max(1)) {
                self.out.write_all(line)?;
                self.out.write_all(b"\n")?;
            }
        } else {
            self.out.write_all(record.id.as_bytes())?;
            self.out.write_all(b"\t")?;
            self.out.write_all(ibuf.format(start).as_bytes())?;
            self.out.write_all(b"\t")?;
            self.out.write_all(ibuf.format(end).as_bytes())?;
            self.out.write_all(b"\n")?;
        }
        self.written += 1;
        Ok(())
    }
}
