use std::io::{Read, Write};

use rustc_hash::FxHashSet;
use tracing::info;

use super::{Expected, Input};
use crate::error::{Result, SetError};
use crate::reader::Reader;
use crate::writer::{Writer, WriterBuilder};

/// Outcome of a [`union`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnionSummary {
    pub k: u32,
    pub n_files: usize,
    pub written: u64,
}

/// Writes the deduplicated union of all inputs to `out`
///
/// Codes are written as soon as they are first seen, so the output keeps
/// first-seen order. The output is canonical if the inputs are.
///
/// # Errors
///
/// * [`SetError::NoInputs`] if `inputs` is empty
/// * [`SetError::KMismatch`] / [`SetError::InconsistentFlags`] if the inputs disagree
pub fn union<I, R, W>(inputs: I, out: W, compact: bool) -> Result<UnionSummary>
where
    I: IntoIterator<Item = Result<Input<R>>>,
    R: Read,
    W: Write,
{
    let mut inputs = inputs.into_iter();
    let Some(first) = inputs.next() else {
        return Err(SetError::NoInputs.into());
    };
    let first = first?;
    info!("process file (1): {}", first.name);
    let reader = Reader::new(first.reader)?;
    let expected = Expected::of(&reader.header());
    let mut writer = WriterBuilder::default()
        .k(expected.k as usize)
        .compact(compact)
        .canonical(expected.canonical)
        .build(out)?;

    let mut seen = FxHashSet::default();
    absorb(reader, &mut seen, &mut writer)?;

    let mut n_files = 1;
    for input in inputs {
        let input = input?;
        n_files += 1;
        info!("process file ({n_files}): {}", input.name);
        let reader = Reader::new(input.reader)?;
        expected.check(&input.name, &reader.header())?;
        absorb(reader, &mut seen, &mut writer)?;
    }

    writer.flush()?;
    info!("{} k-mers saved", writer.num_written());
    Ok(UnionSummary {
        k: expected.k,
        n_files,
        written: writer.num_written(),
    })
}

/// Streams every code not seen before straight into the writer
fn absorb<R: Read, W: Write>(
    reader: Reader<R>,
    seen: &mut FxHashSet<u64>,
    writer: &mut Writer<W>,
) -> Result<()> {
    for kmer in reader {
        let kmer = kmer?;
        if seen.insert(kmer.code()) {
            writer.write(kmer)?;
        }
    }
    Ok(())
}
