use std::io::{self, Read, Write};

use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use super::{Expected, Input, STDIO};
use crate::error::{Result, SetError};
use crate::kmer::KmerCode;
use crate::reader::Reader;
use crate::writer::WriterBuilder;

/// Default number of inputs processed between two sweeps of the code set
pub const DEFAULT_CHECK_INTERVAL: usize = 5;

/// Options for [`diff`]
#[derive(Debug, Clone, Copy)]
pub struct DiffOptions {
    /// Sweep codes seen elsewhere out of the set every N inputs
    ///
    /// Only trades memory against time; the result does not depend on it.
    /// `0` is treated as `1`.
    pub check_interval: usize,
    /// Write the output in the compact representation
    pub compact: bool,
}
impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            check_interval: DEFAULT_CHECK_INTERVAL,
            compact: false,
        }
    }
}
impl DiffOptions {
    #[must_use]
    pub fn check_interval(mut self, check_interval: usize) -> Self {
        self.check_interval = check_interval;
        self
    }

    #[must_use]
    pub fn compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }
}

/// Outcome of a [`diff`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffSummary {
    /// Number of codes written; `None` when the single input was copied verbatim
    pub written: Option<u64>,
    /// Number of inputs actually read
    pub n_files: usize,
}

/// Writes the codes of the first input that appear in none of the other inputs
///
/// With a single input the bytes are copied to `out` unchanged. Otherwise the
/// surviving codes are written in ascending order with [`Mode::SORTED`](crate::Mode::SORTED)
/// set. An empty difference still produces a header-only file. Inputs after the
/// first that carry the first input's name are skipped.
///
/// # Errors
///
/// * [`SetError::NoInputs`] if `inputs` is empty
/// * [`SetError::KMismatch`] / [`SetError::InconsistentFlags`] if the inputs disagree
pub fn diff<I, R, W>(inputs: I, mut out: W, options: DiffOptions) -> Result<DiffSummary>
where
    I: IntoIterator<Item = Result<Input<R>>>,
    I::IntoIter: ExactSizeIterator,
    R: Read,
    W: Write,
{
    let mut inputs = inputs.into_iter();
    let n_inputs = inputs.len();
    let Some(first) = inputs.next() else {
        return Err(SetError::NoInputs.into());
    };
    let mut first = first?;

    if n_inputs == 1 {
        info!("directly copy input data when only one file given");
        io::copy(&mut first.reader, &mut out)?;
        out.flush()?;
        return Ok(DiffSummary {
            written: None,
            n_files: 1,
        });
    }

    info!("process file (1/{n_inputs}): {}", first.name);
    let reader = Reader::new(first.reader)?;
    let expected = Expected::of(&reader.header());

    // code -> seen in another input
    let mut remain: FxHashMap<u64, bool> = FxHashMap::default();
    for kmer in reader {
        remain.insert(kmer?.code(), false);
    }
    info!("{} k-mers loaded", remain.len());

    let check_interval = options.check_interval.max(1);
    let mut pending = false;
    let mut n_files = 1;
    for (i, input) in (1..n_inputs).zip(inputs) {
        let input = input?;
        if input.name == first.name && input.name != STDIO {
            warn!("skip file ({}/{n_inputs}) identical to the first: {}", i + 1, input.name);
            continue;
        }
        info!("process file ({}/{n_inputs}): {}", i + 1, input.name);
        let reader = Reader::new(input.reader)?;
        expected.check(&input.name, &reader.header())?;
        n_files += 1;

        for kmer in reader {
            if let Some(seen) = remain.get_mut(&kmer?.code()) {
                *seen = true;
                pending = true;
            }
        }

        if i == n_inputs - 1 || i % check_interval == 0 {
            sweep(&mut remain);
            pending = false;
            if remain.is_empty() {
                info!("no set difference found");
                break;
            }
        }
    }
    if pending {
        sweep(&mut remain);
    }

    let mut survivors: Vec<u64> = remain.into_keys().collect();
    survivors.sort_unstable();

    let mut writer = WriterBuilder::default()
        .k(expected.k as usize)
        .compact(options.compact)
        .canonical(expected.canonical)
        .sorted(true)
        .build(out)?;
    for code in survivors {
        writer.write(KmerCode::new(code, expected.k))?;
    }
    writer.flush()?;
    info!("{} k-mers found", writer.num_written());

    Ok(DiffSummary {
        written: Some(writer.num_written()),
        n_files,
    })
}

/// Drops every code that has been seen in another input
fn sweep(remain: &mut FxHashMap<u64, bool>) {
    remain.retain(|_, seen| !*seen);
    debug!("{} k-mers remain", remain.len());
}
