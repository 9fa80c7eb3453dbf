//! Streaming set operations over binary k-mer files
//!
//! Every operation owns its in-memory code set for the duration of the call and
//! consumes its inputs strictly one after another: an input is opened when the
//! input iterator yields it and dropped before the next one is requested.
//!
//! * [`count`] - build a k-mer set from sequences
//! * [`union`] - deduplicated union of many files, in first-seen order
//! * [`diff`] - codes of the first file found in none of the others
//! * [`uniqs`] - genome regions covered by k-mers of a set that map only once

mod count;
mod diff;
mod union;
mod uniqs;

pub use count::{count, CountOptions, CountSummary};
pub use diff::{diff, DiffOptions, DiffSummary, DEFAULT_CHECK_INTERVAL};
pub use union::{union, UnionSummary};
pub use uniqs::{uniqs, UniqsOptions, UniqsSummary};

use std::io::Read;

use crate::error::{Result, SetError};
use crate::header::Header;

/// Name used for standard input and output
pub const STDIO: &str = "-";

/// A named binary input
///
/// The name is only used for diagnostics and to detect a file given twice.
pub struct Input<R: Read> {
    pub name: String,
    pub reader: R,
}
impl<R: Read> Input<R> {
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        Self {
            name: name.into(),
            reader,
        }
    }
}

/// Properties every input of one operation has to agree on
#[derive(Debug, Clone, Copy)]
struct Expected {
    k: u32,
    canonical: bool,
}
impl Expected {
    fn of(header: &Header) -> Self {
        Self {
            k: header.k,
            canonical: header.mode.is_canonical(),
        }
    }

    fn check(&self, name: &str, header: &Header) -> Result<()> {
        if header.k != self.k {
            return Err(SetError::KMismatch {
                name: name.to_string(),
                expected: self.k,
                got: header.k,
            }
            .into());
        }
        if header.mode.is_canonical() != self.canonical {
            return Err(SetError::InconsistentFlags {
                name: name.to_string(),
            }
            .into());
        }
        Ok(())
    }
}
