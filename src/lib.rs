//! # unikmer
//!
//! Compact binary storage of k-mer sets and streaming set operations over them.
//!
//! A k-mer of length `k <= 32` is packed 2 bits per base (`A=00 C=01 G=10 T=11`,
//! first base most significant) into a [`KmerCode`]. Codes are stored in a small
//! big-endian container written by [`Writer`] and read back by [`Reader`], either
//! as fixed 8-byte records or compacted to `(k + 3) / 4` bytes.
//!
//! The [`ops`] module builds sets from sequences and combines binary files
//! (union, difference, and mapping a set back to unique genome regions).
//!
//! ```
//! use std::io::Cursor;
//! use unikmer::{KmerCode, Mode, Reader, Writer};
//!
//! let mut writer = Writer::new(Vec::new(), 4, Mode::COMPACT)?;
//! writer.write_kmer(b"ACGT")?;
//! writer.write(KmerCode::encode(b"TTGA")?.canonical())?;
//! let bytes = writer.finish()?;
//!
//! let kmers = Reader::new(Cursor::new(bytes))?
//!     .map(|kmer| kmer.map(|kmer| kmer.to_string()))
//!     .collect::<unikmer::Result<Vec<_>>>()?;
//! assert_eq!(kmers, ["ACGT", "TCAA"]);
//! # Ok::<(), unikmer::Error>(())
//! ```

mod error;
mod header;
mod kmer;
pub mod nucleotide;
pub mod ops;
mod reader;
mod sequence;
mod writer;

pub use error::{Error, HeaderError, KmerError, ReadError, Result, SetError, WriteError};
pub use header::{Header, Mode, MAGIC, MAIN_VERSION};
pub use kmer::{KmerCode, Kmers, MAX_K};
pub use ops::Input;
pub use reader::Reader;
pub use sequence::{RecordList, SequenceRecord, SequenceSource};
pub use writer::{Writer, WriterBuilder};
