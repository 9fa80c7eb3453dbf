/// Custom Result type for unikmer operations, wrapping the custom [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the unikmer library, encompassing all possible error cases
/// that can occur while encoding k-mers, reading or writing binary files, and
/// combining k-mer sets.
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub enum Error {
    /// Errors related to binary file header processing (invalid format)
    HeaderError(#[from] HeaderError),
    /// Errors that occur while reading the body of a binary file
    ReadError(#[from] ReadError),
    /// Errors that occur during write operations
    WriteError(#[from] WriteError),
    /// Errors raised while encoding nucleotides into k-mer codes
    KmerError(#[from] KmerError),
    /// Errors raised by the set operations when inputs disagree
    SetError(#[from] SetError),
    /// Standard I/O errors from the Rust standard library
    IoError(#[from] std::io::Error),
}
impl Error {
    /// Returns true if the error means the input is not a readable k-mer file
    #[must_use]
    pub fn is_invalid_format(&self) -> bool {
        matches!(self, Self::HeaderError(_) | Self::ReadError(_))
    }

    /// Returns true if the error was caused by two different values of K
    #[must_use]
    pub fn is_k_mismatch(&self) -> bool {
        matches!(
            self,
            Self::WriteError(WriteError::KMismatch { .. }) | Self::SetError(SetError::KMismatch { .. })
        )
    }
}

/// Errors specific to processing and validating binary file headers
#[derive(thiserror::Error, Debug)]
pub enum HeaderError {
    /// The magic bytes at the start of the stream do not match
    ///
    /// # Arguments
    /// * `[u8; 8]` - The bytes that were found instead
    #[error("Invalid binary format: bad magic bytes {0:?}")]
    InvalidMagic([u8; 8]),

    /// The main version in the header is not supported
    #[error("Unsupported format version: {0}")]
    UnsupportedVersion(i64),

    /// The value of K stored in the header is outside of 1..=32
    #[error("Invalid K in header: {0}")]
    InvalidK(i64),

    /// The stream ended before a complete header could be read
    ///
    /// # Arguments
    /// * `usize` - The number of header bytes expected
    #[error("Invalid binary format: stream ended inside the {0}-byte header")]
    Truncated(usize),
}

/// Errors that can occur while reading k-mer codes from the body of a file
#[derive(thiserror::Error, Debug)]
pub enum ReadError {
    /// The stream ended in the middle of a record
    ///
    /// # Fields
    /// * `index` - The index of the incomplete record
    /// * `got` - The number of bytes available for it
    /// * `expected` - The number of bytes per record
    #[error("Record {index} is truncated: got {got} of {expected} bytes")]
    TruncatedRecord {
        index: u64,
        got: usize,
        expected: usize,
    },
}

/// Errors that can occur while writing binary k-mer files
#[derive(thiserror::Error, Debug)]
pub enum WriteError {
    /// The K of the k-mer being written does not match the writer
    #[error("K mismatch: writer has K={expected}, k-mer has K={got}")]
    KMismatch { expected: u32, got: u32 },

    /// Attempted to build a writer without setting K
    #[error("Missing K in writer builder")]
    MissingK,
}

/// Errors raised while encoding nucleotides
#[derive(thiserror::Error, Debug)]
pub enum KmerError {
    /// A byte outside of the DNA alphabet was given to the codec
    #[error("Invalid nucleotide base: {0:?}")]
    InvalidBase(char),

    /// A k-mer contains a byte outside of the DNA alphabet
    #[error("Invalid base {base:?} in k-mer '{kmer}'")]
    InvalidKmer { kmer: String, base: char },

    /// K is zero or too large to fit in a 64-bit code
    #[error("Unsupported K: {0} (must be within 1..=32)")]
    UnsupportedK(usize),
}

/// Errors raised by the set operations over multiple inputs
#[derive(thiserror::Error, Debug)]
pub enum SetError {
    /// An input has a different K from the inputs before it
    #[error("K ({got}) of binary file '{name}' not equal to previous K ({expected})")]
    KMismatch {
        name: String,
        expected: u32,
        got: u32,
    },

    /// An input disagrees with the previous inputs about the canonical flag
    #[error("'canonical' flag of binary file '{name}' not consistent with previous files")]
    InconsistentFlags { name: String },

    /// The operation was given no input at all
    #[error("No input files given")]
    NoInputs,
}
