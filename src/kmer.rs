//! K-mer codes
//!
//! A [`KmerCode`] packs up to 32 bases into the low `2k` bits of a `u64`,
//! most-significant base first, so that numeric order of codes matches the
//! lexicographic order of the k-mers (`A < C < G < T`).
//!
//! [`Kmers`] walks every window of a sequence, encoding the first window from
//! scratch and rolling each following code in O(1).

use std::borrow::Cow;
use std::fmt;

use crate::error::{KmerError, Result};
use crate::nucleotide::{base_to_bits, bits_to_base};

/// Largest K that fits into a 64-bit code
pub const MAX_K: usize = 32;

/// Mask keeping the low `2k` bits of a code
#[inline]
#[must_use]
pub fn mask(k: u32) -> u64 {
    if k as usize >= MAX_K {
        u64::MAX
    } else {
        (1u64 << (2 * k)) - 1
    }
}

/// Checks that K is within `1..=MAX_K`
pub fn check_k(k: usize) -> Result<u32> {
    if k == 0 || k > MAX_K {
        return Err(KmerError::UnsupportedK(k).into());
    }
    Ok(k as u32)
}

fn invalid_kmer(kmer: &[u8], base: u8) -> crate::Error {
    KmerError::InvalidKmer {
        kmer: String::from_utf8_lossy(kmer).into_owned(),
        base: char::from(base),
    }
    .into()
}

/// A k-mer packed into a 64-bit integer
///
/// Only the low `2k` bits of `code` are significant; the rest are always zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KmerCode {
    code: u64,
    k: u32,
}
impl KmerCode {
    /// Wraps a raw code, discarding any bit above `2k`
    ///
    /// # Panics
    ///
    /// Panics in debug builds if `k` is not within `1..=32`.
    #[must_use]
    pub fn new(code: u64, k: u32) -> Self {
        debug_assert!(k >= 1 && k as usize <= MAX_K);
        Self {
            code: code & mask(k),
            k,
        }
    }

    /// Encodes `kmer` from scratch; K is the length of the slice
    pub fn encode(kmer: &[u8]) -> Result<Self> {
        let k = check_k(kmer.len())?;
        let mut code = 0u64;
        for &base in kmer {
            let bits = base_to_bits(base).map_err(|_| invalid_kmer(kmer, base))?;
            code = (code << 2) | bits;
        }
        Ok(Self { code, k })
    }

    /// Encodes `kmer` from the code of the window one position before it
    ///
    /// `kmer[..k-1]` must equal `previous[1..]`; this is only checked in debug builds.
    /// Only the trailing base of `kmer` is looked at, so the update is O(1).
    pub fn encode_from_previous(kmer: &[u8], previous: &[u8], previous_code: Self) -> Result<Self> {
        debug_assert_eq!(kmer.len(), previous.len());
        debug_assert_eq!(kmer.len(), previous_code.k as usize);
        debug_assert_eq!(&kmer[..kmer.len() - 1], &previous[1..]);
        let base = kmer[kmer.len() - 1];
        previous_code
            .roll(base)
            .map_err(|_| invalid_kmer(kmer, base))
    }

    /// Drops the leading base and appends `base` at the end
    #[inline]
    pub fn roll(&self, base: u8) -> Result<Self> {
        let bits = base_to_bits(base)?;
        Ok(Self {
            code: ((self.code << 2) | bits) & mask(self.k),
            k: self.k,
        })
    }

    /// The packed code
    #[inline]
    #[must_use]
    pub fn code(&self) -> u64 {
        self.code
    }

    /// The number of bases in the k-mer
    #[inline]
    #[must_use]
    pub fn k(&self) -> u32 {
        self.k
    }

    /// Reverse complement of the k-mer
    ///
    /// Complementing is a bitwise not with this encoding; the 2-bit groups are
    /// then reversed across the whole word and shifted back into the low `2k` bits.
    #[must_use]
    pub fn reverse_complement(&self) -> Self {
        let mut x = !self.code;
        x = ((x >> 2) & 0x3333_3333_3333_3333) | ((x & 0x3333_3333_3333_3333) << 2);
        x = ((x >> 4) & 0x0F0F_0F0F_0F0F_0F0F) | ((x & 0x0F0F_0F0F_0F0F_0F0F) << 4);
        x = x.swap_bytes();
        Self {
            code: x >> (64 - 2 * self.k),
            k: self.k,
        }
    }

    /// The smaller of the k-mer and its reverse complement
    #[must_use]
    pub fn canonical(&self) -> Self {
        let rc = self.reverse_complement();
        if self.code <= rc.code {
            *self
        } else {
            rc
        }
    }

    /// Returns true if the k-mer is already in canonical form
    #[must_use]
    pub fn is_canonical(&self) -> bool {
        self.code <= self.reverse_complement().code
    }

    /// Decodes the k-mer into upper-case bases, appending them to `dbuf`
    pub fn decode_into(&self, dbuf: &mut Vec<u8>) {
        dbuf.extend((0..self.k).rev().map(|i| bits_to_base(self.code >> (2 * i))));
    }

    /// Decodes the k-mer into a newly allocated buffer
    #[must_use]
    pub fn decode(&self) -> Vec<u8> {
        let mut dbuf = Vec::with_capacity(self.k as usize);
        self.decode_into(&mut dbuf);
        dbuf
    }
}

impl fmt::Display for KmerCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // decode() only yields ASCII
        f.write_str(&String::from_utf8_lossy(&self.decode()))
    }
}

/// Iterator over the k-mer codes of every window of a sequence
///
/// For a linear sequence of length `L` it yields `L - k + 1` codes. For a circular
/// one it yields `L` codes, the last `k - 1` windows wrapping around to the start.
/// Sequences shorter than K yield nothing.
///
/// Iteration stops after the first invalid base.
pub struct Kmers<'a> {
    sequence: &'a [u8],
    k: usize,
    pos: usize,
    end: usize,
    last: Option<KmerCode>,
}
impl<'a> Kmers<'a> {
    pub fn new(sequence: &'a [u8], k: usize, circular: bool) -> Result<Self> {
        check_k(k)?;
        let len = sequence.len();
        let end = match (len >= k, circular) {
            (false, _) => 0,
            (true, true) => len,
            (true, false) => len - k + 1,
        };
        Ok(Self {
            sequence,
            k,
            pos: 0,
            end,
            last: None,
        })
    }

    /// The bases of the window starting at `pos`, wrapping around the end if needed
    #[must_use]
    pub fn window(&self, pos: usize) -> Cow<'a, [u8]> {
        let end = pos + self.k;
        if end <= self.sequence.len() {
            Cow::Borrowed(&self.sequence[pos..end])
        } else {
            let mut wrapped = self.sequence[pos..].to_vec();
            wrapped.extend_from_slice(&self.sequence[..end - self.sequence.len()]);
            Cow::Owned(wrapped)
        }
    }

    /// Position of the window that will be encoded next
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl Iterator for Kmers<'_> {
    type Item = Result<KmerCode>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.end {
            return None;
        }
        let pos = self.pos;
        let next = match self.last {
            None => KmerCode::encode(&self.window(pos)),
            Some(last) => {
                let base = self.sequence[(pos + self.k - 1) % self.sequence.len()];
                last.roll(base)
                    .map_err(|_| invalid_kmer(&self.window(pos), base))
            }
        };
        match next {
            Ok(code) => {
                self.last = Some(code);
                self.pos += 1;
                Some(Ok(code))
            }
            Err(e) => {
                self.pos = self.end;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rem = self.end - self.pos;
        (0, Some(rem))
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::Error;
    use anyhow::Result;

    fn code(kmer: &[u8]) -> u64 {
        KmerCode::encode(kmer).unwrap().code()
    }

    #[test]
    fn test_encode_msb_first() -> Result<()> {
        assert_eq!(code(b"A"), 0);
        assert_eq!(code(b"T"), 3);
        assert_eq!(code(b"AC"), 0b0001);
        assert_eq!(code(b"CA"), 0b0100);
        assert_eq!(code(b"ACGT"), 0b0001_1011);
        assert_eq!(code(b"acgt"), code(b"ACGT"));
        assert_eq!(code(&[b'T'; 32]), u64::MAX);
        Ok(())
    }

    #[test]
    fn test_encode_rejects() {
        match KmerCode::encode(b"ACNGT") {
            Err(Error::KmerError(KmerError::InvalidKmer { kmer, base })) => {
                assert_eq!(kmer, "ACNGT");
                assert_eq!(base, 'N');
            }
            other => panic!("expected invalid k-mer, got {other:?}"),
        }
        assert!(matches!(
            KmerCode::encode(b""),
            Err(Error::KmerError(KmerError::UnsupportedK(0)))
        ));
        assert!(matches!(
            KmerCode::encode(&[b'A'; 33]),
            Err(Error::KmerError(KmerError::UnsupportedK(33)))
        ));
    }

    #[test]
    fn test_decode() -> Result<()> {
        let kmer = KmerCode::encode(b"GATTACA")?;
        assert_eq!(kmer.decode(), b"GATTACA");
        assert_eq!(kmer.to_string(), "GATTACA");
        assert_eq!(KmerCode::new(0, 3).decode(), b"AAA");
        Ok(())
    }

    #[test]
    fn test_new_masks_high_bits() {
        let kmer = KmerCode::new(u64::MAX, 2);
        assert_eq!(kmer.code(), 0b1111);
        assert_eq!(kmer.decode(), b"TT");
    }

    #[test]
    fn test_encode_from_previous() -> Result<()> {
        let seq = b"ACGTTGCAAGCT";
        let k = 5;
        let mut previous = KmerCode::encode(&seq[..k])?;
        for i in 1..=seq.len() - k {
            let kmer = &seq[i..i + k];
            let rolled = KmerCode::encode_from_previous(kmer, &seq[i - 1..i - 1 + k], previous)?;
            assert_eq!(rolled, KmerCode::encode(kmer)?);
            previous = rolled;
        }
        Ok(())
    }

    #[test]
    fn test_encode_from_previous_invalid_trailing_base() -> Result<()> {
        let previous = KmerCode::encode(b"ACG")?;
        match KmerCode::encode_from_previous(b"CGN", b"ACG", previous) {
            Err(Error::KmerError(KmerError::InvalidKmer { kmer, base })) => {
                assert_eq!(kmer, "CGN");
                assert_eq!(base, 'N');
            }
            other => panic!("expected invalid k-mer, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_reverse_complement() -> Result<()> {
        let cases: [(&[u8], &[u8]); 5] = [
            (b"A", b"T"),
            (b"AC", b"GT"),
            (b"GATTACA", b"TGTAATC"),
            (b"AAAACCCCGGGGTTTT", b"AAAACCCCGGGGTTTT"),
            (
                b"ACGTACGTACGTACGTACGTACGTACGTACGG",
                b"CCGTACGTACGTACGTACGTACGTACGTACGT",
            ),
        ];
        for (fwd, rev) in cases {
            let kmer = KmerCode::encode(fwd)?;
            assert_eq!(kmer.reverse_complement().decode(), rev);
            assert_eq!(kmer.reverse_complement().reverse_complement(), kmer);
        }
        Ok(())
    }

    #[test]
    fn test_canonical() -> Result<()> {
        let fwd = KmerCode::encode(b"TTTG")?;
        let rev = KmerCode::encode(b"CAAA")?;
        assert_eq!(fwd.canonical(), rev);
        assert_eq!(rev.canonical(), rev);
        assert!(rev.is_canonical());
        assert!(!fwd.is_canonical());

        // palindromes are their own canonical form
        let pal = KmerCode::encode(b"ACGT")?;
        assert_eq!(pal.canonical(), pal);
        Ok(())
    }

    #[test]
    fn test_kmers_linear() -> Result<()> {
        let seq = b"ACGTAC";
        let codes = Kmers::new(seq, 3, false)?.collect::<crate::Result<Vec<_>>>()?;
        let expected = seq
            .windows(3)
            .map(KmerCode::encode)
            .collect::<crate::Result<Vec<_>>>()?;
        assert_eq!(codes, expected);
        Ok(())
    }

    #[test]
    fn test_kmers_circular() -> Result<()> {
        let seq = b"ACGTAC";
        let mut kmers = Kmers::new(seq, 3, true)?;
        assert_eq!(kmers.window(4).as_ref(), b"ACA");
        assert_eq!(kmers.window(5).as_ref(), b"CAC");
        let codes = kmers.by_ref().collect::<crate::Result<Vec<_>>>()?;
        assert_eq!(codes.len(), seq.len());
        assert_eq!(codes[4], KmerCode::encode(b"ACA")?);
        assert_eq!(codes[5], KmerCode::encode(b"CAC")?);
        Ok(())
    }

    #[test]
    fn test_kmers_short_sequence() -> Result<()> {
        assert_eq!(Kmers::new(b"AC", 3, false)?.count(), 0);
        assert_eq!(Kmers::new(b"AC", 3, true)?.count(), 0);
        assert_eq!(Kmers::new(b"", 1, false)?.count(), 0);
        assert_eq!(Kmers::new(b"ACG", 3, false)?.count(), 1);
        Ok(())
    }

    #[test]
    fn test_kmers_stop_on_invalid() -> Result<()> {
        let mut kmers = Kmers::new(b"ACGNTT", 3, false)?;
        assert!(kmers.next().unwrap().is_ok());
        match kmers.next() {
            Some(Err(Error::KmerError(KmerError::InvalidKmer { kmer, .. }))) => {
                assert_eq!(kmer, "CGN");
            }
            other => panic!("expected invalid k-mer, got {other:?}"),
        }
        assert!(kmers.next().is_none());
        Ok(())
    }
}
