//! 2-bit nucleotide codec
//!
//! Each canonical DNA base is stored in 2 bits:
//!
//! | Base | Bits |
//! | ---- | ---- |
//! | A    | 00   |
//! | C    | 01   |
//! | G    | 10   |
//! | T    | 11   |
//!
//! With this layout the complement of a base is its bitwise inverse (`bits ^ 0b11`).
//! Lower-case input is accepted; decoding always yields upper-case bases.

use crate::error::{KmerError, Result};

/// Marker for bytes outside of the DNA alphabet in [`BASE_LUT`]
const INVALID: u8 = 0xFF;

/// ASCII to 2-bit lookup table
static BASE_LUT: [u8; 256] = {
    let mut t = [INVALID; 256];
    t[b'A' as usize] = 0;
    t[b'a' as usize] = 0;
    t[b'C' as usize] = 1;
    t[b'c' as usize] = 1;
    t[b'G' as usize] = 2;
    t[b'g' as usize] = 2;
    t[b'T' as usize] = 3;
    t[b't' as usize] = 3;
    t
};

/// 2-bit to ASCII lookup table
static BITS_LUT: [u8; 4] = [b'A', b'C', b'G', b'T'];

/// Encodes a single base into its 2-bit value
///
/// Fails with [`KmerError::InvalidBase`] for any byte other than `ACGTacgt`.
#[inline]
pub fn base_to_bits(base: u8) -> Result<u64> {
    match BASE_LUT[base as usize] {
        INVALID => Err(KmerError::InvalidBase(char::from(base)).into()),
        bits => Ok(u64::from(bits)),
    }
}

/// Decodes the low 2 bits of `bits` into an upper-case base
#[inline]
#[must_use]
pub fn bits_to_base(bits: u64) -> u8 {
    BITS_LUT[(bits & 0b11) as usize]
}

/// Returns true if `base` is one of the four canonical DNA letters (either case)
#[inline]
#[must_use]
pub fn is_valid_base(base: u8) -> bool {
    BASE_LUT[base as usize] != INVALID
}

/// Complement of a single base, keeping its case
///
/// Bytes outside of the DNA alphabet are returned unchanged so that
/// they are still reported by the encoder later on.
#[inline]
#[must_use]
pub fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'T' => b'A',
        b'C' => b'G',
        b'G' => b'C',
        b'a' => b't',
        b't' => b'a',
        b'c' => b'g',
        b'g' => b'c',
        other => other,
    }
}

/// Reverse complement of a whole sequence into `rbuf`
///
/// Clears `rbuf` before filling it.
pub fn reverse_complement(sequence: &[u8], rbuf: &mut Vec<u8>) {
    rbuf.clear();
    rbuf.extend(sequence.iter().rev().map(|&b| complement(b)));
}
