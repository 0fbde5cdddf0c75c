// SPDX-License-Identifier: Apache-2.0

use crate::error::Error;
use crate::sym_bit_vec::SymBitVec;

/// A hash primitive lifted over symbolic bit vectors.
///
/// Implementations consume a byte-aligned input vector and return the digest
/// as one vector whose most significant byte is byte 0 of the conventional
/// hex rendering, so `digest.hex()` is the standard digest string.
pub trait SymHash {
    fn name(&self) -> &'static str;

    /// Digest width in bits.
    fn digest_bits(&self) -> usize;

    fn hash(&mut self, input: &SymBitVec) -> Result<SymBitVec, Error>;
}

/// Splits a byte-aligned vector into its 8-bit bytes, low byte first.
pub(crate) fn split_bytes(input: &SymBitVec) -> Result<Vec<SymBitVec>, Error> {
    if input.len() % 8 != 0 {
        return Err(Error::Circuit(format!(
            "hash input must be byte aligned, got {} bits",
            input.len()
        )));
    }
    Ok((0..input.len() / 8)
        .map(|i| input.extract(i * 8, (i + 1) * 8))
        .collect())
}
