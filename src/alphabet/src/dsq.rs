use std::fmt;

use crate::{Alphabet, AlphabetError};

/// Boundary marker stored at positions 0 and L+1 of every digital sequence.
pub const SENTINEL: u8 = 0xFF;

/// A digitized target sequence: residue indices in `[0, Kp)`, 1-indexed,
/// with [`SENTINEL`] guards at both ends. Position `i` of the biological
/// sequence is `self[i]` for `i` in `[1, L]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigitalSeq {
    pub alphabet: Alphabet,
    seq         : Vec<u8>,
}

impl DigitalSeq {
    /// Digitize a text sequence. Case-insensitive; rejects any character
    /// outside the alphabet.
    pub fn from_text(alphabet: Alphabet, text: &str) -> Result<DigitalSeq, AlphabetError> {
        let mut seq = Vec::with_capacity(text.len() + 2);
        seq.push(SENTINEL);
        for c in text.chars() {
            seq.push(alphabet.encode(c)?);
        }
        seq.push(SENTINEL);
        Ok(DigitalSeq { alphabet, seq })
    }

    /// Wrap pre-encoded residue indices (no sentinels in the input).
    pub fn from_indices(alphabet: Alphabet, indices: &[u8]) -> Result<DigitalSeq, AlphabetError> {
        let kp = alphabet.kp() as u8;
        let mut seq = Vec::with_capacity(indices.len() + 2);
        seq.push(SENTINEL);
        for &x in indices {
            if x >= kp {
                return Err(AlphabetError::InvalidResidue(x, kp));
            }
            seq.push(x);
        }
        seq.push(SENTINEL);
        Ok(DigitalSeq { alphabet, seq })
    }

    /// Generate `l` residues i.i.d. from the canonical alphabet.
    pub fn random(alphabet: Alphabet, l: usize, rng: &mut fastrand::Rng) -> DigitalSeq {
        let k = alphabet.k() as u8;
        let mut seq = Vec::with_capacity(l + 2);
        seq.push(SENTINEL);
        for _ in 0..l {
            seq.push(rng.u8(0..k));
        }
        seq.push(SENTINEL);
        DigitalSeq { alphabet, seq }
    }

    /// Number of residues (the guards are not counted).
    pub fn len(&self) -> usize {
        self.seq.len() - 2
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Residues in position order, 1-indexed slice view including guards.
    pub fn guarded(&self) -> &[u8] {
        &self.seq
    }

    /// Iterate over residues only (positions 1..=L).
    pub fn residues(&self) -> impl Iterator<Item = u8> + '_ {
        self.seq[1..self.seq.len() - 1].iter().copied()
    }
}

impl std::ops::Index<usize> for DigitalSeq {
    type Output = u8;
    fn index(&self, i: usize) -> &u8 {
        &self.seq[i]
    }
}

impl fmt::Display for DigitalSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for x in self.residues() {
            write!(f, "{}", self.alphabet.decode(x).map_err(|_| fmt::Error)?)?;
        }
        Ok(())
    }
}
