//! K-mer primitives: a fixed-length DNA word packed into a `u64`, plus the
//! canonical-orientation operations used throughout the index and matcher.
//! `k` is fixed once per process, mirroring kallisto's static `Kmer::k`.

use std::fmt;
use std::sync::OnceLock;

use thiserror::Error;

/// Largest `k` that fits in the 2-bit-per-base packing used here.
pub const MAX_K: usize = 31;

static K: OnceLock<usize> = OnceLock::new();

#[derive(Debug, Error)]
pub enum KmerError {
    #[error("k = {0} must be in [1, {MAX_K}]")]
    OutOfRange(usize),
    #[error("k was already set to {previous}; conflicts with requested value {found}")]
    Inconsistent { previous: usize, found: usize },
    #[error("unexpected base byte {0:#x} in k-mer text")]
    BadBase(u8),
    #[error("expected a sequence of length k = {expected}, got {found}")]
    WrongLength { expected: usize, found: usize },
}

/// Fix the global `k` for the lifetime of the process. Fatal (returns an
/// error) if `k` was already set to a different value.
pub fn set_k(k: usize) -> Result<(), KmerError> {
    if k == 0 || k > MAX_K {
        return Err(KmerError::OutOfRange(k));
    }
    match K.set(k) {
        Ok(()) => Ok(()),
        Err(_) => {
            let previous = *K.get().unwrap();
            if previous == k {
                Ok(())
            } else {
                Err(KmerError::Inconsistent {
                    previous,
                    found: k,
                })
            }
        }
    }
}

/// The currently configured `k`, if any.
pub fn k() -> Option<usize> {
    K.get().copied()
}

#[inline]
fn mask(k: usize) -> u64 {
    if k == 32 {
        u64::MAX
    } else {
        (1u64 << (2 * k)) - 1
    }
}

#[inline]
fn encode_base(b: u8) -> Result<u64, KmerError> {
    match b {
        b'A' | b'a' => Ok(0),
        b'C' | b'c' => Ok(1),
        b'G' | b'g' => Ok(2),
        b'T' | b't' => Ok(3),
        other => Err(KmerError::BadBase(other)),
    }
}

#[inline]
fn decode_base(code: u64) -> u8 {
    match code & 0b11 {
        0 => b'A',
        1 => b'C',
        2 => b'G',
        _ => b'T',
    }
}

/// A canonical-or-not DNA k-mer, packed 2 bits per base (A=0, C=1, G=2, T=3),
/// first base in the most significant pair of bits.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Kmer(pub u64);

impl Kmer {
    /// Build a k-mer from an ASCII DNA string of length exactly `k()`.
    pub fn from_bytes(s: &[u8]) -> Result<Self, KmerError> {
        let k = k().expect("k must be set before constructing a Kmer");
        if s.len() != k {
            return Err(KmerError::WrongLength {
                expected: k,
                found: s.len(),
            });
        }
        let mut v: u64 = 0;
        for &b in s {
            v = (v << 2) | encode_base(b)?;
        }
        Ok(Kmer(v))
    }

    /// Build a k-mer directly from 2-bit symbol codes (0=A,1=C,2=G,3=T), as
    /// produced by the suffix-array text encoding. Every code must be < 4;
    /// anything else (a transcript-separator sentinel) is rejected so a
    /// caller can't accidentally build a k-mer that spans a boundary.
    pub fn from_codes(codes: &[u32]) -> Result<Self, KmerError> {
        let k = k().expect("k must be set before constructing a Kmer");
        if codes.len() != k {
            return Err(KmerError::WrongLength {
                expected: k,
                found: codes.len(),
            });
        }
        let mut v: u64 = 0;
        for &c in codes {
            if c > 3 {
                return Err(KmerError::BadBase(c as u8));
            }
            v = (v << 2) | (c as u64);
        }
        Ok(Kmer(v))
    }

    /// Reverse complement ("twin") of this k-mer.
    pub fn twin(&self) -> Kmer {
        let k = k().expect("k must be set");
        let mut v = self.0;
        let mut out: u64 = 0;
        for _ in 0..k {
            let base = v & 0b11;
            out = (out << 2) | (3 - base);
            v >>= 2;
        }
        Kmer(out)
    }

    /// The lexicographically smaller of `self` and `self.twin()`.
    pub fn rep(&self) -> Kmer {
        let t = self.twin();
        if self.0 <= t.0 {
            *self
        } else {
            t
        }
    }

    /// True if this k-mer is already in canonical (forward) orientation.
    pub fn is_rep(&self) -> bool {
        *self == self.rep()
    }

    /// Drop the first base, append `base` at the end.
    pub fn forward(&self, base: u8) -> Result<Kmer, KmerError> {
        let k = k().expect("k must be set");
        let code = encode_base(base)?;
        Ok(Kmer(((self.0 << 2) | code) & mask(k)))
    }

    /// Prepend `base`, drop the last base.
    pub fn backward(&self, base: u8) -> Result<Kmer, KmerError> {
        let k = k().expect("k must be set");
        let code = encode_base(base)?;
        Ok(Kmer((self.0 >> 2) | (code << (2 * (k - 1)))))
    }

    /// Inverse of `from_codes`.
    pub fn to_codes(&self) -> Vec<u32> {
        let k = k().expect("k must be set");
        let mut out = vec![0u32; k];
        let mut v = self.0;
        for i in (0..k).rev() {
            out[i] = (v & 0b11) as u32;
            v >>= 2;
        }
        out
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let k = k().expect("k must be set");
        let mut out = vec![0u8; k];
        let mut v = self.0;
        for i in (0..k).rev() {
            out[i] = decode_base(v);
            v >>= 2;
        }
        out
    }
}

impl fmt::Debug for Kmer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.to_bytes()))
    }
}

impl fmt::Display for Kmer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.to_bytes()))
    }
}

/// All four DNA bases, in the order used for exhaustive extension search
/// (skip-ahead, poly-A purge).
pub const BASES: [u8; 4] = [b'A', b'C', b'G', b'T'];

/// Lightweight overlapping-window iterator over a read's k-mers, skipping any
/// window that contains a base outside `ACGT`. This stands in for the
/// matcher's own k-mer scan, implemented locally since it's a few lines once
/// `Kmer` exists.
pub struct ReadKmers<'a> {
    seq: &'a [u8],
    k: usize,
    pos: usize,
}

impl<'a> ReadKmers<'a> {
    pub fn new(seq: &'a [u8]) -> Self {
        let k = k().expect("k must be set");
        ReadKmers { seq, k, pos: 0 }
    }
}

impl<'a> Iterator for ReadKmers<'a> {
    /// (position in the read, the k-mer at that position)
    type Item = (usize, Kmer);

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos + self.k <= self.seq.len() {
            let window = &self.seq[self.pos..self.pos + self.k];
            let p = self.pos;
            self.pos += 1;
            if let Ok(km) = Kmer::from_bytes(window) {
                return Some((p, km));
            }
            // window contains an ambiguous base; keep sliding.
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // `k` is a process-global, set-once value (matching the production
    // binary, which sets it exactly once at index-load time). `set_k` is
    // idempotent for a repeated identical value, so every unit test in this
    // crate that needs a k-mer shares k = 5.
    fn ensure_k5() {
        set_k(5).unwrap();
    }

    #[test]
    fn twin_is_involution() {
        ensure_k5();
        let km = Kmer::from_bytes(b"ACGTA").unwrap();
        assert_eq!(km.twin().twin(), km);
    }

    #[test]
    fn rep_picks_lexicographic_min() {
        ensure_k5();
        let km = Kmer::from_bytes(b"ACGTA").unwrap();
        let twin = km.twin();
        let rep = km.rep();
        assert!(rep.0 == km.0.min(twin.0));
        assert_eq!(rep.rep(), rep);
    }

    #[test]
    fn forward_drops_first_appends_last() {
        ensure_k5();
        let km = Kmer::from_bytes(b"ACGTA").unwrap();
        let next = km.forward(b'C').unwrap();
        assert_eq!(next.to_bytes(), b"CGTAC");
    }

    #[test]
    fn backward_prepends_drops_last() {
        ensure_k5();
        let km = Kmer::from_bytes(b"ACGTA").unwrap();
        let prev = km.backward(b'G').unwrap();
        assert_eq!(prev.to_bytes(), b"GACGT");
    }

    #[test]
    fn read_kmers_skips_ambiguous_windows() {
        ensure_k5();
        // windows of length 5: ACGNT(skip), CGNTA(skip), GNTAC(skip) -> none survive
        let v: Vec<_> = ReadKmers::new(b"ACGNTAC").map(|(p, _)| p).collect();
        assert!(v.is_empty());
        let v2: Vec<_> = ReadKmers::new(b"ACGTACG").map(|(p, _)| p).collect();
        assert_eq!(v2, vec![0, 1, 2]);
    }

    #[test]
    fn from_codes_matches_from_bytes() {
        ensure_k5();
        let a = Kmer::from_bytes(b"ACGTA").unwrap();
        let b = Kmer::from_codes(&[0, 1, 2, 3, 0]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn to_codes_round_trips_through_from_codes() {
        ensure_k5();
        let km = Kmer::from_bytes(b"GATTA").unwrap();
        let codes = km.to_codes();
        assert_eq!(Kmer::from_codes(&codes).unwrap(), km);
    }

    #[test]
    fn set_k_conflict_is_an_error() {
        ensure_k5();
        assert!(set_k(5).is_ok());
        assert!(matches!(set_k(7), Err(KmerError::Inconsistent { .. })));
    }
}
