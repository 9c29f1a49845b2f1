//! Transcriptome index: the k-mer -> equivalence-class map, the
//! equivalence-class registry, and skip-ahead hints, plus the binary
//! on-disk format for all of it.

mod builder;
pub mod io;
mod skip;

use std::collections::HashMap;

use crate::ecmap::EcMap;
use crate::kmer::Kmer;

pub use builder::{build, build_with_sa};

/// A single k-mer's index entry: its equivalence class, plus how many bases
/// can safely be skipped before the next k-mer in a read needs checking.
/// `-1` means "not computed" / "no skip available".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KmerEntry {
    pub ec_id: u32,
    pub fdist: i32,
    pub bdist: i32,
}

impl KmerEntry {
    fn unresolved(ec_id: u32) -> Self {
        KmerEntry {
            ec_id,
            fdist: -1,
            bdist: -1,
        }
    }
}

/// The full transcriptome index: read-only once built, safe to share across
/// matcher threads (`Index` holds no interior mutability).
pub struct Index {
    pub k: usize,
    pub num_trans: usize,
    pub trans_lens: Vec<u32>,
    pub target_names: Vec<String>,
    pub kmap: HashMap<Kmer, KmerEntry>,
    pub ecmap: EcMap,
}

impl Index {
    pub fn num_eq_classes(&self) -> usize {
        self.ecmap.len()
    }
}
