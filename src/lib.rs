//! Transcript-abundance quantification: a k-mer-indexed,
//! equivalence-class-compressed pseudoalignment index plus an EM-based
//! abundance estimator over it.

pub mod abundance;
pub mod cli;
pub mod config;
pub mod ecmap;
pub mod efflen;
pub mod em;
pub mod error;
pub mod fasta;
pub mod index;
pub mod kmer;
pub mod matcher;
pub mod suffix;
