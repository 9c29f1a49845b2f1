//! Structured error kinds: the fatal conditions that propagate to `main` and
//! stop the process, as opposed to the local, silent-or-logged control flow
//! (numeric underflow in the EM denominator, a match aborted mid-read) that
//! never becomes an `Err` value at all.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TqError {
    #[error(transparent)]
    FatalIo(#[from] std::io::Error),

    #[error("index format mismatch: expected magic/version {expected:#x}, found {found:#x}")]
    FormatMismatch { expected: u64, found: u64 },

    #[error("index was built with k = {previous}, but this run requested k = {found}")]
    InconsistentK { previous: usize, found: usize },

    #[error("{0}")]
    Kmer(#[from] crate::kmer::KmerError),

    #[error("transcript fasta and index disagree on transcript count: {expected} vs {found}")]
    TranscriptCountMismatch { expected: usize, found: usize },

    #[error("no reads could be read from {0}")]
    EmptyInput(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
