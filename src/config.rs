//! Run configuration: the `ProgramOptions` analogue shared by both
//! subcommands. Built from validated CLI args in `main`, then threaded
//! through the builder/matcher/EM stages instead of re-reading `clap`
//! structs deeper in the call stack.

use std::path::PathBuf;

/// Options for `transquant build-index`.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub transfasta: PathBuf,
    pub index_out: PathBuf,
    pub k: usize,
}

/// Options for `transquant quant`.
#[derive(Debug, Clone)]
pub struct QuantConfig {
    pub index: PathBuf,
    pub output_dir: PathBuf,
    pub reads: Vec<PathBuf>,
    pub long_read: bool,
    pub n_iter: usize,
    pub min_rounds: usize,
    /// Per-transcript fragment-length means, parallel to target order.
    /// Required in short-read mode, ignored in long-read mode.
    pub fl_means: Option<PathBuf>,
}

impl QuantConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.reads.is_empty() {
            return Err("quant requires at least one read file".to_string());
        }
        if !self.long_read && self.fl_means.is_none() {
            return Err(
                "short-read mode requires --fl-means (per-transcript fragment-length means)"
                    .to_string(),
            );
        }
        if self.min_rounds == 0 {
            return Err("--min-rounds must be >= 1".to_string());
        }
        if self.n_iter < self.min_rounds {
            return Err("--n-iter must be >= --min-rounds".to_string());
        }
        Ok(())
    }
}
