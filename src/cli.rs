//! CLI surface: one `clap::Args` struct per subcommand, one `help_heading`
//! per flag group.

use std::path::PathBuf;

use clap::Args;

use crate::kmer::MAX_K;

fn klen_is_good(s: &str) -> Result<usize, String> {
    let k: usize = s.parse().map_err(|_| format!("`{s}` can't be parsed as a number"))?;
    if k == 0 || k > MAX_K {
        Err(format!("k = {k} must be in [1, {MAX_K}]"))
    } else {
        Ok(k)
    }
}

/// Build a transcriptome index from a reference FASTA.
#[derive(Args, Clone, Debug)]
#[command(arg_required_else_help = true)]
pub struct BuildIndexOpts {
    /// reference transcript FASTA
    #[arg(short, long, help_heading = "Input")]
    pub transfasta: PathBuf,

    /// length of k-mer to use, must be <= 31
    #[arg(short, long, help_heading = "Index Construction Parameters", default_value_t = 31, value_parser = klen_is_good)]
    pub klen: usize,

    /// output index path prefix
    #[arg(short, long, help_heading = "Output")]
    pub output: PathBuf,
}

/// Quantify transcript abundances against a previously built index.
#[derive(Args, Clone, Debug)]
#[command(arg_required_else_help = true)]
pub struct QuantOpts {
    /// index path prefix produced by `build-index`
    #[arg(short, long, help_heading = "Input")]
    pub index: PathBuf,

    /// ',' separated list of read FASTA/FASTQ files
    #[arg(short, long, help_heading = "Input", value_delimiter = ',')]
    pub reads: Vec<PathBuf>,

    /// treat reads as long reads (switches effective-length estimation and
    /// EM weight-refresh cadence)
    #[arg(long, help_heading = "Quantification Parameters")]
    pub long_read: bool,

    /// per-transcript fragment-length means, one float per line in target
    /// order; required unless --long-read is set
    #[arg(long, help_heading = "Quantification Parameters")]
    pub fl_means: Option<PathBuf>,

    /// maximum number of EM iterations
    #[arg(long, help_heading = "Quantification Parameters", default_value_t = 10_000)]
    pub n_iter: usize,

    /// minimum EM rounds before convergence is considered
    #[arg(long, help_heading = "Quantification Parameters", default_value_t = 50)]
    pub min_rounds: usize,

    /// directory to write the abundance TSV and run_info.json into
    #[arg(short = 'd', long, help_heading = "Output")]
    pub output_dir: PathBuf,
}
