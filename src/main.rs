use std::fs::File;
use std::io::{self, BufReader, BufWriter};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};

use transquant::abundance::{self, RunInfo};
use transquant::cli::{BuildIndexOpts, QuantOpts};
use transquant::config::{BuildConfig, QuantConfig};
use transquant::efflen;
use transquant::em;
use transquant::fasta;
use transquant::index::{self, io as index_io};
use transquant::matcher;
use transquant::suffix;

/// k-mer-indexed transcript-abundance quantification.
#[derive(Debug, Parser)]
#[command(author, version, about)]
#[command(propagate_version = true)]
struct Cli {
    /// be quiet (suppress informational logging)
    #[arg(short, long)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// build a transcriptome index from a reference FASTA
    #[command(arg_required_else_help = true)]
    BuildIndex(BuildIndexOpts),

    /// quantify transcript abundances against a built index
    #[command(arg_required_else_help = true)]
    Quant(QuantOpts),
}

fn main() -> Result<()> {
    let cli_args = Cli::parse();

    if cli_args.quiet {
        tracing_subscriber::fmt().with_max_level(Level::WARN).with_writer(io::stderr).init();
    } else {
        tracing_subscriber::fmt().with_max_level(Level::INFO).with_writer(io::stderr).init();
    }

    match cli_args.command {
        Commands::BuildIndex(opts) => {
            let config = BuildConfig {
                transfasta: opts.transfasta,
                index_out: opts.output,
                k: opts.klen,
            };
            run_build_index(&config)
        }
        Commands::Quant(opts) => {
            let config = QuantConfig {
                index: opts.index,
                output_dir: opts.output_dir,
                reads: opts.reads,
                long_read: opts.long_read,
                n_iter: opts.n_iter,
                min_rounds: opts.min_rounds,
                fl_means: opts.fl_means,
            };
            run_quant(&config)
        }
    }
}

fn append_extension(p: &std::path::Path, ext: &str) -> std::path::PathBuf {
    let mut os = p.as_os_str().to_owned();
    os.push(".");
    os.push(ext);
    os.into()
}

fn run_build_index(config: &BuildConfig) -> Result<()> {
    info!("reading reference transcripts from {}", config.transfasta.display());
    let records = fasta::read_records(&config.transfasta)?;
    info!("building index over {} transcripts at k = {}", records.len(), config.k);
    let (idx, sa, lcp) = index::build_with_sa(&records, config.k)?;

    std::fs::create_dir_all(
        config
            .index_out
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| std::path::Path::new(".")),
    )?;
    let file = File::create(&config.index_out)
        .with_context(|| format!("creating index file at {}", config.index_out.display()))?;
    let mut writer = BufWriter::new(file);
    index_io::write(&idx, &mut writer, true)?;

    let sa_path = append_extension(&config.index_out, "sa");
    let sa_file = File::create(&sa_path)
        .with_context(|| format!("creating suffix-array file at {}", sa_path.display()))?;
    let mut sa_writer = BufWriter::new(sa_file);
    suffix::write_sa_file(&sa, &lcp, &mut sa_writer)?;

    info!(
        "wrote index with {} k-mers and {} equivalence classes to {}",
        idx.kmap.len(),
        idx.num_eq_classes(),
        config.index_out.display()
    );
    Ok(())
}

fn run_quant(config: &QuantConfig) -> Result<()> {
    config.validate().map_err(anyhow::Error::msg)?;

    info!("loading index from {}", config.index.display());
    let file = File::open(&config.index)
        .with_context(|| format!("opening index at {}", config.index.display()))?;
    let mut reader = BufReader::new(file);
    let mut idx = index_io::read(&mut reader, true)?;

    let fl_means = match &config.fl_means {
        Some(path) => Some(read_fl_means(path, idx.num_trans)?),
        None => None,
    };

    let reads = collect_reads(&config.reads);

    let mut counts = vec![0u32; idx.num_eq_classes().max(idx.num_trans)];
    let mut flens_lr = vec![0.0f64; idx.num_trans];
    let mut flens_lr_c = vec![0.0f64; idx.num_trans];
    let mut n_processed: u64 = 0;

    for read in &reads {
        let hits = matcher::match_read(&idx, read);
        let Some(ec_id) = matcher::collapse_hits(&mut idx.ecmap, &hits) else {
            continue;
        };

        if ec_id as usize >= counts.len() {
            counts.resize(ec_id as usize + 1, 0);
        }
        counts[ec_id as usize] += 1;
        n_processed += 1;

        if config.long_read {
            if let Some(members) = idx.ecmap.lookup_by_id(ec_id) {
                if members.len() == 1 {
                    let tid = members[0] as usize;
                    flens_lr[tid] += read.len() as f64;
                    flens_lr_c[tid] += 1.0;
                }
            }
        }
    }

    info!("processed {n_processed} reads into {} observed equivalence classes", idx.num_eq_classes());

    let eff_lens = if config.long_read {
        efflen::calc_eff_lens_long_read(&idx.trans_lens, &flens_lr, &flens_lr_c)
    } else {
        efflen::calc_eff_lens(&idx.trans_lens, fl_means.as_deref().expect("validated above"))
    };

    let out = em::run(
        &idx.ecmap,
        &counts,
        &idx.trans_lens,
        eff_lens,
        fl_means.as_deref(),
        config.long_read,
        config.n_iter,
        config.min_rounds,
    );

    let rho = abundance::compute_rho(&out.alpha, &out.eff_lens);

    std::fs::create_dir_all(&config.output_dir)?;
    let abundance_path = config.output_dir.join("abundance.tsv");
    let abundance_file = File::create(&abundance_path)
        .with_context(|| format!("creating {}", abundance_path.display()))?;
    let mut writer = BufWriter::new(abundance_file);
    abundance::write_abundance_tsv(&mut writer, &idx.target_names, &out.alpha, &rho)?;

    let run_info = RunInfo {
        n_targets: idx.num_trans,
        n_processed,
        n_eq_classes: idx.num_eq_classes(),
        n_rounds: out.rounds,
        index_version: index_io::INDEX_VERSION,
    };
    abundance::write_run_info(&config.output_dir.join("run_info.json"), &run_info)?;

    info!("wrote abundance estimates to {}", config.output_dir.display());
    Ok(())
}

/// Load every read file and flatten to one sequence per read, single-end.
/// Paired-end fragment-length estimation (`map_pair`) is a library
/// capability exercised directly against an index and a reference text, not
/// part of this CLI's read loop; `quant` here always runs in fragment-count
/// mode off externally supplied `--fl-means`/`--long-read` statistics.
fn collect_reads(paths: &[std::path::PathBuf]) -> Vec<Vec<u8>> {
    let mut reads = Vec::new();
    for path in paths {
        match fasta::read_records(path) {
            Ok(records) => reads.extend(records.into_iter().map(|(_, seq)| seq)),
            Err(e) => warn!("skipping unreadable read file {}: {e}", path.display()),
        }
    }
    reads
}

fn read_fl_means(path: &std::path::Path, num_trans: usize) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading fragment-length means from {}", path.display()))?;
    let means: Vec<f64> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .with_context(|| format!("parsing fragment-length means from {}", path.display()))?;

    if means.len() != num_trans {
        bail!(
            "fragment-length means file has {} entries, but the index has {} transcripts",
            means.len(),
            num_trans
        );
    }
    Ok(means)
}
