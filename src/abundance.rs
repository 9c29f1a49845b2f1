//! ρ/TPM emitter: length-normalized proportions and the tabular abundance
//! output, plus the `run_info.json` summary written alongside it.

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::warn;

use crate::em::TOLERANCE;
use crate::error::TqError;

const MILLION: f64 = 1e6;

/// `ρ[tid] = (α[tid] / L*[tid]) / Σ_j (α[j] / L*[j])`, skipping (and
/// warning about) any target whose effective length is below tolerance.
pub fn compute_rho(alpha: &[f64], eff_lens: &[f64]) -> Vec<f64> {
    assert_eq!(alpha.len(), eff_lens.len());
    let mut rho = vec![0.0; alpha.len()];
    let mut total = 0.0;
    for i in 0..alpha.len() {
        if eff_lens[i] < TOLERANCE {
            warn!("target {i} has effective length below tolerance; excluding from rho");
            continue;
        }
        rho[i] = alpha[i] / eff_lens[i];
        total += rho[i];
    }
    if total > 0.0 {
        for r in rho.iter_mut() {
            *r /= total;
        }
    }
    rho
}

/// Write the abundance TSV: `target_id, kallisto_id, rho, tpm, est_counts`,
/// one row per transcript, doubles at 15-digit precision.
pub fn write_abundance_tsv<W: Write>(
    writer: &mut W,
    target_names: &[String],
    alpha: &[f64],
    rho: &[f64],
) -> Result<(), TqError> {
    writeln!(writer, "target_id\tkallisto_id\trho\ttpm\test_counts")?;
    for i in 0..target_names.len() {
        writeln!(
            writer,
            "{}\t{}\t{:.15}\t{:.15}\t{:.15}",
            target_names[i],
            i,
            rho[i],
            rho[i] * MILLION,
            alpha[i]
        )?;
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct RunInfo {
    pub n_targets: usize,
    pub n_processed: u64,
    pub n_eq_classes: usize,
    pub n_rounds: usize,
    pub index_version: u64,
}

pub fn write_run_info(path: &Path, info: &RunInfo) -> Result<(), TqError> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, info)?;
    Ok(())
}
