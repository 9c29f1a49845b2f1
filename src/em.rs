//! EM estimator: distributes observed equivalence-class counts across
//! compatible transcripts by iterative maximum likelihood, with periodic
//! effective-length refresh and a two-stage (threshold-then-one-more-round)
//! convergence rule.

use std::collections::HashMap;

use tracing::info;

use crate::ecmap::EcMap;
use crate::efflen::calc_eff_lens;

/// Smallest positive subnormal `f64` — the underflow guard matching the
/// original's `EPS` handling; must not be substituted with `f64::EPSILON`,
/// which is a different (much larger) quantity.
pub const TOLERANCE: f64 = f64::from_bits(1);

const ALPHA_LIMIT: f64 = 1e-7;
const ALPHA_CHANGE_LIMIT: f64 = 1e-2;
const ALPHA_CHANGE: f64 = 1e-2;

pub struct EmOutput {
    pub alpha: Vec<f64>,
    pub alpha_before_zeroes: Vec<f64>,
    pub rounds: usize,
    /// Effective lengths as of the last refresh, for callers computing rho
    /// against this exact run's alpha without re-deriving the refresh
    /// schedule themselves.
    pub eff_lens: Vec<f64>,
}

/// `w[ec_id][j] = 1 / L*[members[j]]`, computed only for composite ecs;
/// singletons carry no weight since they have only one compatible target.
pub fn calc_weights(ecmap: &EcMap, eff_lens: &[f64]) -> HashMap<u32, Vec<f64>> {
    ecmap
        .iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(ec_id, members)| {
            let w: Vec<f64> = members.iter().map(|&t| 1.0 / eff_lens[t as usize]).collect();
            (ec_id, w)
        })
        .collect()
}

/// Run the EM to convergence (or `n_iter`). `counts` is indexed by ec id
/// (length `>= ecmap.len()`); `fl_means` is required in short-read mode for
/// the periodic effective-length refresh and ignored in long-read mode
/// (whose effective lengths come from unique-mapping statistics up front
/// and are not re-derived from `alpha`).
#[allow(clippy::too_many_arguments)]
pub fn run(
    ecmap: &EcMap,
    counts: &[u32],
    trans_lens: &[u32],
    mut eff_lens: Vec<f64>,
    fl_means: Option<&[f64]>,
    long_read: bool,
    n_iter: usize,
    min_rounds: usize,
) -> EmOutput {
    let num_trans = eff_lens.len();
    let mut weight_map = calc_weights(ecmap, &eff_lens);
    let mut alpha = vec![1.0 / num_trans as f64; num_trans];
    let mut next_alpha = vec![0.0f64; num_trans];
    let mut alpha_before_zeroes = alpha.clone();
    let mut final_round = false;
    let mut i = 0usize;

    while i < n_iter {
        if !long_read {
            if (i == min_rounds || i == min_rounds + 500) && fl_means.is_some() {
                eff_lens = calc_eff_lens(trans_lens, fl_means.unwrap());
                weight_map = calc_weights(ecmap, &eff_lens);
            }
        } else if i == min_rounds || (min_rounds > 0 && i % min_rounds == 0) {
            weight_map = calc_weights(ecmap, &eff_lens);
        }

        for (ec_id, members) in ecmap.iter() {
            if members.len() == 1 {
                next_alpha[members[0] as usize] = counts.get(ec_id as usize).copied().unwrap_or(0) as f64;
            }
        }

        for (ec_id, members) in ecmap.iter() {
            if members.len() == 1 {
                continue;
            }
            let c = counts.get(ec_id as usize).copied().unwrap_or(0);
            if c == 0 {
                continue;
            }
            let wv = &weight_map[&ec_id];
            let mut denom = 0.0;
            for (j, &t) in members.iter().enumerate() {
                denom += alpha[t as usize] * wv[j];
            }
            if denom < TOLERANCE {
                continue;
            }
            let factor = c as f64 / denom;
            for (j, &t) in members.iter().enumerate() {
                next_alpha[t as usize] += alpha[t as usize] * wv[j] * factor;
            }
        }

        let mut chcount = 0;
        for t in 0..num_trans {
            if next_alpha[t] > ALPHA_CHANGE_LIMIT
                && ((next_alpha[t] - alpha[t]).abs() / next_alpha[t]) > ALPHA_CHANGE
            {
                chcount += 1;
            }
            alpha[t] = next_alpha[t];
            next_alpha[t] = 0.0;
        }

        let stop_em = chcount == 0 && i > min_rounds;

        if final_round {
            break;
        }
        if stop_em {
            final_round = true;
            alpha_before_zeroes = alpha.clone();
            for a in alpha.iter_mut() {
                if *a < ALPHA_LIMIT / 10.0 {
                    *a = 0.0;
                }
            }
        }

        i += 1;
    }

    if i == n_iter {
        alpha_before_zeroes = alpha.clone();
    }

    info!("the EM algorithm ran for {i} rounds");
    EmOutput {
        alpha,
        alpha_before_zeroes,
        rounds: i,
        eff_lens,
    }
}

/// Seed this estimator's `alpha` from a previously-run donor's
/// `alpha_before_zeroes`. The donor's values are copied in twice: once
/// behind the `big`-threshold split, then unconditionally over the whole
/// vector. The unconditional copy is authoritative; the first pass is
/// preserved for fidelity with the original control flow.
pub fn set_start(alpha: &mut [f64], counts: &[u32], donor_alpha_before_zeroes: &[f64]) {
    assert_eq!(donor_alpha_before_zeroes.len(), alpha.len());
    let big = 1.0;
    let sum_counts: f64 = counts.iter().map(|&c| c as f64).sum();
    let count_big = donor_alpha_before_zeroes.iter().filter(|&&x| x >= big).count();
    let n = alpha.len();

    for i in 0..n {
        if donor_alpha_before_zeroes[i] >= big {
            alpha[i] = donor_alpha_before_zeroes[i];
        } else {
            alpha[i] = sum_counts / (n - count_big) as f64;
        }
    }

    alpha.copy_from_slice(donor_alpha_before_zeroes);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ec_with(num_trans: usize, composites: &[&[u32]]) -> EcMap {
        let mut ec = EcMap::new(num_trans);
        for c in composites {
            ec.intern(c);
        }
        ec
    }

    #[test]
    fn unambiguous_counts_recover_exact_alpha() {
        let ecmap = EcMap::new(3);
        let counts = vec![10, 20, 30];
        let eff_lens = vec![100.0, 100.0, 100.0];
        let out = run(&ecmap, &counts, &[100, 100, 100], eff_lens, None, false, 200, 50);
        assert!((out.alpha[0] - 10.0).abs() < 1e-6);
        assert!((out.alpha[1] - 20.0).abs() < 1e-6);
        assert!((out.alpha[2] - 30.0).abs() < 1e-6);
    }

    #[test]
    fn ambiguous_count_splits_evenly_between_equal_weight_targets() {
        let mut ecmap = EcMap::new(2);
        let shared = ecmap.intern(&[0, 1]);
        let mut counts = vec![0u32; ecmap.len()];
        counts[shared as usize] = 100;
        let eff_lens = vec![100.0, 100.0];
        let out = run(&ecmap, &counts, &[100, 100], eff_lens, None, false, 200, 50);
        assert!((out.alpha[0] - 50.0).abs() < 1.0);
        assert!((out.alpha[1] - 50.0).abs() < 1.0);
    }

    #[test]
    fn total_alpha_is_conserved_across_a_single_iteration() {
        let ecmap = ec_with(3, &[&[0, 1]]);
        let mut counts = vec![0u32; ecmap.len()];
        counts[0] = 5;
        counts[1] = 5;
        counts[2] = 5;
        counts[3] = 10; // the composite {0,1}
        let eff_lens = vec![50.0, 100.0, 100.0];
        let out = run(&ecmap, &counts, &[50, 100, 100], eff_lens, None, false, 1, 0);
        let observed_total: f64 = counts.iter().take(3).map(|&c| c as f64).sum::<f64>() + 10.0;
        let alpha_total: f64 = out.alpha.iter().sum();
        assert!((alpha_total - observed_total).abs() < 1e-6);
    }

    #[test]
    fn set_start_copies_donor_alpha_before_zeroes_unconditionally() {
        let mut alpha = vec![0.0, 0.0, 0.0];
        let counts = vec![1, 2, 3];
        let donor = vec![5.0, 0.5, 2.0];
        set_start(&mut alpha, &counts, &donor);
        assert_eq!(alpha, donor);
    }
}
