//! Effective-length estimation: per-transcript `L*` from either a
//! fragment-length distribution (short-read) or observed unique-mapping
//! statistics (long-read).

/// Long-read mode's "never uniquely seen" / "implausibly short" fallback.
const LONG_READ_FALLBACK_LEN: f64 = 31.0;

/// Short-read effective length from raw transcript lengths and the
/// fragment-length distribution's per-target conditional means. Mirrors
/// kallisto's `calc_eff_lens`: `L*[i] = max(L[i] - mean[i] + 1, 1)` when
/// `mean[i]` is usable, otherwise falls back to `L[i]`.
pub fn calc_eff_lens(trans_lens: &[u32], fl_means: &[f64]) -> Vec<f64> {
    assert_eq!(trans_lens.len(), fl_means.len());
    trans_lens
        .iter()
        .zip(fl_means.iter())
        .map(|(&len, &mean)| {
            let len = len as f64;
            if mean.is_finite() && mean > 0.0 {
                (len - mean + 1.0).max(1.0)
            } else {
                len.max(1.0)
            }
        })
        .collect()
}

/// Long-read effective length: for target `i`, given unique-mapping count
/// `flens_lr_c[i]` and total observed mapped length `flens_lr[i]`.
pub fn calc_eff_lens_long_read(trans_lens: &[u32], flens_lr: &[f64], flens_lr_c: &[f64]) -> Vec<f64> {
    assert_eq!(trans_lens.len(), flens_lr.len());
    assert_eq!(trans_lens.len(), flens_lr_c.len());

    trans_lens
        .iter()
        .zip(flens_lr.iter())
        .zip(flens_lr_c.iter())
        .map(|((&len, &s), &n)| {
            let len = len as f64;
            if n < 1e-6 {
                LONG_READ_FALLBACK_LEN
            } else {
                let delta = (len - (s - 31.0 * n) / n).abs();
                let eff_len = len - delta;
                if eff_len > 1.0 {
                    LONG_READ_FALLBACK_LEN
                } else {
                    eff_len
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_read_uses_mean_when_available() {
        let lens = vec![200];
        let means = vec![150.0];
        let eff = calc_eff_lens(&lens, &means);
        assert_eq!(eff, vec![51.0]);
    }

    #[test]
    fn short_read_falls_back_to_raw_length_without_a_mean() {
        let lens = vec![200];
        let means = vec![f64::NAN];
        let eff = calc_eff_lens(&lens, &means);
        assert_eq!(eff, vec![200.0]);
    }

    #[test]
    fn long_read_never_uniquely_seen_falls_back_to_31() {
        let lens = vec![1000];
        let flens_lr = vec![0.0];
        let flens_lr_c = vec![0.0];
        let eff = calc_eff_lens_long_read(&lens, &flens_lr, &flens_lr_c);
        assert_eq!(eff, vec![31.0]);
    }

    #[test]
    fn long_read_scenario_from_worked_example() {
        // L=1000, flens_lr=2000, flens_lr_c=50 -> delta = |1000 - 9| = 991,
        // eff_len = 1000 - 991 = 9, which is > 1.0 so clamps to 31.
        let lens = vec![1000];
        let flens_lr = vec![2000.0];
        let flens_lr_c = vec![50.0];
        let eff = calc_eff_lens_long_read(&lens, &flens_lr, &flens_lr_c);
        assert_eq!(eff, vec![31.0]);
    }
}
