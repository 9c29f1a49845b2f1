//! End-to-end tests over the public EM and effective-length API: no index
//! or k-mer machinery involved, so these run independently of the
//! process-global k used by `index_scenarios.rs`.

use transquant::abundance;
use transquant::ecmap::EcMap;
use transquant::efflen;
use transquant::em;

#[test]
fn em_on_unambiguous_reads_recovers_exact_alpha_and_rho() {
    let ecmap = EcMap::new(3);
    let counts = vec![10u32, 20, 30];
    let trans_lens = vec![100u32, 100, 100];
    let eff_lens = vec![100.0f64, 100.0, 100.0];

    let out = em::run(&ecmap, &counts, &trans_lens, eff_lens.clone(), None, false, 200, 50);

    assert!((out.alpha[0] - 10.0).abs() < 1e-6);
    assert!((out.alpha[1] - 20.0).abs() < 1e-6);
    assert!((out.alpha[2] - 30.0).abs() < 1e-6);

    let rho = abundance::compute_rho(&out.alpha, &eff_lens);
    assert!((rho[0] - 1.0 / 6.0).abs() < 1e-9);
    assert!((rho[1] - 2.0 / 6.0).abs() < 1e-9);
    assert!((rho[2] - 3.0 / 6.0).abs() < 1e-9);

    let tpm_sum: f64 = rho.iter().map(|r| r * 1e6).sum();
    assert!((tpm_sum - 1e6).abs() < 1e-6);
}

#[test]
fn em_on_ambiguous_reads_splits_evenly() {
    let mut ecmap = EcMap::new(2);
    let composite = ecmap.intern(&[0, 1]);

    let mut counts = vec![0u32; ecmap.len()];
    counts[composite as usize] = 100;

    let trans_lens = vec![100u32, 100];
    let eff_lens = vec![100.0f64, 100.0];

    let out = em::run(&ecmap, &counts, &trans_lens, eff_lens, None, false, 200, 50);

    assert!((out.alpha[0] - 50.0).abs() < 1e-6);
    assert!((out.alpha[1] - 50.0).abs() < 1e-6);
}

#[test]
fn long_read_effective_length_clamps_to_the_fallback() {
    let trans_lens = vec![1000u32];
    let flens_lr = vec![2000.0f64];
    let flens_lr_c = vec![50.0f64];

    let eff = efflen::calc_eff_lens_long_read(&trans_lens, &flens_lr, &flens_lr_c);
    assert_eq!(eff, vec![31.0]);
}
