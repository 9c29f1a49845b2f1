//! Index construction: one pass over the enhanced suffix array's k-length
//! LCP groups, building the k-mer -> equivalence-class map, then a poly-A
//! purge and skip-ahead pass.

use std::collections::HashMap;

use tracing::info;

use super::skip::compute_skip_ahead;
use super::{Index, KmerEntry};
use crate::ecmap::EcMap;
use crate::error::TqError;
use crate::kmer::{self, Kmer, BASES};
use crate::suffix::{build_lcp_array, build_suffix_array, k_groups, sa_find_range, ConcatText};

/// Build a transcriptome index from `(name, sequence)` records, already
/// upper-cased with non-ACGT bases mapped to `N` by the FASTA front end.
pub fn build(records: &[(String, Vec<u8>)], k: usize) -> Result<Index, TqError> {
    build_with_sa(records, k).map(|(idx, _sa, _lcp)| idx)
}

/// As `build`, but also returns the suffix array and LCP array computed
/// along the way, so a caller that wants to persist them to a `.sa`
/// companion file doesn't have to recompute them.
pub fn build_with_sa(records: &[(String, Vec<u8>)], k: usize) -> Result<(Index, Vec<u32>, Vec<u32>), TqError> {
    kmer::set_k(k)?;

    let num_trans = records.len();
    let target_names: Vec<String> = records.iter().map(|(name, _)| name.clone()).collect();
    let trans_lens: Vec<u32> = records.iter().map(|(_, seq)| seq.len() as u32).collect();

    let seqs: Vec<Vec<u8>> = records.iter().map(|(_, seq)| seq.clone()).collect();

    info!("building suffix array over {} transcripts", num_trans);
    let text = ConcatText::build(&seqs);
    let sa = build_suffix_array(&text.symbols);
    let lcp = build_lcp_array(&text.symbols, &sa);

    info!("traversing k-mer groups (k = {k})");
    let groups = k_groups(&text, &sa, &lcp, k);

    let mut ecmap = EcMap::new(num_trans);
    let mut kmap: HashMap<Kmer, KmerEntry> = HashMap::new();

    for group in &groups {
        let pos = sa[group.sa_range.start] as usize;
        let codes: Vec<u32> = text.symbols[pos..pos + k].to_vec();
        let km = match Kmer::from_codes(&codes) {
            Ok(km) => km,
            Err(_) => continue, // defensive: k_groups already excludes sentinel windows
        };
        let rep = km.rep();
        if kmap.contains_key(&rep) {
            continue;
        }

        let mut ecv: Vec<u32> = sa[group.sa_range.clone()]
            .iter()
            .map(|&p| text.tid_at(p as usize) as u32)
            .collect();

        let twin_codes = km.twin().to_codes();
        let twin_range = sa_find_range(&text.symbols, &sa, &twin_codes);
        ecv.extend(
            sa[twin_range]
                .iter()
                .map(|&p| text.tid_at(p as usize) as u32),
        );

        let ec_id = ecmap.intern(&ecv);
        kmap.insert(rep, KmerEntry::unresolved(ec_id));
    }
    info!(
        "created {} equivalence classes from {} transcripts; k-mer map has {} entries",
        ecmap.len(),
        num_trans,
        kmap.len()
    );

    purge_poly_a(&mut kmap, k);

    info!("computing skip-ahead hints");
    let kset = compute_skip_ahead(&mut kmap);
    info!("computed skip-ahead for {kset} k-mers");

    let idx = Index {
        k,
        num_trans,
        trans_lens,
        target_names,
        kmap,
        ecmap,
    };
    Ok((idx, sa, lcp))
}

/// Remove the poly-A k-mer and every k-mer within Hamming distance 1 of it:
/// these are near-universal low-information k-mers that otherwise dominate
/// equivalence-class composition.
fn purge_poly_a(kmap: &mut HashMap<Kmer, KmerEntry>, k: usize) {
    let poly_a = vec![b'A'; k];
    if let Ok(km) = Kmer::from_bytes(&poly_a) {
        kmap.remove(&km.rep());
    }

    for i in 0..k {
        for &base in &BASES {
            if base == b'A' {
                continue;
            }
            let mut variant = poly_a.clone();
            variant[i] = base;
            if let Ok(km) = Kmer::from_bytes(&variant) {
                kmap.remove(&km.rep());
            }
        }
    }
}
