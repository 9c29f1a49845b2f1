//! Skip-ahead computation: for each k-mer, how far a scan can jump ahead
//! before the next position needs to be checked again, derived from the
//! maximal unambiguous (single in, single out, same-EC) contig the k-mer
//! sits on.

use std::collections::HashMap;

use super::KmerEntry;
use crate::kmer::{Kmer, BASES};

/// Try to extend `current` by exactly one unambiguous base within
/// equivalence class `ec`: there must be exactly one of the four possible
/// forward extensions present in `kmap`, belonging to `ec`, and that
/// extension's own single predecessor must lead back to `current`. Returns
/// `None` if the extension is ambiguous, absent, changes EC, or is a
/// zero-length (self) step.
fn fw_step(kmap: &HashMap<Kmer, KmerEntry>, current: Kmer, ec: u32) -> Option<Kmer> {
    let mut chosen: Option<u8> = None;
    let mut fw_count = 0;
    for &base in &BASES {
        let fw_rep = current.forward(base).ok()?.rep();
        if let Some(entry) = kmap.get(&fw_rep) {
            if entry.ec_id != ec {
                return None;
            }
            chosen = Some(base);
            fw_count += 1;
            if fw_count > 1 {
                return None;
            }
        }
    }
    let base = chosen?;
    let fw = current.forward(base).ok()?;

    let mut bw_count = 0;
    for &b in &BASES {
        let bw_rep = fw.backward(b).ok()?.rep();
        if kmap.contains_key(&bw_rep) {
            bw_count += 1;
            if bw_count > 1 {
                return None;
            }
        }
    }
    if bw_count != 1 {
        return None;
    }

    if fw == current {
        None
    } else {
        Some(fw)
    }
}

/// Fill in `fdist`/`bdist` for every k-mer in `kmap`, returning how many were
/// resolved. Walks each maximal unambiguous contig once (seeded from any
/// unresolved k-mer on it) and stamps every k-mer on that contig in one pass.
pub fn compute_skip_ahead(kmap: &mut HashMap<Kmer, KmerEntry>) -> usize {
    let seeds: Vec<Kmer> = kmap.keys().copied().collect();
    let mut kset = 0;

    for seed in seeds {
        let Some(entry) = kmap.get(&seed) else {
            continue;
        };
        if entry.fdist != -1 || entry.bdist != -1 {
            continue;
        }
        let ec = entry.ec_id;
        let twin = seed.twin();

        let mut flist = vec![seed];
        let mut end = seed;
        let mut last = end;
        let mut self_loop = false;

        while let Some(next) = fw_step(kmap, end, ec) {
            if next == seed || next == twin {
                self_loop = true;
                break;
            } else if next == last.twin() {
                break; // hairpin
            }
            end = next;
            flist.push(end);
            last = end;
        }

        let mut blist: Vec<Kmer> = Vec::new();
        if !self_loop {
            let mut front = twin;
            let mut first = front;
            while let Some(next) = fw_step(kmap, front, ec) {
                if next == twin || next == seed {
                    break; // self_loop reached from the other side
                } else if next == first.twin() {
                    break; // hairpin
                }
                front = next;
                blist.push(front);
                first = front;
            }
        }

        let mut klist: Vec<Kmer> = blist.iter().rev().map(|k| k.twin()).collect();
        klist.extend(flist.iter().copied());
        let contig_len = klist.len();

        for (i, &x) in klist.iter().enumerate() {
            let xr = x.rep();
            let forward = x == xr;
            if let Some(e) = kmap.get_mut(&xr) {
                if forward {
                    e.fdist = (contig_len - 1 - i) as i32;
                    e.bdist = i as i32;
                } else {
                    e.fdist = i as i32;
                    e.bdist = (contig_len - 1 - i) as i32;
                }
                kset += 1;
            }
        }
    }

    kset
}
