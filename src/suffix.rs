//! Enhanced suffix array over the concatenation of all transcripts: a suffix
//! array built by prefix doubling plus an LCP array built with Kasai's
//! algorithm. Together they stand in for a generalized suffix-tree traversal
//! (Abouelhoda et al.,
//! "Replacing Suffix Trees with Enhanced Suffix Arrays") without ever
//! materializing explicit tree nodes.
//!
//! Each transcript is terminated by a unique sentinel symbol strictly
//! greater than any base code, so no suffix of one transcript can be a
//! prefix of a suffix from another, and the generalized suffix array has the
//! same total order as a single-string suffix array would.

use std::ops::Range;

/// Base codes occupy 0..=3; sentinels start here and are one-per-transcript.
const SENTINEL_BASE: u32 = 4;

/// The concatenated, sentinel-separated text plus per-transcript offsets.
pub struct ConcatText {
    pub symbols: Vec<u32>,
    /// `starts[t]` is the index in `symbols` of transcript `t`'s first base.
    pub starts: Vec<usize>,
    /// `ends[t]` is the index of transcript `t`'s sentinel (exclusive end of bases).
    pub ends: Vec<usize>,
}

impl ConcatText {
    /// Build from uppercase ACGT sequences (other bytes are rejected by the
    /// caller before this point; see C10). `seqs` must be non-empty.
    pub fn build(seqs: &[Vec<u8>]) -> Self {
        let mut symbols = Vec::new();
        let mut starts = Vec::with_capacity(seqs.len());
        let mut ends = Vec::with_capacity(seqs.len());
        for (t, seq) in seqs.iter().enumerate() {
            starts.push(symbols.len());
            for &b in seq {
                symbols.push(base_code(b));
            }
            ends.push(symbols.len());
            symbols.push(SENTINEL_BASE + t as u32);
        }
        ConcatText {
            symbols,
            starts,
            ends,
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// The transcript id owning position `pos` (which may point at a base or
    /// at that transcript's trailing sentinel).
    pub fn tid_at(&self, pos: usize) -> usize {
        match self.starts.binary_search(&pos) {
            Ok(t) => t,
            Err(t) => t - 1,
        }
    }

    /// True if the length-`k` window starting at `pos` stays within one
    /// transcript's bases (does not run into or past its sentinel).
    pub fn window_in_bounds(&self, pos: usize, k: usize) -> bool {
        if pos + k > self.symbols.len() {
            return false;
        }
        let t = self.tid_at(pos);
        pos + k <= self.ends[t]
    }
}

#[inline]
fn base_code(b: u8) -> u32 {
    match b {
        b'A' => 0,
        b'C' => 1,
        b'G' => 2,
        b'T' => 3,
        other => panic!("non-ACGT byte {other:#x} reached suffix array construction"),
    }
}

/// Build the suffix array of `symbols` by prefix doubling: O(n log n)
/// comparisons, each round refining a rank array by the pair
/// (rank[i], rank[i + half]).
pub fn build_suffix_array(symbols: &[u32]) -> Vec<u32> {
    let n = symbols.len();
    if n == 0 {
        return Vec::new();
    }

    let mut sa: Vec<u32> = (0..n as u32).collect();
    let mut rank: Vec<i64> = symbols.iter().map(|&s| s as i64).collect();
    let mut tmp = vec![0i64; n];

    let mut k = 1usize;
    while k < n {
        let key = |i: usize| -> (i64, i64) {
            let a = rank[i];
            let b = if i + k < n { rank[i + k] } else { -1 };
            (a, b)
        };
        sa.sort_unstable_by(|&a, &b| key(a as usize).cmp(&key(b as usize)));

        tmp[sa[0] as usize] = 0;
        for i in 1..n {
            let prev = sa[i - 1] as usize;
            let cur = sa[i] as usize;
            tmp[cur] = tmp[prev] + if key(prev) < key(cur) { 1 } else { 0 };
        }
        rank.copy_from_slice(&tmp);

        if rank[sa[n - 1] as usize] as usize == n - 1 {
            break;
        }
        k *= 2;
    }

    sa
}

/// Kasai's algorithm: the LCP array, where `lcp[i]` is the length of the
/// longest common prefix of `sa[i-1]` and `sa[i]` (`lcp[0] == 0`).
pub fn build_lcp_array(symbols: &[u32], sa: &[u32]) -> Vec<u32> {
    let n = symbols.len();
    if n == 0 {
        return Vec::new();
    }
    let mut rank = vec![0usize; n];
    for (i, &s) in sa.iter().enumerate() {
        rank[s as usize] = i;
    }

    let mut lcp = vec![0u32; n];
    let mut h = 0usize;
    for i in 0..n {
        if rank[i] > 0 {
            let j = sa[rank[i] - 1] as usize;
            while i + h < n && j + h < n && symbols[i + h] == symbols[j + h] {
                h += 1;
            }
            lcp[rank[i]] = h as u32;
            if h > 0 {
                h -= 1;
            }
        } else {
            h = 0;
        }
    }
    lcp
}

/// One run of consecutive suffix-array positions that all share the same
/// length-`k` prefix: `sa_range` indexes into the suffix array itself (not
/// into `symbols`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KGroup {
    pub sa_range: Range<usize>,
}

/// Partition the suffix array into maximal runs sharing a common length-`k`
/// prefix ("LCP intervals with bounding LCP >= k"), skipping any suffix that
/// is too short for a full k-window or whose k-window would cross a
/// transcript boundary. Every distinct k-length substring of the text that
/// stays within one transcript appears in exactly one group.
pub fn k_groups(text: &ConcatText, sa: &[u32], lcp: &[u32], k: usize) -> Vec<KGroup> {
    let n = sa.len();
    let mut groups = Vec::new();
    let mut i = 0;
    while i < n {
        let mut j = i + 1;
        while j < n && (lcp[j] as usize) >= k {
            j += 1;
        }
        // [i, j) all share a length->=k common prefix (or is a singleton).
        let pos = sa[i] as usize;
        if text.window_in_bounds(pos, k) {
            groups.push(KGroup { sa_range: i..j });
        }
        i = j;
    }
    groups
}

/// Binary search the suffix array for the contiguous range of suffixes whose
/// first `pattern.len()` symbols equal `pattern` exactly.
pub fn sa_find_range(symbols: &[u32], sa: &[u32], pattern: &[u32]) -> Range<usize> {
    let cmp_at = |idx: u32| -> std::cmp::Ordering {
        let pos = idx as usize;
        let end = (pos + pattern.len()).min(symbols.len());
        symbols[pos..end].cmp(pattern)
    };
    let lo = sa.partition_point(|&idx| cmp_at(idx) == std::cmp::Ordering::Less);
    let hi = sa.partition_point(|&idx| cmp_at(idx) != std::cmp::Ordering::Greater);
    lo..hi
}

/// Persist a suffix array and its LCP array as a `.sa` companion file,
/// little-endian, so a later run against the same transcriptome can load
/// them back instead of recomputing.
pub fn write_sa_file<W: std::io::Write>(sa: &[u32], lcp: &[u32], writer: &mut W) -> std::io::Result<()> {
    writer.write_all(&(sa.len() as u64).to_le_bytes())?;
    for &v in sa {
        writer.write_all(&v.to_le_bytes())?;
    }
    writer.write_all(&(lcp.len() as u64).to_le_bytes())?;
    for &v in lcp {
        writer.write_all(&v.to_le_bytes())?;
    }
    writer.flush()
}

/// Load a `.sa` companion file written by [`write_sa_file`].
pub fn read_sa_file<R: std::io::Read>(reader: &mut R) -> std::io::Result<(Vec<u32>, Vec<u32>)> {
    let sa = read_u32_vec(reader)?;
    let lcp = read_u32_vec(reader)?;
    Ok((sa, lcp))
}

fn read_u32_vec<R: std::io::Read>(reader: &mut R) -> std::io::Result<Vec<u32>> {
    let mut len_buf = [0u8; 8];
    reader.read_exact(&mut len_buf)?;
    let len = u64::from_le_bytes(len_buf) as usize;
    let mut out = Vec::with_capacity(len);
    let mut buf = [0u8; 4];
    for _ in 0..len {
        reader.read_exact(&mut buf)?;
        out.push(u32::from_le_bytes(buf));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seqs(strs: &[&str]) -> Vec<Vec<u8>> {
        strs.iter().map(|s| s.as_bytes().to_vec()).collect()
    }

    #[test]
    fn concat_text_tracks_transcript_bounds() {
        let text = ConcatText::build(&seqs(&["ACGT", "GGCC"]));
        assert_eq!(text.starts, vec![0, 5]);
        assert_eq!(text.ends, vec![4, 9]);
        assert_eq!(text.tid_at(0), 0);
        assert_eq!(text.tid_at(3), 0);
        assert_eq!(text.tid_at(5), 1);
        assert_eq!(text.tid_at(8), 1);
    }

    #[test]
    fn window_in_bounds_rejects_boundary_crossing() {
        let text = ConcatText::build(&seqs(&["ACGT", "GGCC"]));
        assert!(text.window_in_bounds(0, 3));
        assert!(!text.window_in_bounds(2, 3)); // would include the sentinel at 4
        assert!(text.window_in_bounds(5, 3));
        assert!(!text.window_in_bounds(7, 3)); // runs past end of text
    }

    #[test]
    fn suffix_array_is_sorted_order() {
        let text = ConcatText::build(&seqs(&["ACGTACGT"]));
        let sa = build_suffix_array(&text.symbols);
        let suffixes: Vec<&[u32]> = sa.iter().map(|&i| &text.symbols[i as usize..]).collect();
        let mut sorted = suffixes.clone();
        sorted.sort();
        assert_eq!(suffixes, sorted);
    }

    #[test]
    fn lcp_array_matches_naive_computation() {
        let text = ConcatText::build(&seqs(&["ACGTACGT"]));
        let sa = build_suffix_array(&text.symbols);
        let lcp = build_lcp_array(&text.symbols, &sa);
        for i in 1..sa.len() {
            let a = &text.symbols[sa[i - 1] as usize..];
            let b = &text.symbols[sa[i] as usize..];
            let naive = a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count();
            assert_eq!(lcp[i] as usize, naive);
        }
    }

    #[test]
    fn k_groups_separate_distinct_kmers_and_merge_repeats() {
        // "ACGACG" + sentinel: k=3 windows at pos 0 ("ACG") and pos 3 ("ACG")
        // are identical and must land in the same group; pos 1 ("CGA") and
        // pos 2 ("GAC") are each unique.
        let text = ConcatText::build(&seqs(&["ACGACG"]));
        let sa = build_suffix_array(&text.symbols);
        let lcp = build_lcp_array(&text.symbols, &sa);
        let groups = k_groups(&text, &sa, &lcp, 3);

        let mut by_prefix: Vec<Vec<usize>> = groups
            .iter()
            .map(|g| sa[g.sa_range.clone()].iter().map(|&p| p as usize).collect())
            .collect();
        for v in &mut by_prefix {
            v.sort_unstable();
        }
        assert!(by_prefix.contains(&vec![0, 3]));
        assert_eq!(groups.len(), 3); // "ACG" (positions 0 and 3), "CGA", "GAC"
    }

    #[test]
    fn sa_find_range_locates_all_occurrences() {
        let text = ConcatText::build(&seqs(&["ACGACG"]));
        let sa = build_suffix_array(&text.symbols);
        let range = sa_find_range(&text.symbols, &sa, &[0, 1, 2]); // "ACG"
        let mut positions: Vec<usize> = sa[range].iter().map(|&p| p as usize).collect();
        positions.sort_unstable();
        assert_eq!(positions, vec![0, 3]);
    }

    #[test]
    fn sa_file_round_trips() {
        let text = ConcatText::build(&seqs(&["ACGACG", "TTGGCC"]));
        let sa = build_suffix_array(&text.symbols);
        let lcp = build_lcp_array(&text.symbols, &sa);

        let mut buf = Vec::new();
        write_sa_file(&sa, &lcp, &mut buf).unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let (sa2, lcp2) = read_sa_file(&mut cursor).unwrap();
        assert_eq!(sa, sa2);
        assert_eq!(lcp, lcp2);
    }
}
