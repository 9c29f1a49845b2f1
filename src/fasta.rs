//! FASTA front end: a thin wrapper over `needletail`'s reader, kept small
//! and without any algorithmic content of its own.

use std::path::Path;

use needletail::parse_fastx_file;

use crate::error::TqError;

/// Read every record from `path`, truncating each id at the first
/// whitespace byte, upper-casing bases, and mapping anything outside ACGT
/// to `N` (so k-mer extraction can treat `N` as "skip this window"
/// uniformly, regardless of why the base was ambiguous).
pub fn read_records(path: &Path) -> Result<Vec<(String, Vec<u8>)>, TqError> {
    let mut reader =
        parse_fastx_file(path).map_err(|e| TqError::FatalIo(std::io::Error::other(e)))?;

    let mut records = Vec::new();
    while let Some(rec) = reader.next() {
        let rec = rec.map_err(|e| TqError::FatalIo(std::io::Error::other(e)))?;
        let id = String::from_utf8_lossy(rec.id());
        let name = id.split_whitespace().next().unwrap_or("").to_string();
        let seq = normalize(&rec.seq());
        records.push((name, seq));
    }

    if records.is_empty() {
        return Err(TqError::EmptyInput(path.display().to_string()));
    }
    Ok(records)
}

fn normalize(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .map(|&b| match b.to_ascii_uppercase() {
            c @ (b'A' | b'C' | b'G' | b'T') => c,
            _ => b'N',
        })
        .collect()
}
