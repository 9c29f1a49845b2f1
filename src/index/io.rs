//! Binary index format: the byte-exact on-disk layout — version, k,
//! transcript lengths, k-mer map, equivalence-class map, target names, all
//! little-endian and unpadded.

use std::collections::HashMap;
use std::io::{self, Read, Write};

use crate::ecmap::EcMap;
use crate::error::TqError;
use crate::kmer::{self, Kmer};

use super::{Index, KmerEntry};

pub const INDEX_VERSION: u64 = 1;

pub fn write<W: Write>(index: &Index, writer: &mut W, write_kmer_table: bool) -> io::Result<()> {
    writer.write_all(&INDEX_VERSION.to_le_bytes())?;
    writer.write_all(&(index.k as i32).to_le_bytes())?;
    writer.write_all(&(index.num_trans as i32).to_le_bytes())?;

    for &len in &index.trans_lens {
        writer.write_all(&(len as i32).to_le_bytes())?;
    }

    if write_kmer_table {
        writer.write_all(&(index.kmap.len() as u64).to_le_bytes())?;
        for (km, entry) in &index.kmap {
            writer.write_all(&km.0.to_le_bytes())?;
            writer.write_all(&entry.ec_id.to_le_bytes())?;
            writer.write_all(&entry.fdist.to_le_bytes())?;
            writer.write_all(&entry.bdist.to_le_bytes())?;
        }
    } else {
        writer.write_all(&0u64.to_le_bytes())?;
    }

    writer.write_all(&(index.ecmap.len() as u64).to_le_bytes())?;
    for (id, members) in index.ecmap.iter() {
        writer.write_all(&(id as i32).to_le_bytes())?;
        writer.write_all(&(members.len() as u64).to_le_bytes())?;
        for &tid in members {
            writer.write_all(&(tid as i32).to_le_bytes())?;
        }
    }

    for name in &index.target_names {
        let bytes = name.as_bytes();
        writer.write_all(&(bytes.len() as u64).to_le_bytes())?;
        writer.write_all(bytes)?;
    }

    writer.flush()
}

pub fn read<R: Read>(reader: &mut R, load_kmer_table: bool) -> Result<Index, TqError> {
    let version = read_u64(reader)?;
    if version != INDEX_VERSION {
        return Err(TqError::FormatMismatch {
            expected: INDEX_VERSION,
            found: version,
        });
    }

    let k = read_i32(reader)? as usize;
    match kmer::k() {
        None => kmer::set_k(k)?,
        Some(existing) if existing == k => {}
        Some(existing) => {
            return Err(TqError::InconsistentK {
                previous: existing,
                found: k,
            })
        }
    }

    let num_trans = read_i32(reader)? as usize;

    let mut trans_lens = Vec::with_capacity(num_trans);
    for _ in 0..num_trans {
        trans_lens.push(read_i32(reader)? as u32);
    }

    let kmap_size = read_u64(reader)? as usize;
    let mut kmap: HashMap<Kmer, KmerEntry> = HashMap::new();
    if load_kmer_table {
        kmap.reserve(kmap_size);
    }
    for _ in 0..kmap_size {
        let raw = read_u64(reader)?;
        let ec_id = read_i32(reader)? as u32;
        let fdist = read_i32(reader)?;
        let bdist = read_i32(reader)?;
        if load_kmer_table {
            kmap.insert(Kmer(raw), KmerEntry { ec_id, fdist, bdist });
        }
    }

    let ecmap_size = read_u64(reader)? as usize;
    let mut ecmap = EcMap::new(num_trans);
    for _ in 0..ecmap_size {
        let _id = read_i32(reader)?;
        let len = read_u64(reader)? as usize;
        let mut members = Vec::with_capacity(len);
        for _ in 0..len {
            members.push(read_i32(reader)? as u32);
        }
        if members.len() > 1 {
            ecmap.intern(&members);
        }
    }

    let mut target_names = Vec::with_capacity(num_trans);
    for _ in 0..num_trans {
        let len = read_u64(reader)? as usize;
        let mut buf = vec![0u8; len];
        reader.read_exact(&mut buf)?;
        target_names.push(String::from_utf8_lossy(&buf).into_owned());
    }

    Ok(Index {
        k,
        num_trans,
        trans_lens,
        target_names,
        kmap,
        ecmap,
    })
}

fn read_u64<R: Read>(reader: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_i32<R: Read>(reader: &mut R) -> io::Result<i32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}
