//! DALBUNDLE archive format (spec §3, §4.7): a fixed header, a
//! brotli-compressed item index, and a brotli-compressed data block,
//! read back through a repository that only decompresses the data
//! block the first time a lookup demands it.
//!
//! Grounded on `original_source/include/daltools/bundle/bundle.hpp` +
//! `src/bundle/bundle.cpp` for the header layout (magic resolved per
//! SPEC_FULL.md §1) and `src/bundle/repo.cpp` for the lazy repository.

use std::cell::RefCell;
use std::collections::HashSet;
use std::path::Path;

use crate::byte_codec::{ByteReader, ByteWriter};
use crate::compression::{brotli_compress, brotli_decompress};
use crate::error::{DalError, DalResult};

pub const MAGIC: &[u8; 8] = b"DALBUNDL";

/// True iff `bytes` begins with the DALBUNDLE magic (used by the
/// virtual filesystem to recognise a bundle file by content rather
/// than extension).
pub fn has_bundle_magic(bytes: &[u8]) -> bool {
    bytes.len() >= MAGIC.len() && &bytes[..MAGIC.len()] == MAGIC
}
const VERSION: u64 = 1;
const DATETIME_FIELD_LEN: usize = 32;
/// magic(8) + 8 × u64(8) + datetime(32).
const HEADER_SIZE: usize = 8 + 8 * 8 + DATETIME_FIELD_LEN;

#[derive(Debug, Clone, PartialEq)]
pub struct BundleHeader {
    pub version: u64,
    pub items_offset: u64,
    pub items_size: u64,
    pub items_size_z: u64,
    pub items_count: u64,
    pub data_offset: u64,
    pub data_size: u64,
    pub data_size_z: u64,
    pub created_datetime: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BundleItem {
    pub name: String,
    pub offset: u64,
    pub size: u64,
}

fn write_datetime_field(w: &mut ByteWriter) {
    let now = chrono::Utc::now().to_rfc3339();
    let mut buf = [0u8; DATETIME_FIELD_LEN];
    let bytes = now.as_bytes();
    let n = bytes.len().min(DATETIME_FIELD_LEN);
    buf[..n].copy_from_slice(&bytes[..n]);
    w.write_raw(&buf);
}

fn read_header(bytes: &[u8]) -> DalResult<BundleHeader> {
    if bytes.len() < HEADER_SIZE {
        return Err(DalError::Truncated {
            needed: HEADER_SIZE,
            remaining: bytes.len(),
        });
    }
    let mut r = ByteReader::new(bytes);
    let magic = r.read_raw(8)?;
    if magic != MAGIC {
        return Err(DalError::MagicMismatch);
    }
    let version = r.read_u64()?;
    if version != VERSION {
        return Err(DalError::UnsupportedVersion(version));
    }
    let items_offset = r.read_u64()?;
    let items_size = r.read_u64()?;
    let items_size_z = r.read_u64()?;
    let items_count = r.read_u64()?;
    let data_offset = r.read_u64()?;
    let data_size = r.read_u64()?;
    let data_size_z = r.read_u64()?;
    let datetime_bytes = r.read_raw(DATETIME_FIELD_LEN)?;
    let created_datetime = String::from_utf8_lossy(datetime_bytes)
        .trim_end_matches('\0')
        .to_string();

    Ok(BundleHeader {
        version,
        items_offset,
        items_size,
        items_size_z,
        items_count,
        data_offset,
        data_size,
        data_size_z,
        created_datetime,
    })
}

/// Builds a DALBUNDLE file from `(path, contents)` pairs. The basename
/// of each path is the stored item name; a basename collision is fatal
/// and nothing is emitted (spec §4.7 step 1).
pub fn build_bundle(inputs: &[(String, Vec<u8>)]) -> DalResult<Vec<u8>> {
    let mut seen = HashSet::new();
    let mut names = Vec::with_capacity(inputs.len());
    for (path, _) in inputs {
        let name = Path::new(path)
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or(path.as_str())
            .to_string();
        if !seen.insert(name.clone()) {
            return Err(DalError::DuplicateName(name));
        }
        names.push(name);
    }

    let mut items_block = ByteWriter::new();
    let mut data_block = ByteWriter::new();
    let mut offset: u64 = 0;
    for (name, (_, bytes)) in names.iter().zip(inputs.iter()) {
        let size = bytes.len() as u64;
        items_block.write_nt_string(name);
        items_block.write_u64(offset);
        items_block.write_u64(size);
        data_block.write_raw(bytes);
        offset += size;
    }

    let items_z = brotli_compress(items_block.as_slice())?;
    let data_z = brotli_compress(data_block.as_slice())?;

    let items_offset = HEADER_SIZE as u64;
    let items_size = items_block.len() as u64;
    let items_size_z = items_z.len() as u64;
    let data_offset = items_offset + items_size_z;
    let data_size = data_block.len() as u64;
    let data_size_z = data_z.len() as u64;

    let mut w = ByteWriter::with_capacity(HEADER_SIZE + items_z.len() + data_z.len());
    w.write_raw(MAGIC);
    w.write_u64(VERSION);
    w.write_u64(items_offset);
    w.write_u64(items_size);
    w.write_u64(items_size_z);
    w.write_u64(inputs.len() as u64);
    w.write_u64(data_offset);
    w.write_u64(data_size);
    w.write_u64(data_size_z);
    write_datetime_field(&mut w);
    w.write_raw(&items_z);
    w.write_raw(&data_z);

    Ok(w.into_bytes())
}

/// A parsed bundle: header and item index are eager; the data block is
/// decompressed and cached only on the first `lookup`.
pub struct BundleRecord {
    header: BundleHeader,
    items: Vec<BundleItem>,
    data_z: Vec<u8>,
    data_cache: RefCell<Option<Vec<u8>>>,
}

impl BundleRecord {
    pub fn header(&self) -> &BundleHeader {
        &self.header
    }

    pub fn items(&self) -> &[BundleItem] {
        &self.items
    }

    /// Names of items whose `offset + size` would overflow the
    /// (uncompressed) data block, without triggering decompression
    /// (spec §13's `bundle-view` overflow check).
    pub fn overflowing_items(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter(|i| i.offset.saturating_add(i.size) > self.header.data_size)
            .map(|i| i.name.as_str())
            .collect()
    }

    /// `Ok(None)` is the sentinel for "no such item" (spec §7: not an
    /// error). Decompresses and caches the data block on first call.
    pub fn lookup(&self, name: &str) -> DalResult<Option<Vec<u8>>> {
        let item = match self.items.iter().find(|i| i.name == name) {
            Some(i) => i,
            None => return Ok(None),
        };

        if self.data_cache.borrow().is_none() {
            let data = brotli_decompress(&self.data_z, self.header.data_size as usize)?;
            *self.data_cache.borrow_mut() = Some(data);
        }

        let cache = self.data_cache.borrow();
        let data = cache.as_ref().unwrap();
        let start = item.offset as usize;
        let end = start
            .checked_add(item.size as usize)
            .ok_or_else(|| DalError::Corrupted(format!("item '{name}' size overflows usize")))?;
        if end > data.len() {
            return Err(DalError::Corrupted(format!(
                "item '{name}' overflows data block"
            )));
        }
        Ok(Some(data[start..end].to_vec()))
    }
}

/// Reads the header and item index eagerly; leaves the data block
/// compressed until `lookup` is called (spec §4.7).
pub fn parse_bundle(bytes: &[u8]) -> DalResult<BundleRecord> {
    let header = read_header(bytes)?;

    if header.items_offset as usize != HEADER_SIZE {
        return Err(DalError::Corrupted("unexpected items_offset".into()));
    }
    let items_z_start = header.items_offset as usize;
    let items_z_end = items_z_start
        .checked_add(header.items_size_z as usize)
        .ok_or_else(|| DalError::Corrupted("items_size_z overflow".into()))?;
    if bytes.len() < items_z_end {
        return Err(DalError::Truncated {
            needed: items_z_end,
            remaining: bytes.len(),
        });
    }
    let items_raw = brotli_decompress(&bytes[items_z_start..items_z_end], header.items_size as usize)?;

    let mut r = ByteReader::new(&items_raw);
    let mut items = Vec::with_capacity(header.items_count as usize);
    for _ in 0..header.items_count {
        let name = r.read_nt_string()?;
        let offset = r.read_u64()?;
        let size = r.read_u64()?;
        items.push(BundleItem { name, offset, size });
    }
    if !r.is_eof() {
        return Err(DalError::Corrupted("trailing bytes in items block".into()));
    }

    let expected_data_offset = header.items_offset + header.items_size_z;
    if header.data_offset != expected_data_offset {
        return Err(DalError::Corrupted("data_offset mismatch".into()));
    }
    let data_z_start = header.data_offset as usize;
    let data_z_end = data_z_start
        .checked_add(header.data_size_z as usize)
        .ok_or_else(|| DalError::Corrupted("data_size_z overflow".into()))?;
    if bytes.len() < data_z_end {
        return Err(DalError::Truncated {
            needed: data_z_end,
            remaining: bytes.len(),
        });
    }
    let data_z = bytes[data_z_start..data_z_end].to_vec();

    Ok(BundleRecord {
        header,
        items,
        data_z,
        data_cache: RefCell::new(None),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_round_trip_matches_concrete_scenario() {
        let inputs = vec![
            ("a".to_string(), vec![1u8, 2]),
            ("b".to_string(), vec![3u8]),
        ];
        let bytes = build_bundle(&inputs).unwrap();
        let record = parse_bundle(&bytes).unwrap();

        assert_eq!(record.header().items_count, 2);
        assert_eq!(record.header().data_size, 3);
        assert_eq!(record.header().items_offset as usize, HEADER_SIZE);
        assert_eq!(record.lookup("a").unwrap(), Some(vec![1, 2]));
        assert_eq!(record.lookup("b").unwrap(), Some(vec![3]));
        assert_eq!(record.lookup("missing").unwrap(), None);
    }

    #[test]
    fn refuses_basename_collisions() {
        let inputs = vec![
            ("/x/a".to_string(), vec![1u8]),
            ("/y/a".to_string(), vec![2u8]),
        ];
        assert!(matches!(
            build_bundle(&inputs),
            Err(DalError::DuplicateName(ref n)) if n == "a"
        ));
    }

    #[test]
    fn rejects_bad_magic() {
        let bytes = vec![0u8; HEADER_SIZE + 8];
        assert!(matches!(parse_bundle(&bytes), Err(DalError::MagicMismatch)));
    }

    #[test]
    fn preserves_insertion_order() {
        let inputs = vec![
            ("z".to_string(), vec![1u8]),
            ("a".to_string(), vec![2u8]),
        ];
        let bytes = build_bundle(&inputs).unwrap();
        let record = parse_bundle(&bytes).unwrap();
        assert_eq!(record.items()[0].name, "z");
        assert_eq!(record.items()[1].name, "a");
    }
}
