//! Two-way deflate (zlib-compatible) and brotli compression, a
//! length-prefixed deflate envelope, and a base64 codec for text-safe
//! key files.
//!
//! Grounded on `original_source/src/common/compression.cpp`
//! (`compress_zip`/`decomp_zip` via zlib, `compress_bro`/`decomp_bro`
//! via brotli, `compress_with_header`/`decompress_with_header` for the
//! length-prefixed envelope, `encode_base64`/`decode_base64`).

use std::io::{Read, Write};

use base64::Engine as _;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::{DalError, DalResult};

const BROTLI_QUALITY: u32 = 6;
const BROTLI_LG_WINDOW: u32 = 22;

pub fn deflate_compress(src: &[u8]) -> DalResult<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(src)
        .map_err(|_| DalError::CompressionFailed)?;
    encoder.finish().map_err(|_| DalError::CompressionFailed)
}

pub fn deflate_decompress(src: &[u8], hint: usize) -> DalResult<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(src);
    let mut out = Vec::with_capacity(hint);
    decoder
        .read_to_end(&mut out)
        .map_err(|_| DalError::DecompressionFailed)?;
    Ok(out)
}

pub fn brotli_compress(src: &[u8]) -> DalResult<Vec<u8>> {
    let mut out = Vec::new();
    let params = brotli::enc::BrotliEncoderParams {
        quality: BROTLI_QUALITY as i32,
        lgwin: BROTLI_LG_WINDOW as i32,
        ..Default::default()
    };
    brotli::BrotliCompress(&mut &src[..], &mut out, &params)
        .map_err(|_| DalError::CompressionFailed)?;
    Ok(out)
}

pub fn brotli_decompress(src: &[u8], hint: usize) -> DalResult<Vec<u8>> {
    let mut out = Vec::with_capacity(hint);
    brotli::BrotliDecompress(&mut &src[..], &mut out)
        .map_err(|_| DalError::DecompressionFailed)?;
    Ok(out)
}

/// Prepends `i64(raw_size)` then deflates `src`.
pub fn envelope_compress(src: &[u8]) -> DalResult<Vec<u8>> {
    let compressed = deflate_compress(src)?;
    let mut out = Vec::with_capacity(8 + compressed.len());
    out.extend_from_slice(&(src.len() as i64).to_le_bytes());
    out.extend_from_slice(&compressed);
    Ok(out)
}

/// Reads the `i64` raw-size prefix, deflates the rest, and asserts the
/// decompressed length matches the prefix — else `Corrupted`.
pub fn envelope_decompress(src: &[u8]) -> DalResult<Vec<u8>> {
    if src.len() < 8 {
        return Err(DalError::Truncated {
            needed: 8,
            remaining: src.len(),
        });
    }
    let raw_size = i64::from_le_bytes(src[0..8].try_into().unwrap());
    if raw_size < 0 {
        return Err(DalError::Corrupted("negative raw_size in envelope".into()));
    }
    let out = deflate_decompress(&src[8..], raw_size as usize)?;
    if out.len() as i64 != raw_size {
        return Err(DalError::Corrupted(format!(
            "envelope raw_size mismatch: header says {}, got {}",
            raw_size,
            out.len()
        )));
    }
    Ok(out)
}

pub fn base64_encode(src: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(src)
}

pub fn base64_decode(src: &str) -> DalResult<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(src.as_bytes())
        .map_err(|_| DalError::Base64Decode)
}

/// Whitespace-tolerant base64 decode: strips all ASCII whitespace
/// (spaces, tabs, newlines — the line breaks a key file introduces)
/// before decoding.
pub fn base64_decode_tolerant(src: &str) -> DalResult<Vec<u8>> {
    let stripped: String = src.chars().filter(|c| !c.is_whitespace()).collect();
    base64_decode(&stripped)
}

/// Inserts a `\n` every `width` characters.
pub fn line_wrap(s: &str, width: usize) -> String {
    let mut out = String::with_capacity(s.len() + s.len() / width + 1);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && i % width == 0 {
            out.push('\n');
        }
        out.push(c);
    }
    out
}
