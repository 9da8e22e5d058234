//! Little-endian primitive reader/writer. The only place in the crate
//! that deals with endianness or raw byte layout; every persisted
//! format (DMD, bundle, key file) is built on top of these two types.
//!
//! Mirrors the shape of `R-Hidayatullah-tosmole`'s `binary.rs`
//! (`BinaryReader`/`BinaryWriter`, `read_exact::<N>()`), generalised to
//! the exact primitive set spec §4.1 names: bool8, i16, i32, i64, f32,
//! fixed arrays of those, raw bytes, NT strings, and 4x4 matrices
//! stored row-major (element (row, col) at linear index 4*row+col,
//! i.e. the transpose of a column-major math matrix).

use glam::Mat4;

use crate::error::{DalError, DalResult};

#[derive(Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            buf: Vec::with_capacity(cap),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_bool8(&mut self, v: bool) {
        self.buf.push(if v { 1 } else { 0 });
    }

    pub fn write_i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_f32_arr(&mut self, vs: &[f32]) {
        for &v in vs {
            self.write_f32(v);
        }
    }

    pub fn write_i32_arr(&mut self, vs: &[i32]) {
        for &v in vs {
            self.write_i32(v);
        }
    }

    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Bytes followed by a NUL terminator.
    pub fn write_nt_string(&mut self, s: &str) {
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(0);
    }

    /// 16 f32 written row-major: element (row, col) at index 4*row+col,
    /// i.e. the transpose of `m`'s column-major in-memory layout.
    pub fn write_mat4(&mut self, m: &Mat4) {
        let transposed = m.transpose();
        self.write_f32_arr(&transposed.to_cols_array());
    }
}

pub struct ByteReader<'a> {
    buf: &'a [u8],
    cursor: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, cursor: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.cursor
    }

    pub fn is_eof(&self) -> bool {
        self.cursor >= self.buf.len()
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    fn need(&self, n: usize) -> DalResult<()> {
        if self.remaining() < n {
            Err(DalError::Truncated {
                needed: n,
                remaining: self.remaining(),
            })
        } else {
            Ok(())
        }
    }

    pub fn read_bool8(&mut self) -> DalResult<bool> {
        self.need(1)?;
        let v = self.buf[self.cursor] != 0;
        self.cursor += 1;
        Ok(v)
    }

    pub fn read_i16(&mut self) -> DalResult<i16> {
        self.need(2)?;
        let v = i16::from_le_bytes(self.buf[self.cursor..self.cursor + 2].try_into().unwrap());
        self.cursor += 2;
        Ok(v)
    }

    pub fn read_i32(&mut self) -> DalResult<i32> {
        self.need(4)?;
        let v = i32::from_le_bytes(self.buf[self.cursor..self.cursor + 4].try_into().unwrap());
        self.cursor += 4;
        Ok(v)
    }

    pub fn read_i64(&mut self) -> DalResult<i64> {
        self.need(8)?;
        let v = i64::from_le_bytes(self.buf[self.cursor..self.cursor + 8].try_into().unwrap());
        self.cursor += 8;
        Ok(v)
    }

    pub fn read_u64(&mut self) -> DalResult<u64> {
        self.need(8)?;
        let v = u64::from_le_bytes(self.buf[self.cursor..self.cursor + 8].try_into().unwrap());
        self.cursor += 8;
        Ok(v)
    }

    pub fn read_f32(&mut self) -> DalResult<f32> {
        self.need(4)?;
        let v = f32::from_le_bytes(self.buf[self.cursor..self.cursor + 4].try_into().unwrap());
        self.cursor += 4;
        Ok(v)
    }

    pub fn read_f32_arr(&mut self, n: usize) -> DalResult<Vec<f32>> {
        (0..n).map(|_| self.read_f32()).collect()
    }

    pub fn read_i32_arr(&mut self, n: usize) -> DalResult<Vec<i32>> {
        (0..n).map(|_| self.read_i32()).collect()
    }

    pub fn read_raw(&mut self, n: usize) -> DalResult<&'a [u8]> {
        self.need(n)?;
        let slice = &self.buf[self.cursor..self.cursor + n];
        self.cursor += n;
        Ok(slice)
    }

    /// Reads bytes up to (and consuming) the next NUL. Fails with
    /// `UnterminatedString` if no NUL appears before the buffer ends.
    pub fn read_nt_string(&mut self) -> DalResult<String> {
        let start = self.cursor;
        let nul_pos = self.buf[start..]
            .iter()
            .position(|&b| b == 0)
            .ok_or(DalError::UnterminatedString)?;
        let s = String::from_utf8_lossy(&self.buf[start..start + nul_pos]).into_owned();
        self.cursor = start + nul_pos + 1;
        Ok(s)
    }

    /// Inverse of `ByteWriter::write_mat4`.
    pub fn read_mat4(&mut self) -> DalResult<Mat4> {
        let arr = self.read_f32_arr(16)?;
        let mut cols = [0.0f32; 16];
        cols.copy_from_slice(&arr);
        Ok(Mat4::from_cols_array(&cols).transpose())
    }
}
