//! NumPy `.npy` (format version 1.0) reading and writing for 2-D grids.
//!
//! Layout: `\x93NUMPY`, version `[1, 0]`, a little-endian `u16` header
//! length, then an ASCII dict padded with spaces and terminated by `\n` so
//! the data starts on a 64-byte boundary, then raw C-order data.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use cloud_common::Grid;

use crate::error::{StorageError, StorageResult};

const MAGIC: &[u8; 6] = b"\x93NUMPY";
const PREAMBLE_LEN: usize = MAGIC.len() + 2 + 2;
const ALIGNMENT: usize = 64;

/// Element types that can be stored in an `.npy` file.
pub trait NpyElement: Copy {
    /// NumPy dtype descriptor
    const DESCR: &'static str;
    const SIZE: usize;

    fn write_le(self, out: &mut Vec<u8>);
    fn read_le(bytes: &[u8]) -> Self;
}

impl NpyElement for f32 {
    const DESCR: &'static str = "<f4";
    const SIZE: usize = 4;

    fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn read_le(bytes: &[u8]) -> Self {
        f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

impl NpyElement for u8 {
    const DESCR: &'static str = "|u1";
    const SIZE: usize = 1;

    fn write_le(self, out: &mut Vec<u8>) {
        out.push(self);
    }

    fn read_le(bytes: &[u8]) -> Self {
        bytes[0]
    }
}

/// Header for a C-order 2-D array of `T`.
fn header<T: NpyElement>(height: usize, width: usize) -> Vec<u8> {
    let dict = format!(
        "{{'descr': '{}', 'fortran_order': False, 'shape': ({}, {}), }}",
        T::DESCR,
        height,
        width
    );
    let unpadded = PREAMBLE_LEN + dict.len() + 1;
    let pad = (ALIGNMENT - unpadded % ALIGNMENT) % ALIGNMENT;

    let mut header = dict.into_bytes();
    header.extend(std::iter::repeat(b' ').take(pad));
    header.push(b'\n');
    header
}

/// Write a grid as a 2-D `.npy` array.
pub fn write_npy<T: NpyElement>(path: &Path, grid: &Grid<T>) -> StorageResult<()> {
    let (height, width) = grid.shape();
    let header = header::<T>(height, width);
    let header_len = u16::try_from(header.len())
        .map_err(|_| StorageError::InvalidArray("npy header too long".to_string()))?;

    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(1024 * 1024, file);
    writer.write_all(MAGIC)?;
    writer.write_all(&[1, 0])?;
    writer.write_all(&header_len.to_le_bytes())?;
    writer.write_all(&header)?;

    // Row at a time keeps the staging buffer small
    let mut buf = Vec::with_capacity(width * T::SIZE);
    for row in grid.as_slice().chunks(width.max(1)) {
        buf.clear();
        for &v in row {
            v.write_le(&mut buf);
        }
        writer.write_all(&buf)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a 2-D `.npy` array written by [`write_npy`].
pub fn read_npy<T: NpyElement>(path: &Path) -> StorageResult<Grid<T>> {
    let mut reader = BufReader::new(File::open(path)?);

    let mut preamble = [0u8; PREAMBLE_LEN];
    reader.read_exact(&mut preamble)?;
    if &preamble[..6] != MAGIC || preamble[6] != 1 {
        return Err(StorageError::InvalidArray(format!(
            "{} is not a version 1 npy file",
            path.display()
        )));
    }
    let header_len = u16::from_le_bytes([preamble[8], preamble[9]]) as usize;
    let mut header = vec![0u8; header_len];
    reader.read_exact(&mut header)?;
    let header = String::from_utf8_lossy(&header);

    let descr_tag = format!("'descr': '{}'", T::DESCR);
    if !header.contains(&descr_tag) {
        return Err(StorageError::InvalidArray(format!(
            "expected dtype {}, header was {}",
            T::DESCR,
            header.trim()
        )));
    }
    if !header.contains("'fortran_order': False") {
        return Err(StorageError::InvalidArray(
            "Fortran-ordered arrays are not supported".to_string(),
        ));
    }
    let (height, width) = parse_shape(&header)
        .ok_or_else(|| StorageError::InvalidArray(format!("bad shape in {}", header.trim())))?;

    let mut raw = vec![0u8; height * width * T::SIZE];
    reader.read_exact(&mut raw)?;
    let data: Vec<T> = raw.chunks_exact(T::SIZE).map(T::read_le).collect();

    Grid::from_vec(height, width, data).map_err(|e| StorageError::InvalidArray(e.to_string()))
}

/// Extract `(h, w)` from `'shape': (h, w)`.
fn parse_shape(header: &str) -> Option<(usize, usize)> {
    let start = header.find("'shape':")? + "'shape':".len();
    let rest = header[start..].trim_start().strip_prefix('(')?;
    let end = rest.find(')')?;
    let dims: Vec<usize> = rest[..end]
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().ok())
        .collect::<Option<Vec<_>>>()?;
    match dims.as_slice() {
        [h, w] => Some((*h, *w)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_alignment() {
        let h = header::<f32>(2805, 2816);
        assert_eq!((PREAMBLE_LEN + h.len()) % ALIGNMENT, 0);
        assert_eq!(h.last(), Some(&b'\n'));
        let text = String::from_utf8(h).unwrap();
        assert!(text.starts_with("{'descr': '<f4', 'fortran_order': False, 'shape': (2805, 2816), }"));
    }

    #[test]
    fn test_f32_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bt.npy");
        let grid = Grid::from_vec(2, 3, vec![200.0f32, f32::NAN, 210.5, 220.0, 230.0, 240.0]).unwrap();
        write_npy(&path, &grid).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..6], MAGIC);
        assert_eq!(&bytes[6..8], &[1, 0]);
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        assert_eq!(bytes.len(), PREAMBLE_LEN + header_len + 6 * 4);
        assert_eq!(&bytes[PREAMBLE_LEN + header_len..][..4], &200.0f32.to_le_bytes());

        let back: Grid<f32> = read_npy(&path).unwrap();
        assert_eq!(back.shape(), (2, 3));
        assert!(back.as_slice()[1].is_nan());
        assert_eq!(back.as_slice()[5], 240.0);
    }

    #[test]
    fn test_u8_mask() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.npy");
        let grid = Grid::from_vec(1, 4, vec![0u8, 1, 1, 0]).unwrap();
        write_npy(&path, &grid).unwrap();

        let back: Grid<u8> = read_npy(&path).unwrap();
        assert_eq!(back, grid);
    }

    #[test]
    fn test_dtype_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.npy");
        write_npy(&path, &Grid::filled(2, 2, 1u8)).unwrap();
        assert!(matches!(
            read_npy::<f32>(&path),
            Err(StorageError::InvalidArray(_))
        ));
    }

    #[test]
    fn test_parse_shape() {
        assert_eq!(parse_shape("{'shape': (3, 4), }"), Some((3, 4)));
        assert_eq!(parse_shape("{'shape': (3,), }"), None);
    }
}
