//! RAW heightmap decoding.
//!
//! A RAW heightmap is a flat, row-major stream of unsigned samples with no
//! header: one byte per sample at 8 bits, two bytes at 16 bits in either byte
//! order. GIS exports usually put the origin at the top row, hence the
//! optional vertical flip.

use serde::{Deserialize, Serialize};

use crate::error::{TerrainError, TerrainResult};

/// Byte order of 16-bit samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

/// Layout of a RAW sample stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawHeightmapFormat {
    /// Samples per row.
    pub width: usize,
    /// Number of rows.
    pub height: usize,
    /// Bits per sample, 8 or 16.
    pub bit_depth: u32,
    pub byte_order: ByteOrder,
    /// Input row `y` lands in output row `height - 1 - y`.
    pub flip_vertically: bool,
}

impl RawHeightmapFormat {
    /// Square `n`×`n` heightmap.
    pub fn square(n: usize, bit_depth: u32, byte_order: ByteOrder, flip_vertically: bool) -> Self {
        Self {
            width: n,
            height: n,
            bit_depth,
            byte_order,
            flip_vertically,
        }
    }

    fn bytes_per_sample(&self) -> TerrainResult<usize> {
        if self.width == 0 || self.height == 0 {
            return Err(TerrainError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        match self.bit_depth {
            8 => Ok(1),
            16 => Ok(2),
            other => Err(TerrainError::UnsupportedBitDepth(other)),
        }
    }

    /// Bytes the stream must hold at minimum. Saturates at `usize::MAX` for
    /// dimensions no buffer could hold.
    pub fn expected_len(&self) -> TerrainResult<usize> {
        let bytes_per_sample = self.bytes_per_sample()?;
        Ok(self
            .width
            .checked_mul(self.height)
            .and_then(|n| n.checked_mul(bytes_per_sample))
            .unwrap_or(usize::MAX))
    }
}

/// Grid of normalized heights in `[0, 1]`, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightGrid {
    width: usize,
    height: usize,
    samples: Vec<f32>,
    min: f32,
    max: f32,
}

impl HeightGrid {
    /// Build a grid from row-major samples. Returns `None` if the sample
    /// count does not match the dimensions.
    ///
    /// Samples are clamped to `[0, 1]`; non-finite samples become 0.
    pub fn from_samples(width: usize, height: usize, mut samples: Vec<f32>) -> Option<Self> {
        if width == 0 || height == 0 || width.checked_mul(height) != Some(samples.len()) {
            return None;
        }
        for v in &mut samples {
            *v = if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        }
        let (min, max) = observed_range(&samples);
        Some(Self {
            width,
            height,
            samples,
            min,
            max,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Smallest observed sample (0 if it could not be computed).
    pub fn min(&self) -> f32 {
        self.min
    }

    /// Largest observed sample (1 if it could not be computed).
    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.samples[y * self.width + x]
    }

    pub fn row(&self, y: usize) -> &[f32] {
        &self.samples[y * self.width..(y + 1) * self.width]
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn is_square(&self) -> bool {
        self.width == self.height
    }
}

fn observed_range(samples: &[f32]) -> (f32, f32) {
    let mut min = f32::MAX;
    let mut max = f32::MIN;
    for &v in samples {
        min = min.min(v);
        max = max.max(v);
    }
    let min = if min.is_finite() && min != f32::MAX { min } else { 0.0 };
    let max = if max.is_finite() && max != f32::MIN { max } else { 1.0 };
    (min, max)
}

/// Decode a RAW sample stream into a normalized height grid.
///
/// Trailing bytes beyond the grid are ignored.
pub fn decode_raw(bytes: &[u8], format: &RawHeightmapFormat) -> TerrainResult<HeightGrid> {
    let bytes_per_sample = format.bytes_per_sample()?;
    let expected = format.expected_len()?;
    if bytes.len() < expected {
        return Err(TerrainError::TruncatedInput {
            expected,
            actual: bytes.len(),
        });
    }

    let (w, h) = (format.width, format.height);
    let mut samples = vec![0.0f32; w * h];

    for (input_row, chunk) in bytes[..expected].chunks_exact(w * bytes_per_sample).enumerate() {
        let target_row = if format.flip_vertically {
            h - 1 - input_row
        } else {
            input_row
        };
        let out = &mut samples[target_row * w..(target_row + 1) * w];
        match format.bit_depth {
            8 => {
                for (dst, &b) in out.iter_mut().zip(chunk) {
                    *dst = b as f32 / 255.0;
                }
            }
            _ => {
                for (dst, pair) in out.iter_mut().zip(chunk.chunks_exact(2)) {
                    let raw = [pair[0], pair[1]];
                    let value = match format.byte_order {
                        ByteOrder::Little => u16::from_le_bytes(raw),
                        ByteOrder::Big => u16::from_be_bytes(raw),
                    };
                    *dst = value as f32 / 65535.0;
                }
            }
        }
    }

    let (min, max) = observed_range(&samples);
    log::debug!(
        "Decoded {}x{} {}-bit heightmap (range {:.4}..{:.4})",
        w,
        h,
        format.bit_depth,
        min,
        max
    );

    Ok(HeightGrid {
        width: w,
        height: h,
        samples,
        min,
        max,
    })
}

/// Encode a height grid back into a RAW stream, rounding each sample to the
/// nearest quantization step. Inverse of [`decode_raw`] for the same format.
pub fn encode_raw(grid: &HeightGrid, format: &RawHeightmapFormat) -> TerrainResult<Vec<u8>> {
    let expected = format.expected_len()?;
    if grid.width != format.width || grid.height != format.height {
        return Err(TerrainError::InvalidDimensions {
            width: grid.width,
            height: grid.height,
        });
    }

    let mut out = Vec::with_capacity(expected);
    for input_row in 0..grid.height {
        let grid_row = if format.flip_vertically {
            grid.height - 1 - input_row
        } else {
            input_row
        };
        for &v in grid.row(grid_row) {
            let v = if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
            match format.bit_depth {
                8 => out.push((v * 255.0).round() as u8),
                _ => {
                    let q = (v * 65535.0).round() as u16;
                    match format.byte_order {
                        ByteOrder::Little => out.extend_from_slice(&q.to_le_bytes()),
                        ByteOrder::Big => out.extend_from_slice(&q.to_be_bytes()),
                    }
                }
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};

    fn be16(values: &[u16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_be_bytes()).collect()
    }

    #[test]
    fn sixteen_bit_big_endian_without_flip() {
        let bytes = be16(&[
            0x0000, 0xFFFF, 0x8000, //
            0x4000, 0x0000, 0xFFFF, //
            0xFFFF, 0x8000, 0x0000,
        ]);
        let format = RawHeightmapFormat::square(3, 16, ByteOrder::Big, false);
        let grid = decode_raw(&bytes, &format).unwrap();

        let row0 = grid.row(0);
        assert_eq!(row0[0], 0.0);
        assert_eq!(row0[1], 1.0);
        assert!((row0[2] - 32768.0 / 65535.0).abs() < 1e-7);
        assert!(row0[2] > 0.5 && row0[2] < 0.5001);
        assert!((grid.get(0, 1) - 16384.0 / 65535.0).abs() < 1e-7);
        assert_eq!(grid.min(), 0.0);
        assert_eq!(grid.max(), 1.0);
    }

    #[test]
    fn little_endian_reads_low_byte_first() {
        let bytes = vec![0x00, 0x80];
        let format = RawHeightmapFormat::square(1, 16, ByteOrder::Little, false);
        let grid = decode_raw(&bytes, &format).unwrap();
        assert!((grid.get(0, 0) - 32768.0 / 65535.0).abs() < 1e-7);
    }

    #[test]
    fn flip_moves_first_input_row_to_last() {
        let bytes = vec![0, 0, 255, 255];
        let format = RawHeightmapFormat::square(2, 8, ByteOrder::Little, true);
        let grid = decode_raw(&bytes, &format).unwrap();
        assert_eq!(grid.row(0), &[1.0, 1.0]);
        assert_eq!(grid.row(1), &[0.0, 0.0]);
    }

    #[test]
    fn rejects_zero_dimension() {
        let format = RawHeightmapFormat::square(0, 8, ByteOrder::Little, false);
        assert_eq!(
            decode_raw(&[], &format),
            Err(TerrainError::InvalidDimensions { width: 0, height: 0 })
        );
    }

    #[test]
    fn rejects_unsupported_depth() {
        let format = RawHeightmapFormat::square(2, 32, ByteOrder::Little, false);
        assert_eq!(
            decode_raw(&[0; 16], &format),
            Err(TerrainError::UnsupportedBitDepth(32))
        );
    }

    #[test]
    fn rejects_truncated_buffer() {
        let format = RawHeightmapFormat::square(4, 16, ByteOrder::Little, false);
        assert_eq!(
            decode_raw(&[0; 31], &format),
            Err(TerrainError::TruncatedInput {
                expected: 32,
                actual: 31
            })
        );
    }

    #[test]
    fn oversized_dimensions_report_truncation() {
        let format = RawHeightmapFormat::square(1usize << 32, 16, ByteOrder::Little, false);
        assert_eq!(format.expected_len(), Ok(usize::MAX));
        assert_eq!(
            decode_raw(&[0; 8], &format),
            Err(TerrainError::TruncatedInput {
                expected: usize::MAX,
                actual: 8
            })
        );
    }

    #[test]
    fn from_samples_clamps_out_of_range_values() {
        let grid = HeightGrid::from_samples(2, 2, vec![-0.5, 2.0, f32::NAN, 0.25]).unwrap();
        assert_eq!(grid.samples(), &[0.0, 1.0, 0.0, 0.25]);
        assert_eq!((grid.min(), grid.max()), (0.0, 1.0));
        assert!(HeightGrid::from_samples(usize::MAX, 2, Vec::new()).is_none());
    }

    #[test]
    fn flat_buffer_still_yields_valid_grid() {
        let format = RawHeightmapFormat::square(3, 8, ByteOrder::Little, true);
        let grid = decode_raw(&[255; 9], &format).unwrap();
        assert!(grid.samples().iter().all(|&v| v == 1.0));
        assert_eq!((grid.min(), grid.max()), (1.0, 1.0));
    }

    #[test]
    fn decode_encode_round_trips_within_one_step() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        for &depth in &[8u32, 16] {
            for &order in &[ByteOrder::Little, ByteOrder::Big] {
                for &flip in &[false, true] {
                    let n = rng.gen_range(1..12);
                    let format = RawHeightmapFormat::square(n, depth, order, flip);
                    let len = format.expected_len().unwrap();
                    let bytes: Vec<u8> = (0..len).map(|_| rng.gen()).collect();

                    let grid = decode_raw(&bytes, &format).unwrap();
                    let encoded = encode_raw(&grid, &format).unwrap();
                    let again = decode_raw(&encoded, &format).unwrap();

                    let step = if depth == 8 { 1.0 / 255.0 } else { 1.0 / 65535.0 };
                    for (a, b) in grid.samples().iter().zip(again.samples()) {
                        assert!((a - b).abs() <= step, "{depth}-bit {order:?} flip={flip}");
                    }
                    assert_eq!(encoded, bytes);
                }
            }
        }
    }
}
