//! Addressed access to decoded samples.
//!
//! FITS arrays are stored with axis 1 varying fastest (Fortran order), so
//! for a 2-D image index `[x, y]` addresses column `x` of row `y`.

use bytemuck::pod_collect_to_vec;

use crate::data::{FitsData, SampleFormat};
use crate::error::{Error, Result};

/// One decoded sample, typed by the array's [`SampleFormat`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    U8(u8),
    I8(i8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
}

impl Sample {
    /// Decode one host-order sample from the front of `bytes`.
    ///
    /// # Panics
    /// Panics if `bytes` is shorter than `format.bytes()`.
    pub fn from_ne_bytes(format: SampleFormat, bytes: &[u8]) -> Sample {
        fn take<const N: usize>(bytes: &[u8]) -> [u8; N] {
            let mut out = [0u8; N];
            out.copy_from_slice(&bytes[..N]);
            out
        }
        match format {
            SampleFormat::U8 => Sample::U8(bytes[0]),
            SampleFormat::I8 => Sample::I8(i8::from_ne_bytes(take(bytes))),
            SampleFormat::I16 => Sample::I16(i16::from_ne_bytes(take(bytes))),
            SampleFormat::U16 => Sample::U16(u16::from_ne_bytes(take(bytes))),
            SampleFormat::I32 => Sample::I32(i32::from_ne_bytes(take(bytes))),
            SampleFormat::U32 => Sample::U32(u32::from_ne_bytes(take(bytes))),
            SampleFormat::I64 => Sample::I64(i64::from_ne_bytes(take(bytes))),
            SampleFormat::U64 => Sample::U64(u64::from_ne_bytes(take(bytes))),
            SampleFormat::F32 => Sample::F32(f32::from_ne_bytes(take(bytes))),
            SampleFormat::F64 => Sample::F64(f64::from_ne_bytes(take(bytes))),
        }
    }

    /// The sample as `f64` (64-bit integers may lose precision).
    pub fn as_f64(self) -> f64 {
        match self {
            Sample::U8(v) => v as f64,
            Sample::I8(v) => v as f64,
            Sample::I16(v) => v as f64,
            Sample::U16(v) => v as f64,
            Sample::I32(v) => v as f64,
            Sample::U32(v) => v as f64,
            Sample::I64(v) => v as f64,
            Sample::U64(v) => v as f64,
            Sample::F32(v) => v as f64,
            Sample::F64(v) => v,
        }
    }

    /// The exact integer value, or `None` for floating-point samples.
    pub fn as_integer(self) -> Option<i128> {
        match self {
            Sample::U8(v) => Some(v.into()),
            Sample::I8(v) => Some(v.into()),
            Sample::I16(v) => Some(v.into()),
            Sample::U16(v) => Some(v.into()),
            Sample::I32(v) => Some(v.into()),
            Sample::U32(v) => Some(v.into()),
            Sample::I64(v) => Some(v.into()),
            Sample::U64(v) => Some(v.into()),
            Sample::F32(_) | Sample::F64(_) => None,
        }
    }
}

/// Owned, typed copy of every sample of an array.
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    U8(Vec<u8>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    I64(Vec<i64>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

/// Byte strides per axis: axis 1 has stride `bytes_per_sample`, axis k has
/// stride `bytes_per_sample * NAXIS1 * ... * NAXIS(k-1)`.
pub(crate) fn strides(bytes_per_sample: usize, axis_lengths: &[usize]) -> Vec<usize> {
    let mut stride = bytes_per_sample;
    axis_lengths
        .iter()
        .map(|&len| {
            let current = stride;
            stride = stride.saturating_mul(len);
            current
        })
        .collect()
}

/// A 2-D grayscale view of a decoded image for a bitmap renderer.
///
/// Rows are laid out as decoded: row `y` holds `width` samples in
/// increasing `x`, rows in increasing `y`. Sample bytes are host order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrayRaster<'a> {
    pub width: usize,
    pub height: usize,
    pub bits_per_component: usize,
    pub bytes_per_row: usize,
    pub is_floating_point: bool,
    pub data: &'a [u8],
}

impl<'a> GrayRaster<'a> {
    /// The bytes of scan line `y`.
    pub fn row(&self, y: usize) -> Option<&'a [u8]> {
        let start = y.checked_mul(self.bytes_per_row)?;
        let end = start.checked_add(self.bytes_per_row)?;
        self.data.get(start..end)
    }
}

impl FitsData {
    /// Byte strides per axis, axis 1 first.
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Byte offset of the sample at `indices` (axis 1 first).
    ///
    /// Every index is checked against its axis before anything is computed.
    pub fn byte_offset(&self, indices: &[usize]) -> Result<usize> {
        if indices.len() != self.axis_lengths.len() {
            return Err(Error::AxisCountMismatch {
                expected: self.axis_lengths.len(),
                actual: indices.len(),
            });
        }
        for (axis, (&index, &length)) in indices.iter().zip(&self.axis_lengths).enumerate() {
            if index >= length {
                return Err(Error::IndexOutOfRange {
                    axis,
                    index,
                    length,
                });
            }
        }
        // NAXIS = 0: no axes to check, and no data.
        if self.bytes.is_empty() {
            return Err(Error::IndexOutOfRange {
                axis: 0,
                index: 0,
                length: 0,
            });
        }
        Ok(indices
            .iter()
            .zip(&self.strides)
            .map(|(&index, &stride)| index * stride)
            .sum())
    }

    /// The sample at `indices`, one index per axis, axis 1 first.
    pub fn sample_at(&self, indices: &[usize]) -> Result<Sample> {
        let offset = self.byte_offset(indices)?;
        Ok(Sample::from_ne_bytes(self.format, &self.bytes[offset..]))
    }

    /// Iterate over all samples in storage order.
    pub fn iter_samples(&self) -> impl Iterator<Item = Sample> + '_ {
        let format = self.format;
        self.bytes
            .chunks_exact(format.bytes())
            .map(move |chunk| Sample::from_ne_bytes(format, chunk))
    }

    /// Copy all samples into a typed vector.
    pub fn samples(&self) -> Samples {
        let b = self.bytes.as_slice();
        match self.format {
            SampleFormat::U8 => Samples::U8(b.to_vec()),
            SampleFormat::I8 => Samples::I8(pod_collect_to_vec(b)),
            SampleFormat::I16 => Samples::I16(pod_collect_to_vec(b)),
            SampleFormat::U16 => Samples::U16(pod_collect_to_vec(b)),
            SampleFormat::I32 => Samples::I32(pod_collect_to_vec(b)),
            SampleFormat::U32 => Samples::U32(pod_collect_to_vec(b)),
            SampleFormat::I64 => Samples::I64(pod_collect_to_vec(b)),
            SampleFormat::U64 => Samples::U64(pod_collect_to_vec(b)),
            SampleFormat::F32 => Samples::F32(pod_collect_to_vec(b)),
            SampleFormat::F64 => Samples::F64(pod_collect_to_vec(b)),
        }
    }

    /// Smallest and largest sample value, ignoring NaN. `None` when the
    /// array is empty or holds only NaN.
    pub fn sample_range(&self) -> Option<(f64, f64)> {
        self.range
    }

    pub(crate) fn compute_range(&self) -> Option<(f64, f64)> {
        self.iter_samples()
            .map(Sample::as_f64)
            .filter(|v| !v.is_nan())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// View a 2-D array as a grayscale raster: NAXIS1 is the width, NAXIS2
    /// the height.
    pub fn gray_raster(&self) -> Result<GrayRaster<'_>> {
        let &[width, height] = self.axis_lengths.as_slice() else {
            return Err(Error::UnsupportedEncoding("raster view needs a 2-D image"));
        };
        Ok(GrayRaster {
            width,
            height,
            bits_per_component: self.format.bytes() * 8,
            bytes_per_row: width * self.format.bytes(),
            is_floating_point: self.is_floating_point(),
            data: &self.bytes,
        })
    }

    /// Linearly stretch a 2-D image onto 8-bit gray levels, minimum to 0
    /// and maximum to 255. NaN samples map to 0.
    pub fn to_gray8(&self) -> Result<Vec<u8>> {
        self.gray_raster()?;
        let Some((lo, hi)) = self.range else {
            return Ok(vec![0; self.len()]);
        };
        let span = hi - lo;
        Ok(self
            .iter_samples()
            .map(|s| {
                let v = s.as_f64();
                if v.is_nan() || span <= 0.0 {
                    0
                } else {
                    ((v - lo) / span * 255.0).round() as u8
                }
            })
            .collect())
    }

    /// Copy the samples into an `ndarray` array of shape
    /// `[NAXIS1, NAXIS2, ...]`, so that `array[[x, y]]` equals
    /// `sample_at(&[x, y])`.
    #[cfg(feature = "array")]
    pub fn to_array(&self) -> Result<ndarray::ArrayD<f64>> {
        use ndarray::{Array, IxDyn, ShapeBuilder};

        if self.axis_lengths.is_empty() {
            return Ok(Array::zeros(IxDyn(&[0])));
        }
        let values: Vec<f64> = self.iter_samples().map(Sample::as_f64).collect();
        let actual = values.len();
        Array::from_shape_vec(IxDyn(&self.axis_lengths).f(), values).map_err(|_| {
            Error::SizeMismatch {
                expected: self.len(),
                actual,
            }
        })
    }
}
