//! Primary data array decoding.
//!
//! The header supplies the shape (NAXIS, NAXISn), the sample type (BITPIX)
//! and the zero point (BZERO); the data blocks that follow the header are
//! read, stripped of their padding, and converted to host-order samples.

use std::io::{Read, Seek};

use log::debug;

use crate::block::{blocks_needed, BlockReader};
use crate::endian::{decode_samples_in_place, widen_be_with_offset};
use crate::error::{Error, Result};
use crate::header::FitsHeader;
use crate::value::Value;

const VALID_BITPIX: [i64; 6] = [8, 16, 32, 64, -32, -64];

/// In-memory representation of one decoded sample.
///
/// Unsigned 16/32/64-bit and signed 8-bit formats arise from the standard
/// BZERO offsets. Any other integer BZERO widens the samples to `I64`, with
/// the zero point added to each one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    U8,
    I8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl SampleFormat {
    /// Choose the format for a BITPIX and BZERO pair.
    ///
    /// Integer data with a non-standard zero point is stored as `I64`; a
    /// 64-bit zero point outside the `i64` range is unsupported.
    pub fn for_encoding(bitpix: i64, zero_point: i128) -> Result<Self> {
        let format = match (bitpix, zero_point) {
            (8, 0) => SampleFormat::U8,
            (8, -128) => SampleFormat::I8,
            (16, 0) => SampleFormat::I16,
            (16, 32_768) => SampleFormat::U16,
            (32, 0) => SampleFormat::I32,
            (32, 2_147_483_648) => SampleFormat::U32,
            (64, 0) => SampleFormat::I64,
            (64, z) if z == 1i128 << 63 => SampleFormat::U64,
            (-32, 0) => SampleFormat::F32,
            (-64, 0) => SampleFormat::F64,
            (-32 | -64, _) => {
                return Err(Error::UnsupportedEncoding(
                    "BZERO on floating-point data is not applied",
                ))
            }
            (8 | 16 | 32 | 64, z) if i64::try_from(z).is_ok() => SampleFormat::I64,
            (b, _) if VALID_BITPIX.contains(&b) => {
                return Err(Error::UnsupportedEncoding(
                    "BZERO does not map onto a native sample type",
                ))
            }
            (b, _) => return Err(Error::InvalidBitpix(b)),
        };
        Ok(format)
    }

    /// Size of one sample in bytes.
    pub const fn bytes(self) -> usize {
        match self {
            SampleFormat::U8 | SampleFormat::I8 => 1,
            SampleFormat::I16 | SampleFormat::U16 => 2,
            SampleFormat::I32 | SampleFormat::U32 | SampleFormat::F32 => 4,
            SampleFormat::I64 | SampleFormat::U64 | SampleFormat::F64 => 8,
        }
    }

    pub const fn is_floating_point(self) -> bool {
        matches!(self, SampleFormat::F32 | SampleFormat::F64)
    }

    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            SampleFormat::I8
                | SampleFormat::I16
                | SampleFormat::I32
                | SampleFormat::I64
                | SampleFormat::F32
                | SampleFormat::F64
        )
    }
}

/// Shape and encoding of a data array, derived from its header.
#[derive(Debug, Clone, PartialEq)]
pub struct DataShape {
    /// BITPIX value (8, 16, 32, 64, -32, -64).
    pub bitpix: i64,
    /// Axis lengths (NAXIS1, NAXIS2, ...); axis 1 varies fastest.
    pub axis_lengths: Vec<usize>,
    /// BZERO, or 0 if absent.
    pub zero_point: i128,
    /// How decoded samples are laid out in memory.
    pub format: SampleFormat,
}

fn required_integer(header: &FitsHeader, keyword: &str) -> Result<i64> {
    header
        .integer(keyword)
        .ok_or_else(|| Error::MissingRequiredKeyword(String::from(keyword)))
}

fn required_length(header: &FitsHeader, keyword: &str) -> Result<usize> {
    let value = required_integer(header, keyword)?;
    usize::try_from(value).map_err(|_| Error::MissingRequiredKeyword(String::from(keyword)))
}

/// BZERO as an exact integer. Integral floats are accepted because 2^63
/// does not fit an `i64` literal.
fn zero_point(header: &FitsHeader) -> Result<i128> {
    match header.value("BZERO") {
        None => Ok(0),
        Some(Value::Integer(n)) => Ok(i128::from(*n)),
        Some(Value::Float(f)) if f.fract() == 0.0 && f.abs() < 1e30 => Ok(*f as i128),
        Some(_) => Err(Error::UnsupportedEncoding("BZERO is not an integer")),
    }
}

fn check_unit_scale(header: &FitsHeader) -> Result<()> {
    match header.record("BSCALE").map(|r| r.value.as_ref()) {
        None => Ok(()),
        Some(Some(v)) if v.as_f64() == Some(1.0) => Ok(()),
        Some(_) => Err(Error::UnsupportedEncoding("BSCALE other than 1 is not applied")),
    }
}

impl DataShape {
    /// Derive the data shape from a primary header.
    ///
    /// Requires exactly one integer BITPIX, a non-negative integer NAXIS,
    /// and a non-negative integer NAXISn for every axis. A zero-length axis
    /// is legal and yields an empty array.
    pub fn from_header(header: &FitsHeader) -> Result<Self> {
        let mut bitpix_records = header.iter().filter(|r| r.name == "BITPIX");
        let bitpix_record = bitpix_records
            .next()
            .ok_or_else(|| Error::MissingRequiredKeyword(String::from("BITPIX")))?;
        if bitpix_records.next().is_some() {
            return Err(Error::MalformedHeader("duplicate BITPIX keyword"));
        }
        let bitpix = bitpix_record
            .int_value()
            .ok_or_else(|| Error::MissingRequiredKeyword(String::from("BITPIX")))?;
        if !VALID_BITPIX.contains(&bitpix) {
            return Err(Error::InvalidBitpix(bitpix));
        }

        let naxis = required_length(header, "NAXIS")?;
        let mut axis_lengths = Vec::with_capacity(naxis.min(999));
        for i in 1..=naxis {
            axis_lengths.push(required_length(header, &format!("NAXIS{i}"))?);
        }

        check_unit_scale(header)?;
        let zero_point = zero_point(header)?;
        let format = SampleFormat::for_encoding(bitpix, zero_point)?;

        Ok(DataShape {
            bitpix,
            axis_lengths,
            zero_point,
            format,
        })
    }

    pub fn bytes_per_sample(&self) -> usize {
        (self.bitpix.unsigned_abs() / 8) as usize
    }

    /// Number of samples; 0 when there are no axes.
    pub fn sample_count(&self) -> Result<usize> {
        if self.axis_lengths.is_empty() {
            return Ok(0);
        }
        self.axis_lengths
            .iter()
            .try_fold(1usize, |acc, &len| acc.checked_mul(len))
            .ok_or(Error::MalformedHeader("data size overflows"))
    }

    /// Compute the number of data bytes: `|BITPIX/8| * NAXIS1 * ... * NAXISn`.
    pub fn byte_count(&self) -> Result<usize> {
        self.sample_count()?
            .checked_mul(self.bytes_per_sample())
            .ok_or(Error::MalformedHeader("data size overflows"))
    }

    /// True when each sample is widened to `i64` and offset by the zero
    /// point, rather than decoded at its stored width.
    pub fn widens_samples(&self) -> bool {
        self.format == SampleFormat::I64 && self.zero_point != 0
    }

    /// Number of bytes the decoded samples occupy in memory. Equal to
    /// [`byte_count`](Self::byte_count) unless the samples are widened.
    pub fn decoded_byte_count(&self) -> Result<usize> {
        self.sample_count()?
            .checked_mul(self.format.bytes())
            .ok_or(Error::MalformedHeader("data size overflows"))
    }

    /// Number of whole blocks the data occupies on disk.
    pub fn block_count(&self) -> Result<usize> {
        Ok(blocks_needed(self.byte_count()?))
    }

    /// Index of the block after this data array, where the next HDU starts.
    pub fn next_hdu_block(&self, first_data_block: usize) -> Result<usize> {
        first_data_block
            .checked_add(self.block_count()?)
            .ok_or(Error::MalformedHeader("data size overflows"))
    }
}

/// A decoded, immutable data array.
///
/// Samples are stored as host-order bytes in FITS order: axis 1 varies
/// fastest. See the `pixel` module for addressed access.
#[derive(Debug, Clone, PartialEq)]
pub struct FitsData {
    pub(crate) bitpix: i64,
    pub(crate) format: SampleFormat,
    pub(crate) axis_lengths: Vec<usize>,
    pub(crate) zero_point: i128,
    pub(crate) strides: Vec<usize>,
    pub(crate) bytes: Vec<u8>,
    pub(crate) range: Option<(f64, f64)>,
}

impl FitsData {
    /// Build a data array from host-order sample bytes.
    ///
    /// `bytes` must hold exactly the number of decoded bytes `shape` declares.
    pub fn from_native_bytes(shape: DataShape, bytes: Vec<u8>) -> Result<Self> {
        let expected = shape.decoded_byte_count()?;
        if bytes.len() != expected {
            return Err(Error::SizeMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        let strides = crate::pixel::strides(shape.format.bytes(), &shape.axis_lengths);
        let mut data = FitsData {
            bitpix: shape.bitpix,
            format: shape.format,
            axis_lengths: shape.axis_lengths,
            zero_point: shape.zero_point,
            strides,
            bytes,
            range: None,
        };
        data.range = data.compute_range();
        Ok(data)
    }

    /// Bits per stored sample, without the floating-point sign of BITPIX.
    pub fn bits_per_sample(&self) -> usize {
        self.bitpix.unsigned_abs() as usize
    }

    pub fn bitpix(&self) -> i64 {
        self.bitpix
    }

    pub fn is_floating_point(&self) -> bool {
        self.bitpix < 0
    }

    pub fn format(&self) -> SampleFormat {
        self.format
    }

    pub fn number_of_axes(&self) -> usize {
        self.axis_lengths.len()
    }

    pub fn axis_lengths(&self) -> &[usize] {
        &self.axis_lengths
    }

    pub fn zero_point(&self) -> i128 {
        self.zero_point
    }

    /// Host-order sample bytes, axis 1 fastest.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.bytes.len() / self.format.bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The size of the data in bits.
    pub fn size_in_bits(&self) -> usize {
        self.bytes.len() * 8
    }
}

/// Read and decode the data array described by `shape`, starting at
/// `first_data_block`.
///
/// Exactly `ceil(bytes / 2880)` blocks are read; the padding in the final
/// block is discarded.
pub fn decode_data<R: Read + Seek>(
    shape: DataShape,
    reader: &mut BlockReader<R>,
    first_data_block: usize,
) -> Result<FitsData> {
    let total = shape.byte_count()?;
    let mut bytes = reader.read_blocks(first_data_block, blocks_needed(total))?;
    bytes.truncate(total);
    if shape.widens_samples() {
        let zero_point = i64::try_from(shape.zero_point)
            .map_err(|_| Error::UnsupportedEncoding("BZERO is outside the i64 range"))?;
        bytes = widen_be_with_offset(&bytes, shape.bytes_per_sample(), zero_point).ok_or(
            Error::UnsupportedEncoding("sample plus BZERO does not fit an i64"),
        )?;
    } else {
        decode_samples_in_place(&mut bytes, shape.format);
    }

    let data = FitsData::from_native_bytes(shape, bytes)?;
    debug!(
        "decoded {:?} data {:?} from block {first_data_block}, range {:?}",
        data.format, data.axis_lengths, data.range
    );
    Ok(data)
}

/// Decode the primary data array that follows `header`.
pub fn decode_primary_data<R: Read + Seek>(
    header: &FitsHeader,
    reader: &mut BlockReader<R>,
    first_data_block: usize,
) -> Result<FitsData> {
    let shape = DataShape::from_header(header)?;
    decode_data(shape, reader, first_data_block)
}
