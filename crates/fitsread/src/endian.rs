//! Big-endian to host-order conversion for FITS data.
//!
//! FITS stores all binary data in big-endian (most-significant byte first)
//! format. Decoded arrays keep their samples as host-order bytes, so the
//! conversion happens once, in place, right after the blocks are read.
//!
//! Integer data written with the standard unsigned (or, for BITPIX 8,
//! signed) BZERO offset is remapped during the same pass: adding
//! 2^(n-1) to an n-bit two's-complement value yields the same bits as
//! flipping its most-significant bit. Any other integer zero point widens
//! each sample to `i64` before it is added.

use crate::data::SampleFormat;

/// Flip the sign bit of each big-endian `width`-byte value in place.
fn flip_sign_be(buf: &mut [u8], width: usize) {
    for chunk in buf.chunks_exact_mut(width) {
        chunk[0] ^= 0x80;
    }
}

/// Reverse each `width`-byte value in place when the host is little-endian.
/// On big-endian hosts this is a no-op.
fn be_to_native(buf: &mut [u8], width: usize) {
    if cfg!(target_endian = "little") && width > 1 {
        for chunk in buf.chunks_exact_mut(width) {
            chunk.reverse();
        }
    }
}

/// Convert a buffer of big-endian `i16` values to native endianness in place.
///
/// # Panics
/// Panics if `buf.len()` is not a multiple of 2.
pub fn buf_i16_be_to_native(buf: &mut [u8]) {
    assert!(
        buf.len().is_multiple_of(2),
        "buffer length must be a multiple of 2"
    );
    be_to_native(buf, 2);
}

/// Convert big-endian `i16` values stored with BZERO = 32768 to native `u16`.
///
/// # Panics
/// Panics if `buf.len()` is not a multiple of 2.
pub fn buf_offset_i16_be_to_native_u16(buf: &mut [u8]) {
    assert!(
        buf.len().is_multiple_of(2),
        "buffer length must be a multiple of 2"
    );
    flip_sign_be(buf, 2);
    be_to_native(buf, 2);
}

/// Convert a buffer of big-endian 4-byte values (`i32` or `f32`) to native
/// endianness in place.
///
/// # Panics
/// Panics if `buf.len()` is not a multiple of 4.
pub fn buf_32_be_to_native(buf: &mut [u8]) {
    assert!(
        buf.len().is_multiple_of(4),
        "buffer length must be a multiple of 4"
    );
    be_to_native(buf, 4);
}

/// Convert big-endian `i32` values stored with BZERO = 2^31 to native `u32`.
///
/// # Panics
/// Panics if `buf.len()` is not a multiple of 4.
pub fn buf_offset_i32_be_to_native_u32(buf: &mut [u8]) {
    assert!(
        buf.len().is_multiple_of(4),
        "buffer length must be a multiple of 4"
    );
    flip_sign_be(buf, 4);
    be_to_native(buf, 4);
}

/// Convert a buffer of big-endian 8-byte values (`i64` or `f64`) to native
/// endianness in place.
///
/// # Panics
/// Panics if `buf.len()` is not a multiple of 8.
pub fn buf_64_be_to_native(buf: &mut [u8]) {
    assert!(
        buf.len().is_multiple_of(8),
        "buffer length must be a multiple of 8"
    );
    be_to_native(buf, 8);
}

/// Convert big-endian `i64` values stored with BZERO = 2^63 to native `u64`.
///
/// # Panics
/// Panics if `buf.len()` is not a multiple of 8.
pub fn buf_offset_i64_be_to_native_u64(buf: &mut [u8]) {
    assert!(
        buf.len().is_multiple_of(8),
        "buffer length must be a multiple of 8"
    );
    flip_sign_be(buf, 8);
    be_to_native(buf, 8);
}

/// Convert unsigned bytes stored with BZERO = -128 to `i8`.
pub fn buf_offset_u8_to_i8(buf: &mut [u8]) {
    flip_sign_be(buf, 1);
}

/// Convert raw on-disk samples to host-order samples of `format`, applying
/// the zero point that `format` implies.
pub fn decode_samples_in_place(buf: &mut [u8], format: SampleFormat) {
    match format {
        SampleFormat::U8 => {}
        SampleFormat::I8 => buf_offset_u8_to_i8(buf),
        SampleFormat::I16 => buf_i16_be_to_native(buf),
        SampleFormat::U16 => buf_offset_i16_be_to_native_u16(buf),
        SampleFormat::I32 | SampleFormat::F32 => buf_32_be_to_native(buf),
        SampleFormat::U32 => buf_offset_i32_be_to_native_u32(buf),
        SampleFormat::I64 | SampleFormat::F64 => buf_64_be_to_native(buf),
        SampleFormat::U64 => buf_offset_i64_be_to_native_u64(buf),
    }
}

/// Widen big-endian integer samples of `width` bytes to host-order `i64`,
/// adding `zero_point` to each.
///
/// 8-bit samples are unsigned, wider ones two's complement. Returns `None`
/// if a sum does not fit an `i64` or `width` is not 1, 2, 4 or 8.
pub fn widen_be_with_offset(buf: &[u8], width: usize, zero_point: i64) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(buf.len() / width.max(1) * 8);
    for chunk in buf.chunks_exact(width) {
        let stored = match width {
            1 => i64::from(chunk[0]),
            2 => i64::from(i16::from_be_bytes(<[u8; 2]>::try_from(chunk).ok()?)),
            4 => i64::from(i32::from_be_bytes(<[u8; 4]>::try_from(chunk).ok()?)),
            8 => i64::from_be_bytes(<[u8; 8]>::try_from(chunk).ok()?),
            _ => return None,
        };
        out.extend_from_slice(&stored.checked_add(zero_point)?.to_ne_bytes());
    }
    Some(out)
}
