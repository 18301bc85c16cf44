//! End-to-end decoding of in-memory and on-disk primary HDUs.

use std::io::{Cursor, Write};
use std::sync::{Arc, Barrier};
use std::thread;

use fitsread::{Error, Fits, ReadOptions, Sample, SampleFormat, Value, BLOCK_SIZE};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn card(text: &str) -> Vec<u8> {
    assert!(text.len() <= 80);
    let mut buf = vec![b' '; 80];
    buf[..text.len()].copy_from_slice(text.as_bytes());
    buf
}

/// Header cards padded to whole blocks with spaces.
fn header(cards: &[&str]) -> Vec<u8> {
    let mut out: Vec<u8> = cards.iter().flat_map(|c| card(c)).collect();
    let padded = out.len().div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
    out.resize(padded, b' ');
    out
}

/// Append `data` and zero-pad it to whole blocks.
fn with_data(mut file: Vec<u8>, data: &[u8]) -> Vec<u8> {
    file.extend_from_slice(data);
    let padded = file.len().div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
    file.resize(padded, 0);
    file
}

/// The 4 x 3 unsigned 16-bit image: stored values 0..12 with BZERO = 32768.
fn unsigned_image() -> Vec<u8> {
    let head = header(&[
        "SIMPLE  =                    T",
        "BITPIX  =                   16",
        "NAXIS   =                    2",
        "NAXIS1  =                    4",
        "NAXIS2  =                    3",
        "BZERO   =                32768",
        "BSCALE  =                    1",
        "END",
    ]);
    let data: Vec<u8> = (0i16..12).flat_map(|v| v.to_be_bytes()).collect();
    with_data(head, &data)
}

// ===========================================================================
// Sample decoding
// ===========================================================================

#[test]
fn unsigned_sixteen_bit_image() {
    let fits = Fits::new(Cursor::new(unsigned_image()));
    let data = fits.primary_data().unwrap();

    assert_eq!(data.format(), SampleFormat::U16);
    assert_eq!(data.bitpix(), 16);
    assert_eq!(data.axis_lengths(), [4, 3]);
    assert_eq!(data.zero_point(), 32768);
    assert_eq!(data.len(), 12);
    assert_eq!(data.bytes().len(), 24);

    assert_eq!(data.sample_at(&[0, 0]).unwrap(), Sample::U16(32768));
    assert_eq!(data.sample_at(&[1, 0]).unwrap(), Sample::U16(32769));
    assert_eq!(data.sample_at(&[0, 1]).unwrap(), Sample::U16(32772));
    assert_eq!(data.sample_at(&[3, 2]).unwrap(), Sample::U16(32779));
    assert_eq!(data.sample_range(), Some((32768.0, 32779.0)));
}

#[test]
fn index_out_of_range() {
    let fits = Fits::new(Cursor::new(unsigned_image()));
    let data = fits.primary_data().unwrap();

    assert!(matches!(
        data.sample_at(&[4, 0]),
        Err(Error::IndexOutOfRange { axis: 0, index: 4, length: 4 })
    ));
    assert!(matches!(
        data.sample_at(&[0, 3]),
        Err(Error::IndexOutOfRange { axis: 1, index: 3, length: 3 })
    ));
    assert!(matches!(
        data.sample_at(&[0]),
        Err(Error::AxisCountMismatch { expected: 2, actual: 1 })
    ));
}

#[test]
fn float_image() {
    let head = header(&[
        "SIMPLE  =                    T",
        "BITPIX  =                  -64",
        "NAXIS   =                    2",
        "NAXIS1  =                    2",
        "NAXIS2  =                    2",
        "END",
    ]);
    let values = [1.5f64, -2.25, f64::NAN, 1.0e10];
    let data: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
    let fits = Fits::new(Cursor::new(with_data(head, &data)));

    let data = fits.primary_data().unwrap();
    assert!(data.is_floating_point());
    assert_eq!(data.bits_per_sample(), 64);
    assert_eq!(data.sample_at(&[1, 0]).unwrap(), Sample::F64(-2.25));
    assert_eq!(data.sample_at(&[1, 1]).unwrap(), Sample::F64(1.0e10));
    assert_eq!(data.sample_range(), Some((-2.25, 1.0e10)));
}

#[test]
fn signed_bytes_from_offset() {
    let head = header(&[
        "SIMPLE  =                    T",
        "BITPIX  =                    8",
        "NAXIS   =                    1",
        "NAXIS1  =                    3",
        "BZERO   =                 -128",
        "END",
    ]);
    let fits = Fits::new(Cursor::new(with_data(head, &[0, 128, 255])));
    let data = fits.primary_data().unwrap();
    assert_eq!(data.format(), SampleFormat::I8);
    let values: Vec<Sample> = data.iter_samples().collect();
    assert_eq!(values, [Sample::I8(-128), Sample::I8(0), Sample::I8(127)]);
}

#[test]
fn arbitrary_zero_point_is_added() {
    let head = header(&[
        "SIMPLE  =                    T",
        "BITPIX  =                   16",
        "NAXIS   =                    1",
        "NAXIS1  =                    2",
        "BZERO   =                 1000",
        "END",
    ]);
    let data: Vec<u8> = [5i16, 7].iter().flat_map(|v| v.to_be_bytes()).collect();
    let fits = Fits::new(Cursor::new(with_data(head, &data)));

    let data = fits.primary_data().unwrap();
    assert_eq!(data.format(), SampleFormat::I64);
    assert_eq!(data.zero_point(), 1000);
    assert_eq!(data.sample_at(&[0]).unwrap(), Sample::I64(1005));
    assert_eq!(data.sample_at(&[1]).unwrap(), Sample::I64(1007));
}

#[test]
fn scaled_data_is_rejected() {
    let head = header(&[
        "SIMPLE  =                    T",
        "BITPIX  =                   16",
        "NAXIS   =                    1",
        "NAXIS1  =                    1",
        "BSCALE  =                  2.0",
        "END",
    ]);
    let fits = Fits::new(Cursor::new(with_data(head, &[0, 1])));
    assert!(matches!(
        fits.primary_data(),
        Err(Error::UnsupportedEncoding(_))
    ));
}

#[test]
fn no_data_array() {
    let head = header(&[
        "SIMPLE  =                    T",
        "BITPIX  =                    8",
        "NAXIS   =                    0",
        "END",
    ]);
    let fits = Fits::new(Cursor::new(head));
    let data = fits.primary_data().unwrap();
    assert!(data.is_empty());
    assert_eq!(data.number_of_axes(), 0);
    assert_eq!(fits.next_hdu_block_index().unwrap(), 1);
}

// ===========================================================================
// Header termination and malformed input
// ===========================================================================

#[test]
fn binary_block_ends_header_without_end_card() {
    let head = header(&[
        "SIMPLE  =                    T",
        "BITPIX  =                    8",
        "NAXIS   =                    1",
        "NAXIS1  =                    3",
    ]);
    let file = with_data(head, &[0, 5, 6]);
    let fits = Fits::new(Cursor::new(file));

    let header = fits.header().unwrap();
    assert_eq!(header.len(), 4);
    assert_eq!(fits.primary_data_block_index().unwrap(), 1);

    let data = fits.primary_data().unwrap();
    assert_eq!(data.bytes(), [0, 5, 6]);
}

#[test]
fn missing_axis_length() {
    let head = header(&[
        "SIMPLE  =                    T",
        "BITPIX  =                   16",
        "NAXIS   =                    2",
        "NAXIS2  =                    3",
        "END",
    ]);
    let fits = Fits::new(Cursor::new(with_data(head, &[0; 24])));
    assert!(fits.header().is_ok());
    match fits.primary_data() {
        Err(Error::MissingRequiredKeyword(name)) => assert_eq!(name, "NAXIS1"),
        other => panic!("expected missing NAXIS1, got {other:?}"),
    }
}

#[test]
fn invalid_bitpix() {
    let head = header(&[
        "SIMPLE  =                    T",
        "BITPIX  =                   12",
        "NAXIS   =                    0",
        "END",
    ]);
    let fits = Fits::new(Cursor::new(head));
    assert!(matches!(fits.primary_data(), Err(Error::InvalidBitpix(12))));
}

#[test]
fn truncated_data() {
    let mut file = unsigned_image();
    file.truncate(BLOCK_SIZE + 10);
    let fits = Fits::new(Cursor::new(file));
    assert!(matches!(fits.primary_data(), Err(Error::ShortRead { .. })));
}

#[test]
fn declared_size_far_beyond_file() {
    let head = header(&[
        "SIMPLE  =                    T",
        "BITPIX  =                    8",
        "NAXIS   =                    2",
        "NAXIS1  =              1000000",
        "NAXIS2  =             10000000",
        "END",
    ]);
    let fits = Fits::new(Cursor::new(with_data(head, &[1, 2, 3])));
    assert!(matches!(
        fits.primary_data(),
        Err(Error::ShortRead { block: 2, len: 0 })
    ));
}

#[test]
fn empty_source() {
    let fits = Fits::new(Cursor::new(Vec::new()));
    assert!(matches!(fits.header(), Err(Error::MalformedHeader(_))));
}

// ===========================================================================
// Header content
// ===========================================================================

#[test]
fn quoted_slash_stays_in_value() {
    let head = header(&[
        "SIMPLE  =                    T",
        "OBJECT  = 'M31 / Andromeda'  / target name",
        "OBSERVER= 'O''Neil  '",
        "HISTORY   flat fielded / dark subtracted",
        "NAXIS   =                    0",
        "END",
    ]);
    let fits = Fits::new(Cursor::new(head));
    let header = fits.header().unwrap();

    let object = header.record("OBJECT").unwrap();
    assert_eq!(object.string_value(), Some("M31 / Andromeda"));
    assert_eq!(object.comment.as_deref(), Some("target name"));
    assert_eq!(header.string("OBSERVER"), Some("O'Neil"));

    let history = header.record("HISTORY").unwrap();
    assert!(history.value.is_none());
    assert_eq!(
        history.comment.as_deref(),
        Some("flat fielded / dark subtracted")
    );
}

#[test]
fn indexed_keywords() {
    let fits = Fits::new(Cursor::new(unsigned_image()));
    let header = fits.header().unwrap();

    let axes = header.records_for_keyword("NAXIS");
    let names: Vec<&str> = axes.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["NAXIS", "NAXIS1", "NAXIS2"]);
    assert_eq!(axes[2].sequence_number(), Some(2));

    let exact = header.records_for_keyword("NAXIS2");
    assert_eq!(exact.len(), 1);
    assert_eq!(exact[0].value, Some(Value::Integer(3)));

    assert!(header.keywords().contains(&"BZERO"));
    assert!(!header.keywords().contains(&"END"));
}

// ===========================================================================
// Lazy loading and sharing
// ===========================================================================

#[test]
fn repeated_access_returns_same_object() {
    let fits = Fits::new(Cursor::new(unsigned_image()));
    let a = fits.primary_data().unwrap();
    let b = fits.primary_data().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&fits.header().unwrap(), &fits.header().unwrap()));
}

#[test]
fn concurrent_first_access_decodes_once() {
    let fits = Arc::new(Fits::new(Cursor::new(unsigned_image())));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let fits = Arc::clone(&fits);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                fits.primary_data().unwrap()
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for data in &results[1..] {
        assert!(Arc::ptr_eq(&results[0], data));
    }
    assert_eq!(results[0].sample_at(&[3, 2]).unwrap(), Sample::U16(32779));
}

#[test]
fn options_limit_data_size() {
    let options = ReadOptions::new().max_data_bytes(16);
    let fits = Fits::with_options(Cursor::new(unsigned_image()), options);
    assert!(matches!(
        fits.primary_data(),
        Err(Error::DataTooLarge { bytes: 24, limit: 16 })
    ));
}

// ===========================================================================
// Files on disk
// ===========================================================================

#[test]
fn open_file_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&unsigned_image()).unwrap();
    file.flush().unwrap();

    let fits = Fits::open(file.path()).unwrap();
    assert_eq!(fits.header().unwrap().integer("NAXIS1"), Some(4));
    let data = fits.primary_data().unwrap();
    assert_eq!(data.sample_at(&[2, 1]).unwrap(), Sample::U16(32774));
}

#[test]
fn open_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = Fits::open(dir.path().join("absent.fits"));
    assert!(matches!(result, Err(Error::SourceUnavailable(_))));
}
