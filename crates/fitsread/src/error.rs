use std::io;
use std::sync::Arc;

/// All errors that can occur while reading and decoding a FITS file.
///
/// I/O causes are held behind an [`Arc`] so that a failed load can be cached
/// and handed out again to later callers.
#[derive(Debug, Clone)]
pub enum Error {
    /// The byte source could not be opened.
    SourceUnavailable(Arc<io::Error>),
    /// The byte offset of a block could not be reached.
    Seek {
        block: usize,
        cause: Option<Arc<io::Error>>,
    },
    /// A block that must exist was shorter than 2880 bytes (`len == 0` means
    /// the source ended cleanly where more data was required).
    ShortRead { block: usize, len: usize },
    /// A read on the underlying source failed.
    Io(Arc<io::Error>),
    /// The header is structurally broken.
    MalformedHeader(&'static str),
    /// A structural keyword is absent, not an integer, or negative.
    MissingRequiredKeyword(String),
    /// Unrecognized BITPIX value.
    InvalidBitpix(i64),
    /// The decoded buffer length disagrees with the declared shape.
    SizeMismatch { expected: usize, actual: usize },
    /// A pixel index lies outside its axis.
    IndexOutOfRange {
        axis: usize,
        index: usize,
        length: usize,
    },
    /// A pixel address has the wrong number of indices.
    AxisCountMismatch { expected: usize, actual: usize },
    /// The data uses an encoding this decoder does not apply.
    UnsupportedEncoding(&'static str),
    /// The declared data size exceeds the configured limit.
    DataTooLarge { bytes: usize, limit: usize },
    /// An earlier decode on the same file panicked mid-way.
    DecodeInterrupted,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::SourceUnavailable(e) => write!(f, "source unavailable: {e}"),
            Error::Seek { block, cause: None } => {
                write!(f, "cannot seek to block {block}")
            }
            Error::Seek {
                block,
                cause: Some(e),
            } => write!(f, "cannot seek to block {block}: {e}"),
            Error::ShortRead { block, len: 0 } => {
                write!(f, "unexpected end of file at block {block}")
            }
            Error::ShortRead { block, len } => {
                write!(f, "short read at block {block}: {len} of 2880 bytes")
            }
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::MalformedHeader(why) => write!(f, "malformed FITS header: {why}"),
            Error::MissingRequiredKeyword(kw) => write!(f, "missing required keyword: {kw}"),
            Error::InvalidBitpix(v) => write!(f, "invalid BITPIX value: {v}"),
            Error::SizeMismatch { expected, actual } => {
                write!(f, "data size mismatch: expected {expected} bytes, got {actual}")
            }
            Error::IndexOutOfRange {
                axis,
                index,
                length,
            } => write!(
                f,
                "index {index} out of range for axis {} of length {length}",
                axis + 1
            ),
            Error::AxisCountMismatch { expected, actual } => {
                write!(f, "expected {expected} indices, got {actual}")
            }
            Error::UnsupportedEncoding(why) => write!(f, "unsupported encoding: {why}"),
            Error::DataTooLarge { bytes, limit } => {
                write!(f, "data of {bytes} bytes exceeds the limit of {limit} bytes")
            }
            Error::DecodeInterrupted => write!(f, "a previous decode was interrupted"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::SourceUnavailable(e) | Error::Io(e) => Some(e.as_ref()),
            Error::Seek { cause: Some(e), .. } => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(Arc::new(e))
    }
}
