//! Read-only decoding of the primary HDU of FITS files.
//!
//! ```no_run
//! use fitsread::Fits;
//!
//! let fits = Fits::open("image.fits")?;
//! let header = fits.header()?;
//! println!("BITPIX = {:?}", header.integer("BITPIX"));
//!
//! let data = fits.primary_data()?;
//! println!("{:?} -> {:?}", data.axis_lengths(), data.sample_at(&[0, 0])?);
//! # Ok::<(), fitsread::Error>(())
//! ```

pub mod block;
pub mod data;
pub mod endian;
pub mod error;
pub mod fits;
pub mod header;
pub mod options;
pub mod pixel;
pub mod value;

pub use block::{BLOCK_SIZE, CARDS_PER_BLOCK, CARD_SIZE};
pub use data::{DataShape, FitsData, SampleFormat};
pub use error::{Error, Result};
pub use fits::Fits;
pub use header::{FitsHeader, KeywordRecord};
pub use options::ReadOptions;
pub use pixel::{GrayRaster, Sample, Samples};
pub use value::Value;
