//! The file-level FITS object: lazy, memoized access to the primary HDU.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info};

use crate::block::BlockReader;
use crate::data::{decode_data, DataShape, FitsData};
use crate::error::{Error, Result};
use crate::header::{parse_header, FitsHeader};
use crate::options::ReadOptions;

/// Progress of one lazily computed part of the file.
#[derive(Debug)]
enum LoadState<T> {
    Unloaded,
    Loading,
    Loaded(T),
    Failed(Error),
}

impl<T: Clone> LoadState<T> {
    /// Return the cached outcome, or run `load` if nothing is cached yet.
    ///
    /// The state stays `Loading` while `load` runs; finding it there means a
    /// previous load panicked.
    fn get_or_load(&mut self, load: impl FnOnce() -> Result<T>) -> Result<T> {
        match self {
            LoadState::Loaded(value) => return Ok(value.clone()),
            LoadState::Failed(e) => return Err(e.clone()),
            LoadState::Loading => return Err(Error::DecodeInterrupted),
            LoadState::Unloaded => {}
        }
        *self = LoadState::Loading;
        let result = load();
        *self = match &result {
            Ok(value) => LoadState::Loaded(value.clone()),
            Err(e) => LoadState::Failed(e.clone()),
        };
        result
    }
}

#[derive(Debug, Clone)]
struct PrimaryHeader {
    header: Arc<FitsHeader>,
    first_data_block: usize,
}

#[derive(Debug)]
struct Inner<R> {
    reader: BlockReader<R>,
    header: LoadState<PrimaryHeader>,
    data: LoadState<Arc<FitsData>>,
}

impl<R: Read + Seek> Inner<R> {
    fn primary_header(&mut self, options: &ReadOptions) -> Result<PrimaryHeader> {
        let reader = &mut self.reader;
        self.header.get_or_load(|| {
            let (header, first_data_block) = parse_header(reader)?;
            if options.require_simple {
                header.validate_simple()?;
            }
            Ok(PrimaryHeader {
                header: Arc::new(header),
                first_data_block,
            })
        })
    }

    fn primary_data(&mut self, options: &ReadOptions) -> Result<Arc<FitsData>> {
        let primary = self.primary_header(options)?;
        let reader = &mut self.reader;
        self.data.get_or_load(|| {
            let shape = DataShape::from_header(&primary.header)?;
            if let Some(limit) = options.max_data_bytes {
                let bytes = shape.decoded_byte_count()?;
                if bytes > limit {
                    return Err(Error::DataTooLarge { bytes, limit });
                }
            }
            decode_data(shape, reader, primary.first_data_block).map(Arc::new)
        })
    }
}

/// A FITS file opened for reading.
///
/// Nothing is read at construction. The primary header is parsed on the
/// first call to [`header`](Fits::header) and the primary data array on the
/// first call to [`primary_data`](Fits::primary_data); both are cached for
/// the lifetime of the value, failures included.
///
/// All access goes through one lock, so concurrent first calls perform a
/// single decode and observe the same cached `Arc`. The returned
/// [`FitsData`] is immutable and can be read from any thread.
#[derive(Debug)]
pub struct Fits<R> {
    inner: Mutex<Inner<R>>,
    options: ReadOptions,
}

impl Fits<BufReader<File>> {
    /// Open the file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_options(path, ReadOptions::default())
    }

    pub fn open_with_options(path: impl AsRef<Path>, options: ReadOptions) -> Result<Self> {
        let path = path.as_ref();
        info!("opening FITS file {}", path.display());
        let file = File::open(path).map_err(|e| Error::SourceUnavailable(Arc::new(e)))?;
        Ok(Self::with_options(BufReader::new(file), options))
    }
}

impl<R: Read + Seek> Fits<R> {
    /// Wrap any seekable byte source.
    pub fn new(source: R) -> Self {
        Self::with_options(source, ReadOptions::default())
    }

    pub fn with_options(source: R, options: ReadOptions) -> Self {
        Fits {
            inner: Mutex::new(Inner {
                reader: BlockReader::new(source),
                header: LoadState::Unloaded,
                data: LoadState::Unloaded,
            }),
            options,
        }
    }

    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    fn lock(&self) -> MutexGuard<'_, Inner<R>> {
        // A panic mid-decode leaves its state at `Loading`, which is reported
        // as `DecodeInterrupted`, so the guard is still safe to use.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The primary header, parsed on first use.
    pub fn header(&self) -> Result<Arc<FitsHeader>> {
        let primary = self.lock().primary_header(&self.options)?;
        Ok(primary.header)
    }

    /// Index of the first block after the primary header.
    pub fn primary_data_block_index(&self) -> Result<usize> {
        let primary = self.lock().primary_header(&self.options)?;
        Ok(primary.first_data_block)
    }

    /// Index of the block where the next HDU would start.
    ///
    /// Only the header is needed; the data array is not read.
    pub fn next_hdu_block_index(&self) -> Result<usize> {
        let primary = self.lock().primary_header(&self.options)?;
        let shape = DataShape::from_header(&primary.header)?;
        let next = shape.next_hdu_block(primary.first_data_block)?;
        debug!("next HDU would start at block {next}");
        Ok(next)
    }

    /// The primary data array, decoded on first use.
    pub fn primary_data(&self) -> Result<Arc<FitsData>> {
        self.lock().primary_data(&self.options)
    }

    /// Give back the underlying source.
    pub fn into_inner(self) -> R {
        self.inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .reader
            .into_inner()
    }
}
