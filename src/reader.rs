//! Ordered record reader over BAM, CRAM and SAM files.
//!
//! [`OrderedRecordReader`] presents one `read`/`close` contract over two
//! access patterns:
//!
//! - **Sequential**: no intervals were requested, every record is decoded in
//!   file order.
//! - **Random access**: intervals were requested and an index is attached.
//!   Intervals are visited in the order given, each through an index-driven
//!   region iterator. Intervals whose reference sequence cannot be resolved
//!   are skipped.
//!
//! When intervals are requested but the file has no usable index, the reader
//! either fails to open ([`ReaderOptions::require_index`]) or falls back to
//! [`AccessMode::RandomAccessUnavailable`], which reads sequentially without
//! filtering and refuses [`OrderedRecordReader::jump_to_interval`].
//!
//! # Example
//!
//! ```no_run
//! use htsreadr::{GenomeInterval, OrderedRecordReader};
//! use noodles::sam::alignment::RecordBuf;
//!
//! let intervals = vec!["chr2:1-1000".parse()?, GenomeInterval::whole("chrX")];
//! let mut reader = OrderedRecordReader::new("sample.bam", intervals)?;
//!
//! let mut record = RecordBuf::default();
//! while reader.read(&mut record)? {
//!     // ...
//! }
//!
//! reader.close();
//! # Ok::<(), htsreadr::Error>(())
//! ```

use crate::formats::{AlignmentFile, RegionIterator};
use crate::interval_tree::IntervalIndex;
use crate::types::{Format, GenomeInterval};
use crate::{Error, Result};
use noodles::sam;
use noodles::sam::alignment::RecordBuf;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Options applied when opening a reader
#[derive(Debug, Clone, Default)]
pub struct ReaderOptions {
    /// Reference FASTA (with `.fai`) for CRAM input
    pub reference: Option<PathBuf>,
    /// Fail to open when intervals are given but no index can be loaded
    pub require_index: bool,
}

impl ReaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reference(mut self, reference: impl Into<PathBuf>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn require_index(mut self, require_index: bool) -> Self {
        self.require_index = require_index;
        self
    }
}

/// How records are being selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    Sequential,
    RandomAccess,
    RandomAccessUnavailable,
}

enum State {
    Sequential,
    RandomAccess {
        intervals: Vec<GenomeInterval>,
        cursor: usize,
        tree: IntervalIndex,
    },
    RandomAccessUnavailable {
        intervals: Vec<GenomeInterval>,
    },
}

struct ActiveRegion {
    interval: GenomeInterval,
    iter: RegionIterator,
}

// Field order is release order: the region iterator before the file.
struct Handle {
    region: Option<ActiveRegion>,
    file: AlignmentFile,
}

impl Handle {
    fn jump(&mut self, interval: &GenomeInterval) -> bool {
        self.region = None;

        match self.file.query(interval) {
            Ok(iter) => {
                debug!("Jumped to interval {}", interval);
                self.region = Some(ActiveRegion {
                    interval: interval.clone(),
                    iter,
                });
                true
            }
            Err(e) => {
                debug!(kind = e.kind(), "Cannot resolve interval {}: {}", interval, e);
                false
            }
        }
    }
}

/// Record reader that streams a whole file or visits intervals in order
pub struct OrderedRecordReader {
    path: PathBuf,
    format: Format,
    index_loaded: bool,
    state: State,
    handle: Option<Handle>,
}

impl OrderedRecordReader {
    /// Opens `path`, selecting records from `intervals` (all records if empty).
    pub fn new(path: impl AsRef<Path>, intervals: Vec<GenomeInterval>) -> Result<Self> {
        Self::with_options(path, intervals, ReaderOptions::default())
    }

    /// Opens `path` with a reference FASTA for CRAM decoding.
    pub fn with_reference(
        path: impl AsRef<Path>,
        intervals: Vec<GenomeInterval>,
        reference: impl Into<PathBuf>,
    ) -> Result<Self> {
        Self::with_options(path, intervals, ReaderOptions::new().with_reference(reference))
    }

    pub fn with_options(
        path: impl AsRef<Path>,
        intervals: Vec<GenomeInterval>,
        options: ReaderOptions,
    ) -> Result<Self> {
        let path = path.as_ref();

        if path.as_os_str().is_empty() {
            return Err(Error::InvalidInput("empty input path".to_string()));
        }

        let format = Format::detect(path)?;

        if options.reference.is_some() && !format.is_reference_compressed() {
            debug!("Ignoring reference for {} input {}", format, path.display());
        }

        let mut file = AlignmentFile::open(path, format, options.reference.as_deref())?;

        let index_loaded = !intervals.is_empty()
            && file.load_index(path).unwrap_or_else(|e| {
                warn!("Ignoring unreadable index for {}: {}", path.display(), e);
                false
            });

        let state = if intervals.is_empty() {
            State::Sequential
        } else if index_loaded {
            let tree = IntervalIndex::from_intervals(&intervals);
            State::RandomAccess {
                intervals,
                cursor: 0,
                tree,
            }
        } else if options.require_index {
            return Err(Error::IndexRequired(format!(
                "intervals requested but {} has no index",
                path.display()
            )));
        } else {
            warn!(
                "Intervals requested but {} has no index; reading all records sequentially",
                path.display()
            );
            State::RandomAccessUnavailable { intervals }
        };

        let reader = Self {
            path: path.to_path_buf(),
            format,
            index_loaded,
            state,
            handle: Some(Handle { region: None, file }),
        };

        info!(
            "Opened {} ({}, {:?})",
            path.display(),
            format,
            reader.mode()
        );

        Ok(reader)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// The file header, `None` once closed
    pub fn header(&self) -> Option<&sam::Header> {
        self.handle.as_ref().map(|handle| handle.file.header())
    }

    pub fn mode(&self) -> AccessMode {
        match self.state {
            State::Sequential => AccessMode::Sequential,
            State::RandomAccess { .. } => AccessMode::RandomAccess,
            State::RandomAccessUnavailable { .. } => AccessMode::RandomAccessUnavailable,
        }
    }

    pub fn intervals_present(&self) -> bool {
        !matches!(self.state, State::Sequential)
    }

    pub fn index_loaded(&self) -> bool {
        self.index_loaded
    }

    pub fn random_access_enabled(&self) -> bool {
        matches!(self.state, State::RandomAccess { .. })
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_none()
    }

    /// Requested intervals in visiting order
    pub fn intervals(&self) -> &[GenomeInterval] {
        match &self.state {
            State::Sequential => &[],
            State::RandomAccess { intervals, .. }
            | State::RandomAccessUnavailable { intervals } => intervals.as_slice(),
        }
    }

    /// Position of the next interval to activate
    pub fn interval_index(&self) -> usize {
        match self.state {
            State::RandomAccess { cursor, .. } => cursor,
            _ => 0,
        }
    }

    /// Interval whose region iterator is currently active
    pub fn current_interval(&self) -> Option<&GenomeInterval> {
        self.handle
            .as_ref()
            .and_then(|handle| handle.region.as_ref())
            .map(|region| &region.interval)
    }

    /// Per-chromosome overlap index over the requested intervals.
    ///
    /// Only built in random-access mode.
    pub fn interval_tree(&self) -> Option<&IntervalIndex> {
        match &self.state {
            State::RandomAccess { tree, .. } => Some(tree),
            _ => None,
        }
    }

    /// Requested intervals overlapping `[start, end)` on `reference_name`, in list order
    pub fn overlapping_intervals(
        &self,
        reference_name: &str,
        start: u64,
        end: u64,
    ) -> Vec<&GenomeInterval> {
        match &self.state {
            State::RandomAccess {
                intervals, tree, ..
            } => tree
                .query(reference_name, start, end)
                .into_iter()
                .map(|i| &intervals[i])
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Replaces the active region iterator with one over `interval`.
    ///
    /// Returns `false` when random access is not enabled, the reader is
    /// closed, or the interval cannot be resolved against the index. Does not
    /// move the interval cursor.
    pub fn jump_to_interval(&mut self, interval: &GenomeInterval) -> bool {
        if !self.random_access_enabled() {
            debug!(
                "Cannot jump to {}: random access is not enabled for {}",
                interval,
                self.path.display()
            );
            return false;
        }

        match self.handle.as_mut() {
            Some(handle) => handle.jump(interval),
            None => false,
        }
    }

    /// Decodes the next record into `record`.
    ///
    /// Returns `Ok(false)` at the end of the file, once every interval has
    /// been visited, or after [`close`](Self::close). `record` is only
    /// meaningful when `Ok(true)` is returned.
    pub fn read(&mut self, record: &mut RecordBuf) -> Result<bool> {
        if !self.random_access_enabled() {
            return match self.handle.as_mut() {
                Some(handle) => handle.file.read_record(record),
                None => Ok(false),
            };
        }

        // Each pass either yields a record or advances the interval cursor.
        loop {
            let Some(handle) = self.handle.as_mut() else {
                return Ok(false);
            };

            if let Some(region) = handle.region.as_mut() {
                if handle.file.read_region_record(&mut region.iter, record)? {
                    return Ok(true);
                }

                handle.region = None;
            }

            if !self.initialize_next_interval() {
                return Ok(false);
            }
        }
    }

    /// Activates the next resolvable interval. Returns `false` only when the
    /// interval list is exhausted.
    fn initialize_next_interval(&mut self) -> bool {
        let Some(handle) = self.handle.as_mut() else {
            return false;
        };

        let State::RandomAccess {
            intervals, cursor, ..
        } = &mut self.state
        else {
            return false;
        };

        while *cursor < intervals.len() {
            let interval = &intervals[*cursor];
            *cursor += 1;

            if handle.jump(interval) {
                return true;
            }

            debug!("Skipping interval {}", interval);
        }

        false
    }

    /// Adapts [`read`](Self::read) into an iterator of owned records.
    pub fn records(&mut self) -> Records<'_> {
        Records { reader: self }
    }

    /// Releases the region iterator, index, header and file, in that order.
    ///
    /// Closing twice is a no-op, and reads after closing return `Ok(false)`.
    /// Dropping the reader releases the same resources.
    pub fn close(&mut self) {
        if let Some(Handle { region, file }) = self.handle.take() {
            drop(region);
            drop(file);
            debug!("Closed {}", self.path.display());
        }
    }
}

/// Iterator over the records of an [`OrderedRecordReader`]
pub struct Records<'r> {
    reader: &'r mut OrderedRecordReader,
}

impl Iterator for Records<'_> {
    type Item = Result<RecordBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut record = RecordBuf::default();

        match self.reader.read(&mut record) {
            Ok(true) => Some(Ok(record)),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
