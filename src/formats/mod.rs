//! Container-format handles built on noodles.
//!
//! Each handle owns the open file, its parsed header and, once loaded, the
//! on-disk index. Fields are declared index first so that dependents are
//! released before the file they were read from.
//!
//! # Supported Formats
//!
//! - [`BamFile`] - BAM with a `.bai` or `.csi` index
//! - [`CramFile`] - CRAM with a `.crai` index, decoded against a FASTA reference
//! - [`SamFile`] - plain-text SAM, sequential only
//!
//! # Region iteration
//!
//! [`AlignmentFile::query`] turns a [`GenomeInterval`] into a
//! [`RegionIterator`], which [`AlignmentFile::read_region_record`] then drains.
//! The iterator holds no borrow of the file, so the owner can keep both side
//! by side and replace the iterator between intervals.

mod bam;
mod cram;
mod sam;

pub use bam::{BamFile, BamRegion};
pub use cram::{CramFile, CramRegion};
pub use sam::SamFile;

use crate::types::{Format, GenomeInterval};
use crate::{Error, Result};
use noodles::sam::Header;
use noodles::sam::alignment::RecordBuf;
use std::path::{Path, PathBuf};

/// An open alignment file of any supported format
pub enum AlignmentFile {
    Bam(BamFile),
    Cram(CramFile),
    Sam(SamFile),
}

/// Cursor over the records of one interval
pub enum RegionIterator {
    Bam(BamRegion),
    Cram(CramRegion),
}

impl AlignmentFile {
    /// Opens `path` as `format` and reads its header.
    ///
    /// `reference` is only consulted for CRAM, where it is required.
    pub fn open(path: &Path, format: Format, reference: Option<&Path>) -> Result<Self> {
        match format {
            Format::Bam => BamFile::open(path).map(Self::Bam),
            Format::Cram => {
                let reference = reference.ok_or_else(|| {
                    Error::ReferenceRequired(format!("{} is CRAM", path.display()))
                })?;
                CramFile::open(path, reference).map(Self::Cram)
            }
            Format::Sam => SamFile::open(path).map(Self::Sam),
        }
    }

    pub fn format(&self) -> Format {
        match self {
            Self::Bam(_) => Format::Bam,
            Self::Cram(_) => Format::Cram,
            Self::Sam(_) => Format::Sam,
        }
    }

    pub fn header(&self) -> &Header {
        match self {
            Self::Bam(file) => file.header(),
            Self::Cram(file) => file.header(),
            Self::Sam(file) => file.header(),
        }
    }

    /// Looks for an index sidecar next to `path` and attaches it.
    ///
    /// Returns `Ok(false)` when no sidecar exists or the format has no index.
    pub fn load_index(&mut self, path: &Path) -> Result<bool> {
        let Some(index_path) = find_index(path, self.format()) else {
            return Ok(false);
        };

        match self {
            Self::Bam(file) => file.load_index(&index_path)?,
            Self::Cram(file) => file.load_index(&index_path)?,
            Self::Sam(_) => return Ok(false),
        }

        tracing::debug!("Loaded index {}", index_path.display());

        Ok(true)
    }

    /// Decodes the next record in file order.
    pub fn read_record(&mut self, record: &mut RecordBuf) -> Result<bool> {
        match self {
            Self::Bam(file) => file.read_record(record),
            Self::Cram(file) => file.read_record(record),
            Self::Sam(file) => file.read_record(record),
        }
    }

    /// Resolves `interval` against the header and index.
    pub fn query(&mut self, interval: &GenomeInterval) -> Result<RegionIterator> {
        match self {
            Self::Bam(file) => file.query(interval).map(RegionIterator::Bam),
            Self::Cram(file) => file.query(interval).map(RegionIterator::Cram),
            Self::Sam(_) => Err(Error::IndexRequired(
                "SAM files do not support region queries".to_string(),
            )),
        }
    }

    /// Decodes the next record of `region`, returning `false` once it is exhausted.
    pub fn read_region_record(
        &mut self,
        region: &mut RegionIterator,
        record: &mut RecordBuf,
    ) -> Result<bool> {
        match (self, region) {
            (Self::Bam(file), RegionIterator::Bam(region)) => file.read_region_record(region, record),
            (Self::Cram(file), RegionIterator::Cram(region)) => {
                file.read_region_record(region, record)
            }
            (file, _) => Err(Error::Internal(format!(
                "region iterator does not belong to this {} file",
                file.format()
            ))),
        }
    }
}

/// Finds the index sidecar for `path`.
///
/// Appended names (`reads.bam.bai`) are preferred over replaced extensions
/// (`reads.bai`), and extensions are tried in [`Format::index_extensions`] order.
pub fn find_index(path: &Path, format: Format) -> Option<PathBuf> {
    for ext in format.index_extensions() {
        let appended = PathBuf::from(format!("{}.{}", path.display(), ext));
        if appended.exists() {
            return Some(appended);
        }

        let replaced = path.with_extension(ext);
        if replaced.exists() {
            return Some(replaced);
        }
    }

    None
}
