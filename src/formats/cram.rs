use crate::types::GenomeInterval;
use crate::{Error, Result};
use noodles::core::region::Interval;
use noodles::cram;
use noodles::cram::DataContainer;
use noodles::cram::crai;
use noodles::fasta;
use noodles::sam;
use noodles::sam::alignment::RecordBuf;
use std::fs::File;
use std::io::{self, SeekFrom};
use std::path::Path;
use std::vec;

/// An open CRAM file with an optional CRAI index.
///
/// Records are decoded one data container at a time. `pending` holds the
/// rest of the current container during sequential reads.
pub struct CramFile {
    index: Option<crai::Index>,
    pending: vec::IntoIter<RecordBuf>,
    repository: fasta::Repository,
    header: sam::Header,
    reader: cram::io::Reader<File>,
}

/// Cursor over the containers that may hold records of one interval.
///
/// Containers are decoded lazily as the region is drained, and only records
/// overlapping the interval on the queried reference are returned.
pub struct CramRegion {
    reference_sequence_id: usize,
    interval: Interval,
    offsets: vec::IntoIter<u64>,
    records: vec::IntoIter<RecordBuf>,
}

impl CramFile {
    /// Opens a CRAM file, resolving reference slices from an indexed FASTA.
    pub fn open(path: &Path, reference: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(path.display().to_string()));
        }

        let repository = Self::reference_repository(reference)?;

        let mut reader = cram::io::reader::Builder::default()
            .set_reference_sequence_repository(repository.clone())
            .build_from_path(path)
            .map_err(|e| Error::Internal(format!("failed to open CRAM file: {}", e)))?;

        let header = reader
            .read_header()
            .map_err(|e| Error::Internal(format!("failed to read CRAM header: {}", e)))?;

        Ok(Self {
            index: None,
            pending: Vec::new().into_iter(),
            repository,
            header,
            reader,
        })
    }

    fn reference_repository(reference: &Path) -> Result<fasta::Repository> {
        if !reference.exists() {
            return Err(Error::NotFound(format!(
                "reference sequence file: {}",
                reference.display()
            )));
        }

        let reader = fasta::io::indexed_reader::Builder::default()
            .build_from_path(reference)
            .map_err(|e| {
                Error::Internal(format!(
                    "failed to open indexed reference {}: {}",
                    reference.display(),
                    e
                ))
            })?;

        Ok(fasta::Repository::new(
            fasta::repository::adapters::IndexedReader::new(reader),
        ))
    }

    pub fn header(&self) -> &sam::Header {
        &self.header
    }

    pub fn load_index(&mut self, index_path: &Path) -> Result<()> {
        let index = crai::read(index_path)
            .map_err(|e| Error::Internal(format!("failed to read CRAI index: {}", e)))?;

        self.index = Some(index);

        Ok(())
    }

    pub fn read_record(&mut self, record: &mut RecordBuf) -> Result<bool> {
        loop {
            if let Some(next) = self.pending.next() {
                *record = next;
                return Ok(true);
            }

            let Some(container) = self.reader.read_data_container()? else {
                return Ok(false);
            };

            self.pending = self.decode(&container)?.into_iter();
        }
    }

    /// Resolves `interval` to the index entries of its reference sequence.
    ///
    /// Nothing is decoded here; decoding failures surface from
    /// [`read_region_record`](Self::read_region_record).
    pub fn query(&self, interval: &GenomeInterval) -> Result<CramRegion> {
        let index = self
            .index
            .as_ref()
            .ok_or_else(|| Error::IndexRequired("CRAM index not loaded".to_string()))?;

        let reference_sequence_id = self
            .header
            .reference_sequences()
            .get_index_of(interval.reference_name.as_bytes())
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "reference sequence not found: {}",
                    interval.reference_name
                ))
            })?;

        let interval = interval.to_interval()?;

        let mut offsets: Vec<u64> = index
            .iter()
            .filter(|entry| entry.reference_sequence_id() == Some(reference_sequence_id))
            .filter(|entry| slice_intersects(entry, interval))
            .map(|entry| entry.offset())
            .collect();

        // One entry per slice, so multi-slice containers repeat their offset
        offsets.dedup();

        Ok(CramRegion {
            reference_sequence_id,
            interval,
            offsets: offsets.into_iter(),
            records: Vec::new().into_iter(),
        })
    }

    pub fn read_region_record(
        &mut self,
        region: &mut CramRegion,
        record: &mut RecordBuf,
    ) -> Result<bool> {
        loop {
            let reference_sequence_id = region.reference_sequence_id;
            let interval = region.interval;

            if let Some(next) = region
                .records
                .find(|r| overlaps(r, reference_sequence_id, interval))
            {
                *record = next;
                return Ok(true);
            }

            let Some(offset) = region.offsets.next() else {
                return Ok(false);
            };

            self.reader.seek(SeekFrom::Start(offset))?;

            let container = self.reader.read_data_container()?.ok_or_else(|| {
                Error::Internal(format!("no CRAM container at indexed offset {}", offset))
            })?;

            region.records = self.decode(&container)?.into_iter();
        }
    }

    fn decode(&self, container: &DataContainer) -> Result<Vec<RecordBuf>> {
        decode_container(container, &self.repository, &self.header)
            .map_err(|e| Error::Internal(format!("failed to decode CRAM container: {}", e)))
    }
}

fn decode_container(
    container: &DataContainer,
    repository: &fasta::Repository,
    header: &sam::Header,
) -> io::Result<Vec<RecordBuf>> {
    let compression_header = container.compression_header();
    let mut records = Vec::new();

    for slice in container.slices() {
        let mut slice_records = slice.records(compression_header)?;
        slice.resolve_records(repository, header, compression_header, &mut slice_records)?;

        for record in slice_records {
            records.push(record.try_into_alignment_record(header)?);
        }
    }

    Ok(records)
}

// Entries without a start cover unplaced or multi-reference slices.
fn slice_intersects(entry: &crai::Record, interval: Interval) -> bool {
    let Some(start) = entry.alignment_start() else {
        return true;
    };

    let span = entry.alignment_span().max(1);

    match start.checked_add(span - 1) {
        Some(end) => interval.intersects((start..=end).into()),
        None => true,
    }
}

fn overlaps(record: &RecordBuf, reference_sequence_id: usize, interval: Interval) -> bool {
    if record.reference_sequence_id() != Some(reference_sequence_id) {
        return false;
    }

    match (record.alignment_start(), record.alignment_end()) {
        (Some(start), Some(end)) => interval.intersects((start..=end).into()),
        _ => false,
    }
}
