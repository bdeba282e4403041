use crate::types::GenomeInterval;
use crate::{Error, Result};
use noodles::bam;
use noodles::bam::bai;
use noodles::bgzf;
use noodles::bgzf::VirtualPosition;
use noodles::core::Position;
use noodles::csi;
use noodles::csi::binning_index::BinningIndex;
use noodles::csi::binning_index::index::reference_sequence::bin::Chunk;
use noodles::sam;
use noodles::sam::alignment::RecordBuf;
use std::fs::File;
use std::path::Path;
use std::vec;

pub type BamReader = bam::io::Reader<bgzf::Reader<File>>;

/// An open BAM file with an optional BAI/CSI index
pub struct BamFile {
    index: Option<Box<dyn BinningIndex>>,
    header: sam::Header,
    reader: BamReader,
}

/// Chunk-driven cursor over the records overlapping one interval.
///
/// Records are read between the virtual positions of each index chunk and
/// kept only if they overlap `[start, end]` on the queried reference.
pub struct BamRegion {
    reference_sequence_id: usize,
    start: Position,
    end: Option<Position>,
    chunks: vec::IntoIter<Chunk>,
    chunk_end: Option<VirtualPosition>,
}

enum Placement {
    Before,
    Overlapping,
    Past,
}

impl BamFile {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| Error::NotFound(format!("{}: {}", path.display(), e)))?;

        // bam::io::Reader::new wraps the file in a BGZF reader internally
        let mut reader = bam::io::Reader::new(file);

        let header = reader
            .read_header()
            .map_err(|e| Error::Internal(format!("failed to read BAM header: {}", e)))?;

        Ok(Self {
            index: None,
            header,
            reader,
        })
    }

    pub fn header(&self) -> &sam::Header {
        &self.header
    }

    /// Reads a BAI or CSI index, chosen by the sidecar's extension.
    pub fn load_index(&mut self, index_path: &Path) -> Result<()> {
        let is_csi = index_path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csi"));

        let index: Box<dyn BinningIndex> = if is_csi {
            let index = csi::read(index_path)
                .map_err(|e| Error::Internal(format!("failed to read CSI index: {}", e)))?;
            Box::new(index)
        } else {
            let index = bai::read(index_path)
                .map_err(|e| Error::Internal(format!("failed to read BAI index: {}", e)))?;
            Box::new(index)
        };

        self.index = Some(index);

        Ok(())
    }

    pub fn read_record(&mut self, record: &mut RecordBuf) -> Result<bool> {
        let n = self.reader.read_record_buf(&self.header, record)?;
        Ok(n != 0)
    }

    /// Maps `interval` to a reference sequence ID and asks the index for the
    /// chunks that may hold overlapping records.
    pub fn query(&self, interval: &GenomeInterval) -> Result<BamRegion> {
        let index = self
            .index
            .as_ref()
            .ok_or_else(|| Error::IndexRequired("BAM index not loaded".to_string()))?;

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

        let chunks = index
            .query(reference_sequence_id, interval.to_interval()?)
            .map_err(|e| Error::Internal(format!("index query failed: {}", e)))?;

        Ok(BamRegion {
            reference_sequence_id,
            start: interval.start_position()?,
            end: interval.end_position()?,
            chunks: chunks.into_iter(),
            chunk_end: None,
        })
    }

    pub fn read_region_record(
        &mut self,
        region: &mut BamRegion,
        record: &mut RecordBuf,
    ) -> Result<bool> {
        loop {
            let chunk_end = match region.chunk_end {
                Some(end) => end,
                None => match region.chunks.next() {
                    Some(chunk) => {
                        self.reader.get_mut().seek(chunk.start())?;
                        region.chunk_end = Some(chunk.end());
                        chunk.end()
                    }
                    None => return Ok(false),
                },
            };

            if self.reader.get_ref().virtual_position() >= chunk_end {
                region.chunk_end = None;
                continue;
            }

            if self.reader.read_record_buf(&self.header, record)? == 0 {
                region.finish();
                return Ok(false);
            }

            match region.placement(record) {
                Placement::Overlapping => return Ok(true),
                Placement::Before => {}
                Placement::Past => {
                    region.finish();
                    return Ok(false);
                }
            }
        }
    }
}

impl BamRegion {
    fn finish(&mut self) {
        self.chunks = Vec::new().into_iter();
        self.chunk_end = None;
    }

    // Records are coordinate-sorted, so the first record past the interval
    // ends the region.
    fn placement(&self, record: &RecordBuf) -> Placement {
        let Some(id) = record.reference_sequence_id() else {
            return Placement::Past;
        };

        if id > self.reference_sequence_id {
            return Placement::Past;
        } else if id < self.reference_sequence_id {
            return Placement::Before;
        }

        let Some(start) = record.alignment_start() else {
            return Placement::Before;
        };

        if self.end.is_some_and(|end| start > end) {
            return Placement::Past;
        }

        let end = record
            .alignment_end()
            .filter(|end| *end >= start)
            .unwrap_or(start);

        if end >= self.start {
            Placement::Overlapping
        } else {
            Placement::Before
        }
    }
}
