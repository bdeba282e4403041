use crate::{Error, Result};
use noodles::sam;
use noodles::sam::alignment::RecordBuf;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// A plain-text SAM file. SAM has no index, so it is only read sequentially.
pub struct SamFile {
    header: sam::Header,
    reader: sam::io::Reader<BufReader<File>>,
}

impl SamFile {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| Error::NotFound(format!("{}: {}", path.display(), e)))?;

        let mut reader = sam::io::Reader::new(BufReader::new(file));

        let header = reader
            .read_header()
            .map_err(|e| Error::Internal(format!("failed to read SAM header: {}", e)))?;

        Ok(Self { header, reader })
    }

    pub fn header(&self) -> &sam::Header {
        &self.header
    }

    pub fn read_record(&mut self, record: &mut RecordBuf) -> Result<bool> {
        let n = self.reader.read_record_buf(&self.header, record)?;
        Ok(n != 0)
    }
}
