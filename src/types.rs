use crate::{Error, Result};
use noodles::core::Position;
use noodles::core::Region;
use noodles::core::region::Interval;
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

/// A genomic interval on one reference sequence.
///
/// Coordinates are 0-based and half-open. A missing `start` means the
/// beginning of the chromosome and a missing `end` means its end, so an
/// interval with neither is the whole chromosome.
///
/// The string form is the usual 1-based closed region syntax
/// (`chr1`, `chr1:100`, `chr1:100-200`, `chr1:100-`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenomeInterval {
    pub reference_name: String,
    pub start: Option<u64>,
    pub end: Option<u64>,
}

impl GenomeInterval {
    pub fn new(reference_name: impl Into<String>, start: u64, end: u64) -> Self {
        Self {
            reference_name: reference_name.into(),
            start: Some(start),
            end: Some(end),
        }
    }

    /// Interval spanning a whole reference sequence
    pub fn whole(reference_name: impl Into<String>) -> Self {
        Self {
            reference_name: reference_name.into(),
            start: None,
            end: None,
        }
    }

    pub fn reference_name(&self) -> &str {
        &self.reference_name
    }

    pub fn is_whole_chromosome(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Half-open overlap test against `[start, end)` on `reference_name`.
    pub fn overlaps(&self, reference_name: &str, start: u64, end: u64) -> bool {
        self.reference_name == reference_name
            && self.start.unwrap_or(0) < end
            && start < self.end.unwrap_or(u64::MAX)
    }

    /// 1-based closed start position
    pub fn start_position(&self) -> Result<Position> {
        let Some(start) = self.start else {
            return Ok(Position::MIN);
        };

        usize::try_from(start)
            .ok()
            .and_then(|s| s.checked_add(1))
            .and_then(Position::new)
            .ok_or_else(|| Error::InvalidRange(format!("start out of range: {}", start)))
    }

    /// 1-based closed end position, `None` when the interval is open-ended
    pub fn end_position(&self) -> Result<Option<Position>> {
        self.end
            .map(|end| {
                usize::try_from(end)
                    .ok()
                    .and_then(Position::new)
                    .ok_or_else(|| Error::InvalidRange(format!("end out of range: {}", end)))
            })
            .transpose()
    }

    /// Converts to the 1-based closed interval used by index queries.
    ///
    /// Empty intervals (`end <= start`) have no closed form and are rejected.
    pub fn to_interval(&self) -> Result<Interval> {
        let start = self.start_position()?;

        let interval = match self.end_position()? {
            Some(end) if end < start => {
                return Err(Error::InvalidRange(format!("empty interval: {}", self)));
            }
            Some(end) => Interval::from(start..=end),
            None => Interval::from(start..),
        };

        Ok(interval)
    }

    pub fn to_region(&self) -> Result<Region> {
        Ok(Region::new(self.reference_name.as_str(), self.to_interval()?))
    }
}

impl fmt::Display for GenomeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start, self.end) {
            (None, None) => write!(f, "{}", self.reference_name),
            (start, Some(end)) => {
                let start = start.unwrap_or(0).saturating_add(1);
                write!(f, "{}:{}-{}", self.reference_name, start, end)
            }
            (Some(start), None) => {
                write!(f, "{}:{}-", self.reference_name, start.saturating_add(1))
            }
        }
    }
}

impl FromStr for GenomeInterval {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();

        if s.is_empty() {
            return Err(Error::InvalidInput("empty region".to_string()));
        }

        // Names such as HLA contigs may contain ':', so only a numeric suffix
        // is treated as a range.
        let Some((name, range)) = s.rsplit_once(':') else {
            return Ok(Self::whole(s));
        };

        let Some((start, end)) = parse_range(range) else {
            return Ok(Self::whole(s));
        };

        if name.is_empty() {
            return Err(Error::InvalidInput(format!("missing reference name: {}", s)));
        }

        // 1-based closed to 0-based half-open
        let start = start.saturating_sub(1);

        if let Some(end) = end {
            if end <= start {
                return Err(Error::InvalidRange(format!("end precedes start: {}", s)));
            }
        }

        Ok(Self {
            reference_name: name.to_string(),
            start: Some(start),
            end,
        })
    }
}

/// Parses `pos`, `start-end` or `start-` into 1-based coordinates.
fn parse_range(range: &str) -> Option<(u64, Option<u64>)> {
    match range.split_once('-') {
        None => {
            let pos = range.parse::<u64>().ok()?;
            Some((pos, Some(pos)))
        }
        Some((start, "")) => Some((start.parse().ok()?, None)),
        Some((start, end)) => Some((start.parse().ok()?, Some(end.parse().ok()?))),
    }
}

/// Parses one line of an interval list: BED (`chrom\tstart\tend`, 0-based
/// half-open) when it has three or more tab-separated columns, otherwise a
/// region string.
pub fn parse_interval_line(line: &str) -> Result<GenomeInterval> {
    let fields: Vec<&str> = line.split('\t').collect();

    if fields.len() < 3 {
        return line.parse();
    }

    let parse_coord = |value: &str| {
        value
            .trim()
            .parse::<u64>()
            .map_err(|e| Error::InvalidRange(format!("invalid BED coordinate {:?}: {}", value, e)))
    };

    let start = parse_coord(fields[1])?;
    let end = parse_coord(fields[2])?;

    if end <= start {
        return Err(Error::InvalidRange(format!("empty BED interval: {}", line)));
    }

    Ok(GenomeInterval::new(fields[0].trim(), start, end))
}

/// Parses a comma-separated list of region strings.
pub fn parse_interval_list(s: &str) -> Result<Vec<GenomeInterval>> {
    s.split(',')
        .map(str::trim)
        .filter(|region| !region.is_empty())
        .map(str::parse)
        .collect()
}

/// Reads intervals from a file, one per line, preserving file order.
pub fn read_interval_list(path: &Path) -> Result<Vec<GenomeInterval>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::NotFound(format!("{}: {}", path.display(), e)))?;

    let mut intervals = Vec::new();

    for (i, line) in contents.lines().enumerate() {
        let line = line.trim_end();

        if line.trim().is_empty()
            || line.starts_with('#')
            || line.starts_with("track")
            || line.starts_with("browser")
        {
            continue;
        }

        let interval = parse_interval_line(line).map_err(|e| {
            Error::InvalidInput(format!("{} line {}: {}", path.display(), i + 1, e))
        })?;

        intervals.push(interval);
    }

    Ok(intervals)
}

/// Container formats the reader can open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Format {
    Bam,
    Cram,
    Sam,
}

impl Format {
    /// Detects the container format from the leading bytes of a file.
    pub fn detect(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| Error::NotFound(format!("{}: {}", path.display(), e)))?;

        let mut magic = Vec::with_capacity(4);
        file.take(4).read_to_end(&mut magic)?;

        Self::from_magic(&magic)
            .ok_or_else(|| Error::UnsupportedFormat(format!("{} is empty", path.display())))
    }

    pub fn from_magic(magic: &[u8]) -> Option<Self> {
        if magic.is_empty() {
            None
        } else if magic.starts_with(b"CRAM") {
            Some(Format::Cram)
        } else if magic.starts_with(&[0x1f, 0x8b]) {
            Some(Format::Bam)
        } else {
            Some(Format::Sam)
        }
    }

    /// Index sidecar extensions, in lookup order
    pub fn index_extensions(&self) -> &'static [&'static str] {
        match self {
            Format::Bam => &["bai", "csi"],
            Format::Cram => &["crai"],
            Format::Sam => &[],
        }
    }

    pub fn is_reference_compressed(&self) -> bool {
        matches!(self, Format::Cram)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Bam => "BAM",
            Format::Cram => "CRAM",
            Format::Sam => "SAM",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_region_with_range() {
        let interval: GenomeInterval = "chr1:100-200".parse().unwrap();
        assert_eq!(interval, GenomeInterval::new("chr1", 99, 200));
        assert_eq!(interval.to_string(), "chr1:100-200");
    }

    #[test]
    fn test_parse_whole_chromosome() {
        let interval: GenomeInterval = "chrX".parse().unwrap();
        assert!(interval.is_whole_chromosome());
        assert_eq!(interval.to_string(), "chrX");
    }

    #[test]
    fn test_parse_single_position() {
        let interval: GenomeInterval = "chr2:50".parse().unwrap();
        assert_eq!(interval, GenomeInterval::new("chr2", 49, 50));
    }

    #[test]
    fn test_parse_open_end() {
        let interval: GenomeInterval = "chr2:50-".parse().unwrap();
        assert_eq!(interval.start, Some(49));
        assert_eq!(interval.end, None);
        assert_eq!(interval.to_string(), "chr2:50-");
    }

    #[test]
    fn test_parse_name_with_colon() {
        let interval: GenomeInterval = "HLA-A*01:01:01:01N".parse().unwrap();
        assert!(interval.is_whole_chromosome());
        assert_eq!(interval.reference_name(), "HLA-A*01:01:01:01N");

        let interval: GenomeInterval = "HLA-A*01:01:01:01N:10-20".parse().unwrap();
        assert_eq!(interval, GenomeInterval::new("HLA-A*01:01:01:01N", 9, 20));
    }

    #[test]
    fn test_parse_invalid_regions() {
        assert!(matches!(
            "".parse::<GenomeInterval>(),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            ":10-20".parse::<GenomeInterval>(),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            "chr1:200-100".parse::<GenomeInterval>(),
            Err(Error::InvalidRange(_))
        ));
    }

    #[test]
    fn test_display_zero_start() {
        let interval = GenomeInterval::new("chr2", 0, 1000);
        assert_eq!(interval.to_string(), "chr2:1-1000");
        assert_eq!(interval.to_string().parse::<GenomeInterval>().unwrap(), interval);
    }

    #[test]
    fn test_overlaps() {
        let interval = GenomeInterval::new("chr1", 100, 200);
        assert!(interval.overlaps("chr1", 150, 160));
        assert!(interval.overlaps("chr1", 199, 300));
        assert!(!interval.overlaps("chr1", 200, 300));
        assert!(!interval.overlaps("chr1", 0, 100));
        assert!(!interval.overlaps("chr2", 150, 160));
        assert!(GenomeInterval::whole("chr1").overlaps("chr1", 5_000_000, 5_000_001));
    }

    #[test]
    fn test_to_interval() {
        let interval = GenomeInterval::new("chr1", 99, 200).to_interval().unwrap();
        assert_eq!(interval.start(), Position::new(100));
        assert_eq!(interval.end(), Position::new(200));

        let interval = GenomeInterval::whole("chr1").to_interval().unwrap();
        assert_eq!(interval.start(), Some(Position::MIN));
        assert_eq!(interval.end(), None);
    }

    #[test]
    fn test_parse_interval_line_bed() {
        let interval = parse_interval_line("chr3\t10\t20\tname").unwrap();
        assert_eq!(interval, GenomeInterval::new("chr3", 10, 20));

        assert!(parse_interval_line("chr3\t20\t10").is_err());
        assert!(parse_interval_line("chr3\tx\t10").is_err());
    }

    #[test]
    fn test_parse_interval_line_rejects_empty() {
        assert!(matches!(
            parse_interval_line("chr1\t155\t155"),
            Err(Error::InvalidRange(_))
        ));
        assert!(matches!(
            parse_interval_line("chr1\t18446744073709551615\t18446744073709551615"),
            Err(Error::InvalidRange(_))
        ));
    }

    #[test]
    fn test_to_interval_rejects_empty_and_out_of_range() {
        assert!(matches!(
            GenomeInterval::new("chr1", 155, 155).to_interval(),
            Err(Error::InvalidRange(_))
        ));
        assert!(matches!(
            GenomeInterval::new("chr1", u64::MAX, u64::MAX).to_interval(),
            Err(Error::InvalidRange(_))
        ));
        assert!(matches!(
            GenomeInterval::new("chr1", 0, 0).to_interval(),
            Err(Error::InvalidRange(_))
        ));
        assert_eq!(
            GenomeInterval::new("chr1", u64::MAX, u64::MAX).to_string(),
            format!("chr1:{}-{}", u64::MAX, u64::MAX)
        );
    }

    #[test]
    fn test_parse_interval_list() {
        let intervals = parse_interval_list("chr2:1-1000, chrX,,chr1:5").unwrap();
        assert_eq!(
            intervals,
            vec![
                GenomeInterval::new("chr2", 0, 1000),
                GenomeInterval::whole("chrX"),
                GenomeInterval::new("chr1", 4, 5),
            ]
        );
    }

    #[test]
    fn test_read_interval_list() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file, "track name=test").unwrap();
        writeln!(file, "chr2\t0\t1000").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "chr1:101-200").unwrap();
        writeln!(file, "chrX").unwrap();

        let intervals = read_interval_list(file.path()).unwrap();
        assert_eq!(
            intervals,
            vec![
                GenomeInterval::new("chr2", 0, 1000),
                GenomeInterval::new("chr1", 100, 200),
                GenomeInterval::whole("chrX"),
            ]
        );
    }

    #[test]
    fn test_read_interval_list_reports_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "chr1:1-10").unwrap();
        writeln!(file, "chr1:10-1").unwrap();

        let err = read_interval_list(file.path()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_read_interval_list_missing() {
        let result = read_interval_list(Path::new("/nonexistent/intervals.txt"));
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_format_from_magic() {
        assert_eq!(Format::from_magic(b"CRAM"), Some(Format::Cram));
        assert_eq!(Format::from_magic(&[0x1f, 0x8b, 0x08, 0x04]), Some(Format::Bam));
        assert_eq!(Format::from_magic(b"@HD\t"), Some(Format::Sam));
        assert_eq!(Format::from_magic(b""), None);
    }

    #[test]
    fn test_format_detect() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"CRAM\x03\x00").unwrap();
        assert_eq!(Format::detect(file.path()).unwrap(), Format::Cram);

        let empty = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            Format::detect(empty.path()),
            Err(Error::UnsupportedFormat(_))
        ));

        assert!(matches!(
            Format::detect(Path::new("/nonexistent/reads.bam")),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_format_index_extensions() {
        assert_eq!(Format::Bam.index_extensions(), &["bai", "csi"]);
        assert!(Format::Sam.index_extensions().is_empty());
        assert!(Format::Cram.is_reference_compressed());
        assert!(!Format::Bam.is_reference_compressed());
    }
}
