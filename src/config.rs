use crate::reader::ReaderOptions;
use crate::types::{GenomeInterval, parse_interval_list, read_interval_list};
use crate::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// What the binary writes to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// SAM header and records
    Sam,
    /// Number of records
    Count,
    /// JSON summary with per-interval record counts
    Summary,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "htsreadr")]
#[command(about = "Read BAM/CRAM/SAM records in file order or interval by interval")]
pub struct Config {
    /// Input BAM, CRAM or SAM file
    pub input: PathBuf,

    /// Region to read (chr, chr:pos, chr:start-end); repeatable, comma-separated lists allowed
    #[arg(short = 'i', long = "interval", value_name = "REGION")]
    pub regions: Vec<String>,

    /// File of intervals, one per line (region strings or BED)
    #[arg(short = 'I', long, value_name = "PATH")]
    pub interval_file: Option<PathBuf>,

    /// Reference FASTA with .fai index, required for CRAM
    #[arg(short, long, env = "HTSREADR_REFERENCE")]
    pub reference: Option<PathBuf>,

    /// Fail when intervals are given but the input has no index
    #[arg(long, env = "HTSREADR_REQUIRE_INDEX")]
    pub require_index: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "sam")]
    pub output: OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "warn")]
    pub log_level: String,
}

impl Config {
    /// Intervals from `--interval` values followed by the interval file.
    pub fn intervals(&self) -> Result<Vec<GenomeInterval>> {
        let mut intervals = Vec::new();

        for region in &self.regions {
            intervals.extend(parse_interval_list(region)?);
        }

        if let Some(path) = &self.interval_file {
            intervals.extend(read_interval_list(path)?);
        }

        Ok(intervals)
    }

    pub fn reader_options(&self) -> ReaderOptions {
        ReaderOptions {
            reference: self.reference.clone(),
            require_index: self.require_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_intervals_in_argument_order() {
        let config = Config::try_parse_from([
            "htsreadr",
            "reads.bam",
            "-i",
            "chr2:1-1000,chrX",
            "--interval",
            "chr1:5",
        ])
        .unwrap();

        let intervals = config.intervals().unwrap();
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
    fn test_intervals_include_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "chr3\t10\t20").unwrap();

        let config = Config {
            input: PathBuf::from("reads.bam"),
            regions: vec!["chr1".to_string()],
            interval_file: Some(file.path().to_path_buf()),
            reference: None,
            require_index: false,
            output: OutputFormat::Count,
            log_level: "warn".to_string(),
        };

        let intervals = config.intervals().unwrap();
        assert_eq!(
            intervals,
            vec![
                GenomeInterval::whole("chr1"),
                GenomeInterval::new("chr3", 10, 20),
            ]
        );
    }

    #[test]
    fn test_invalid_region_rejected() {
        let config = Config::try_parse_from(["htsreadr", "reads.bam", "-i", "chr1:20-10"]).unwrap();
        assert!(config.intervals().is_err());
    }

    #[test]
    fn test_reader_options() {
        let config = Config::try_parse_from([
            "htsreadr",
            "reads.cram",
            "--reference",
            "ref.fa",
            "--require-index",
            "-o",
            "summary",
        ])
        .unwrap();

        let options = config.reader_options();
        assert_eq!(options.reference, Some(PathBuf::from("ref.fa")));
        assert!(options.require_index);
        assert_eq!(config.output, OutputFormat::Summary);
    }

    #[test]
    fn test_missing_input_rejected() {
        assert!(Config::try_parse_from(["htsreadr"]).is_err());
    }
}
