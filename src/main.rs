use anyhow::Context;
use clap::Parser;
use noodles::sam;
use noodles::sam::alignment::RecordBuf;
use noodles::sam::alignment::io::Write as _;
use serde::Serialize;
use std::io::{self, BufWriter, Write};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use htsreadr::{AccessMode, Config, Format, OrderedRecordReader, config::OutputFormat};

#[derive(Debug, Serialize)]
struct Summary {
    format: Format,
    mode: AccessMode,
    records: u64,
    intervals: Vec<IntervalSummary>,
}

#[derive(Debug, Serialize)]
struct IntervalSummary {
    interval: String,
    records: u64,
}

fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Logs go to stderr so stdout carries only records
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let intervals = config.intervals()?;

    let mut reader =
        OrderedRecordReader::with_options(&config.input, intervals, config.reader_options())
            .with_context(|| format!("failed to open {}", config.input.display()))?;

    match config.output {
        OutputFormat::Sam => write_sam(&mut reader)?,
        OutputFormat::Count => println!("{}", count(&mut reader)?),
        OutputFormat::Summary => {
            let summary = summarize(&mut reader)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    reader.close();

    Ok(())
}

fn write_sam(reader: &mut OrderedRecordReader) -> anyhow::Result<()> {
    let header = reader.header().cloned().context("reader is closed")?;

    let stdout = io::stdout().lock();
    let mut writer = sam::io::Writer::new(BufWriter::new(stdout));
    writer.write_header(&header)?;

    let mut record = RecordBuf::default();
    while reader.read(&mut record)? {
        writer.write_alignment_record(&header, &record)?;
    }

    writer.into_inner().flush()?;

    Ok(())
}

fn count(reader: &mut OrderedRecordReader) -> anyhow::Result<u64> {
    let mut n = 0;
    let mut record = RecordBuf::default();

    while reader.read(&mut record)? {
        n += 1;
    }

    Ok(n)
}

fn summarize(reader: &mut OrderedRecordReader) -> anyhow::Result<Summary> {
    let mut intervals: Vec<IntervalSummary> = if reader.random_access_enabled() {
        reader
            .intervals()
            .iter()
            .map(|interval| IntervalSummary {
                interval: interval.to_string(),
                records: 0,
            })
            .collect()
    } else {
        Vec::new()
    };

    let mut records = 0;
    let mut record = RecordBuf::default();

    while reader.read(&mut record)? {
        records += 1;

        // The cursor sits one past the interval being drained
        if let Some(entry) = reader
            .interval_index()
            .checked_sub(1)
            .and_then(|i| intervals.get_mut(i))
        {
            entry.records += 1;
        }
    }

    Ok(Summary {
        format: reader.format(),
        mode: reader.mode(),
        records,
        intervals,
    })
}
