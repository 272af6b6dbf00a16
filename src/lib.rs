pub mod cli;
pub mod column;
pub mod data;
pub mod ingest;
pub mod io_utils;
pub mod normalize;
pub mod pattern;
pub mod report;
pub mod workbook;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};

use crate::{
    cli::{Cli, Commands},
    column::Column,
    ingest::IngestOptions,
    report::ProbeReport,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("tabular_probe", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Probe(args) => handle_probe(&args),
        Commands::Convert(args) => handle_convert(&args),
    }
}

fn handle_probe(args: &cli::ProbeArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    info!(
        "Probing '{}' with delimiter '{}'",
        args.input.display(),
        printable_delimiter(delimiter)
    );
    let options = IngestOptions {
        has_headers: !args.no_headers,
        row_limit: args.limit,
        extra_absent_tokens: args.absent_tokens.clone(),
    };
    let columns = ingest::read_source(&args.input, args.sheet.as_deref(), delimiter, encoding, &options)
        .with_context(|| format!("Probing {:?}", args.input))?;
    let report = ProbeReport::from_columns(&columns);
    if let Some(path) = &args.report {
        report
            .save(path)
            .with_context(|| format!("Writing report to {path:?}"))?;
        info!(
            "Report for {} column(s) written to {:?}",
            report.columns.len(),
            path
        );
    }
    print!("{}", report.render());
    Ok(())
}

fn handle_convert(args: &cli::ConvertArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let output_delimiter = args.output_delimiter.unwrap_or(io_utils::DEFAULT_CSV_DELIMITER);
    info!(
        "Converting '{}' -> {}",
        args.input.display(),
        args.output
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "stdout".into())
    );
    let options = IngestOptions {
        has_headers: !args.no_headers,
        row_limit: args.limit,
        extra_absent_tokens: args.absent_tokens.clone(),
    };
    let columns = ingest::read_source(&args.input, args.sheet.as_deref(), delimiter, encoding, &options)
        .with_context(|| format!("Converting {:?}", args.input))?;
    write_converted(&columns, args.output.as_deref(), output_delimiter, !args.no_headers)
}

fn write_converted(
    columns: &[Column],
    output: Option<&std::path::Path>,
    delimiter: u8,
    write_headers: bool,
) -> Result<()> {
    let mut writer = io_utils::open_csv_writer(output, delimiter)?;
    if write_headers && columns.iter().any(|column| column.name().is_some()) {
        let headers: Vec<String> = columns
            .iter()
            .map(|column| column.name().unwrap_or_default().to_string())
            .collect();
        writer.write_record(&headers).context("Writing header row")?;
    }
    for row in 0..ingest::row_count(columns) {
        let record: Vec<String> = columns
            .iter()
            .map(|column| column.values()[row].display_string())
            .collect();
        writer
            .write_record(&record)
            .with_context(|| format!("Writing row {}", row + 1))?;
    }
    writer.flush().context("Flushing converted output")?;
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
