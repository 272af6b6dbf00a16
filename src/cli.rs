use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about = "Infer column types and formats from tabular data", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Probe a tabular source and report inferred column types and patterns
    Probe(ProbeArgs),
    /// Convert a tabular source into normalized CSV using inferred types
    Convert(ConvertArgs),
}

#[derive(Debug, Args)]
pub struct ProbeArgs {
    /// Input file to inspect (.csv, .tsv, or .xlsx; '-' reads CSV from stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Optional destination for the YAML report
    #[arg(short = 'o', long = "report")]
    pub report: Option<PathBuf>,
    /// Worksheet name for workbook inputs (defaults to the first sheet)
    #[arg(long)]
    pub sheet: Option<String>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of delimited-text input (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Limit number of data rows to read
    #[arg(long)]
    pub limit: Option<usize>,
    /// Treat the first row as data rather than column labels
    #[arg(long = "no-headers")]
    pub no_headers: bool,
    /// Additional sentinel tokens treated as absent values (repeatable)
    #[arg(long = "absent", action = clap::ArgAction::Append)]
    pub absent_tokens: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Input file to convert (.csv, .tsv, or .xlsx; '-' reads CSV from stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Worksheet name for workbook inputs (defaults to the first sheet)
    #[arg(long)]
    pub sheet: Option<String>,
    /// CSV delimiter character for reading input
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Delimiter to use for output (defaults to ',')
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Character encoding of delimited-text input (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Limit number of data rows to read
    #[arg(long)]
    pub limit: Option<usize>,
    /// Treat the first row as data rather than column labels
    #[arg(long = "no-headers")]
    pub no_headers: bool,
    /// Additional sentinel tokens treated as absent values (repeatable)
    #[arg(long = "absent", action = clap::ArgAction::Append)]
    pub absent_tokens: Vec<String>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
