use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::stage::StagePreset;

pub const DEFAULT_EXPORT: &str = "merchant_performance_report.csv";

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Reconcile base and current merchant snapshots into growth and performance stages",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Join the snapshots, compute growth, tag stages and export the result
    Reconcile(ReconcileArgs),
    /// Print aggregate statistics for the reconciled merchants
    Summary(SummaryArgs),
    /// Write the default run configuration as YAML
    Config(ConfigArgs),
}

/// Inputs shared by `reconcile` and `summary`.
#[derive(Debug, Args)]
pub struct InputArgs {
    /// Base period snapshot (CSV or TSV)
    #[arg(short = 'b', long)]
    pub base: PathBuf,
    /// Current period snapshot (CSV or TSV)
    #[arg(short = 'c', long)]
    pub current: PathBuf,
    /// Optional merchant attribute table keyed on the same merchant key
    #[arg(short = 'm', long)]
    pub mapping: Option<PathBuf>,
    /// YAML run configuration (defaults to the built-in merchant layout)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Stage thresholds to use instead of the configured ones
    #[arg(long, value_enum)]
    pub preset: Option<StagePreset>,
    /// Restrict to merchants whose filter attribute equals this value ('All' for no restriction)
    #[arg(short = 'f', long)]
    pub filter: Option<String>,
    /// Attribute column the filter applies to (overrides the configured one)
    #[arg(long = "filter-attribute")]
    pub filter_attribute: Option<String>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct ReconcileArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Export destination; use '-' for stdout
    #[arg(short = 'o', long, default_value = DEFAULT_EXPORT)]
    pub output: PathBuf,
    /// Delimiter for the export (defaults from the output extension)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum SummaryFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Output format for the statistics
    #[arg(long, value_enum, default_value = "table")]
    pub format: SummaryFormat,
    /// List the distinct values of the filter attribute instead of statistics
    #[arg(long = "list-filter-values")]
    pub list_filter_values: bool,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Stage thresholds to embed in the generated configuration
    #[arg(long, value_enum, default_value = "two-tier")]
    pub preset: StagePreset,
    /// Destination YAML file; prints to stdout when omitted
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,
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

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn delimiter_names() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter("semicolon"), Ok(b';'));
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("ab").is_err());
    }

    #[test]
    fn reconcile_defaults_export_path() {
        let cli = Cli::try_parse_from([
            "merchant-recon",
            "reconcile",
            "--base",
            "b.csv",
            "--current",
            "c.csv",
        ])
        .unwrap();
        let Commands::Reconcile(args) = cli.command else {
            panic!("expected reconcile");
        };
        assert_eq!(args.output, PathBuf::from(DEFAULT_EXPORT));
        assert!(args.input.mapping.is_none());
    }

    #[test]
    fn config_preset_parses_kebab_case() {
        let cli = Cli::try_parse_from(["merchant-recon", "config", "--preset", "four-tier"]).unwrap();
        let Commands::Config(args) = cli.command else {
            panic!("expected config");
        };
        assert_eq!(args.preset, StagePreset::FourTier);
    }
}
