pub mod cli;
pub mod columns;
pub mod config;
pub mod config_cmd;
pub mod data;
pub mod error;
pub mod filter;
pub mod growth;
pub mod io_utils;
pub mod join;
pub mod keys;
pub mod pipeline;
pub mod reconcile_cmd;
pub mod stage;
pub mod summary;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::cli::{Cli, Commands};

pub use crate::{
    config::ReconConfig,
    data::{Table, Value},
    error::{ReconError, ReconResult, Snapshot, Warning},
    pipeline::{Inputs, RunOutput, run as reconcile_snapshots},
    stage::{PerformanceStage, StagePreset, StageScheme},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("merchant_recon", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Reconcile(args) => reconcile_cmd::execute(&args),
        Commands::Summary(args) => reconcile_cmd::summarize(&args),
        Commands::Config(args) => config_cmd::execute(&args),
    }
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
