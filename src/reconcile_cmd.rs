use std::path::Path;

use anyhow::{Context, Result, anyhow};
use encoding_rs::Encoding;
use log::{info, warn};

use crate::{
    cli::{InputArgs, ReconcileArgs, SummaryArgs, SummaryFormat},
    config::ReconConfig,
    data::Table,
    filter::{self, AttributeFilter},
    io_utils,
    join::ReconciledTable,
    pipeline::{self, Inputs, RunOutput},
    printable_delimiter,
    summary::SummaryReport,
    table,
};

/// A finished pipeline run plus the filter the caller asked for.
struct Prepared {
    config: ReconConfig,
    output: RunOutput,
    filter_attribute: Option<String>,
    filter: Option<AttributeFilter>,
}

impl Prepared {
    /// Records the filter selects, with any filter warning already logged.
    fn selected(&self) -> ReconciledTable {
        let mut warnings = Vec::new();
        let selected = filter::restrict(&self.output.table, self.filter.as_ref(), &mut warnings);
        for warning in &warnings {
            warn!("{warning}");
        }
        selected
    }

    fn report(&self) -> SummaryReport {
        let (report, warnings) = self.output.summarize(&self.config, self.filter.as_ref());
        for warning in &warnings {
            warn!("{warning}");
        }
        report
    }
}

fn load_config(args: &InputArgs) -> Result<ReconConfig> {
    let config = match &args.config {
        Some(path) => ReconConfig::load(path)
            .with_context(|| format!("Loading configuration from {path:?}"))?,
        None => ReconConfig::default(),
    };
    Ok(match args.preset {
        Some(preset) => config.with_preset(preset),
        None => config,
    })
}

fn load_table(path: &Path, delimiter: Option<u8>, encoding: &'static Encoding) -> Result<Table> {
    let delimiter = io_utils::resolve_input_delimiter(path, delimiter);
    info!(
        "Reading '{}' with delimiter '{}'",
        path.display(),
        printable_delimiter(delimiter)
    );
    io_utils::read_table(path, delimiter, encoding)
}

fn prepare(args: &InputArgs) -> Result<Prepared> {
    let config = load_config(args)?;
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let inputs = Inputs {
        base: load_table(&args.base, args.delimiter, encoding)?,
        current: load_table(&args.current, args.delimiter, encoding)?,
        mapping: args
            .mapping
            .as_deref()
            .map(|path| load_table(path, args.delimiter, encoding))
            .transpose()?,
    };
    let output = pipeline::run(&inputs, &config).context("Reconciling merchant snapshots")?;

    let filter_attribute = args
        .filter_attribute
        .clone()
        .or_else(|| config.normalized_filter_attribute());
    let filter = match (&args.filter, &filter_attribute) {
        (None, _) => None,
        (Some(value), Some(attribute)) => AttributeFilter::new(attribute, value),
        (Some(_), None) => {
            return Err(anyhow!(
                "--filter needs a filter attribute; pass --filter-attribute or set filter_attribute in the configuration"
            ));
        }
    };

    Ok(Prepared {
        config,
        output,
        filter_attribute,
        filter,
    })
}

pub fn execute(args: &ReconcileArgs) -> Result<()> {
    let prepared = prepare(&args.input)?;
    let selected = prepared.selected();

    let delimiter = io_utils::resolve_output_delimiter(&args.output, args.output_delimiter);
    let mut writer = io_utils::open_csv_writer(&args.output, delimiter)?;
    io_utils::write_export(&mut writer, &selected)
        .with_context(|| format!("Writing export to {:?}", args.output))?;
    if io_utils::is_dash(&args.output) {
        info!("Exported {} merchant(s) to stdout", selected.len());
    } else {
        info!(
            "Exported {} merchant(s) to {:?}",
            selected.len(),
            args.output
        );
    }

    for row in prepared.report().display_rows() {
        info!("{}: {}", row[0], row[1]);
    }
    Ok(())
}

pub fn summarize(args: &SummaryArgs) -> Result<()> {
    let prepared = prepare(&args.input)?;

    if args.list_filter_values {
        let attribute = prepared.filter_attribute.as_deref().ok_or_else(|| {
            anyhow!("No filter attribute configured; pass --filter-attribute")
        })?;
        let mut rows = vec![vec![filter::ALL.to_string()]];
        rows.extend(
            filter::attribute_values(&prepared.output.table, attribute)
                .into_iter()
                .map(|value| vec![value]),
        );
        table::print_table(&[attribute.to_string()], &rows);
        return Ok(());
    }

    let report = prepared.report();
    match args.format {
        SummaryFormat::Table => {
            let headers = vec!["metric".to_string(), "value".to_string()];
            table::print_table(&headers, &report.display_rows());
        }
        SummaryFormat::Json => {
            let json = serde_json::to_string_pretty(&report.to_flat())
                .context("Serializing summary as JSON")?;
            println!("{json}");
        }
    }
    Ok(())
}
