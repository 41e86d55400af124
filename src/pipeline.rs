//! End-to-end run: normalize → resolve key → reconcile → growth → classify.
//!
//! [`run`] owns private copies of every derived table; the caller's inputs are
//! only read. Summaries are produced afterwards with [`RunOutput::summarize`],
//! which can be called again for each filter choice.

use log::{info, warn};

use crate::{
    columns::normalize_table,
    config::{ReconConfig, StageBasis},
    data::{Table, Value},
    error::{ReconError, ReconResult, Warning},
    filter::AttributeFilter,
    growth::{self, GrowthColumns},
    join::{self, ReconciledTable},
    keys,
    summary::{self, SummaryReport},
};

pub const STAGE_COLUMN: &str = "performance tag";

/// The three uploaded snapshots. Only `mapping` is optional.
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    pub base: Table,
    pub current: Table,
    pub mapping: Option<Table>,
}

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub key: String,
    pub table: ReconciledTable,
    pub columns: GrowthColumns,
    pub warnings: Vec<Warning>,
}

impl RunOutput {
    pub fn key_notice(&self) -> String {
        keys::key_notice(&self.key)
    }

    pub fn warning_messages(&self) -> Vec<String> {
        self.warnings.iter().map(ToString::to_string).collect()
    }

    pub fn summarize(
        &self,
        config: &ReconConfig,
        filter: Option<&AttributeFilter>,
    ) -> (SummaryReport, Vec<Warning>) {
        summary::summarize(&self.table, &self.columns, &config.summary, filter)
    }
}

pub fn run(inputs: &Inputs, config: &ReconConfig) -> ReconResult<RunOutput> {
    config.validate()?;
    let scheme = config.stage.scheme()?;

    let base = normalize_table(&inputs.base);
    let current = normalize_table(&inputs.current);
    let mapping = inputs.mapping.as_ref().map(normalize_table);

    let key = keys::resolve_key(&base.headers, &current.headers, &config.key_candidates)?;
    let join::Reconciliation {
        mut table,
        mut warnings,
    } = join::reconcile(&base, &current, &key, mapping.as_ref())?;

    let mut columns = growth::apply(&mut table, &config.fields, &config.ratios)?;
    warnings.append(&mut columns.warnings);

    let metric = columns
        .field(&config.stage.metric)
        .ok_or_else(|| {
            ReconError::InvalidConfig(format!(
                "stage metric '{}' is not a resolved field",
                config.stage.metric
            ))
        })?;
    let source = match config.stage.basis {
        StageBasis::Growth => metric.growth,
        StageBasis::Change => metric.change,
    };
    let stages: Vec<Value> = table
        .records
        .iter_mut()
        .map(|record| {
            let stage = scheme.classify(record.value(source).as_f64());
            record.stage = Some(stage);
            Value::Text(stage.label().to_string())
        })
        .collect();
    table.push_derived(STAGE_COLUMN, stages);

    for warning in &warnings {
        warn!("{warning}");
    }
    info!(
        "Reconciled {} merchant(s) on '{}' with {} warning(s)",
        table.len(),
        key,
        warnings.len()
    );

    Ok(RunOutput {
        key,
        table,
        columns,
        warnings,
    })
}
