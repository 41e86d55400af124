//! Aggregate statistics over a reconciled, classified record set.

use std::collections::BTreeMap;

use log::debug;
use serde::Serialize;

use crate::{
    config::{FieldRef, SummaryConfig},
    error::Warning,
    filter::{self, AttributeFilter},
    growth::GrowthColumns,
    join::ReconciledTable,
    stage::PerformanceStage,
};

pub const TOTAL_METRIC: &str = "total_merchants";

/// Snapshot of one (possibly filtered) record set. Rebuilt on every call to
/// [`summarize`]; never patched in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryReport {
    pub total_records: usize,
    /// Every stage, in declaration order, zero when unused.
    pub stage_counts: Vec<(PerformanceStage, usize)>,
    pub sums: Vec<(String, f64)>,
    pub ratios: Vec<(String, f64)>,
}

impl SummaryReport {
    pub fn stage_count(&self, stage: PerformanceStage) -> usize {
        self.stage_counts
            .iter()
            .find(|(s, _)| *s == stage)
            .map_or(0, |(_, count)| *count)
    }

    pub fn sum(&self, label: &str) -> Option<f64> {
        lookup(&self.sums, label)
    }

    pub fn ratio(&self, name: &str) -> Option<f64> {
        lookup(&self.ratios, name)
    }

    /// Flat metric map: `total_merchants`, `stage.<stage>`, `sum.<field>_<period>`,
    /// `ratio.<name>`.
    pub fn to_flat(&self) -> BTreeMap<String, f64> {
        let mut flat = BTreeMap::new();
        flat.insert(TOTAL_METRIC.to_string(), self.total_records as f64);
        for (stage, count) in &self.stage_counts {
            flat.insert(format!("stage.{}", stage.token()), *count as f64);
        }
        for (label, value) in &self.sums {
            flat.insert(format!("sum.{label}"), *value);
        }
        for (name, value) in &self.ratios {
            flat.insert(format!("ratio.{}", name.replace(' ', "_")), *value);
        }
        flat
    }

    /// `(metric, value)` rows in display order for the terminal table.
    pub fn display_rows(&self) -> Vec<Vec<String>> {
        let mut rows = vec![vec![
            "Total Merchants".to_string(),
            self.total_records.to_string(),
        ]];
        rows.extend(
            self.stage_counts
                .iter()
                .map(|(stage, count)| vec![stage.label().to_string(), count.to_string()]),
        );
        rows.extend(
            self.sums
                .iter()
                .map(|(label, value)| vec![format!("Sum {label}"), format_number(*value)]),
        );
        rows.extend(
            self.ratios
                .iter()
                .map(|(name, value)| vec![name.clone(), format_number(*value)]),
        );
        rows
    }
}

fn lookup(entries: &[(String, f64)], name: &str) -> Option<f64> {
    entries.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.4}")
    }
}

/// Summarizes `table`, restricted by `filter` when given.
///
/// Sums skip null cells. Ratios are `sum(numerator) / sum(denominator)` and
/// fall back to 0 when the denominator sum is not positive. Metrics whose
/// field was not resolved for this run are left out of the report.
pub fn summarize(
    table: &ReconciledTable,
    columns: &GrowthColumns,
    spec: &SummaryConfig,
    filter: Option<&AttributeFilter>,
) -> (SummaryReport, Vec<Warning>) {
    let mut warnings = Vec::new();
    let records = filter::restrict(table, filter, &mut warnings);

    let mut stage_counts: Vec<(PerformanceStage, usize)> =
        PerformanceStage::ALL.iter().map(|s| (*s, 0)).collect();
    for record in &records.records {
        let stage = record.stage.unwrap_or(PerformanceStage::Unknown);
        if let Some(entry) = stage_counts.iter_mut().find(|(s, _)| *s == stage) {
            entry.1 += 1;
        }
    }

    let column_sum = |field: &FieldRef| -> Option<f64> {
        let column = columns.field(&field.field)?.period_column(field.period);
        Some(
            records
                .records
                .iter()
                .filter_map(|r| r.value(column).as_f64())
                .sum(),
        )
    };

    let sums = spec
        .sums
        .iter()
        .filter_map(|field| column_sum(field).map(|total| (field.label(), total)))
        .collect();

    let ratios = spec
        .ratios
        .iter()
        .filter_map(|ratio| {
            let numerator = column_sum(&ratio.numerator)?;
            let denominator = column_sum(&ratio.denominator)?;
            let value = if denominator > 0.0 {
                numerator / denominator
            } else {
                0.0
            };
            Some((ratio.name.clone(), value))
        })
        .collect();

    debug!(
        "Summarized {} of {} record(s)",
        records.len(),
        table.len()
    );
    let report = SummaryReport {
        total_records: records.len(),
        stage_counts,
        sums,
        ratios,
    };
    (report, warnings)
}
