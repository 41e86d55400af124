//! Base/current/mapping reconciliation.
//!
//! [`reconcile()`] inner-joins the base and current tables on the resolved key
//! and then left-joins the optional mapping table onto the result. Every
//! output column remembers which input it came from ([`Side`]) so later stages
//! can look metrics up per period even after collision suffixes are applied.

use std::collections::{HashMap, HashSet};

use log::{debug, info};

use crate::{
    data::{Table, Value},
    error::{ReconError, ReconResult, Snapshot, Warning},
    keys,
    stage::PerformanceStage,
};

pub const BASE_SUFFIX: &str = "_base";
pub const CURRENT_SUFFIX: &str = "_current";
pub const MAPPING_SUFFIX: &str = "_mapping";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Key,
    Base,
    Current,
    Mapping,
    Derived,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Header written to the export.
    pub name: String,
    /// Header as it appeared in the input table.
    pub source: String,
    pub side: Side,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MerchantRecord {
    pub key: String,
    pub values: Vec<Value>,
    pub stage: Option<PerformanceStage>,
}

impl MerchantRecord {
    pub fn value(&self, column: usize) -> &Value {
        static NULL: Value = Value::Null;
        self.values.get(column).unwrap_or(&NULL)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledTable {
    pub key: String,
    pub columns: Vec<Column>,
    pub records: Vec<MerchantRecord>,
}

impl ReconciledTable {
    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Positions and source names of the columns that came from `side`.
    pub fn side_columns(&self, side: Side) -> Vec<(usize, &str)> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.side == side)
            .map(|(idx, c)| (idx, c.source.as_str()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Appends a derived column. `values` holds one entry per record.
    pub fn push_derived(&mut self, name: &str, values: Vec<Value>) {
        debug_assert_eq!(values.len(), self.records.len());
        let name = unique_name(name, &self.columns.iter().map(|c| c.name.clone()).collect());
        self.columns.push(Column {
            source: name.clone(),
            name,
            side: Side::Derived,
        });
        for (record, value) in self.records.iter_mut().zip(values) {
            record.values.push(value);
        }
    }

    /// Copy restricted to the records accepted by `keep`, columns unchanged.
    pub fn retain_records<F>(&self, mut keep: F) -> ReconciledTable
    where
        F: FnMut(&MerchantRecord) -> bool,
    {
        ReconciledTable {
            key: self.key.clone(),
            columns: self.columns.clone(),
            records: self.records.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub table: ReconciledTable,
    pub warnings: Vec<Warning>,
}

/// Joins normalized tables on `key`.
///
/// Output holds one record per key present in both base and current, in base
/// row order. The mapping table, when it carries `key`, only adds columns.
pub fn reconcile(
    base: &Table,
    current: &Table,
    key: &str,
    mapping: Option<&Table>,
) -> ReconResult<Reconciliation> {
    let base_key = base
        .column_index(key)
        .ok_or_else(|| missing_key(key, Snapshot::Base))?;
    let current_key = current
        .column_index(key)
        .ok_or_else(|| missing_key(key, Snapshot::Current))?;

    let mut warnings = Vec::new();
    let base_rows = unique_rows(base, base_key, Snapshot::Base, &mut warnings);
    let current_rows = unique_rows(current, current_key, Snapshot::Current, &mut warnings);
    let current_lookup: HashMap<&str, usize> = current_rows
        .iter()
        .map(|(k, idx)| (k.as_str(), *idx))
        .collect();

    let (columns, current_columns) =
        build_output_columns(&base.headers, &current.headers, base_key, current_key);

    let mut records = Vec::new();
    for (merchant, base_idx) in &base_rows {
        let Some(&current_idx) = current_lookup.get(merchant.as_str()) else {
            continue;
        };
        let mut values = base.rows[*base_idx].clone();
        values.resize(base.headers.len(), Value::Null);
        values.extend(
            current_columns
                .iter()
                .map(|idx| current.cell(current_idx, *idx).clone()),
        );
        records.push(MerchantRecord {
            key: merchant.clone(),
            values,
            stage: None,
        });
    }
    info!(
        "Matched {} merchant(s) across {} base and {} current key(s)",
        records.len(),
        base_rows.len(),
        current_rows.len()
    );

    let mut table = ReconciledTable {
        key: key.to_string(),
        columns,
        records,
    };

    if let Some(mapping) = mapping {
        match keys::mapping_key_index(&mapping.headers, key) {
            Some(mapping_key) => merge_mapping(&mut table, mapping, mapping_key, &mut warnings),
            None => warnings.push(Warning::MappingKeyAbsent {
                key: key.to_string(),
            }),
        }
    }

    Ok(Reconciliation { table, warnings })
}

fn missing_key(key: &str, side: Snapshot) -> ReconError {
    ReconError::MissingKeyColumn {
        key: key.to_string(),
        side,
    }
}

pub fn key_text(value: &Value) -> String {
    value.as_display().trim().to_string()
}

/// First row index per key value, in table order. Blank keys and repeats are
/// dropped and reported.
fn unique_rows(
    table: &Table,
    key_idx: usize,
    source: Snapshot,
    warnings: &mut Vec<Warning>,
) -> Vec<(String, usize)> {
    let mut rows: Vec<(String, usize)> = Vec::with_capacity(table.rows.len());
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(table.rows.len());
    let mut extras: Vec<usize> = Vec::with_capacity(table.rows.len());
    let mut blanks = 0usize;

    for row_idx in 0..table.rows.len() {
        let merchant = key_text(table.cell(row_idx, key_idx));
        if merchant.is_empty() {
            blanks += 1;
            continue;
        }
        if let Some(&pos) = positions.get(&merchant) {
            extras[pos] += 1;
            continue;
        }
        positions.insert(merchant.clone(), rows.len());
        rows.push((merchant, row_idx));
        extras.push(0);
    }

    if blanks > 0 {
        warnings.push(Warning::BlankKeys {
            table: source,
            rows: blanks,
        });
    }
    warnings.extend(
        rows.iter()
            .zip(&extras)
            .filter(|(_, extra)| **extra > 0)
            .map(|((key, _), extra)| Warning::DuplicateKey {
                table: source,
                key: key.clone(),
                extra_rows: *extra,
            }),
    );
    rows
}

/// Base columns (key in place), then the non-key current columns. Names shared
/// by both sides get period suffixes.
fn build_output_columns(
    base_headers: &[String],
    current_headers: &[String],
    base_key: usize,
    current_key: usize,
) -> (Vec<Column>, Vec<usize>) {
    let base_names: HashSet<&str> = base_headers
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != base_key)
        .map(|(_, h)| h.as_str())
        .collect();
    let current_names: HashSet<&str> = current_headers
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != current_key)
        .map(|(_, h)| h.as_str())
        .collect();

    let mut seen: HashSet<String> = HashSet::new();
    let mut columns = Vec::with_capacity(base_headers.len() + current_headers.len());

    for (idx, name) in base_headers.iter().enumerate() {
        let (side, candidate) = if idx == base_key {
            (Side::Key, name.clone())
        } else if current_names.contains(name.as_str()) {
            (Side::Base, format!("{name}{BASE_SUFFIX}"))
        } else {
            (Side::Base, name.clone())
        };
        let output = unique_name(&candidate, &seen);
        seen.insert(output.clone());
        columns.push(Column {
            name: output,
            source: name.clone(),
            side,
        });
    }

    let mut current_columns = Vec::new();
    for (idx, name) in current_headers.iter().enumerate() {
        if idx == current_key {
            continue;
        }
        let candidate = if base_names.contains(name.as_str()) {
            format!("{name}{CURRENT_SUFFIX}")
        } else {
            name.clone()
        };
        let output = unique_name(&candidate, &seen);
        seen.insert(output.clone());
        columns.push(Column {
            name: output,
            source: name.clone(),
            side: Side::Current,
        });
        current_columns.push(idx);
    }

    (columns, current_columns)
}

fn merge_mapping(
    table: &mut ReconciledTable,
    mapping: &Table,
    mapping_key: usize,
    warnings: &mut Vec<Warning>,
) {
    let lookup: HashMap<String, usize> = unique_rows(mapping, mapping_key, Snapshot::Mapping, warnings)
        .into_iter()
        .collect();

    let mut seen: HashSet<String> = table.columns.iter().map(|c| c.name.clone()).collect();
    let mut mapping_columns = Vec::new();
    for (idx, name) in mapping.headers.iter().enumerate() {
        if idx == mapping_key {
            continue;
        }
        let candidate = if seen.contains(name) {
            format!("{name}{MAPPING_SUFFIX}")
        } else {
            name.clone()
        };
        let output = unique_name(&candidate, &seen);
        seen.insert(output.clone());
        table.columns.push(Column {
            name: output,
            source: name.clone(),
            side: Side::Mapping,
        });
        mapping_columns.push(idx);
    }

    let mut matched = 0usize;
    for record in &mut table.records {
        match lookup.get(&record.key) {
            Some(&row_idx) => {
                matched += 1;
                record
                    .values
                    .extend(mapping_columns.iter().map(|idx| mapping.cell(row_idx, *idx).clone()));
            }
            None => record
                .values
                .extend(mapping_columns.iter().map(|_| Value::Null)),
        }
    }
    debug!(
        "Mapping enriched {} of {} record(s) with {} column(s)",
        matched,
        table.records.len(),
        mapping_columns.len()
    );
}

fn unique_name(candidate: &str, seen: &HashSet<String>) -> String {
    if !seen.contains(candidate) {
        return candidate.to_string();
    }
    let mut counter = 1usize;
    loop {
        let next = format!("{candidate}_{counter}");
        if !seen.contains(&next) {
            return next;
        }
        counter += 1;
    }
}
