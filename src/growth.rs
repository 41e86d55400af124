//! Period-over-period growth metrics.
//!
//! Each declared [`FieldSpec`] is resolved against the base-period and
//! current-period columns of a [`ReconciledTable`], then every record gets an
//! absolute change and a growth percentage. A base of exactly zero yields a
//! null growth value for that record only.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    columns::{FieldSpec, resolve},
    data::Value,
    error::{Period, ReconError, ReconResult, Warning},
    join::{ReconciledTable, Side},
};

/// Per-record ratio of two declared fields read from one period,
/// e.g. success rate = successful / total.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RatioSpec {
    pub name: String,
    pub numerator: String,
    pub denominator: String,
    #[serde(default = "RatioSpec::default_period")]
    pub period: Period,
}

impl RatioSpec {
    fn default_period() -> Period {
        Period::Current
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldColumns {
    pub name: String,
    pub base: usize,
    pub current: usize,
    pub change: usize,
    pub growth: usize,
}

impl FieldColumns {
    pub fn period_column(&self, period: Period) -> usize {
        match period {
            Period::Base => self.base,
            Period::Current => self.current,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GrowthColumns {
    pub fields: Vec<FieldColumns>,
    pub ratios: Vec<(String, usize)>,
    pub warnings: Vec<Warning>,
}

impl GrowthColumns {
    pub fn field(&self, name: &str) -> Option<&FieldColumns> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// `(current - base) / base * 100`, null when either side is missing or the
/// base is zero.
pub fn growth_percent(base: Option<f64>, current: Option<f64>) -> Option<f64> {
    let (base, current) = (base?, current?);
    if base == 0.0 {
        return None;
    }
    Some((current - base) / base * 100.0)
}

pub fn absolute_change(base: Option<f64>, current: Option<f64>) -> Option<f64> {
    Some(current? - base?)
}

/// `numerator / denominator`, null on a missing value or zero denominator.
pub fn safe_ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let (numerator, denominator) = (numerator?, denominator?);
    if denominator == 0.0 {
        return None;
    }
    Some(numerator / denominator)
}

/// Resolves `fields` against the table and appends the derived columns.
///
/// A required field missing from either period fails the whole call before
/// the table is touched. Optional fields that do not resolve are skipped and
/// reported as warnings; ratios built on them are skipped too.
pub fn apply(
    table: &mut ReconciledTable,
    fields: &[FieldSpec],
    ratios: &[RatioSpec],
) -> ReconResult<GrowthColumns> {
    let mut out = GrowthColumns::default();
    let mut resolved = Vec::with_capacity(fields.len());
    for spec in fields {
        let base = resolve_in(table, Side::Base, spec);
        let current = resolve_in(table, Side::Current, spec);
        match (base, current) {
            (Some(base), Some(current)) => {
                debug!(
                    "Field '{}' uses '{}' (base) and '{}' (current)",
                    spec.name, table.columns[base].name, table.columns[current].name
                );
                resolved.push((spec.name.clone(), base, current));
            }
            (base, _) => {
                let period = if base.is_none() {
                    Period::Base
                } else {
                    Period::Current
                };
                if spec.required {
                    return Err(ReconError::UnresolvedMetricField {
                        field: spec.name.clone(),
                        period,
                    });
                }
                out.warnings.push(Warning::MetricUnresolved {
                    field: spec.name.clone(),
                    period,
                });
            }
        }
    }

    for (name, base, current) in resolved {
        let (changes, growths): (Vec<Value>, Vec<Value>) = table
            .records
            .iter()
            .map(|record| {
                let b = record.value(base).as_f64();
                let c = record.value(current).as_f64();
                (
                    Value::from(absolute_change(b, c)),
                    Value::from(growth_percent(b, c)),
                )
            })
            .unzip();
        let nulls = growths.iter().filter(|v| v.is_null()).count();
        table.push_derived(&format!("{name} change"), changes);
        let change = table.columns.len() - 1;
        table.push_derived(&format!("{name} growth %"), growths);
        let growth = table.columns.len() - 1;
        if nulls > 0 {
            info!("'{name}' growth is undefined for {nulls} record(s) (zero or missing base)");
        }
        out.fields.push(FieldColumns {
            name,
            base,
            current,
            change,
            growth,
        });
    }

    for ratio in ratios {
        let (Some(numerator), Some(denominator)) =
            (out.field(&ratio.numerator), out.field(&ratio.denominator))
        else {
            debug!("Skipping ratio '{}': an input field is unresolved", ratio.name);
            continue;
        };
        let num_col = numerator.period_column(ratio.period);
        let den_col = denominator.period_column(ratio.period);
        let values = table
            .records
            .iter()
            .map(|record| {
                Value::from(safe_ratio(
                    record.value(num_col).as_f64(),
                    record.value(den_col).as_f64(),
                ))
            })
            .collect();
        table.push_derived(&ratio.name, values);
        out.ratios
            .push((ratio.name.clone(), table.columns.len() - 1));
    }

    Ok(out)
}

fn resolve_in(table: &ReconciledTable, side: Side, spec: &FieldSpec) -> Option<usize> {
    let candidates = table.side_columns(side);
    resolve(
        candidates.iter().map(|(_, source)| *source),
        spec.candidates().as_slice(),
    )
    .map(|pos| candidates[pos].0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{data::Table, join::reconcile};

    fn reconciled(base: &[&[&str]], current: &[&[&str]], headers: &[&str]) -> ReconciledTable {
        let base = Table::from_raw(headers.iter().copied(), base.iter().map(|r| r.iter().copied()));
        let current =
            Table::from_raw(headers.iter().copied(), current.iter().map(|r| r.iter().copied()));
        reconcile(&base, &current, "id", None).unwrap().table
    }

    #[test]
    fn growth_percent_handles_zero_and_missing() {
        assert_eq!(growth_percent(Some(100.0), Some(130.0)), Some(30.0));
        assert_eq!(growth_percent(Some(100.0), Some(70.0)), Some(-30.0));
        assert_eq!(growth_percent(Some(0.0), Some(50.0)), None);
        assert_eq!(growth_percent(None, Some(50.0)), None);
        assert_eq!(growth_percent(Some(-50.0), Some(-25.0)), Some(-50.0));
    }

    #[test]
    fn safe_ratio_is_null_on_zero_denominator() {
        assert_eq!(safe_ratio(Some(9.0), Some(10.0)), Some(0.9));
        assert_eq!(safe_ratio(Some(9.0), Some(0.0)), None);
    }

    #[test]
    fn apply_appends_change_and_growth_columns() {
        let mut table = reconciled(
            &[&["M1", "100"], &["M2", "0"]],
            &[&["M1", "130"], &["M2", "50"]],
            &["id", "gmv"],
        );
        let cols = apply(&mut table, &[FieldSpec::new("gmv", ["gmv"])], &[]).unwrap();
        assert_eq!(
            table.headers(),
            vec!["id", "gmv_base", "gmv_current", "gmv change", "gmv growth %"]
        );
        let field = cols.field("gmv").unwrap();
        assert_eq!(table.records[0].value(field.growth), &Value::Number(30.0));
        assert_eq!(table.records[0].value(field.change), &Value::Number(30.0));
        assert!(table.records[1].value(field.growth).is_null());
        assert_eq!(table.records[1].value(field.change), &Value::Number(50.0));
    }

    #[test]
    fn resolves_aliases_per_period() {
        let base = Table::from_raw(["id", "GMV (prev)"], [["M1", "10"]]);
        let current = Table::from_raw(["id", "gross merchandise value"], [["M1", "15"]]);
        let base = crate::columns::normalize_table(&base);
        let current = crate::columns::normalize_table(&current);
        let mut table = reconcile(&base, &current, "id", None).unwrap().table;
        let spec = FieldSpec::new("gmv", ["gross merchandise value", "gmv"]);
        let cols = apply(&mut table, &[spec], &[]).unwrap();
        let field = cols.field("gmv").unwrap();
        assert_eq!(table.records[0].value(field.growth), &Value::Number(50.0));
    }

    #[test]
    fn required_field_missing_fails_before_mutation() {
        let mut table = reconciled(&[&["M1", "1"]], &[&["M1", "2"]], &["id", "gmv"]);
        let before = table.clone();
        let err = apply(
            &mut table,
            &[FieldSpec::new("gmv", ["gmv"]), FieldSpec::new("txn", ["txn"])],
            &[],
        )
        .unwrap_err();
        assert_eq!(
            err,
            ReconError::UnresolvedMetricField {
                field: "txn".into(),
                period: Period::Base
            }
        );
        assert_eq!(table, before);
    }

    #[test]
    fn optional_field_missing_warns_and_skips_ratio() {
        let mut table = reconciled(&[&["M1", "1"]], &[&["M1", "2"]], &["id", "total"]);
        let fields = [
            FieldSpec::new("attempted", ["total"]),
            FieldSpec::new("successful", ["success"]).optional(),
        ];
        let ratio = RatioSpec {
            name: "success rate".into(),
            numerator: "successful".into(),
            denominator: "attempted".into(),
            period: Period::Current,
        };
        let cols = apply(&mut table, &fields, &[ratio]).unwrap();
        assert!(cols.ratios.is_empty());
        assert_eq!(
            cols.warnings,
            vec![Warning::MetricUnresolved {
                field: "successful".into(),
                period: Period::Base
            }]
        );
    }

    #[test]
    fn ratio_uses_requested_period() {
        let mut table = reconciled(
            &[&["M1", "8", "10"], &["M2", "1", "0"]],
            &[&["M1", "9", "10"], &["M2", "0", "0"]],
            &["id", "successful", "total"],
        );
        let fields = [
            FieldSpec::new("successful", ["successful"]),
            FieldSpec::new("attempted", ["total"]),
        ];
        let ratio = RatioSpec {
            name: "success rate".into(),
            numerator: "successful".into(),
            denominator: "attempted".into(),
            period: Period::Current,
        };
        let cols = apply(&mut table, &fields, &[ratio]).unwrap();
        let (name, idx) = &cols.ratios[0];
        assert_eq!(name, "success rate");
        assert_eq!(table.records[0].value(*idx), &Value::Number(0.9));
        assert!(table.records[1].value(*idx).is_null());
    }
}
