use anyhow::{Result, anyhow};
use itertools::Itertools;
use log::debug;

use crate::{
    columns::normalize_header,
    error::Warning,
    join::{ReconciledTable, key_text},
};

/// Choice meaning "no restriction".
pub const ALL: &str = "All";

/// Exact-match restriction on one categorical column, e.g. an account manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeFilter {
    pub attribute: String,
    pub value: String,
}

impl AttributeFilter {
    /// Returns `None` for a blank value or the `All` choice.
    pub fn new(attribute: &str, value: &str) -> Option<Self> {
        let value = unquote(value.trim());
        if value.is_empty() || value.eq_ignore_ascii_case(ALL) {
            return None;
        }
        Some(Self {
            attribute: normalize_header(attribute),
            value: value.to_string(),
        })
    }

    /// Parses `attribute=value`.
    pub fn parse(spec: &str) -> Result<Option<Self>> {
        let (attribute, value) = spec
            .split_once('=')
            .ok_or_else(|| anyhow!("Filter '{spec}' must look like attribute=value"))?;
        let attribute = attribute.trim();
        if attribute.is_empty() {
            return Err(anyhow!("Filter '{spec}' is missing an attribute name"));
        }
        Ok(Self::new(attribute, value))
    }
}

fn unquote(value: &str) -> &str {
    if value.len() >= 2 {
        let bytes = value.as_bytes();
        if (bytes[0] == b'"' && bytes[value.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[value.len() - 1] == b'\'')
        {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Records matching `filter`, or every record when there is no filter.
///
/// A filter on a column the table does not have applies no restriction and
/// pushes a [`Warning::FilterAttributeAbsent`].
pub fn restrict(
    table: &ReconciledTable,
    filter: Option<&AttributeFilter>,
    warnings: &mut Vec<Warning>,
) -> ReconciledTable {
    let Some(filter) = filter else {
        return table.clone();
    };
    let Some(column) = table.column_index(&filter.attribute) else {
        warnings.push(Warning::FilterAttributeAbsent {
            attribute: filter.attribute.clone(),
        });
        return table.clone();
    };
    let restricted = table.retain_records(|record| key_text(record.value(column)) == filter.value);
    debug!(
        "Filter {}='{}' kept {} of {} record(s)",
        filter.attribute,
        filter.value,
        restricted.len(),
        table.len()
    );
    restricted
}

/// Distinct non-blank values of `attribute`, in first-seen order.
pub fn attribute_values(table: &ReconciledTable, attribute: &str) -> Vec<String> {
    let Some(column) = table.column_index(&normalize_header(attribute)) else {
        return Vec::new();
    };
    table
        .records
        .iter()
        .map(|record| key_text(record.value(column)))
        .filter(|value| !value.is_empty())
        .unique()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{data::Table, join::reconcile};

    fn sample() -> ReconciledTable {
        let base = Table::from_raw(["id", "gmv"], [["M1", "1"], ["M2", "2"], ["M3", "3"]]);
        let current = Table::from_raw(["id", "gmv"], [["M1", "1"], ["M2", "2"], ["M3", "3"]]);
        let mapping = Table::from_raw(
            ["id", "account manager"],
            [["M1", "Asha"], ["M2", "Ravi"], ["M3", "Asha"]],
        );
        reconcile(&base, &current, "id", Some(&mapping)).unwrap().table
    }

    #[test]
    fn all_and_blank_mean_no_filter() {
        assert_eq!(AttributeFilter::new("account manager", "All"), None);
        assert_eq!(AttributeFilter::new("account manager", " all "), None);
        assert_eq!(AttributeFilter::new("account manager", ""), None);
    }

    #[test]
    fn parse_splits_attribute_and_value() {
        let filter = AttributeFilter::parse("Account Manager = 'Asha'").unwrap().unwrap();
        assert_eq!(filter.attribute, "account manager");
        assert_eq!(filter.value, "Asha");
        assert!(AttributeFilter::parse("Asha").is_err());
        assert!(AttributeFilter::parse("=Asha").is_err());
    }

    #[test]
    fn restrict_keeps_exact_matches() {
        let table = sample();
        let filter = AttributeFilter::new("account manager", "Asha");
        let mut warnings = Vec::new();
        let kept = restrict(&table, filter.as_ref(), &mut warnings);
        let keys: Vec<&str> = kept.records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["M1", "M3"]);
        assert!(warnings.is_empty());

        let none = restrict(
            &table,
            AttributeFilter::new("account manager", "asha").as_ref(),
            &mut warnings,
        );
        assert!(none.is_empty());
    }

    #[test]
    fn restrict_on_missing_column_warns() {
        let table = sample();
        let filter = AttributeFilter::new("region", "north");
        let mut warnings = Vec::new();
        let kept = restrict(&table, filter.as_ref(), &mut warnings);
        assert_eq!(kept.len(), table.len());
        assert_eq!(
            warnings,
            vec![Warning::FilterAttributeAbsent {
                attribute: "region".into()
            }]
        );
    }

    #[test]
    fn attribute_values_are_distinct_in_order() {
        let table = sample();
        assert_eq!(attribute_values(&table, "Account Manager"), vec!["Asha", "Ravi"]);
        assert!(attribute_values(&table, "region").is_empty());
    }
}
