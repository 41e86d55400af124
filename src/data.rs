//! Cell values and the in-memory [`Table`] handed to the reconciler.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Number(f64),
    Text(String),
}

impl Value {
    /// Wraps a raw cell: blank is null, anything else is kept as the text it
    /// was read as. Numeric meaning is only taken on demand by [`Value::as_f64`],
    /// so keys, filters and exports always see the original cell.
    pub fn from_raw(raw: &str) -> Self {
        if raw.trim().is_empty() {
            Value::Null
        } else {
            Value::Text(raw.to_string())
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric reading of the cell; text is parsed, allowing `,` thousands
    /// separators. Non-finite values read as missing.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => parse_number(s.trim()),
            Value::Null => None,
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Number(f) => {
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    (*f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
            Value::Text(s) => s.clone(),
        }
    }
}

impl From<Option<f64>> for Value {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Value::Null, Value::Number)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

fn parse_number(value: &str) -> Option<f64> {
    if let Ok(parsed) = value.parse::<f64>() {
        return parsed.is_finite().then_some(parsed);
    }
    if !value.contains(',') {
        return None;
    }
    let stripped: String = value.chars().filter(|c| *c != ',').collect();
    stripped
        .parse::<f64>()
        .ok()
        .filter(|parsed| parsed.is_finite())
}

/// An ordered collection of rows sharing one header.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { headers, rows }
    }

    /// Builds a table from raw string cells, parsing each with [`Value::from_raw`].
    pub fn from_raw<H, R, C>(headers: H, rows: R) -> Self
    where
        H: IntoIterator,
        H::Item: Into<String>,
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        let headers = headers.into_iter().map(Into::into).collect();
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|cell| Value::from_raw(cell.as_ref())).collect())
            .collect();
        Self { headers, rows }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn cell(&self, row: usize, column: usize) -> &Value {
        static NULL: Value = Value::Null;
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&NULL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_keeps_cell_text() {
        assert_eq!(Value::from_raw(""), Value::Null);
        assert_eq!(Value::from_raw("   "), Value::Null);
        assert_eq!(Value::from_raw(" 42 "), Value::Text(" 42 ".into()));
        assert_eq!(Value::from_raw("100.50").as_display(), "100.50");
        assert_eq!(Value::from_raw("+5").as_display(), "+5");
        assert_eq!(Value::from_raw("007").as_display(), "007");
        assert_eq!(
            Value::from_raw("9007199254740993").as_display(),
            "9007199254740993"
        );
    }

    #[test]
    fn as_f64_parses_on_demand() {
        assert_eq!(Value::from_raw(" 42 ").as_f64(), Some(42.0));
        assert_eq!(Value::from_raw("1,250.5").as_f64(), Some(1250.5));
        assert_eq!(Value::from_raw("1e3").as_f64(), Some(1000.0));
        assert_eq!(Value::from_raw("+5").as_f64(), Some(5.0));
        assert_eq!(Value::from_raw("NaN").as_f64(), None);
        assert_eq!(Value::from_raw("M-001").as_f64(), None);
        assert_eq!(Value::Number(0.5).as_f64(), Some(0.5));
        assert_eq!(Value::Null.as_f64(), None);
    }

    #[test]
    fn as_display_drops_integral_fraction() {
        assert_eq!(Value::Number(130.0).as_display(), "130");
        assert_eq!(Value::Number(-30.5).as_display(), "-30.5");
        assert_eq!(Value::Null.as_display(), "");
    }

    #[test]
    fn cell_out_of_range_is_null() {
        let table = Table::from_raw(["id"], [["M1"]]);
        assert_eq!(table.cell(0, 0), &Value::Text("M1".into()));
        assert!(table.cell(0, 3).is_null());
        assert!(table.cell(9, 0).is_null());
    }
}
