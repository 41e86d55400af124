//! Header normalization and alias-based column resolution.
//!
//! Every header is trimmed and lowercased before any lookup, so exports that
//! spell a column `" Client Code"` or `"CLIENT CODE"` resolve to the same name.
//! [`FieldSpec`] pairs a canonical metric name with the ordered aliases it may
//! appear under; [`resolve()`] picks the column for it.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::data::Table;

pub fn normalize_header(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Returns a copy of `table` with normalized headers. Rows are untouched.
pub fn normalize_table(table: &Table) -> Table {
    Table {
        headers: table.headers.iter().map(|h| normalize_header(h)).collect(),
        rows: table.rows.clone(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub aliases: Vec<String>,
    #[serde(default = "FieldSpec::default_required")]
    pub required: bool,
}

impl FieldSpec {
    pub fn new<I, S>(name: &str, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            aliases: aliases.into_iter().map(Into::into).collect(),
            required: true,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    const fn default_required() -> bool {
        true
    }

    /// Aliases to try, in priority order. The canonical name itself is tried
    /// last when it is not already listed.
    pub fn candidates(&self) -> Vec<String> {
        let mut out: Vec<String> = self.aliases.iter().map(|a| normalize_header(a)).collect();
        let canonical = normalize_header(&self.name);
        if !out.contains(&canonical) {
            out.push(canonical);
        }
        out.retain(|a| !a.is_empty());
        out
    }

    pub fn resolve<'a, I>(&self, headers: I) -> Option<usize>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let found = resolve(headers, self.candidates().as_slice());
        debug!("Field '{}' resolved to column position {:?}", self.name, found);
        found
    }
}

/// Finds the column matching the first alias that matches anything.
///
/// For each alias in order, an exact header match wins; otherwise the first
/// header containing the alias is taken. Headers are compared after
/// normalization. Returns the position of the header in the iteration order.
pub fn resolve<'a, I, S>(headers: I, aliases: &[S]) -> Option<usize>
where
    I: IntoIterator<Item = &'a str>,
    S: AsRef<str>,
{
    let normalized = headers
        .into_iter()
        .map(normalize_header)
        .collect::<Vec<_>>();
    for alias in aliases {
        let alias = normalize_header(alias.as_ref());
        if alias.is_empty() {
            continue;
        }
        if let Some(idx) = normalized.iter().position(|h| *h == alias) {
            return Some(idx);
        }
        if let Some(idx) = normalized.iter().position(|h| h.contains(&alias)) {
            return Some(idx);
        }
    }
    None
}
