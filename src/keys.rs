use log::{debug, info};

use crate::{
    columns::normalize_header,
    error::{ReconError, ReconResult},
};

/// Picks the merchant key shared by the base and current headers.
///
/// Candidates are tried in list order; the first one present in both headers
/// wins, regardless of where it sits in either header.
pub fn resolve_key<S: AsRef<str>>(
    base_headers: &[String],
    current_headers: &[String],
    candidates: &[S],
) -> ReconResult<String> {
    for candidate in candidates {
        let name = normalize_header(candidate.as_ref());
        if name.is_empty() {
            continue;
        }
        let in_base = base_headers.iter().any(|h| normalize_header(h) == name);
        let in_current = current_headers.iter().any(|h| normalize_header(h) == name);
        debug!("Key candidate '{name}': base={in_base} current={in_current}");
        if in_base && in_current {
            info!("{}", key_notice(&name));
            return Ok(name);
        }
    }
    Err(ReconError::NoCommonKey {
        candidates: candidates
            .iter()
            .map(|c| normalize_header(c.as_ref()))
            .collect(),
    })
}

/// Position of `key` in the mapping header, if the mapping can be joined on it.
pub fn mapping_key_index(mapping_headers: &[String], key: &str) -> Option<usize> {
    mapping_headers.iter().position(|h| normalize_header(h) == key)
}

pub fn key_notice(key: &str) -> String {
    format!("Using '{key}' as merchant key")
}
