//! Per-surface wordlist loading, deduplication, and filtering.
//!
//! Grounded on the teacher's `parser::parse_word_list`/`parse_user_agents`
//! (read-to-string, split lines, trim, drop empties), generalized to load a
//! comma-separated list of files per surface and merge/dedupe them, plus the
//! header/cookie name filters the spec requires.

use std::collections::HashSet;
use std::fs::read_to_string;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ParamHuntError;
use crate::surface::SurfaceTag;

static HEADER_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

/// Deduplicated, per-surface candidate name lists.
#[derive(Debug, Clone, Default)]
pub struct Wordlists {
    pub url: Vec<String>,
    pub body_form: Vec<String>,
    pub body_json: Vec<String>,
    pub header: Vec<String>,
    pub cookie: Vec<String>,
}

impl Wordlists {
    pub fn for_surface(&self, surface: SurfaceTag) -> &[String] {
        match surface {
            SurfaceTag::Url => &self.url,
            SurfaceTag::BodyForm => &self.body_form,
            SurfaceTag::BodyJson => &self.body_json,
            SurfaceTag::Header => &self.header,
            SurfaceTag::Cookie => &self.cookie,
        }
    }
}

/// Reads one wordlist file, one candidate name per line, skipping blank lines.
fn read_one_wordlist(path: &Path) -> Result<Vec<String>, ParamHuntError> {
    if !path.exists() {
        return Err(ParamHuntError::WordlistNotFound(path.to_path_buf()));
    }
    let content = read_to_string(path).map_err(|source| ParamHuntError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(content
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect())
}

/// Loads and merges a comma-separated list of wordlist file paths, deduplicating
/// while preserving first-seen order.
pub fn load_merged(paths_csv: &str) -> Result<Vec<String>, ParamHuntError> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for raw_path in paths_csv.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        for word in read_one_wordlist(Path::new(raw_path))? {
            if seen.insert(word.clone()) {
                out.push(word);
            }
        }
    }
    Ok(out)
}

/// `^[A-Za-z0-9_-]+$` filter applied to the header wordlist.
pub fn filter_header_names(names: Vec<String>) -> Vec<String> {
    names.into_iter().filter(|n| HEADER_NAME_RE.is_match(n)).collect()
}

/// Cookie names must not contain `=`, `,`, or `;`.
pub fn filter_cookie_names(names: Vec<String>) -> Vec<String> {
    names
        .into_iter()
        .filter(|n| !n.contains('=') && !n.contains(',') && !n.contains(';'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_filter_rejects_invalid_characters() {
        let names = vec!["X-Debug".to_string(), "bad header".to_string(), "a:b".to_string()];
        let filtered = filter_header_names(names);
        assert_eq!(filtered, vec!["X-Debug".to_string()]);
    }

    #[test]
    fn cookie_filter_rejects_reserved_characters() {
        let names = vec!["session".to_string(), "a=b".to_string(), "a,b".to_string(), "a;b".to_string()];
        let filtered = filter_cookie_names(names);
        assert_eq!(filtered, vec!["session".to_string()]);
    }
}
