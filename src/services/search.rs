//! Line-by-line search over the `.lua` scripts of a directory.
//!
//! Scripts are Shift_JIS encoded. Bytes that do not decode are replaced
//! rather than failing the search, and a file that cannot be read is logged
//! and skipped so one bad file never aborts the scan.

use super::file_state::list_files;
use crate::metrics::METRICS;
use crate::models::archive::LUA_EXT;
use camino::{Utf8Path, Utf8PathBuf};
use encoding_rs::SHIFT_JIS;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid search pattern '{term}': {source}")]
    InvalidQuery {
        term: String,
        #[source]
        source: regex::Error,
    },

    #[error("Cannot search {path}: {reason}")]
    Directory { path: Utf8PathBuf, reason: String },
}

/// What to look for
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    pub term: String,
    pub case_sensitive: bool,
    pub use_regex: bool,
}

impl SearchQuery {
    pub fn new(term: impl Into<String>, case_sensitive: bool, use_regex: bool) -> Self {
        Self {
            term: term.into(),
            case_sensitive,
            use_regex,
        }
    }

    /// Plain, case-insensitive substring query.
    pub fn plain(term: impl Into<String>) -> Self {
        Self::new(term, false, false)
    }
}

/// One matching line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineMatch {
    /// 1-based line number
    pub line_number: usize,
    /// Line text without its terminator
    pub text: String,
}

/// All matches in one file, bottom-most line first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMatches {
    pub file_name: String,
    pub matches: Vec<LineMatch>,
    /// The file contained bytes that were not valid Shift_JIS
    pub lossy: bool,
}

impl FileMatches {
    pub fn match_count(&self) -> usize {
        self.matches.len()
    }
}

/// Predicate compiled once from a [`SearchQuery`]
#[derive(Debug, Clone)]
enum LineMatcher {
    Regex(Regex),
    Substring { needle: String, case_sensitive: bool },
}

impl LineMatcher {
    fn is_match(&self, line: &str) -> bool {
        match self {
            LineMatcher::Regex(regex) => regex.is_match(line),
            LineMatcher::Substring {
                needle,
                case_sensitive: true,
            } => line.contains(needle.as_str()),
            LineMatcher::Substring { needle, .. } => line.to_lowercase().contains(needle.as_str()),
        }
    }
}

/// A compiled search, ready to run against any number of directories
#[derive(Debug, Clone)]
pub struct SearchEngine {
    query: SearchQuery,
    matcher: LineMatcher,
}

impl SearchEngine {
    /// Compile `query`. Fails only for a regex query with an invalid pattern.
    pub fn new(query: SearchQuery) -> Result<Self, SearchError> {
        let matcher = if query.use_regex {
            let regex = RegexBuilder::new(&query.term)
                .case_insensitive(!query.case_sensitive)
                .build()
                .map_err(|source| SearchError::InvalidQuery {
                    term: query.term.clone(),
                    source,
                })?;
            LineMatcher::Regex(regex)
        } else if query.case_sensitive {
            LineMatcher::Substring {
                needle: query.term.clone(),
                case_sensitive: true,
            }
        } else {
            LineMatcher::Substring {
                needle: query.term.to_lowercase(),
                case_sensitive: false,
            }
        };

        Ok(Self { query, matcher })
    }

    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    /// Search every `.lua` file directly in `dir`.
    ///
    /// Files are visited in name order and only files with at least one match
    /// are returned. An empty term returns no results.
    pub fn search(&self, dir: &Utf8Path) -> Result<Vec<FileMatches>, SearchError> {
        if self.query.term.is_empty() {
            tracing::debug!("Empty search term, nothing to search");
            return Ok(Vec::new());
        }

        let files = list_files(dir).map_err(|e| SearchError::Directory {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;

        METRICS.record_search();
        let mut results = Vec::new();

        for path in files.iter().filter(|p| p.extension() == Some(LUA_EXT)) {
            let bytes = match fs::read(path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!("Skipping unreadable script {}: {}", path, e);
                    continue;
                }
            };
            let file_name = path.file_name().unwrap_or_default().to_string();
            if let Some(found) = self.search_bytes(&file_name, &bytes) {
                results.push(found);
            }
        }

        tracing::info!(
            "Search for '{}' in {}: {} file(s) matched",
            self.query.term,
            dir,
            results.len()
        );
        Ok(results)
    }

    /// Search the raw bytes of one script. Returns None when nothing matches.
    pub fn search_bytes(&self, file_name: &str, bytes: &[u8]) -> Option<FileMatches> {
        let (text, lossy) = SHIFT_JIS.decode_without_bom_handling(bytes);
        if lossy {
            tracing::warn!("{} contains invalid Shift_JIS, replaced undecodable bytes", file_name);
        }

        let mut matches: Vec<LineMatch> = text
            .lines()
            .enumerate()
            .filter(|(_, line)| self.matcher.is_match(line))
            .map(|(i, line)| LineMatch {
                line_number: i + 1,
                text: line.to_string(),
            })
            .collect();

        if matches.is_empty() {
            return None;
        }
        matches.reverse();

        Some(FileMatches {
            file_name: file_name.to_string(),
            matches,
            lossy,
        })
    }
}

/// Compile `query` and run it against `dir`.
pub fn search(dir: &Utf8Path, query: SearchQuery) -> Result<Vec<FileMatches>, SearchError> {
    SearchEngine::new(query)?.search(dir)
}

/// List entry for a file in the results: match count padded to six columns.
pub fn format_file_entry(result: &FileMatches) -> String {
    format!(" {:<6} {}", result.match_count(), result.file_name)
}

/// List entry for a matching line: line number padded to five columns.
pub fn format_line_entry(line: &LineMatch) -> String {
    format!("{:<5} {}", line.line_number, line.text)
}
