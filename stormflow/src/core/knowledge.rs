//! Retrieved source records and the per-run knowledge base.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A retrieved source: its URL and the snippets taken from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Information {
    /// Where the snippets came from.
    pub source_url: String,
    /// Snippets in retrieval order. May be empty.
    #[serde(default)]
    pub snippets: Vec<String>,
}

impl Information {
    /// Creates a new record.
    #[must_use]
    pub fn new(source_url: impl Into<String>, snippets: Vec<String>) -> Self {
        Self {
            source_url: source_url.into(),
            snippets,
        }
    }
}

/// The accumulated sources of one run, unique by `source_url`.
///
/// Insertion order is preserved so summaries are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Information>", into = "Vec<Information>")]
pub struct KnowledgeBase {
    records: Vec<Information>,
    seen: HashSet<String>,
}

impl KnowledgeBase {
    /// Creates an empty knowledge base.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record unless its URL is already present.
    ///
    /// Returns true if the record was added.
    pub fn insert(&mut self, info: Information) -> bool {
        if self.seen.contains(&info.source_url) {
            return false;
        }
        self.seen.insert(info.source_url.clone());
        self.records.push(info);
        true
    }

    /// Inserts every record, skipping known URLs. Returns how many were added.
    pub fn extend<I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = Information>,
    {
        let mut added = 0;
        for info in records {
            if self.insert(info) {
                added += 1;
            }
        }
        added
    }

    /// Returns true if a record with this URL exists.
    #[must_use]
    pub fn contains_url(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    /// Returns the URLs already collected, for use as an exclusion set.
    #[must_use]
    pub fn urls(&self) -> HashSet<String> {
        self.seen.clone()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing has been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates the records in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Information> {
        self.records.iter()
    }

    /// Total number of snippets across all records.
    #[must_use]
    pub fn snippet_count(&self) -> usize {
        self.records.iter().map(|r| r.snippets.len()).sum()
    }

    /// Renders a numbered digest of the sources, capped at `max_chars`.
    ///
    /// Records that would overflow the cap are omitted whole.
    #[must_use]
    pub fn summary(&self, max_chars: usize) -> String {
        if self.records.is_empty() {
            return "No sources were found.".to_string();
        }

        let mut out = String::new();
        for (i, record) in self.records.iter().enumerate() {
            let snippets = if record.snippets.is_empty() {
                "(no snippets)".to_string()
            } else {
                record.snippets.join(" ")
            };
            let line = format!("[{}] {}: {}\n", i + 1, record.source_url, snippets);
            if out.len() + line.len() > max_chars && !out.is_empty() {
                break;
            }
            out.push_str(&line);
        }
        out.trim_end().to_string()
    }
}

impl From<Vec<Information>> for KnowledgeBase {
    fn from(records: Vec<Information>) -> Self {
        let mut kb = Self::new();
        kb.extend(records);
        kb
    }
}

impl From<KnowledgeBase> for Vec<Information> {
    fn from(kb: KnowledgeBase) -> Self {
        kb.records
    }
}

impl<'a> IntoIterator for &'a KnowledgeBase {
    type Item = &'a Information;
    type IntoIter = std::slice::Iter<'a, Information>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
