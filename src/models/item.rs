use serde::{Deserialize, Serialize};
use std::fmt;

/// A diary entry. Items are keyed by (user, date); the owning user is
/// supplied alongside the item rather than stored on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub date: String,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Item {
    pub fn new(date: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            title: title.into(),
            body: String::new(),
            tags: Vec::new(),
        }
    }

    /// An item with no content, used when a date has no entry yet.
    pub fn empty(date: impl Into<String>) -> Self {
        Self::new(date, "")
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let heading = if self.title.is_empty() {
            "(untitled)"
        } else {
            self.title.as_str()
        };
        writeln!(f, "{} - {}", self.date, heading)?;
        if !self.tags.is_empty() {
            writeln!(f, "Tags: {}", self.tags.join(", "))?;
        }
        if !self.body.is_empty() {
            writeln!(f)?;
            writeln!(f, "{}", self.body)?;
        }
        Ok(())
    }
}

/// Trims every tag and drops the ones left empty. Order and duplicates are
/// preserved.
pub fn normalize_tags<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    tags.iter()
        .map(|t| t.as_ref().trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Filters for listing a user's items. Empty fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    /// Exact date match.
    pub date: Option<String>,
    /// Case-insensitive substring match over title or body.
    pub search_text: Option<String>,
    /// Matches items carrying any of these tags.
    pub tags: Vec<String>,
}

impl SearchParams {
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_search_text(mut self, text: impl Into<String>) -> Self {
        self.search_text = Some(text.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}
