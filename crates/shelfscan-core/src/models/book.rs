use serde::{Deserialize, Serialize};

/// Fields a single bibliographic source reported for an ISBN.
///
/// `None` means the source did not report the field at all, which is kept
/// distinct from a field reported as an empty string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookRecordPartial {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
}

impl BookRecordPartial {
    /// A partial record only counts as a hit when it carries a usable title.
    pub fn has_title(&self) -> bool {
        self.title
            .as_deref()
            .is_some_and(|title| !title.trim().is_empty())
    }
}

/// A normalized book record, built once per processed file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    pub title: String,
    pub authors: Vec<String>,
    pub publisher: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub series: Option<String>,
    pub isbn: String,
    /// Name of the source whose record won resolution.
    pub source: String,
}

impl BookRecord {
    pub fn new(title: impl Into<String>, isbn: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            authors: Vec::new(),
            publisher: None,
            category: None,
            sub_category: None,
            series: None,
            isbn: isbn.into(),
            source: String::new(),
        }
    }

    /// The single author stored in the library's author slot.
    pub fn primary_author(&self) -> Option<&str> {
        self.authors.first().map(String::as_str)
    }
}

/// A `books` row joined back to its lookup-table names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredBook {
    pub id: i64,
    pub title: String,
    pub isbn: String,
    pub publisher: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub destination: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_without_title_is_not_a_hit() {
        let partial = BookRecordPartial {
            title: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(!partial.has_title());
        assert!(!BookRecordPartial::default().has_title());
    }

    #[test]
    fn primary_author_is_first() {
        let mut record = BookRecord::new("Foo", "9784867104562");
        assert_eq!(record.primary_author(), None);
        record.authors = vec!["A".to_string(), "B".to_string()];
        assert_eq!(record.primary_author(), Some("A"));
    }
}
