//! Destination-path rules.
//!
//! Serial works (comics, light novels) are shelved by series regardless of
//! imprint; everything else nests by imprint/author label first and series
//! second. Both rules are pure functions of the record.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::config::ShelvingConfig;
use crate::models::BookRecord;

#[derive(Debug, Clone)]
pub struct Classifier {
    serial_categories: BTreeSet<String>,
    uncategorized_label: String,
    extension: String,
}

impl Classifier {
    pub fn new<I, S>(serial_categories: I, uncategorized_label: &str, extension: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            serial_categories: serial_categories.into_iter().map(Into::into).collect(),
            uncategorized_label: uncategorized_label.to_string(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn from_config(config: &ShelvingConfig) -> Self {
        Self::new(
            config.serial_categories.iter().cloned(),
            &config.uncategorized_label,
            &config.extension,
        )
    }

    pub fn is_serial(&self, category: &str) -> bool {
        self.serial_categories.contains(category)
    }

    /// Relative shelving path for `record`, to be joined onto the output root.
    pub fn classify(&self, record: &BookRecord) -> PathBuf {
        let category = self.component_or_label(record.category.as_deref());

        let mut path = PathBuf::from(category);
        if self.is_serial(category) {
            let shelf = record
                .series
                .as_deref()
                .or(record.sub_category.as_deref());
            path.push(self.component_or_label(shelf));
        } else {
            for level in [record.sub_category.as_deref(), record.series.as_deref()]
                .into_iter()
                .flatten()
                .filter(|level| is_plain_component(level))
            {
                path.push(level);
            }
        }
        path.push(self.file_name(&record.title));
        path
    }

    fn component_or_label<'a>(&'a self, level: Option<&'a str>) -> &'a str {
        level
            .filter(|level| is_plain_component(level))
            .unwrap_or(&self.uncategorized_label)
    }

    fn file_name(&self, title: &str) -> String {
        let name = if self.extension.is_empty() {
            title.to_string()
        } else {
            format!("{title}.{}", self.extension)
        };
        if is_plain_component(&name) {
            name
        } else {
            self.uncategorized_label.clone()
        }
    }
}

/// A single normal path segment: not empty, not made only of dots, no separators.
fn is_plain_component(level: &str) -> bool {
    !level.is_empty() && !level.chars().all(|c| c == '.') && !level.contains(['/', '\\'])
}

impl Default for Classifier {
    fn default() -> Self {
        Self::from_config(&ShelvingConfig::default())
    }
}
