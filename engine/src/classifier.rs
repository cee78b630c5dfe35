//! File name to language tag lookup.

use std::collections::HashMap;

use presence_providers::LanguageMapsDocument;
use presence_types::file_extension;
use regex::Regex;

/// Extension table first, then patterns in a fixed order.
#[derive(Debug, Default)]
pub struct Classifier {
    extensions: HashMap<String, String>,
    patterns: Vec<(Regex, String)>,
}

impl Classifier {
    /// Compile the pattern table. Malformed patterns are logged and skipped.
    #[must_use]
    pub fn new(document: LanguageMapsDocument) -> Self {
        // `regex_map` is a BTreeMap, so patterns are tried in sorted order.
        let patterns = document
            .regex_map
            .into_iter()
            .filter_map(|(pattern, language)| match Regex::new(&pattern) {
                Ok(regex) => Some((regex, language)),
                Err(e) => {
                    tracing::warn!(pattern = %pattern, "Skipping malformed language pattern: {e}");
                    None
                }
            })
            .collect();
        Self {
            extensions: document.ext_map,
            patterns,
        }
    }

    /// Language tag for `file_name`, or `None` if nothing matches.
    ///
    /// Extension lookup is case-sensitive and keyed with the leading dot.
    #[must_use]
    pub fn classify(&self, file_name: &str) -> Option<&str> {
        if let Some(ext) = file_extension(file_name)
            && let Some(language) = self.extensions.get(ext)
        {
            return Some(language);
        }
        self.patterns
            .iter()
            .find(|(regex, _)| regex.is_match(file_name))
            .map(|(_, language)| language.as_str())
    }

    #[must_use]
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}
