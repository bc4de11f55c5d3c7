//! Annotations on spans of tokens.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::TokenError;

/// An annotation on the tokens `start..=end` of a sentence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Annotation {
    /// The index of the first token (inclusive).
    pub start: usize,
    /// The index of the last token (inclusive).
    pub end: usize,
    /// A short code of the error type, e. g. `E001`.
    pub code: String,
    /// A human-readable message.
    pub text: String,
    #[serde(default)]
    pub detail: Option<String>,
    /// The flagged substring of the original text.
    #[serde(default)]
    pub original: Option<String>,
    /// The suggested replacement for the whole span.
    #[serde(default)]
    pub suggest: Option<String>,
    /// Alternative replacements to pick from.
    #[serde(default)]
    pub suggestlist: Vec<String>,
}

impl Annotation {
    pub fn new<S: Into<String>, T: Into<String>>(start: usize, end: usize, code: S, text: T) -> Self {
        Annotation {
            start,
            end,
            code: code.into(),
            text: text.into(),
            detail: None,
            original: None,
            suggest: None,
            suggestlist: Vec::new(),
        }
    }

    /// Creates an annotation from the error marker of the token at `index`.
    /// The span is clamped so the annotation never reaches past the last of `n_tokens` tokens.
    pub fn from_token_error(index: usize, error: &TokenError, n_tokens: usize) -> Self {
        let end = (index + error.span.max(1) - 1).min(n_tokens.saturating_sub(1).max(index));

        Annotation {
            start: index,
            end,
            code: error.code.clone(),
            text: error.description.clone(),
            detail: error.detail.clone(),
            original: error.original.clone(),
            suggest: error.suggest.clone(),
            suggestlist: error.suggestlist.clone(),
        }
    }

    pub fn with_detail<S: Into<String>>(mut self, detail: S) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_original<S: Into<String>>(mut self, original: S) -> Self {
        self.original = Some(original.into());
        self
    }

    pub fn with_suggest<S: Into<String>>(mut self, suggest: S) -> Self {
        self.suggest = Some(suggest.into());
        self
    }

    pub fn with_suggestlist(mut self, suggestlist: Vec<String>) -> Self {
        self.suggestlist = suggestlist;
        self
    }

    /// The suggestion, if there is one and it is not empty.
    pub fn replacement(&self) -> Option<&str> {
        self.suggest.as_deref().filter(|x| !x.is_empty())
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:03}-{:03}: {:6} {}",
            self.start, self.end, self.code, self.text
        )?;
        if let Some(suggest) = self.replacement() {
            write!(f, " | '{}'", suggest)?;
        }
        Ok(())
    }
}

/// Sorts annotations by start index and then by decreasing end index,
/// and removes annotations with the same code on the same span.
pub fn normalize(annotations: &mut Vec<Annotation>) {
    // ties on the span are broken by code so that duplicates are adjacent
    annotations.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then_with(|| b.end.cmp(&a.end))
            .then_with(|| a.code.cmp(&b.code))
    });
    annotations.dedup_by(|a, prev| a.code == prev.code && a.start == prev.start && a.end == prev.end);
}
