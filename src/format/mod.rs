//! Rendering of correction results.
//!
//! [format_grammar] renders results with sentence annotations, [format_spelling] renders
//! token-level corrections only.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

mod grammar;
mod spelling;

pub use grammar::{apply_suggestions, format_grammar, SentenceReport, TokenReport};
pub use spelling::format_spelling;

/// An output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Corrected text, optionally with annotations.
    Text,
    /// One JSON object per sentence (or per token in token-level output).
    Json,
    /// One line per annotation (or per token in token-level output).
    Csv,
    /// The M2 format used for evaluating error correction.
    M2,
}

impl FromStr for Format {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "text" => Format::Text,
            "json" => Format::Json,
            "csv" => Format::Csv,
            "m2" => Format::M2,
            _ => return Err(crate::Error::UnknownFormat(s.to_string())),
        })
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Format::Text => "text",
            Format::Json => "json",
            Format::Csv => "csv",
            Format::M2 => "m2",
        })
    }
}

/// Options which only affect [Format::Text].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatOptions {
    /// Whether to list the annotations.
    pub annotations: bool,
    /// Whether to list all annotations at the end instead of after each sentence (token-level output only).
    pub print_all: bool,
    /// Whether to separate tokens by single spaces instead of detokenizing (token-level output only).
    pub spaced: bool,
    /// Whether to use normalized punctuation with `spaced` (token-level output only).
    pub normalize: bool,
}
