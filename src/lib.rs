//! Spelling and grammar annotation on top of an upstream tokenizer, parser and lexicon.
//! # Overview
//!
//! gramcheck has the following core abstractions:
//! - An [Annotator][components::annotator::Annotator] which turns one tokenized and (possibly) parsed
//!   [Sentence][types::Sentence] into a sorted, deduplicated list of [Annotation]s.
//! - An [ErrorFinder][components::error_finder::ErrorFinder] which walks every derivation of a parse tree and
//!   flags nonterminals tagged as errors and impersonal verbs with a subject in the wrong case.
//! - A [Corrector][correct::Corrector] which runs the spelling pipeline, the optional analyses and the
//!   annotator over a whole document and returns a [CorrectionResult][correct::CorrectionResult].
//! - The [format] module which renders a result as corrected text, JSON, CSV or M2.
//!
//! The tokenizer, the parser, the lexicon, the pattern matcher and the statistical analyzers are
//! external. They are plugged in through the traits in [components].
//!
//! # Examples
//!
//! Render an annotated sentence in the M2 format:
//!
//! ```no_run
//! use gramcheck::{
//!     correct::{CorrectedSentence, CorrectionResult},
//!     format::{format_grammar, Format, FormatOptions},
//!     types::{Token, TokenKind},
//!     Annotation,
//! };
//!
//! let tokens = ["Hann", "kom", "í", "gær", "."]
//!     .iter()
//!     .map(|text| Token::new(TokenKind::Word, *text))
//!     .collect();
//! let annotation = Annotation::new(1, 1, "X1", "Röng tíð").with_suggest("kemur");
//!
//! let result = CorrectionResult::new(vec![CorrectedSentence::new(tokens, Some(vec![annotation]), None)]);
//! let m2 = format_grammar(&result, Format::M2, &FormatOptions::default())?;
//! assert!(m2.starts_with("S Hann kom í gær ."));
//! # Ok::<(), gramcheck::Error>(())
//! ```

use std::io;

use thiserror::Error;

pub mod annotation;
pub mod components;
pub mod correct;
pub mod format;
pub mod grammar;
pub mod readability;
pub mod types;
pub(crate) mod utils;

pub use annotation::Annotation;
pub use correct::{check_errors, CheckOptions, Corrector, CorrectorOptions, Input};
pub use format::Format;
pub use grammar::{Grammar, SharedGrammar};

#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    /// (De)serialization error of a binary. Can have occured during deserialization or during serialization.
    #[error(transparent)]
    Serialization(#[from] bincode::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("no input text")]
    MissingInput,
    #[error("tried to format with invalid format: {0}")]
    UnknownFormat(String),
    #[error("annotations not set in sentence {0} which was supposedly parsed")]
    MissingAnnotations(usize),
    #[error("invalid grammar: {0}")]
    InvalidGrammar(String),
}
