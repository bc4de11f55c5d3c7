//! The parts of the checking pipeline.
//!
//! [annotator] and [error_finder] are implemented here. Everything upstream of them
//! (tokenization and spelling correction, parsing, lexicon lookup) and the pluggable
//! analyses are expressed as traits which callers implement. [replay] implements the
//! upstream traits from a recorded JSON dump.

use std::{
    collections::{HashMap, HashSet},
    io::{BufReader, Read, Write},
    path::Path,
};

use fs_err::File;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::annotation::Annotation;
use crate::readability::Readability;
use crate::types::{Meaning, ParseOutcome, Sentence, Token};

pub mod annotator;
pub mod error_finder;
pub mod replay;

/// A component which is stored as a binary.
pub trait Component: Serialize + DeserializeOwned {
    fn name() -> &'static str;

    fn new<P: AsRef<Path>>(p: P) -> Result<Self, crate::Error> {
        let reader = BufReader::new(File::open(p.as_ref())?);
        Ok(Self::from_reader(reader)?)
    }

    fn from_reader<R: Read>(reader: R) -> Result<Self, crate::Error> {
        Ok(bincode::deserialize_from(reader)?)
    }

    fn to_writer<W: Write>(&self, writer: W) -> Result<(), crate::Error> {
        Ok(bincode::serialize_into(writer, self)?)
    }
}

/// Configuration handed to the spelling pipeline for one call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpellingConfig {
    /// Error codes which must not be reported.
    pub ignore_rules: HashSet<String>,
    /// Whether to reject far-fetched automatic corrections.
    pub suppress_suggestions: bool,
}

/// Tokenization and token-level spelling correction.
pub trait SpellingPipeline {
    /// Tokenizes and corrects the text. Sentences are delimited by
    /// [SentenceBegin][crate::types::TokenKind::SentenceBegin] and
    /// [SentenceEnd][crate::types::TokenKind::SentenceEnd] tokens.
    fn tokenize<'a>(
        &'a self,
        text: &'a [String],
        config: &'a SpellingConfig,
    ) -> Box<dyn Iterator<Item = Token> + 'a>;
}

/// The context-free grammar parser.
pub trait Parser {
    fn parse(&self, tokens: &[Token]) -> ParseOutcome;
}

/// Morphological lexicon lookup.
pub trait Lexicon {
    /// All meanings of the word. Empty if the word is not known.
    fn lookup(&self, word: &str) -> Vec<Meaning>;
}

/// Rule-specific heuristics which may append annotations to a parsed sentence.
pub trait PatternMatcher {
    fn run(&self, annotations: &mut Vec<Annotation>, sentence: &Sentence);
}

/// A cheap classifier deciding whether a text likely contains an error at all.
pub trait SentenceClassifier {
    fn contains_error(&self, text: &str) -> bool;
}

/// Scores how easy a text is to read.
pub trait ReadabilityScorer {
    fn score(&self, tokens: &[Token]) -> Readability;
}

/// Finds the rarest words of a text.
pub trait RareWordAnalyzer {
    /// Returns up to `max_count` words with a probability below `cutoff`, rarest first.
    fn rare_words(&self, words: &[&Token], max_count: usize, cutoff: f64) -> Vec<(String, f64)>;
}

impl<'a, T> Lexicon for &'a T
where
    T: Lexicon,
{
    fn lookup(&self, word: &str) -> Vec<Meaning> {
        (*self).lookup(word)
    }
}

impl Lexicon for HashMap<String, Vec<Meaning>> {
    fn lookup(&self, word: &str) -> Vec<Meaning> {
        self.get(word).cloned().unwrap_or_default()
    }
}

impl<'a, T> Parser for &'a T
where
    T: Parser,
{
    fn parse(&self, tokens: &[Token]) -> ParseOutcome {
        (*self).parse(tokens)
    }
}

/// A pattern matcher which never adds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPatterns;

impl PatternMatcher for NoPatterns {
    fn run(&self, _annotations: &mut Vec<Annotation>, _sentence: &Sentence) {}
}

impl<F> PatternMatcher for F
where
    F: Fn(&mut Vec<Annotation>, &Sentence),
{
    fn run(&self, annotations: &mut Vec<Annotation>, sentence: &Sentence) {
        self(annotations, sentence)
    }
}

impl<F> SentenceClassifier for F
where
    F: Fn(&str) -> bool,
{
    fn contains_error(&self, text: &str) -> bool {
        self(text)
    }
}
