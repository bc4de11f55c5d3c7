//! Correction of whole documents: spelling, optional analyses and grammar checking.

use log::debug;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, time::Instant};

use crate::annotation::Annotation;
use crate::components::{
    annotator::Annotator, Parser, RareWordAnalyzer, ReadabilityScorer, SentenceClassifier,
    SpellingConfig, SpellingPipeline,
};
use crate::format::{self, Format, FormatOptions};
use crate::readability::Readability;
use crate::types::{ParseOutcome, Sentence, Terminal, Token, TokenKind};
use crate::Error;

/// Options for a [Corrector].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectorOptions {
    /// Whether to parse and check grammar. If false, only token-level corrections are made.
    pub grammar_check: bool,
    /// The maximum number of rare words to report.
    pub rare_words_max: usize,
    /// Words with a probability at or above this are not considered rare.
    pub rare_words_cutoff: f64,
}

impl Default for CorrectorOptions {
    fn default() -> Self {
        CorrectorOptions {
            grammar_check: true,
            rare_words_max: 10,
            rare_words_cutoff: 0.00000005,
        }
    }
}

/// The tokens of a sentence with its annotations and terminals.
/// `annotations` is `None` if grammar checking did not run, `terminals` is `None` if the sentence was not parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectedSentence {
    pub tokens: Vec<Token>,
    pub annotations: Option<Vec<Annotation>>,
    pub terminals: Option<Vec<Terminal>>,
}

impl CorrectedSentence {
    pub fn new(
        tokens: Vec<Token>,
        annotations: Option<Vec<Annotation>>,
        terminals: Option<Vec<Terminal>>,
    ) -> Self {
        CorrectedSentence {
            tokens,
            annotations,
            terminals,
        }
    }

    fn annotated(sentence: Sentence, annotations: Vec<Annotation>) -> Self {
        let (tokens, outcome) = sentence.into_parts();
        let terminals = match outcome {
            ParseOutcome::Parsed(tree) => Some(tree.terminals),
            ParseOutcome::Failed { .. } => None,
        };

        CorrectedSentence::new(tokens, Some(annotations), terminals)
    }

    /// Removes annotations with one of the given codes.
    pub fn filter_annotations(&mut self, ignore_rules: &HashSet<String>) {
        if let Some(annotations) = &mut self.annotations {
            annotations.retain(|x| !ignore_rules.contains(&x.code));
        }
    }
}

/// Statistics of the grammar check of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseStats {
    pub num_sentences: usize,
    pub num_parsed: usize,
    pub num_tokens: usize,
    /// Token-weighted mean of the per-token ambiguity of the parsed sentences.
    pub ambiguity: f64,
    /// Seconds spent in the parser.
    pub parse_time: f64,
}

/// The result of correcting a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionResult {
    pub sentences: Vec<CorrectedSentence>,
    pub stats: Option<ParseStats>,
    pub readability: Option<Readability>,
    pub rare_words: Option<Vec<(String, f64)>>,
}

impl CorrectionResult {
    pub fn new(sentences: Vec<CorrectedSentence>) -> Self {
        CorrectionResult {
            sentences,
            stats: None,
            readability: None,
            rare_words: None,
        }
    }

    /// Removes annotations with one of the given codes from all sentences.
    pub fn filter_annotations(&mut self, ignore_rules: &HashSet<String>) {
        for sentence in self.sentences.iter_mut() {
            sentence.filter_annotations(ignore_rules);
        }
    }
}

/// Splits a token stream into sentences at sentence begin and end markers.
/// The markers are not part of the sentences.
fn split_sentences(tokens: Vec<Token>) -> Vec<Vec<Token>> {
    let mut sentences = Vec::new();
    let mut current = Vec::new();

    for token in tokens {
        if token.is_sentence_marker() {
            if !current.is_empty() {
                sentences.push(std::mem::take(&mut current));
            }
        } else {
            current.push(token);
        }
    }

    if !current.is_empty() {
        sentences.push(current);
    }

    sentences
}

/// Corrects documents by running the spelling pipeline, the optional analyses and the grammar check.
pub struct Corrector {
    speller: Box<dyn SpellingPipeline>,
    parser: Box<dyn Parser>,
    annotator: Annotator,
    prefilter: Option<Box<dyn SentenceClassifier>>,
    readability: Option<Box<dyn ReadabilityScorer>>,
    rare_words: Option<Box<dyn RareWordAnalyzer>>,
    options: CorrectorOptions,
}

impl Corrector {
    pub fn new<S, P>(speller: S, parser: P, annotator: Annotator) -> Self
    where
        S: SpellingPipeline + 'static,
        P: Parser + 'static,
    {
        Corrector {
            speller: Box::new(speller),
            parser: Box::new(parser),
            annotator,
            prefilter: None,
            readability: None,
            rare_words: None,
            options: CorrectorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CorrectorOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets a classifier which decides whether the full grammar check is needed at all.
    pub fn with_prefilter<C: SentenceClassifier + 'static>(mut self, prefilter: C) -> Self {
        self.prefilter = Some(Box::new(prefilter));
        self
    }

    pub fn with_readability<R: ReadabilityScorer + 'static>(mut self, scorer: R) -> Self {
        self.readability = Some(Box::new(scorer));
        self
    }

    pub fn with_rare_words<R: RareWordAnalyzer + 'static>(mut self, analyzer: R) -> Self {
        self.rare_words = Some(Box::new(analyzer));
        self
    }

    pub fn options(&self) -> &CorrectorOptions {
        &self.options
    }

    pub fn annotator(&self) -> &Annotator {
        &self.annotator
    }

    /// Corrects the text by first correcting spelling and then grammar.
    /// Annotations with a code in `ignore_rules` are removed from the result.
    pub fn correct(
        &self,
        text: &[String],
        ignore_rules: &HashSet<String>,
        suppress_suggestions: bool,
    ) -> CorrectionResult {
        self.run(
            text,
            ignore_rules,
            suppress_suggestions,
            self.options.grammar_check,
        )
    }

    fn run(
        &self,
        text: &[String],
        ignore_rules: &HashSet<String>,
        suppress_suggestions: bool,
        grammar_check: bool,
    ) -> CorrectionResult {
        let config = SpellingConfig {
            ignore_rules: ignore_rules.clone(),
            suppress_suggestions,
        };
        // the token stream is consumed more than once below
        let tokens: Vec<Token> = self.speller.tokenize(text, &config).collect();

        let readability = self.readability.as_ref().map(|x| x.score(&tokens));
        let rare_words = self.rare_words.as_ref().map(|analyzer| {
            let words: Vec<&Token> = tokens
                .iter()
                .filter(|x| x.kind == TokenKind::Word)
                .collect();
            analyzer.rare_words(
                &words,
                self.options.rare_words_max,
                self.options.rare_words_cutoff,
            )
        });

        let mut result = if !grammar_check {
            CorrectionResult::new(vec![CorrectedSentence::new(tokens, None, None)])
        } else if !self.needs_grammar_check(&tokens) {
            debug!("Prefilter found no error, skipping the grammar check.");
            CorrectionResult::new(vec![CorrectedSentence::new(tokens, Some(Vec::new()), None)])
        } else {
            let (sentences, stats) = self.check_grammar(tokens);
            let mut result = CorrectionResult::new(sentences);
            result.stats = Some(stats);
            result
        };

        result.readability = readability;
        result.rare_words = rare_words;
        result.filter_annotations(ignore_rules);
        result
    }

    fn needs_grammar_check(&self, tokens: &[Token]) -> bool {
        match &self.prefilter {
            Some(prefilter) => {
                let text: String = tokens.iter().map(|x| x.original_or_text()).collect();
                prefilter.contains_error(&text)
            }
            None => true,
        }
    }

    fn check_grammar(&self, tokens: Vec<Token>) -> (Vec<CorrectedSentence>, ParseStats) {
        let mut sentences = Vec::new();
        let mut num_parsed = 0;
        let mut num_tokens = 0;
        let mut parse_time = 0.0;
        let mut total_ambiguity = 0.0;
        let mut parsed_tokens = 0;

        for tokens in split_sentences(tokens) {
            let start = Instant::now();
            let outcome = self.parser.parse(&tokens);
            parse_time += start.elapsed().as_secs_f64();

            num_tokens += tokens.len();
            if let ParseOutcome::Parsed(tree) = &outcome {
                num_parsed += 1;
                let n = tokens.len() as f64;
                total_ambiguity += (tree.combinations.max(1) as f64).powf(1.0 / n) * n;
                parsed_tokens += tokens.len();
            }

            let sentence = Sentence::new(tokens, outcome);
            let annotations = self.annotator.annotate(&sentence);
            sentences.push(CorrectedSentence::annotated(sentence, annotations));
        }

        let stats = ParseStats {
            num_sentences: sentences.len(),
            num_parsed,
            num_tokens,
            ambiguity: if parsed_tokens > 0 {
                total_ambiguity / parsed_tokens as f64
            } else {
                1.0
            },
            parse_time,
        };
        debug!("{:?}", stats);

        (sentences, stats)
    }
}

/// The input text of [check_errors].
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Text(String),
    Lines(Vec<String>),
}

impl Input {
    fn into_lines(self) -> Vec<String> {
        match self {
            Input::Text(text) => vec![text],
            Input::Lines(lines) => lines,
        }
    }
}

impl From<&str> for Input {
    fn from(text: &str) -> Self {
        Input::Text(text.to_string())
    }
}

impl From<String> for Input {
    fn from(text: String) -> Self {
        Input::Text(text)
    }
}

impl From<Vec<String>> for Input {
    fn from(lines: Vec<String>) -> Self {
        Input::Lines(lines)
    }
}

/// Options for [check_errors].
#[derive(Debug, Clone)]
pub struct CheckOptions {
    pub input: Option<Input>,
    /// One of `text`, `json`, `csv` and `m2`.
    pub format: String,
    /// Whether to check grammar. If false, only token-level errors are reported.
    pub all_errors: bool,
    /// Whether to list the annotations in text output.
    pub annotations: bool,
    /// Whether to list all annotations at the end of text output instead of after each sentence.
    pub print_all: bool,
    pub ignore_rules: HashSet<String>,
    pub suppress_suggestions: bool,
    /// Whether to separate tokens by spaces in token-level text output.
    pub spaced: bool,
    /// Whether to use normalized punctuation in token-level text output.
    pub normalize: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        CheckOptions {
            input: None,
            format: "json".to_string(),
            all_errors: true,
            annotations: false,
            print_all: false,
            ignore_rules: HashSet::new(),
            suppress_suggestions: false,
            spaced: false,
            normalize: false,
        }
    }
}

/// Checks the input and renders the result in the chosen format.
///
/// # Errors
/// - If there is no input.
/// - If the format is not one of `text`, `json`, `csv` and `m2`.
/// - If the result can not be rendered.
pub fn check_errors(corrector: &Corrector, options: CheckOptions) -> Result<String, Error> {
    let input = options.input.ok_or(Error::MissingInput)?;
    let output_format: Format = options.format.parse()?;

    let results = corrector.run(
        &input.into_lines(),
        &options.ignore_rules,
        options.suppress_suggestions,
        options.all_errors,
    );

    let format_options = FormatOptions {
        annotations: options.annotations,
        print_all: options.print_all,
        spaced: options.spaced,
        normalize: options.normalize,
    };

    let mut output = if options.all_errors {
        format::format_grammar(&results, output_format, &format_options)?
    } else {
        format::format_spelling(&results, output_format, &format_options)?
    };

    if let Some(readability) = &results.readability {
        output.push_str(&format!(
            "\nFlesch score: {:.2} ({})",
            readability.score, readability.feedback
        ));
    }
    if let Some(rare_words) = &results.rare_words {
        output.push_str("\nRare words:\n");
        for (word, probability) in rare_words {
            output.push_str(&format!("\t{}: {:.8}\n", word, probability));
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Lexicon;
    use crate::grammar::Grammar;
    use crate::types::{Meaning, Node, ParseTree, TokenError};
    use std::sync::Arc;

    struct Speller;

    impl SpellingPipeline for Speller {
        fn tokenize<'a>(
            &'a self,
            text: &'a [String],
            config: &'a SpellingConfig,
        ) -> Box<dyn Iterator<Item = Token> + 'a> {
            Box::new(text.iter().flat_map(move |line| {
                let mut tokens = vec![Token::sentence_begin()];
                for (i, word) in line.split_whitespace().enumerate() {
                    let original = if i == 0 { word.to_string() } else { format!(" {}", word) };
                    let mut token = Token::new(TokenKind::Word, word)
                        .with_original(original)
                        .with_meanings(vec![Meaning::new(word, "kk", "NFET")]);
                    if word == "hestr" && !config.ignore_rules.contains("S004") {
                        token = token.with_error(TokenError::new("S004", "Stafsetning").with_suggest("hestur"));
                    }
                    tokens.push(token);
                }
                tokens.push(Token::sentence_end());
                tokens
            }))
        }
    }

    /// Parses sentences with at most three tokens.
    struct ShortParser;

    impl Parser for ShortParser {
        fn parse(&self, tokens: &[Token]) -> ParseOutcome {
            if tokens.len() > 3 {
                return ParseOutcome::Failed { error_index: 3 };
            }
            ParseOutcome::Parsed(ParseTree::new(
                Node::nonterminal("S0", &[], Vec::new()),
                Vec::new(),
                8,
            ))
        }
    }

    struct NoLexicon;

    impl Lexicon for NoLexicon {
        fn lookup(&self, _word: &str) -> Vec<Meaning> {
            Vec::new()
        }
    }

    fn corrector() -> Corrector {
        Corrector::new(
            Speller,
            ShortParser,
            Annotator::new(Arc::new(Grammar::default()), NoLexicon),
        )
    }

    fn lines(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn sentences_are_annotated_separately() {
        let result = corrector().correct(
            &lines(&["Ég sá hestr", "Hann kom ekki í gær"]),
            &HashSet::new(),
            false,
        );

        assert_eq!(result.sentences.len(), 2);
        let first = result.sentences[0].annotations.as_ref().unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].code, "S004");
        assert!(result.sentences[0].terminals.is_some());

        let second = result.sentences[1].annotations.as_ref().unwrap();
        assert_eq!(second[0].code, "E001");
        assert!(result.sentences[1].terminals.is_none());

        let stats = result.stats.unwrap();
        assert_eq!((stats.num_sentences, stats.num_parsed, stats.num_tokens), (2, 1, 8));
        assert!((stats.ambiguity - 2.0).abs() < 1e-9);
    }

    #[test]
    fn ignored_rules_are_filtered() {
        let mut ignore_rules = HashSet::new();
        ignore_rules.insert("E001".to_string());

        let result = corrector().correct(&lines(&["Hann kom ekki í gær"]), &ignore_rules, false);
        assert!(result.sentences[0].annotations.as_ref().unwrap().is_empty());
    }

    #[test]
    fn without_grammar_check_tokens_are_not_split() {
        let corrector = corrector().with_options(CorrectorOptions {
            grammar_check: false,
            ..CorrectorOptions::default()
        });
        let result = corrector.correct(&lines(&["Ég sá hestr", "Hann kom"]), &HashSet::new(), false);

        assert_eq!(result.sentences.len(), 1);
        assert_eq!(result.sentences[0].tokens.len(), 9);
        assert!(result.sentences[0].annotations.is_none());
        assert!(result.stats.is_none());
    }

    #[test]
    fn prefilter_skips_grammar_check() {
        let corrector = corrector().with_prefilter(|text: &str| text.contains("hestr"));

        let skipped = corrector.correct(&lines(&["Hann kom ekki í gær"]), &HashSet::new(), false);
        assert_eq!(skipped.sentences.len(), 1);
        assert_eq!(skipped.sentences[0].annotations, Some(Vec::new()));

        let checked = corrector.correct(&lines(&["Ég sá hestr"]), &HashSet::new(), false);
        assert!(checked.stats.is_some());
    }

    #[test]
    fn check_errors_reports_configuration_errors() {
        let corrector = corrector();

        assert!(matches!(
            check_errors(&corrector, CheckOptions::default()),
            Err(Error::MissingInput)
        ));
        assert!(matches!(
            check_errors(
                &corrector,
                CheckOptions {
                    input: Some("Ég sá hest".into()),
                    format: "xml".to_string(),
                    ..CheckOptions::default()
                }
            ),
            Err(Error::UnknownFormat(format)) if format == "xml"
        ));
    }

    #[test]
    fn check_errors_appends_readability() {
        let corrector = corrector().with_readability(crate::readability::Flesch);
        let output = check_errors(
            &corrector,
            CheckOptions {
                input: Some("Ég sá hestr".into()),
                format: "text".to_string(),
                ..CheckOptions::default()
            },
        )
        .unwrap();

        assert!(output.starts_with("Ég sá hestur"));
        assert!(output.contains("\nFlesch score: "));
    }
}
