//! Assembles the annotations of a sentence from the token-level errors, the parse outcome,
//! the errors found in the parse tree and the pattern matcher.

use log::{debug, warn};
use std::sync::Arc;

use super::{error_finder::ErrorFinder, Lexicon, NoPatterns, PatternMatcher};
use crate::annotation::{self, Annotation};
use crate::grammar::{Grammar, ValidationError};
use crate::types::*;

/// If less than this fraction of the words in a sentence is recognized,
/// the sentence is assumed to be in a foreign language.
pub const ICELANDIC_RATIO: f64 = 0.5;

/// Produces the sorted, deduplicated annotations of a sentence.
pub struct Annotator {
    grammar: Arc<Grammar>,
    lexicon: Box<dyn Lexicon>,
    patterns: Box<dyn PatternMatcher>,
}

impl Annotator {
    pub fn new<L: Lexicon + 'static>(grammar: Arc<Grammar>, lexicon: L) -> Self {
        Annotator {
            grammar,
            lexicon: Box::new(lexicon),
            patterns: Box::new(NoPatterns),
        }
    }

    /// Sets the pattern matcher which runs on successfully parsed sentences.
    pub fn with_patterns<P: PatternMatcher + 'static>(mut self, patterns: P) -> Self {
        self.patterns = Box::new(patterns);
        self
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Computes the annotations of a sentence. Sorted by start index and then by decreasing end index,
    /// without two annotations having the same code and span.
    pub fn annotate(&self, sentence: &Sentence) -> Vec<Annotation> {
        let tokens = sentence.tokens();
        if tokens.is_empty() {
            return Vec::new();
        }

        let mut annotations = Vec::new();
        let mut words_in_lexicon = 0;
        let mut words_not_in_lexicon = 0;

        for (i, token) in tokens.iter().enumerate() {
            match token.kind {
                TokenKind::Word => {
                    if token.is_recognized() {
                        words_in_lexicon += 1;
                    } else {
                        words_not_in_lexicon += 1;
                    }
                }
                TokenKind::Person => words_in_lexicon += 1,
                // each word of an entity name counts as unrecognized
                TokenKind::Entity => words_not_in_lexicon += token.text.matches(' ').count() + 1,
                _ => {}
            }

            if let Some(error) = &token.error {
                if self.keep_token_error(sentence, i, token, error) {
                    annotations.push(Annotation::from_token_error(i, error, tokens.len()));
                }
            }
        }

        let n_words = words_in_lexicon + words_not_in_lexicon;

        if n_words > 2 && (words_in_lexicon as f64 / n_words as f64) < ICELANDIC_RATIO {
            annotations = vec![not_icelandic(
                tokens.len(),
                words_not_in_lexicon as f64 / n_words as f64,
            )];
        } else {
            match sentence.outcome() {
                ParseOutcome::Failed { error_index } => {
                    annotations.push(unparsed(sentence, *error_index));
                }
                ParseOutcome::Parsed(tree) => {
                    ErrorFinder::new(&self.grammar, sentence, tree).run(&mut annotations);
                    self.patterns.run(&mut annotations, sentence);
                }
            }
        }

        annotation::normalize(&mut annotations);
        annotations
    }

    /// Whether to keep the annotation of a token-level error. A suggestion which does not fit the
    /// terminal the token was matched to is dropped; if that can not be checked, the annotation is kept.
    fn keep_token_error(
        &self,
        sentence: &Sentence,
        index: usize,
        token: &Token,
        error: &TokenError,
    ) -> bool {
        let terminal = match sentence
            .tree()
            .and_then(|tree| tree.terminal_for_token(index))
        {
            Some(terminal) => terminal,
            None => return true,
        };

        match self.suggestion_fits(terminal, token, error) {
            Ok(fits) => {
                if !fits {
                    debug!(
                        "Dropping suggestion '{}' for token {} which does not fit terminal {}.",
                        error.suggest.as_deref().unwrap_or(""),
                        index,
                        terminal.rule
                    );
                }
                fits
            }
            Err(err) => {
                warn!("Could not validate suggestion for token {}: {}", index, err);
                true
            }
        }
    }

    fn suggestion_fits(
        &self,
        terminal: &Terminal,
        token: &Token,
        error: &TokenError,
    ) -> Result<bool, ValidationError> {
        let spec = self.grammar.terminal(terminal.rule)?;

        if token.value.is_some() && token.meanings().is_none() {
            return Err(ValidationError::MeaningMismatch {
                text: token.text.clone(),
                kind: token.kind,
            });
        }

        let suggest = match error.suggest.as_deref() {
            Some(suggest) if !suggest.is_empty() => suggest,
            _ => return Ok(true),
        };

        let meanings = self.lexicon.lookup(suggest);
        if meanings.is_empty() {
            // nothing to judge the suggestion by
            return Ok(true);
        }

        Ok(meanings.iter().any(|meaning| spec.accepts(meaning)))
    }
}

fn not_icelandic(n_tokens: usize, unrecognized: f64) -> Annotation {
    Annotation::new(
        0,
        n_tokens - 1,
        "E004",
        "Málsgreinin er sennilega ekki á íslensku",
    )
    .with_detail(format!(
        "{:.0}% orða í henni finnast ekki í íslenskri orðabók",
        unrecognized * 100.0
    ))
}

fn unparsed(sentence: &Sentence, error_index: usize) -> Annotation {
    let n_tokens = sentence.tokens().len();
    let context = sentence.text_of(error_index.saturating_sub(1), error_index + 2);

    Annotation::new(0, n_tokens - 1, "E001", "Málsgreinin fellur ekki að reglum").with_detail(
        format!(
            "Þáttun brást í kring um {}. tóka ('{}')",
            error_index + 1,
            context
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::TerminalSpec;
    use std::collections::{HashMap, HashSet};

    fn word(text: &str, recognized: bool) -> Token {
        let meanings = if recognized {
            vec![Meaning::new(text, "kk", "NFET")]
        } else {
            Vec::new()
        };
        Token::new(TokenKind::Word, text).with_meanings(meanings)
    }

    fn terminal(token_index: usize, rule: usize) -> Terminal {
        Terminal {
            token_index,
            category: "no".into(),
            variants: vec!["et".into(), "þgf".into()],
            rule,
            text: String::new(),
            lemma: None,
        }
    }

    fn annotator() -> Annotator {
        let grammar = Grammar::new(
            vec![TerminalSpec::new("no_et_þgf", "no", &["et", "þgf"])],
            HashMap::new(),
            HashSet::new(),
        );
        let mut lexicon: HashMap<String, Vec<Meaning>> = HashMap::new();
        lexicon.insert("hesti".into(), vec![Meaning::new("hestur", "kk", "ÞGFET")]);
        lexicon.insert("hestur".into(), vec![Meaning::new("hestur", "kk", "NFET")]);

        Annotator::new(Arc::new(grammar), lexicon)
    }

    fn parsed(tokens: Vec<Token>, terminals: Vec<Terminal>) -> Sentence {
        let leaves = (0..terminals.len()).map(Node::terminal).collect();
        Sentence::new(
            tokens,
            ParseOutcome::Parsed(ParseTree::new(
                Node::nonterminal("S0", &[], leaves),
                terminals,
                1,
            )),
        )
    }

    #[test]
    fn foreign_sentence_gets_single_annotation() {
        let tokens = vec![
            word("This", false),
            word("is", false).with_error(TokenError::new("S001", "Óþekkt orð")),
            word("hestur", true),
            word("English", false),
        ];
        let sentence = Sentence::new(tokens, ParseOutcome::Failed { error_index: 1 });

        let annotations = annotator().annotate(&sentence);

        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].code, "E004");
        assert_eq!((annotations[0].start, annotations[0].end), (0, 3));
        assert_eq!(
            annotations[0].detail.as_deref(),
            Some("75% orða í henni finnast ekki í íslenskri orðabók")
        );
    }

    #[test]
    fn entity_words_count_as_unrecognized() {
        let tokens = vec![
            word("hestur", true),
            Token::new(TokenKind::Entity, "Sameinuðu þjóðirnar"),
            word("hestur", true),
        ];
        let sentence = Sentence::new(tokens, ParseOutcome::Failed { error_index: 0 });

        let annotations = annotator().annotate(&sentence);
        assert!(annotations.iter().all(|x| x.code != "E004"));
    }

    #[test]
    fn unparsed_sentence_keeps_token_annotations() {
        let tokens = vec![
            word("Ég", true),
            word("sá", true).with_error(TokenError::new("S004", "Stafsetning").with_suggest("sá")),
            word("hestur", true),
            Token::new(TokenKind::Punctuation, "."),
        ];
        let sentence = Sentence::new(tokens, ParseOutcome::Failed { error_index: 2 });

        let annotations = annotator().annotate(&sentence);

        assert_eq!(annotations.len(), 2);
        assert_eq!(annotations[0].code, "E001");
        assert_eq!((annotations[0].start, annotations[0].end), (0, 3));
        assert_eq!(
            annotations[0].detail.as_deref(),
            Some("Þáttun brást í kring um 3. tóka ('sá hestur.')")
        );
        assert_eq!(annotations[1].code, "S004");
    }

    #[test]
    fn error_window_is_clamped() {
        let tokens = vec![word("hestur", true), word("hestur", true)];
        let sentence = Sentence::new(tokens, ParseOutcome::Failed { error_index: 7 });

        let annotations = annotator().annotate(&sentence);
        assert_eq!(
            annotations[0].detail.as_deref(),
            Some("Þáttun brást í kring um 8. tóka ('')")
        );
    }

    #[test]
    fn suggestion_must_fit_terminal() {
        let fitting = parsed(
            vec![
                word("hesti", true),
                word("hessti", false).with_error(TokenError::new("S004", "Stafsetning").with_suggest("hesti")),
                word("hesti", true),
            ],
            vec![terminal(0, 0), terminal(1, 0), terminal(2, 0)],
        );
        let not_fitting = parsed(
            vec![
                word("hesti", true),
                word("hessti", false).with_error(TokenError::new("S004", "Stafsetning").with_suggest("hestur")),
                word("hesti", true),
            ],
            vec![terminal(0, 0), terminal(1, 0), terminal(2, 0)],
        );

        assert_eq!(annotator().annotate(&fitting).len(), 1);
        assert!(annotator().annotate(&not_fitting).is_empty());
    }

    #[test]
    fn unknown_terminal_keeps_annotation() {
        let _ = env_logger::builder().is_test(true).try_init();

        let sentence = parsed(
            vec![
                word("hesti", true),
                word("hessti", false).with_error(TokenError::new("S004", "Stafsetning").with_suggest("hestur")),
                word("hesti", true),
            ],
            vec![terminal(0, 0), terminal(1, 9), terminal(2, 0)],
        );

        assert_eq!(annotator().annotate(&sentence).len(), 1);
    }

    #[test]
    fn numeric_value_keeps_annotation() {
        let sentence = parsed(
            vec![
                word("hesti", true),
                Token::new(TokenKind::Word, "1,8 milljarður")
                    .with_value(TokenValue::Number(1.8e9))
                    .with_error(TokenError::new("S004", "Stafsetning").with_suggest("hestur")),
                word("hesti", true),
            ],
            vec![terminal(0, 0), terminal(1, 0), terminal(2, 0)],
        );

        assert_eq!(annotator().annotate(&sentence).len(), 1);
    }

    #[test]
    fn pattern_matcher_runs_on_parsed_sentences() {
        let annotator = annotator().with_patterns(|annotations: &mut Vec<Annotation>, _: &Sentence| {
            annotations.push(Annotation::new(0, 0, "P001", "Mynstur"));
            annotations.push(Annotation::new(0, 0, "P001", "Mynstur"));
        });
        let sentence = parsed(
            vec![word("hesti", true), word("hesti", true)],
            vec![terminal(0, 0), terminal(1, 0)],
        );

        let annotations = annotator.annotate(&sentence);
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].code, "P001");
    }
}
