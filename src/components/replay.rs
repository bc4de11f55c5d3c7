//! Upstream components which replay a recorded run of the tokenizer, the parser and the lexicon.
//!
//! A recording is a JSON document:
//!
//! ```json
//! {
//!     "lines": [{"text": "Ég sá hestr", "tokens": [{"kind": "S_BEGIN", "text": ""}, ...]}],
//!     "parses": [{"sentence": "Ég sá hestur", "outcome": {"outcome": "failed", "error_index": 2}}],
//!     "lexicon": {"hestur": [{"stem": "hestur", "category": "kk", "form": "NFET"}]}
//! }
//! ```
//!
//! Parses are looked up by the token texts of the sentence joined with single spaces.

use std::{collections::HashMap, io::Read};

use log::warn;
use serde::{Deserialize, Serialize};

use super::{Parser, SpellingConfig, SpellingPipeline};
use crate::types::{Meaning, ParseOutcome, Token, TokenKind};
use crate::utils;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayLine {
    pub text: String,
    pub tokens: Vec<Token>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayParse {
    pub sentence: String,
    pub outcome: ParseOutcome,
}

/// A recorded run of the upstream components.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayDocument {
    pub lines: Vec<ReplayLine>,
    pub parses: Vec<ReplayParse>,
    pub lexicon: HashMap<String, Vec<Meaning>>,
}

impl ReplayDocument {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, crate::Error> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// The recorded input text, one entry per line.
    pub fn text(&self) -> Vec<String> {
        self.lines.iter().map(|x| x.text.clone()).collect()
    }

    pub fn into_parts(self) -> (ReplaySpeller, ReplayParser, HashMap<String, Vec<Meaning>>) {
        let speller = ReplaySpeller {
            lines: self.lines.into_iter().map(|x| (x.text, x.tokens)).collect(),
        };
        let parser = ReplayParser {
            parses: self
                .parses
                .into_iter()
                .map(|x| (x.sentence, x.outcome))
                .collect(),
        };

        (speller, parser, self.lexicon)
    }
}

/// Replays the recorded tokens of each input line.
#[derive(Debug, Clone, Default)]
pub struct ReplaySpeller {
    lines: HashMap<String, Vec<Token>>,
}

impl ReplaySpeller {
    fn replay(&self, line: &str, config: &SpellingConfig) -> Vec<Token> {
        let tokens = match self.lines.get(line) {
            Some(tokens) => tokens.clone(),
            None => {
                warn!("No recorded tokens for line '{}', treating it as unknown words.", line);
                unknown_words(line)
            }
        };

        tokens
            .into_iter()
            .map(|mut token| {
                let ignored = token
                    .error
                    .as_ref()
                    .map_or(false, |x| config.ignore_rules.contains(&x.code));
                if ignored {
                    token.error = None;
                } else if let (Some(error), true) = (&mut token.error, config.suppress_suggestions) {
                    error.suggest = None;
                    error.suggestlist.clear();
                }
                token
            })
            .collect()
    }
}

fn unknown_words(line: &str) -> Vec<Token> {
    let mut tokens = vec![Token::sentence_begin()];
    tokens.extend(line.split_whitespace().map(|word| {
        Token::new(TokenKind::Word, word).with_meanings(Vec::new())
    }));
    tokens.push(Token::sentence_end());
    tokens
}

impl SpellingPipeline for ReplaySpeller {
    fn tokenize<'a>(
        &'a self,
        text: &'a [String],
        config: &'a SpellingConfig,
    ) -> Box<dyn Iterator<Item = Token> + 'a> {
        Box::new(text.iter().flat_map(move |line| self.replay(line, config)))
    }
}

/// Replays recorded parse outcomes.
#[derive(Debug, Clone, Default)]
pub struct ReplayParser {
    parses: HashMap<String, ParseOutcome>,
}

impl Parser for ReplayParser {
    fn parse(&self, tokens: &[Token]) -> ParseOutcome {
        let key = utils::text_from_tokens(tokens);

        match self.parses.get(&key) {
            Some(outcome) => outcome.clone(),
            None => {
                warn!("No recorded parse for '{}'.", key);
                ParseOutcome::Failed { error_index: 0 }
            }
        }
    }
}
