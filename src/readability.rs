//! Readability scoring.

use serde::{Deserialize, Serialize};

use crate::components::ReadabilityScorer;
use crate::types::{Token, TokenKind};

/// A readability score and a human-readable assessment of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Readability {
    pub score: f64,
    pub feedback: String,
}

const VOWELS: &str = "aáeéiíoóuúyýæö";
const DIPHTHONGS: &[&str] = &["au", "ei", "ey"];

/// The Flesch reading ease score, with syllables counted by Icelandic vowels.
#[derive(Debug, Clone, Copy, Default)]
pub struct Flesch;

impl Flesch {
    /// Counts the syllables of a word: vowels, with diphthongs counted once.
    pub fn syllables(word: &str) -> usize {
        let word = word.to_lowercase();
        let vowels = word.chars().filter(|c| VOWELS.contains(*c)).count();
        let diphthongs: usize = DIPHTHONGS.iter().map(|x| word.matches(x).count()).sum();

        vowels.saturating_sub(diphthongs).max(1)
    }

    pub fn get_score(tokens: &[Token]) -> f64 {
        let mut n_sentences = 0;
        let mut n_words = 0;
        let mut n_syllables = 0;

        for token in tokens {
            match token.kind {
                TokenKind::SentenceEnd => n_sentences += 1,
                TokenKind::Word | TokenKind::Person | TokenKind::Entity => {
                    for word in token.text.split_whitespace() {
                        n_words += 1;
                        n_syllables += Flesch::syllables(word);
                    }
                }
                _ => {}
            }
        }

        if n_words == 0 {
            return 0.0;
        }
        let n_sentences = n_sentences.max(1) as f64;
        let n_words = n_words as f64;

        206.835 - 1.015 * (n_words / n_sentences) - 84.6 * (n_syllables as f64 / n_words)
    }

    pub fn get_feedback(score: f64) -> &'static str {
        if score >= 90.0 {
            "Mjög auðlesinn texti"
        } else if score >= 80.0 {
            "Auðlesinn texti"
        } else if score >= 70.0 {
            "Frekar auðlesinn texti"
        } else if score >= 60.0 {
            "Miðlungsþungur texti"
        } else if score >= 50.0 {
            "Frekar þungur texti"
        } else if score >= 30.0 {
            "Þungur texti"
        } else {
            "Mjög þungur texti"
        }
    }
}

impl ReadabilityScorer for Flesch {
    fn score(&self, tokens: &[Token]) -> Readability {
        let score = Flesch::get_score(tokens);

        Readability {
            score,
            feedback: Flesch::get_feedback(score).to_string(),
        }
    }
}
