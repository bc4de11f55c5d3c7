use itertools::Itertools;
use serde::Serialize;

use super::{Format, FormatOptions};
use crate::annotation::Annotation;
use crate::correct::{CorrectedSentence, CorrectionResult};
use crate::types::Token;
use crate::utils;

/// A token as it appears in formatted output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenReport {
    /// The numeric kind code.
    pub k: u32,
    /// The token text, as rendered by the parser if the token was matched to a terminal.
    pub x: String,
    /// The original text, or the token text if there is none.
    pub o: String,
}

/// The formatting-ready summary of one annotated sentence.
#[derive(Debug, Clone)]
pub struct SentenceReport<'a> {
    pub original: String,
    /// The sentence with token-level corrections only.
    pub partially_corrected: String,
    /// The sentence with all suggestions applied.
    pub corrected: String,
    pub tokens: Vec<TokenReport>,
    /// Sorted by start index and then by end index.
    pub annotations: Vec<&'a Annotation>,
}

impl<'a> SentenceReport<'a> {
    fn new(sentence: &'a CorrectedSentence, annotations: &'a [Annotation]) -> Self {
        let mut annotations: Vec<&Annotation> = annotations.iter().collect();
        annotations.sort_by_key(|x| (x.start, x.end));

        let original = sentence
            .tokens
            .iter()
            .filter_map(|x| x.original.as_deref())
            .collect();

        let terminal_text = |i: usize| {
            sentence
                .terminals
                .as_ref()
                .and_then(|terminals| terminals.iter().find(|x| x.token_index == i))
                .map(|x| x.text.clone())
        };
        let tokens = sentence
            .tokens
            .iter()
            .enumerate()
            .map(|(i, token)| TokenReport {
                k: token.kind.code(),
                x: terminal_text(i).unwrap_or_else(|| token.text.clone()),
                o: token.original_or_text().to_string(),
            })
            .collect();

        SentenceReport {
            original,
            partially_corrected: utils::detokenize_tokens(&sentence.tokens, false),
            corrected: utils::detokenize_tokens(
                &apply_suggestions(&sentence.tokens, &annotations),
                false,
            ),
            tokens,
            annotations,
        }
    }
}

/// Applies the suggestions of the annotations to a copy of the tokens.
///
/// The first token of an annotated span gets the suggestion as its text, the rest of the span is removed.
/// Annotations are applied from the end of the sentence so earlier indices stay valid.
/// A wider annotation overrides any narrower one it contains.
pub fn apply_suggestions(tokens: &[Token], annotations: &[&Annotation]) -> Vec<Token> {
    let mut annotations = annotations.to_vec();
    annotations.sort_by_key(|x| (x.start, x.end));

    let mut tokens = tokens.to_vec();

    for annotation in annotations.iter().rev() {
        let suggest = match annotation.replacement() {
            Some(suggest) => suggest,
            None => continue,
        };
        if annotation.start >= tokens.len() {
            continue;
        }

        tokens[annotation.start].text = suggest.to_string();
        let end = (annotation.end + 1).min(tokens.len());
        if end > annotation.start + 1 {
            tokens.drain(annotation.start + 1..end);
        }
    }

    tokens
}

/// Renders annotated sentences. Every sentence must carry annotations.
///
/// # Errors
/// - If a sentence has no annotations, which means grammar checking did not run on it.
/// - If JSON serialization fails.
pub fn format_grammar(
    results: &CorrectionResult,
    format: Format,
    options: &FormatOptions,
) -> Result<String, crate::Error> {
    let reports = results
        .sentences
        .iter()
        .enumerate()
        .map(|(i, sentence)| {
            sentence
                .annotations
                .as_ref()
                .map(|annotations| SentenceReport::new(sentence, annotations))
                .ok_or(crate::Error::MissingAnnotations(i))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(match format {
        Format::Text => format_text(&reports, options),
        Format::Json => format_json(&reports)?,
        Format::Csv => format_csv(&reports),
        Format::M2 => format_m2(&reports),
    })
}

fn format_text(reports: &[SentenceReport], options: &FormatOptions) -> String {
    reports
        .iter()
        .map(|report| {
            let mut text = report.corrected.clone();
            if options.annotations {
                for annotation in &report.annotations {
                    text.push('\n');
                    text.push_str(&annotation.to_string());
                }
            }
            text
        })
        .join("\n")
}

#[derive(Serialize)]
struct AnnotationRecord<'a> {
    start: usize,
    end: usize,
    /// Offset of the first character in the original text.
    start_char: usize,
    /// Offset of the last character in the original text.
    end_char: usize,
    code: &'a str,
    text: &'a str,
    detail: &'a str,
    suggest: &'a str,
}

#[derive(Serialize)]
struct SentenceRecord<'a> {
    original: &'a str,
    corrected: &'a str,
    tokens: &'a [TokenReport],
    annotations: Vec<AnnotationRecord<'a>>,
}

/// Character offsets of each token plus one past the end, continuing from `offset`.
fn token_offsets(tokens: &[TokenReport], offset: &mut usize) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(tokens.len() + 1);
    for token in tokens {
        offsets.push(*offset);
        *offset += token.o.chars().count();
    }
    offsets.push(*offset);
    offsets
}

fn format_json(reports: &[SentenceReport]) -> Result<String, crate::Error> {
    let mut lines = Vec::with_capacity(reports.len());
    let mut offset = 0;

    for report in reports {
        let offsets = token_offsets(&report.tokens, &mut offset);
        let at = |i: usize| offsets.get(i).or_else(|| offsets.last()).copied().unwrap_or(0);

        let annotations = report
            .annotations
            .iter()
            .map(|x| AnnotationRecord {
                start: x.start,
                end: x.end,
                start_char: at(x.start),
                end_char: at(x.end + 1).saturating_sub(1),
                code: &x.code,
                text: &x.text,
                detail: x.detail.as_deref().unwrap_or(""),
                suggest: x.suggest.as_deref().unwrap_or(""),
            })
            .collect();

        lines.push(serde_json::to_string(&SentenceRecord {
            original: &report.original,
            corrected: &report.corrected,
            tokens: &report.tokens,
            annotations,
        })?);
    }

    Ok(lines.join("\n"))
}

fn format_csv(reports: &[SentenceReport]) -> String {
    reports
        .iter()
        .flat_map(|x| x.annotations.iter())
        .map(|x| {
            format!(
                "{},{},{},{},{},{}",
                x.code,
                x.original.as_deref().unwrap_or(""),
                x.suggest.as_deref().unwrap_or(""),
                x.start,
                x.end,
                x.suggestlist.join("|")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Appends the M2 lines of one sentence, followed by an empty line.
pub(crate) fn m2_lines<'a, I>(texts: I, annotations: &[&Annotation], lines: &mut Vec<String>)
where
    I: IntoIterator<Item = &'a str>,
{
    lines.push(format!("S {}", texts.into_iter().join(" ")));
    for annotation in annotations {
        lines.push(format!(
            "A {} {}|||{}|||{}|||REQUIRED|||-NONE-|||0",
            annotation.start,
            annotation.end + 1,
            annotation.code,
            annotation.suggest.as_deref().unwrap_or("")
        ));
    }
    lines.push(String::new());
}

fn format_m2(reports: &[SentenceReport]) -> String {
    let mut lines = Vec::new();
    for report in reports {
        m2_lines(
            report.tokens.iter().map(|x| x.x.as_str()),
            &report.annotations,
            &mut lines,
        );
    }
    lines.join("\n")
}
