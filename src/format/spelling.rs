use itertools::Itertools;
use serde::Serialize;
use serde_json::{json, Value};

use super::{grammar::m2_lines, Format, FormatOptions};
use crate::annotation::Annotation;
use crate::correct::CorrectionResult;
use crate::types::{Token, TokenError, TokenKind, TokenValue};
use crate::utils;

/// The decoded value of a token for output. Words have no value since their meanings are not rendered.
/// With `quoted`, textual values are quoted and compound values are joined with `|`.
fn value(token: &Token, quoted: bool) -> Option<Value> {
    let value = token.value.as_ref()?;

    match token.kind {
        TokenKind::Word | TokenKind::Person | TokenKind::Entity | TokenKind::SentenceBegin => {
            return None
        }
        TokenKind::Punctuation => {
            let punctuation = token.normalized_text();
            return Some(Value::String(if quoted {
                utils::quote(punctuation)
            } else {
                punctuation.to_string()
            }));
        }
        _ => {}
    }

    Some(match value {
        TokenValue::Meanings(_) => return None,
        TokenValue::Number(number) => json!(number),
        TokenValue::Currency(iso) => json!(iso),
        TokenValue::Amount { amount, currency } => {
            if quoted {
                json!(format!("\"{:?}|{}\"", amount, currency))
            } else {
                json!([amount, currency])
            }
        }
        TokenValue::Components(components) => {
            if quoted && token.kind.has_components() {
                json!(utils::quote(&components.iter().join("|")))
            } else {
                json!(components)
            }
        }
        TokenValue::Punctuation(text) | TokenValue::Text(text) => {
            if quoted {
                json!(utils::quote(text))
            } else {
                json!(text)
            }
        }
    })
}

fn csv_value(token: &Token) -> String {
    match value(token, true) {
        Some(Value::String(text)) if !text.is_empty() => text,
        Some(Value::Null) | Some(Value::String(_)) | None => "\"\"".to_string(),
        Some(other) => other.to_string(),
    }
}

#[derive(Serialize)]
struct TokenRecord<'a> {
    k: &'static str,
    t: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    v: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    e: Option<&'a TokenError>,
}

fn to_text(tokens: &[Token], options: &FormatOptions) -> String {
    match (options.spaced, options.normalize) {
        (true, true) => utils::normalized_text_from_tokens(tokens),
        (true, false) => utils::text_from_tokens(tokens),
        (false, _) => utils::detokenize_tokens(tokens, true),
    }
}

/// Splits tokens into sentences at sentence markers, keeping nonempty sentences.
fn sentences(tokens: &[Token]) -> impl Iterator<Item = &[Token]> {
    tokens
        .split(|x| x.is_sentence_marker())
        .filter(|x| !x.is_empty())
}

/// Renders token-level corrections only. Annotations of the sentences are ignored;
/// the errors attached to tokens are reported instead.
///
/// # Errors
/// - If JSON serialization fails.
pub fn format_spelling(
    results: &CorrectionResult,
    format: Format,
    options: &FormatOptions,
) -> Result<String, crate::Error> {
    let mut lines: Vec<String> = Vec::new();
    let mut deferred: Vec<String> = Vec::new();

    for sentence in &results.sentences {
        let tokens = &sentence.tokens;

        match format {
            Format::Text => {
                let mut text = to_text(tokens, options);
                if options.annotations {
                    let errors = tokens
                        .iter()
                        .filter_map(|x| x.error.as_ref())
                        .map(|x| x.to_string());
                    if options.print_all {
                        deferred.extend(errors);
                    } else {
                        for error in errors {
                            text.push('\n');
                            text.push_str(&error);
                        }
                    }
                }
                lines.push(text);
            }
            Format::Csv => {
                for token in tokens {
                    if !token.text.is_empty() {
                        lines.push(format!(
                            "{},{},{},{}",
                            token.kind.code(),
                            utils::quote(&token.text),
                            csv_value(token),
                            utils::quote(&token.error.as_ref().map(|x| x.to_string()).unwrap_or_default())
                        ));
                    } else if token.kind == TokenKind::SentenceEnd {
                        lines.push("0,\"\",\"\"".to_string());
                    }
                }
            }
            Format::Json => {
                for token in tokens {
                    lines.push(serde_json::to_string(&TokenRecord {
                        k: token.kind.descr(),
                        t: &token.text,
                        v: value(token, false),
                        e: token.error.as_ref(),
                    })?);
                }
            }
            Format::M2 => {
                for tokens in sentences(tokens) {
                    let annotations: Vec<Annotation> = tokens
                        .iter()
                        .enumerate()
                        .filter_map(|(i, token)| {
                            token
                                .error
                                .as_ref()
                                .map(|error| Annotation::from_token_error(i, error, tokens.len()))
                        })
                        .collect();
                    let annotations: Vec<&Annotation> = annotations.iter().collect();

                    m2_lines(tokens.iter().map(|x| x.text.as_str()), &annotations, &mut lines);
                }
            }
        }
    }

    if options.print_all && format == Format::Text {
        let mut output = lines.join(" ");
        if !deferred.is_empty() {
            output.push('\n');
            output.push_str(&deferred.join("\n"));
        }
        return Ok(output);
    }

    Ok(lines.join("\n"))
}
