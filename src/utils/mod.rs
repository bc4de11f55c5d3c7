use lazy_static::lazy_static;
use onig::{Captures, Regex};

use crate::types::Token;

/// Punctuation which attaches to the preceding token.
const RIGHT_PUNCTUATION: &str = ".,:;)]}!?%‰°“»”’›…";
/// Punctuation which attaches to the following token.
const LEFT_PUNCTUATION: &str = "([{„‚«‹$€£¥";
/// Punctuation which attaches on both sides.
const NONE_PUNCTUATION: &str = "/-\\~";

#[derive(Debug, Clone, Copy, PartialEq)]
enum Spacing {
    Left,
    Right,
    None,
    Word,
}

fn spacing(token: &str) -> Spacing {
    let mut chars = token.chars();

    match (chars.next(), chars.next()) {
        (Some(c), None) if RIGHT_PUNCTUATION.contains(c) => Spacing::Right,
        (Some(c), None) if LEFT_PUNCTUATION.contains(c) => Spacing::Left,
        (Some(c), None) if NONE_PUNCTUATION.contains(c) => Spacing::None,
        _ if token == "..." => Spacing::Right,
        _ => Spacing::Word,
    }
}

// remove duplicate whitespaces
pub fn normalize_whitespace(string: &str) -> String {
    lazy_static! {
        static ref REGEX: Regex = Regex::new(r"(\s)\s+").unwrap();
    }

    REGEX.replace_all(string, |caps: &Captures| caps.at(1).unwrap_or(" ").to_string())
}

/// Joins token texts into natural text: words are separated by a single space,
/// punctuation attaches to its neighbours.
pub fn detokenize<'a, I>(texts: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut output = String::new();
    let mut prev: Option<Spacing> = None;

    for text in texts {
        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        let current = spacing(text);
        if let Some(prev) = prev {
            let attached = matches!(prev, Spacing::Left | Spacing::None)
                || matches!(current, Spacing::Right | Spacing::None);
            if !attached {
                output.push(' ');
            }
        }

        output.push_str(text);
        prev = Some(current);
    }

    normalize_whitespace(&output)
}

/// Fixes the spacing of a text whose tokens are separated by whitespace.
pub fn correct_spaces(text: &str) -> String {
    detokenize(text.split_whitespace())
}

/// Detokenizes the token texts, optionally with normalized punctuation.
pub fn detokenize_tokens(tokens: &[Token], normalize: bool) -> String {
    detokenize(tokens.iter().map(|x| {
        if normalize {
            x.normalized_text()
        } else {
            x.text.as_str()
        }
    }))
}

/// Joins the token texts with single spaces.
pub fn text_from_tokens(tokens: &[Token]) -> String {
    spaced(tokens.iter().map(|x| x.text.as_str()))
}

/// Joins the token texts with single spaces, with normalized punctuation.
pub fn normalized_text_from_tokens(tokens: &[Token]) -> String {
    spaced(tokens.iter().map(|x| x.normalized_text()))
}

fn spaced<'a, I: Iterator<Item = &'a str>>(texts: I) -> String {
    texts
        .filter(|x| !x.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Puts the string in double quotes, escaping backslashes and double quotes.
pub fn quote(string: &str) -> String {
    format!("\"{}\"", string.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn punctuation_attaches() {
        assert_eq!(correct_spaces("Hann kom ( í gær ) ."), "Hann kom (í gær).");
        assert_eq!(correct_spaces("„ Já “ , sagði hún"), "„Já“, sagði hún");
        assert_eq!(correct_spaces("1 - 2 / 3"), "1-2/3");
    }

    #[test]
    fn inner_whitespace_is_collapsed() {
        assert_eq!(detokenize(vec![" Við  sjáum", "hann", "."]), "Við sjáum hann.");
    }

    #[test]
    fn quoting_escapes() {
        assert_eq!(quote(r#"a"b\c"#), r#""a\"b\\c""#);
        assert_eq!(quote(""), "\"\"");
    }
}
