//! Fundamental types used by this crate.

use std::{collections::HashMap, fmt};

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::grammar::Case;
use crate::utils;

/// The kind of a token as assigned by the upstream tokenizer.
/// The discriminants are the tokenizer's numeric kind codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TokenKind {
    Punctuation = 1,
    Time = 2,
    Date = 3,
    Year = 4,
    Number = 5,
    Word = 6,
    Telno = 7,
    Percent = 8,
    Url = 9,
    Ordinal = 10,
    Timestamp = 11,
    Currency = 12,
    Amount = 13,
    Person = 14,
    Email = 15,
    Entity = 16,
    Unknown = 17,
    DateAbs = 18,
    DateRel = 19,
    TimestampAbs = 20,
    TimestampRel = 21,
    Measurement = 22,
    NumWLetter = 23,
    Domain = 24,
    Hashtag = 25,
    Molecule = 26,
    Ssn = 27,
    Username = 28,
    SerialNumber = 29,
    Company = 30,
    #[serde(rename = "S_BEGIN")]
    SentenceBegin = 11001,
    #[serde(rename = "S_END")]
    SentenceEnd = 11002,
}

impl TokenKind {
    /// The numeric kind code.
    pub fn code(self) -> u32 {
        self as u32
    }

    /// The descriptive name of the kind, e. g. `"WORD"`.
    pub fn descr(self) -> &'static str {
        use TokenKind::*;

        match self {
            Punctuation => "PUNCTUATION",
            Time => "TIME",
            Date => "DATE",
            Year => "YEAR",
            Number => "NUMBER",
            Word => "WORD",
            Telno => "TELNO",
            Percent => "PERCENT",
            Url => "URL",
            Ordinal => "ORDINAL",
            Timestamp => "TIMESTAMP",
            Currency => "CURRENCY",
            Amount => "AMOUNT",
            Person => "PERSON",
            Email => "EMAIL",
            Entity => "ENTITY",
            Unknown => "UNKNOWN",
            DateAbs => "DATEABS",
            DateRel => "DATEREL",
            TimestampAbs => "TIMESTAMPABS",
            TimestampRel => "TIMESTAMPREL",
            Measurement => "MEASUREMENT",
            NumWLetter => "NUMWLETTER",
            Domain => "DOMAIN",
            Hashtag => "HASHTAG",
            Molecule => "MOLECULE",
            Ssn => "SSN",
            Username => "USERNAME",
            SerialNumber => "SERIALNUMBER",
            Company => "COMPANY",
            SentenceBegin => "S_BEGIN",
            SentenceEnd => "S_END",
        }
    }

    /// Whether the value of tokens of this kind is a tuple of components
    /// which is rendered as a `|`-joined list.
    pub fn has_components(self) -> bool {
        use TokenKind::*;

        matches!(
            self,
            Date | Time
                | DateAbs
                | DateRel
                | Timestamp
                | TimestampAbs
                | TimestampRel
                | Telno
                | NumWLetter
                | Measurement
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.descr())
    }
}

/// One meaning of a word as found in the morphological lexicon.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Meaning {
    /// The lemma.
    pub stem: String,
    /// The word category, e. g. `kk` for a masculine noun or `so` for a verb.
    pub category: String,
    /// The inflectional form, e. g. `ÞGFET`.
    pub form: String,
}

impl Meaning {
    pub fn new<S: Into<String>>(stem: S, category: S, form: S) -> Self {
        Meaning {
            stem: stem.into(),
            category: category.into(),
            form: form.into(),
        }
    }
}

/// A single component of a compound token value, e. g. the year of a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(x) => write!(f, "{}", x),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Text(x) => write!(f, "{}", x),
        }
    }
}

/// The kind-specific decoded value of a token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TokenValue {
    /// Lexicon meanings of a word. Empty if the word is not recognized.
    Meanings(Vec<Meaning>),
    /// Numeric value of a number or a percentage.
    Number(f64),
    /// ISO code of a currency.
    Currency(String),
    /// An amount of money.
    Amount { amount: f64, currency: String },
    /// Normalized form of a punctuation mark.
    Punctuation(String),
    /// Components of a date, time, measurement or similar.
    Components(Vec<Scalar>),
    /// Any other textual value, e. g. a normalized URL.
    Text(String),
}

fn default_span() -> usize {
    1
}

/// An error marker attached to a token by the spelling pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenError {
    pub code: String,
    pub description: String,
    #[serde(default)]
    pub detail: Option<String>,
    /// The flagged substring of the original text.
    #[serde(default)]
    pub original: Option<String>,
    /// The suggested replacement.
    #[serde(default)]
    pub suggest: Option<String>,
    /// The number of tokens this error covers, starting at the token it is attached to.
    #[serde(default = "default_span")]
    pub span: usize,
    /// Alternative suggestions to pick from.
    #[serde(default)]
    pub suggestlist: Vec<String>,
}

impl TokenError {
    pub fn new<S: Into<String>>(code: S, description: S) -> Self {
        TokenError {
            code: code.into(),
            description: description.into(),
            detail: None,
            original: None,
            suggest: None,
            span: 1,
            suggestlist: Vec::new(),
        }
    }

    pub fn with_suggest<S: Into<String>>(mut self, suggest: S) -> Self {
        self.suggest = Some(suggest.into());
        self
    }

    pub fn with_original<S: Into<String>>(mut self, original: S) -> Self {
        self.original = Some(original.into());
        self
    }

    pub fn with_detail<S: Into<String>>(mut self, detail: S) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_span(mut self, span: usize) -> Self {
        self.span = span;
        self
    }
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.description)
    }
}

/// A token as produced by the spelling pipeline.
/// `text` is the current (possibly corrected) text, `original` the text as submitted,
/// including any preceding whitespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    #[serde(default)]
    pub original: Option<String>,
    #[serde(default)]
    pub value: Option<TokenValue>,
    #[serde(default)]
    pub error: Option<TokenError>,
}

impl Token {
    pub fn new<S: Into<String>>(kind: TokenKind, text: S) -> Self {
        Token {
            kind,
            text: text.into(),
            original: None,
            value: None,
            error: None,
        }
    }

    /// Gets the special sentence begin token.
    pub fn sentence_begin() -> Self {
        Token::new(TokenKind::SentenceBegin, "")
    }

    /// Gets the special sentence end token.
    pub fn sentence_end() -> Self {
        Token::new(TokenKind::SentenceEnd, "")
    }

    pub fn with_original<S: Into<String>>(mut self, original: S) -> Self {
        self.original = Some(original.into());
        self
    }

    pub fn with_value(mut self, value: TokenValue) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_meanings(self, meanings: Vec<Meaning>) -> Self {
        self.with_value(TokenValue::Meanings(meanings))
    }

    pub fn with_error(mut self, error: TokenError) -> Self {
        self.error = Some(error);
        self
    }

    /// The lexicon meanings of this token, if its value holds meanings.
    pub fn meanings(&self) -> Option<&[Meaning]> {
        match &self.value {
            Some(TokenValue::Meanings(meanings)) => Some(meanings),
            _ => None,
        }
    }

    /// Whether the word has at least one meaning in the lexicon.
    pub fn is_recognized(&self) -> bool {
        self.meanings().map_or(false, |x| !x.is_empty())
    }

    /// The original text if it is set and nonempty, the current text otherwise.
    pub fn original_or_text(&self) -> &str {
        match &self.original {
            Some(original) if !original.is_empty() => original,
            _ => &self.text,
        }
    }

    /// The text with punctuation replaced by its normalized form.
    pub fn normalized_text(&self) -> &str {
        match &self.value {
            Some(TokenValue::Punctuation(normalized)) if self.kind == TokenKind::Punctuation => {
                normalized
            }
            _ => &self.text,
        }
    }

    pub fn is_sentence_marker(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::SentenceBegin | TokenKind::SentenceEnd
        )
    }
}

/// A terminal of the grammar matched to a token by the parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Terminal {
    /// Index of the token this terminal was matched to.
    pub token_index: usize,
    /// The word category, e. g. `so` or `no`.
    pub category: String,
    /// Case and variant flags, e. g. `["op", "et", "p3"]`.
    #[serde(default)]
    pub variants: Vec<String>,
    /// Index of the terminal specification in the [Grammar][crate::grammar::Grammar].
    pub rule: usize,
    /// The text as rendered by the parser.
    pub text: String,
    #[serde(default)]
    pub lemma: Option<String>,
}

impl Terminal {
    pub fn has_variant(&self, variant: &str) -> bool {
        self.variants.iter().any(|x| x == variant)
    }

    /// The first grammatical case among the variants.
    pub fn case(&self) -> Option<Case> {
        self.variants.iter().find_map(|x| Case::from_variant(x))
    }
}

/// A node in a (packed) parse forest.
/// A nonterminal holds one child list per derivation; the first derivation is the best one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Nonterminal {
        name: String,
        #[serde(default)]
        tags: Vec<String>,
        families: Vec<Vec<Node>>,
    },
    Terminal {
        /// Index into the terminal sequence of the [ParseTree].
        index: usize,
    },
}

impl Node {
    pub fn nonterminal<S: Into<String>>(name: S, tags: &[&str], children: Vec<Node>) -> Self {
        Node::Nonterminal {
            name: name.into(),
            tags: tags.iter().map(|x| x.to_string()).collect(),
            families: vec![children],
        }
    }

    pub fn terminal(index: usize) -> Self {
        Node::Terminal { index }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        match self {
            Node::Nonterminal { tags, .. } => tags.iter().any(|x| x == tag),
            Node::Terminal { .. } => false,
        }
    }

    /// Whether this nonterminal is tagged as an error by the grammar.
    pub fn is_error(&self) -> bool {
        self.has_tag("error")
    }

    /// Terminal indices covered by the best derivation, in order.
    pub fn leaves(&self) -> Vec<usize> {
        let mut output = Vec::new();
        self.collect_leaves(&mut output);
        output
    }

    fn collect_leaves(&self, output: &mut Vec<usize>) {
        match self {
            Node::Terminal { index } => output.push(*index),
            Node::Nonterminal { families, .. } => {
                if let Some(children) = families.first() {
                    for child in children {
                        child.collect_leaves(output);
                    }
                }
            }
        }
    }
}

/// The result of a successful parse: the tree and the matched terminals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseTree {
    pub root: Node,
    pub terminals: Vec<Terminal>,
    /// Number of possible parse tree combinations before disambiguation.
    #[serde(default = "default_combinations")]
    pub combinations: u64,
    #[serde(skip)]
    token_map: OnceCell<HashMap<usize, usize>>,
}

fn default_combinations() -> u64 {
    1
}

impl ParseTree {
    pub fn new(root: Node, terminals: Vec<Terminal>, combinations: u64) -> Self {
        ParseTree {
            root,
            terminals,
            combinations,
            token_map: OnceCell::new(),
        }
    }

    /// Maps token indices to terminal indices.
    /// Not all tokens are passed to the parser, so there can be fewer terminals than tokens.
    pub fn token_to_terminal(&self) -> &HashMap<usize, usize> {
        self.token_map.get_or_init(|| {
            self.terminals
                .iter()
                .enumerate()
                .map(|(i, terminal)| (terminal.token_index, i))
                .collect()
        })
    }

    pub fn terminal_for_token(&self, token_index: usize) -> Option<&Terminal> {
        self.token_to_terminal()
            .get(&token_index)
            .and_then(|i| self.terminals.get(*i))
    }
}

/// What the parser made of a sentence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ParseOutcome {
    Parsed(ParseTree),
    Failed {
        /// Best-effort index of the token where parsing failed.
        error_index: usize,
    },
}

/// A sentence: its tokens and the parse outcome.
#[derive(Debug, Clone)]
pub struct Sentence {
    tokens: Vec<Token>,
    outcome: ParseOutcome,
}

impl Sentence {
    pub fn new(tokens: Vec<Token>, outcome: ParseOutcome) -> Self {
        Sentence { tokens, outcome }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn outcome(&self) -> &ParseOutcome {
        &self.outcome
    }

    pub fn tree(&self) -> Option<&ParseTree> {
        match &self.outcome {
            ParseOutcome::Parsed(tree) => Some(tree),
            ParseOutcome::Failed { .. } => None,
        }
    }

    /// The detokenized text of the tokens in the range.
    pub fn text_of(&self, start: usize, end: usize) -> String {
        let end = end.min(self.tokens.len());
        let start = start.min(end);

        utils::correct_spaces(
            &self.tokens[start..end]
                .iter()
                .filter(|x| !x.text.is_empty())
                .map(|x| x.text.as_str())
                .collect::<Vec<_>>()
                .join(" "),
        )
    }

    pub fn into_parts(self) -> (Vec<Token>, ParseOutcome) {
        (self.tokens, self.outcome)
    }
}
