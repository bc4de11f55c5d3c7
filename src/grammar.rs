//! The grammar data the annotator checks against, and a lock-guarded handle to load it once.
//!
//! The parser itself is external. What this crate needs from its grammar is:
//! - the specification of each terminal (category and required variants), to check whether
//!   a spelling suggestion fits grammatically where the original word was matched;
//! - the impersonal verbs and the case each requires of its subject.

use fs_err::File;
use log::info;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::{
    collections::{HashMap, HashSet},
    io::{BufReader, Read},
    path::{Path, PathBuf},
    sync::Arc,
    time::SystemTime,
};
use thiserror::Error;

use crate::components::Component;
use crate::types::{Meaning, TokenKind};

/// A grammatical case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Case {
    Nominative,
    Accusative,
    Dative,
    Genitive,
}

impl Case {
    /// Parses a terminal variant, e. g. `þgf`.
    pub fn from_variant(variant: &str) -> Option<Case> {
        Some(match variant {
            "nf" => Case::Nominative,
            "þf" => Case::Accusative,
            "þgf" => Case::Dative,
            "ef" => Case::Genitive,
            _ => return None,
        })
    }

    pub fn variant(self) -> &'static str {
        match self {
            Case::Nominative => "nf",
            Case::Accusative => "þf",
            Case::Dative => "þgf",
            Case::Genitive => "ef",
        }
    }

    /// The marker of this case in the inflectional form of a lexicon meaning.
    pub fn form_marker(self) -> &'static str {
        match self {
            Case::Nominative => "NF",
            Case::Accusative => "ÞF",
            Case::Dative => "ÞGF",
            Case::Genitive => "EF",
        }
    }

    /// The Icelandic name in the dative, as used in messages ("í þolfalli").
    pub fn name(self) -> &'static str {
        match self {
            Case::Nominative => "nefnifalli",
            Case::Accusative => "þolfalli",
            Case::Dative => "þágufalli",
            Case::Genitive => "eignarfalli",
        }
    }
}

/// Maps a terminal variant to the marker it requires in a meaning's form.
/// Variants without a marker (e. g. `op`) constrain the parse but not the word form.
fn form_marker(variant: &str) -> Option<&'static str> {
    if let Some(case) = Case::from_variant(variant) {
        return Some(case.form_marker());
    }

    Some(match variant {
        "et" => "ET",
        "ft" => "FT",
        "gr" => "gr",
        "p1" => "1P",
        "p2" => "2P",
        "p3" => "3P",
        "nh" => "NH",
        "fh" => "FH",
        "vh" => "VH",
        "bh" => "BH",
        "nt" => "NT",
        "þt" => "ÞT",
        _ => return None,
    })
}

const NOUN_CATEGORIES: &[&str] = &["kk", "kvk", "hk"];

/// Specification of a terminal in the grammar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalSpec {
    pub name: String,
    /// The word category, `no` matches nouns of any gender.
    pub category: String,
    #[serde(default)]
    pub variants: Vec<String>,
}

impl TerminalSpec {
    pub fn new<S: Into<String>>(name: S, category: S, variants: &[&str]) -> Self {
        TerminalSpec {
            name: name.into(),
            category: category.into(),
            variants: variants.iter().map(|x| x.to_string()).collect(),
        }
    }

    fn accepts_category(&self, category: &str) -> bool {
        self.category == category
            || (self.category == "no" && NOUN_CATEGORIES.contains(&category))
    }

    /// Whether a word with the given meaning can be matched to this terminal.
    pub fn accepts(&self, meaning: &Meaning) -> bool {
        self.accepts_category(&meaning.category)
            && self
                .variants
                .iter()
                .filter_map(|x| form_marker(x))
                .all(|marker| meaning.form.contains(marker))
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum ValidationError {
    #[error("terminal {0} does not exist in the grammar")]
    UnknownTerminal(usize),
    #[error("value of token '{text}' ({kind}) is not a list of meanings")]
    MeaningMismatch { text: String, kind: TokenKind },
}

/// Grammar data used for checking. Immutable once loaded and shared behind an [Arc].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Grammar {
    terminals: Vec<TerminalSpec>,
    /// Lemmas of impersonal verbs and the case each requires of its subject.
    #[serde(default)]
    impersonal_verbs: HashMap<String, Case>,
    /// Lemmas of verbs which never take a nominative subject.
    /// A nominative subject of these is flagged by error rules of the grammar itself.
    #[serde(default)]
    nominative_forbidden: HashSet<String>,
}

impl Component for Grammar {
    fn name() -> &'static str {
        "grammar"
    }
}

impl Grammar {
    pub fn new(
        terminals: Vec<TerminalSpec>,
        impersonal_verbs: HashMap<String, Case>,
        nominative_forbidden: HashSet<String>,
    ) -> Self {
        Grammar {
            terminals,
            impersonal_verbs,
            nominative_forbidden,
        }
    }

    /// Compiles the grammar from its JSON description.
    pub fn from_json<R: Read>(reader: R) -> Result<Self, crate::Error> {
        let grammar: Grammar = serde_json::from_reader(reader)?;
        grammar.validate()?;
        Ok(grammar)
    }

    /// Loads the grammar from a path. Files with a `json` extension are compiled,
    /// anything else is read as a binary.
    pub fn load<P: AsRef<Path>>(p: P) -> Result<Self, crate::Error> {
        let p = p.as_ref();

        if p.extension().map_or(false, |x| x == "json") {
            Grammar::from_json(BufReader::new(File::open(p)?))
        } else {
            let grammar = <Grammar as Component>::new(p)?;
            grammar.validate()?;
            Ok(grammar)
        }
    }

    fn validate(&self) -> Result<(), crate::Error> {
        if let Some(spec) = self.terminals.iter().find(|x| x.category.is_empty()) {
            return Err(crate::Error::InvalidGrammar(format!(
                "terminal '{}' has no category",
                spec.name
            )));
        }

        Ok(())
    }

    pub fn terminals(&self) -> &[TerminalSpec] {
        &self.terminals
    }

    pub fn terminal(&self, index: usize) -> Result<&TerminalSpec, ValidationError> {
        self.terminals
            .get(index)
            .ok_or(ValidationError::UnknownTerminal(index))
    }

    /// The case an impersonal verb requires of its subject, `None` if the verb is not known to be impersonal.
    pub fn impersonal_case(&self, lemma: &str) -> Option<Case> {
        self.impersonal_verbs.get(lemma).copied()
    }

    pub fn forbids_nominative(&self, lemma: &str) -> bool {
        self.nominative_forbidden.contains(lemma)
    }
}

struct Loaded {
    modified: Option<SystemTime>,
    grammar: Arc<Grammar>,
}

/// A handle to a grammar file which is loaded on first use and reloaded if the file changes.
///
/// Loading happens with a lock held; the returned [Arc<Grammar>] is read-only and can be used
/// from any number of threads without further synchronization.
pub struct SharedGrammar {
    path: PathBuf,
    state: Mutex<Option<Loaded>>,
}

impl SharedGrammar {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        SharedGrammar {
            path: path.into(),
            state: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets the grammar, loading it if it is not loaded yet or the file was modified since.
    pub fn get(&self) -> Result<Arc<Grammar>, crate::Error> {
        let mut state = self.state.lock();
        let modified = fs_err::metadata(&self.path)?.modified().ok();

        if let Some(loaded) = state.as_ref() {
            if loaded.modified == modified {
                return Ok(Arc::clone(&loaded.grammar));
            }
        }

        info!("Loading grammar from {}.", self.path.display());
        let grammar = Arc::new(Grammar::load(&self.path)?);
        *state = Some(Loaded {
            modified,
            grammar: Arc::clone(&grammar),
        });

        Ok(grammar)
    }
}
