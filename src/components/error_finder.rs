//! Finds grammatical errors in a parse tree.
//!
//! All derivations in the parse forest are visited, not only the best one, since any of them
//! can contain an error worth reporting. Errors found twice are removed by the caller.

use crate::annotation::Annotation;
use crate::grammar::{Case, Grammar};
use crate::types::{Node, ParseTree, Sentence, Terminal};

/// Walks a parse tree and emits annotations for nonterminals tagged as errors (`E002`)
/// and for impersonal verbs whose subject is in the wrong case (`E003`).
pub struct ErrorFinder<'a> {
    grammar: &'a Grammar,
    sentence: &'a Sentence,
    tree: &'a ParseTree,
}

impl<'a> ErrorFinder<'a> {
    pub fn new(grammar: &'a Grammar, sentence: &'a Sentence, tree: &'a ParseTree) -> Self {
        ErrorFinder {
            grammar,
            sentence,
            tree,
        }
    }

    /// Appends the errors found in the tree to `annotations`.
    pub fn run(&self, annotations: &mut Vec<Annotation>) {
        self.visit(&self.tree.root, annotations);
    }

    fn visit(&self, node: &Node, annotations: &mut Vec<Annotation>) {
        let (name, families) = match node {
            Node::Nonterminal { name, families, .. } => (name, families),
            Node::Terminal { .. } => return,
        };

        if node.is_error() {
            if let Some((start, end)) = self.token_span(&node.leaves()) {
                annotations.push(Annotation::new(
                    start,
                    end,
                    "E002",
                    format!(
                        "'{}' fellur undir villureglu {}",
                        self.sentence.text_of(start, end + 1),
                        name
                    ),
                ));
            }
        }

        for children in families {
            if let Some(annotation) = self.check_impersonal(children) {
                annotations.push(annotation);
            }

            for child in children {
                self.visit(child, annotations);
            }
        }
    }

    /// Maps terminal indices to the first and last token they cover.
    fn token_span(&self, leaves: &[usize]) -> Option<(usize, usize)> {
        let n_tokens = self.sentence.tokens().len();
        let mut indices = leaves
            .iter()
            .filter_map(|i| self.tree.terminals.get(*i))
            .map(|x| x.token_index)
            .filter(|x| *x < n_tokens);

        let first = indices.next()?;
        Some(indices.fold((first, first), |(start, end), x| {
            (start.min(x), end.max(x))
        }))
    }

    fn terminal(&self, index: usize) -> Option<&'a Terminal> {
        self.tree.terminals.get(index)
    }

    /// Checks one derivation for an impersonal verb with a subject in the wrong case.
    /// The subject is a child tagged `subject`, the verb the first `so` terminal with the `op`
    /// variant outside of it.
    fn check_impersonal(&self, children: &[Node]) -> Option<Annotation> {
        let subject = children.iter().find(|x| x.has_tag("subject"))?;

        let verb = children
            .iter()
            .filter(|x| !x.has_tag("subject"))
            .flat_map(|x| x.leaves())
            .filter_map(|i| self.terminal(i))
            .find(|x| x.category == "so" && x.has_variant("op"))?;

        let lemma = match &verb.lemma {
            Some(lemma) => lemma.clone(),
            None => self.sentence.tokens().get(verb.token_index)?.text.to_lowercase(),
        };
        let required = self.grammar.impersonal_case(&lemma)?;

        let subject_leaves = subject.leaves();
        let case = subject_leaves
            .iter()
            .filter_map(|i| self.terminal(*i))
            .find_map(Terminal::case)?;

        if case == required || (case == Case::Nominative && self.grammar.forbids_nominative(&lemma)) {
            return None;
        }

        let (start, end) = self.token_span(&subject_leaves)?;
        let subject_text = self.sentence.text_of(start, end + 1);

        Some(
            Annotation::new(
                start,
                end,
                "E003",
                format!(
                    "Frumlag sagnarinnar 'að {}' á að vera í {}",
                    lemma,
                    required.name()
                ),
            )
            .with_detail(format!(
                "Frumlagið '{}' er í {} en ópersónulega sögnin 'að {}' stýrir {}",
                subject_text,
                case.name(),
                lemma,
                required.name()
            ))
            .with_original(subject_text),
        )
    }
}
