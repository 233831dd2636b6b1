/*
    This module is for storing and manipulating grammars
*/

mod writer;

use std::collections::HashSet;
use std::fmt::Display;

use indexmap::IndexMap;

pub use writer::{render, save_file, SaveError, SaveErrorType};
pub(crate) use writer::production_text;

// The base unit in a grammar rule. Whether a symbol is a terminal is decided
// once, when the rule is built, and never looked up again afterwards
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum Symbol {
    Terminal(String),
    Nonterminal(String),
}

impl Symbol {
    pub fn terminal(text: &str) -> Self {
        Symbol::Terminal(text.to_string())
    }

    pub fn nonterminal(name: &str) -> Self {
        Symbol::Nonterminal(name.to_string())
    }

    pub fn name(&self) -> &str {
        match self {
            Symbol::Terminal(s) | Symbol::Nonterminal(s) => s,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Symbol::Terminal(_))
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// The symbols in a single alternative
pub type Production = Vec<Symbol>;

// The alternatives of a rewrite rule
pub type Rewrite = Vec<Production>;

/// A context-free grammar: every nonterminal maps to its alternatives in the
/// order they were added.
///
/// The start symbol is the first nonterminal ever added unless one is given
/// explicitly with [`Grammar::with_start_symbol`] or
/// [`Grammar::set_start_symbol`].
#[derive(Debug, PartialEq, Clone, Default)]
pub struct Grammar {
    start_symbol: Option<String>,
    rules: IndexMap<String, Rewrite>,
}

impl Grammar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_start_symbol(start: &str) -> Self {
        Grammar {
            start_symbol: Some(start.to_string()),
            rules: IndexMap::new(),
        }
    }

    pub fn start_symbol(&self) -> Option<&str> {
        self.start_symbol.as_deref()
    }

    pub fn set_start_symbol(&mut self, start: &str) {
        self.start_symbol = Some(start.to_string());
    }

    /// Appends `rhs` to the alternatives of `lhs` unless an equal alternative
    /// is already there. Returns whether anything was added.
    pub fn add_rule(&mut self, lhs: &str, rhs: Production) -> bool {
        if self.start_symbol.is_none() {
            self.start_symbol = Some(lhs.to_string());
        }

        let rewrite = self.rules.entry(lhs.to_string()).or_default();
        if rewrite.contains(&rhs) {
            return false;
        }
        rewrite.push(rhs);
        true
    }

    // A symbol is a terminal iff nothing rewrites it
    pub fn is_terminal(&self, symbol: &str) -> bool {
        !self.rules.contains_key(symbol)
    }

    pub fn productions_for(&self, lhs: &str) -> &[Production] {
        self.rules.get(lhs).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn rules(&self) -> impl Iterator<Item = (&str, &[Production])> {
        self.rules.iter().map(|(lhs, rewrite)| (lhs.as_str(), rewrite.as_slice()))
    }

    pub fn nonterminals(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    // Number of nonterminals with at least one entry
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn production_count(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }

    // True if `symbol` occurs on the right-hand side of any rule
    pub fn references(&self, symbol: &Symbol) -> bool {
        self.rules.values().flatten().flatten().any(|s| s == symbol)
    }

    // Every name used anywhere in the grammar, in either role
    pub fn symbol_names(&self) -> HashSet<&str> {
        let rhs_names = self.rules.values().flatten().flatten().map(Symbol::name);
        self.nonterminals().chain(rhs_names).collect()
    }

    /// Finds the first production that is neither a single terminal nor a
    /// pair of nonterminals.
    pub fn first_non_normal(&self) -> Option<(&str, &Production)> {
        self.rules().find_map(|(lhs, rewrite)| {
            rewrite
                .iter()
                .find(|rhs| !is_normal_production(rhs))
                .map(|rhs| (lhs, rhs))
        })
    }

    pub fn is_normal_form(&self) -> bool {
        self.first_non_normal().is_none()
    }

    pub(crate) fn remove_production(&mut self, lhs: &str, rhs: &Production) {
        if let Some(rewrite) = self.rules.get_mut(lhs) {
            rewrite.retain(|p| p != rhs);
        }
    }

    // Drops every nonterminal left without alternatives
    pub(crate) fn remove_empty(&mut self) {
        self.rules.retain(|_, rewrite| !rewrite.is_empty());
    }
}

pub fn is_normal_production(rhs: &[Symbol]) -> bool {
    match rhs {
        [Symbol::Terminal(_)] => true,
        [Symbol::Nonterminal(_), Symbol::Nonterminal(_)] => true,
        _ => false,
    }
}
