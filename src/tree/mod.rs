/*
    This module rebuilds parse trees from a filled in chart
*/

use std::collections::HashMap;
use std::fmt::Display;

use itertools::Itertools;

use crate::chart::{Backpointers, Chart, Witness};

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ParseTree {
    // A nonterminal covering a single token
    Leaf { symbol: String, token: String },
    Branch { symbol: String, left: Box<ParseTree>, right: Box<ParseTree> },
}

impl ParseTree {
    pub fn leaf(symbol: &str, token: &str) -> Self {
        ParseTree::Leaf { symbol: symbol.to_string(), token: token.to_string() }
    }

    pub fn branch(symbol: &str, left: ParseTree, right: ParseTree) -> Self {
        ParseTree::Branch { symbol: symbol.to_string(), left: Box::new(left), right: Box::new(right) }
    }

    pub fn symbol(&self) -> &str {
        match self {
            ParseTree::Leaf { symbol, .. } | ParseTree::Branch { symbol, .. } => symbol,
        }
    }

    // The tokens under this tree, left to right
    pub fn leaves(&self) -> Vec<&str> {
        match self {
            ParseTree::Leaf { token, .. } => vec![token],
            ParseTree::Branch { left, right, .. } => {
                let mut leaves = left.leaves();
                leaves.extend(right.leaves());
                leaves
            }
        }
    }

    /// Renders the tree one node per line, children indented by two spaces
    /// under their parent and leaves written as `symbol -> token`.
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        self.write_pretty(&mut out, 0);
        out
    }

    fn write_pretty(&self, out: &mut String, indent: usize) {
        out.extend(std::iter::repeat(' ').take(indent));
        match self {
            ParseTree::Leaf { symbol, token } => {
                out.push_str(&format!("{} -> {}\n", symbol, token));
            }
            ParseTree::Branch { symbol, left, right } => {
                out.push_str(symbol);
                out.push('\n');
                left.write_pretty(out, indent + 2);
                right.write_pretty(out, indent + 2);
            }
        }
    }
}

// Bracketed form: (S (NP (Det the) (N dog)) (VP ...))
impl Display for ParseTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseTree::Leaf { symbol, token } => write!(f, "({} {})", symbol, token),
            ParseTree::Branch { symbol, left, right } => write!(f, "({} {} {})", symbol, left, right),
        }
    }
}

struct Extractor<'a, 'g, T> {
    tokens: &'a [T],
    backpointers: &'a Backpointers<'g>,
    // Trees already enumerated for (symbol, i, j), at most `limit` of them
    enumerated: HashMap<(String, usize, usize), Vec<ParseTree>>,
}

impl<'a, 'g, T> Extractor<'a, 'g, T> {
    fn new(tokens: &'a [T], backpointers: &'a Backpointers<'g>) -> Self {
        Extractor { tokens, backpointers, enumerated: HashMap::new() }
    }
}

impl<'a, 'g, T: AsRef<str>> Extractor<'a, 'g, T> {
    fn leaf(&self, symbol: &str, i: usize) -> Option<ParseTree> {
        self.tokens.get(i).map(|token| ParseTree::leaf(symbol, token.as_ref()))
    }

    fn build<F>(&self, symbol: &str, i: usize, j: usize, select: &mut F) -> Option<ParseTree>
    where
        F: FnMut(&str, (usize, usize), &[Witness<'g>]) -> Option<Witness<'g>>,
    {
        if j - i == 1 {
            return self.leaf(symbol, i);
        }

        let witnesses = self.backpointers.witnesses(i, j, symbol)?;
        let witness = select(symbol, (i, j), witnesses)?;
        let left = self.build(witness.left, i, witness.split, select)?;
        let right = self.build(witness.right, witness.split, j, select)?;

        Some(ParseTree::branch(symbol, left, right))
    }

    fn build_all(&mut self, symbol: &str, i: usize, j: usize, limit: usize) -> Vec<ParseTree> {
        if j - i == 1 {
            return self.leaf(symbol, i).into_iter().collect();
        }

        let key = (symbol.to_string(), i, j);
        if let Some(trees) = self.enumerated.get(&key) {
            return trees.clone();
        }

        let backpointers = self.backpointers;
        let mut trees = Vec::new();
        for witness in backpointers.witnesses(i, j, symbol).unwrap_or_default() {
            if trees.len() >= limit {
                break;
            }
            let lefts = self.build_all(witness.left, i, witness.split, limit);
            let rights = self.build_all(witness.right, witness.split, j, limit);
            let room = limit - trees.len();
            trees.extend(
                lefts
                    .iter()
                    .cartesian_product(rights.iter())
                    .take(room)
                    .map(|(left, right)| ParseTree::branch(symbol, left.clone(), right.clone())),
            );
        }

        self.enumerated.insert(key, trees.clone());
        trees
    }
}

fn spans_input<T>(tokens: &[T], chart: &Chart, start: &str) -> bool {
    !tokens.is_empty() && chart.len() == tokens.len() && chart.contains(0, tokens.len(), start)
}

/// Builds one parse tree for the whole input, always following the first
/// recorded derivation of every span.
///
/// Returns `None` if `start` does not span the input.
pub fn extract<T: AsRef<str>>(tokens: &[T], chart: &Chart, backpointers: &Backpointers, start: &str) -> Option<ParseTree> {
    extract_with(tokens, chart, backpointers, start, |_, _, witnesses| witnesses.first().copied())
}

/// Builds one parse tree for the whole input, letting `select` pick which
/// derivation to follow wherever a span was derived in more than one way.
/// `select` gets the symbol, its span and every recorded derivation; giving
/// back `None` abandons the tree.
pub fn extract_with<'g, T, F>(
    tokens: &[T],
    chart: &Chart,
    backpointers: &Backpointers<'g>,
    start: &str,
    mut select: F,
) -> Option<ParseTree>
where
    T: AsRef<str>,
    F: FnMut(&str, (usize, usize), &[Witness<'g>]) -> Option<Witness<'g>>,
{
    if !spans_input(tokens, chart, start) {
        return None;
    }

    let extractor = Extractor::new(tokens, backpointers);
    extractor.build(start, 0, tokens.len(), &mut select)
}

/// Enumerates up to `limit` distinct parse trees for the whole input. The
/// first one is the tree [`extract`] returns. Each span is enumerated once
/// and keeps at most `limit` trees, so a small limit stays cheap however
/// ambiguous the input is.
pub fn extract_all<T: AsRef<str>>(
    tokens: &[T],
    chart: &Chart,
    backpointers: &Backpointers,
    start: &str,
    limit: usize,
) -> Vec<ParseTree> {
    if !spans_input(tokens, chart, start) || limit == 0 {
        return Vec::new();
    }

    let mut extractor = Extractor::new(tokens, backpointers);
    extractor.build_all(start, 0, tokens.len(), limit)
}
