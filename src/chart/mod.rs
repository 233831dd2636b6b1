/*
    This module recognizes sentences with the CYK algorithm
*/

use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt::Display;
use std::time::Instant;

use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use log::{debug, trace};

use crate::error_handling::ErrorType;
use crate::grammar::*;

#[derive(Debug, PartialEq)]
pub enum ChartError {
    // The grammar has a rule that is not `A -> t` or `A -> B C`
    NotNormalized { lhs: String, production: String },
    // The deadline passed before spans of this width were filled in
    DeadlineExceeded { width: usize },
}

impl ErrorType for ChartError {}

impl Display for ChartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChartError::NotNormalized { lhs, production } => write!(
                f,
                "`{} -> {}` is not in Chomsky normal form, convert the grammar first",
                lhs, production
            ),
            ChartError::DeadlineExceeded { width } => write!(f, "Parse ran out of time before spans of width {}", width),
        }
    }
}

/// One way a chart entry was derived: `A -> left right` with `left` covering
/// `[i, split)` and `right` covering `[split, j)`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Witness<'g> {
    pub left: &'g str,
    pub right: &'g str,
    pub split: usize,
}

// Cells for every (i, j) with 0 <= i, j <= len, stored row by row
fn cell_index(len: usize, i: usize, j: usize) -> Option<usize> {
    (i < j && j <= len).then(|| i * (len + 1) + j)
}

/// The nonterminals derivable for each span of the input.
#[derive(Debug, Clone)]
pub struct Chart<'g> {
    len: usize,
    cells: Vec<IndexSet<&'g str>>,
}

impl<'g> Chart<'g> {
    fn new(len: usize) -> Self {
        Chart {
            len,
            cells: vec![IndexSet::new(); (len + 1) * (len + 1)],
        }
    }

    // Number of tokens the chart was built for
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Nonterminals derivable for `tokens[i..j]`, in the order they were
    /// found. `None` if the span is empty or out of range.
    pub fn cell(&self, i: usize, j: usize) -> Option<&IndexSet<&'g str>> {
        cell_index(self.len, i, j).map(|index| &self.cells[index])
    }

    pub fn contains(&self, i: usize, j: usize, symbol: &str) -> bool {
        self.cell(i, j).is_some_and(|cell| cell.contains(symbol))
    }

    fn insert(&mut self, i: usize, j: usize, symbol: &'g str) {
        if let Some(index) = cell_index(self.len, i, j) {
            self.cells[index].insert(symbol);
        }
    }

    /// Every span with at least one derivable nonterminal, ordered by start
    /// then end.
    pub fn constituents<T: AsRef<str>>(&self, tokens: &[T]) -> Vec<Constituent<'g>> {
        (0..self.len)
            .flat_map(|i| (i + 1..=self.len).map(move |j| (i, j)))
            .filter_map(|(i, j)| {
                let cell = self.cell(i, j)?;
                if cell.is_empty() {
                    return None;
                }
                let text = tokens.get(i..j).map(|span| span.iter().map(|t| t.as_ref()).join(" "));
                Some(Constituent {
                    start: i,
                    end: j,
                    text: text.unwrap_or_default(),
                    labels: cell.iter().copied().sorted().collect(),
                })
            })
            .collect()
    }
}

/// A span of the input together with everything that can derive it.
#[derive(Debug, PartialEq, Clone)]
pub struct Constituent<'g> {
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub labels: Vec<&'g str>,
}

impl Display for Constituent<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}) '{}': {}", self.start, self.end, self.text, self.labels.join(", "))
    }
}

/// How each chart entry of width two or more was derived.
#[derive(Debug, Clone)]
pub struct Backpointers<'g> {
    len: usize,
    cells: Vec<IndexMap<&'g str, Vec<Witness<'g>>>>,
}

impl<'g> Backpointers<'g> {
    fn new(len: usize) -> Self {
        Backpointers {
            len,
            cells: vec![IndexMap::new(); (len + 1) * (len + 1)],
        }
    }

    /// Every recorded derivation of `symbol` over `[i, j)`, in the order the
    /// parser found them.
    pub fn witnesses(&self, i: usize, j: usize, symbol: &str) -> Option<&[Witness<'g>]> {
        let index = cell_index(self.len, i, j)?;
        self.cells[index].get(symbol).map(Vec::as_slice)
    }

    fn record(&mut self, i: usize, j: usize, symbol: &'g str, witness: Witness<'g>) {
        if let Some(index) = cell_index(self.len, i, j) {
            trace!("[{}, {}) {} -> {} {} at {}", i, j, symbol, witness.left, witness.right, witness.split);
            self.cells[index].entry(symbol).or_default().push(witness);
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParseOutcome<'g> {
    pub recognized: bool,
    pub chart: Chart<'g>,
    pub backpointers: Backpointers<'g>,
}

/// A CYK recognizer over a grammar in Chomsky normal form.
///
/// The parser only borrows the grammar, so any number of parsers (or
/// threads sharing one parser) can work from the same grammar. Each call to
/// [`ChartParser::parse`] builds its own chart.
pub struct ChartParser<'g> {
    start: Option<&'g str>,
    // Terminal text to every nonterminal that rewrites to it
    lexical: HashMap<&'g str, Vec<&'g str>>,
    // (A, B, C) for every rule A -> B C
    binary: Vec<(&'g str, &'g str, &'g str)>,
}

impl<'g> ChartParser<'g> {
    /// Prepares `grammar` for parsing. Fails without doing anything else if
    /// the grammar is not in normal form.
    pub fn new(grammar: &'g Grammar) -> Result<Self, ChartError> {
        if let Some((lhs, production)) = grammar.first_non_normal() {
            return Err(ChartError::NotNormalized {
                lhs: lhs.to_string(),
                production: production_text(production),
            });
        }

        let mut lexical: HashMap<&'g str, Vec<&'g str>> = HashMap::new();
        let mut binary = Vec::new();
        for (lhs, rewrite) in grammar.rules() {
            for production in rewrite {
                match production.as_slice() {
                    [Symbol::Terminal(text)] => lexical.entry(text.as_str()).or_default().push(lhs),
                    [Symbol::Nonterminal(left), Symbol::Nonterminal(right)] => {
                        binary.push((lhs, left.as_str(), right.as_str()))
                    }
                    _ => {}
                }
            }
        }

        Ok(ChartParser {
            start: grammar.start_symbol(),
            lexical,
            binary,
        })
    }

    pub fn start_symbol(&self) -> Option<&'g str> {
        self.start
    }

    pub fn parse<T: AsRef<str>>(&self, tokens: &[T]) -> ParseOutcome<'g> {
        match self.fill(tokens, |_| Ok::<(), Infallible>(())) {
            Ok(outcome) => outcome,
            Err(never) => match never {},
        }
    }

    /// Like [`ChartParser::parse`], but gives up once `deadline` has passed.
    /// The clock is only checked between span widths.
    pub fn parse_until<T: AsRef<str>>(&self, tokens: &[T], deadline: Instant) -> Result<ParseOutcome<'g>, ChartError> {
        self.fill(tokens, |width| {
            if Instant::now() >= deadline {
                Err(ChartError::DeadlineExceeded { width })
            } else {
                Ok(())
            }
        })
    }

    fn fill<T, E>(&self, tokens: &[T], mut checkpoint: impl FnMut(usize) -> Result<(), E>) -> Result<ParseOutcome<'g>, E>
    where
        T: AsRef<str>,
    {
        let n = tokens.len();
        let mut chart = Chart::new(n);
        let mut backpointers = Backpointers::new(n);

        for (i, token) in tokens.iter().enumerate() {
            let token: &str = token.as_ref();
            for &lhs in self.lexical.get(token).into_iter().flatten() {
                chart.insert(i, i + 1, lhs);
            }
        }

        for width in 2..=n {
            checkpoint(width)?;
            for i in 0..=n - width {
                let j = i + width;
                for k in i + 1..j {
                    for &(lhs, left, right) in &self.binary {
                        if chart.contains(i, k, left) && chart.contains(k, j, right) {
                            chart.insert(i, j, lhs);
                            backpointers.record(i, j, lhs, Witness { left, right, split: k });
                        }
                    }
                }
            }
        }

        let recognized = n > 0 && self.start.is_some_and(|start| chart.contains(0, n, start));
        debug!(
            "parsed {} tokens, {} chart entries, recognized: {}",
            n,
            chart.cells.iter().map(IndexSet::len).sum::<usize>(),
            recognized
        );

        Ok(ParseOutcome {
            recognized,
            chart,
            backpointers,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::parser::parse_str;

    fn animals() -> Grammar {
        parse_str("\
S -> NP VP
NP -> Det N
VP -> V NP
Det -> \"the\"
N -> \"dog\" | \"cat\"
V -> \"chased\"
").unwrap()
    }

    #[test]
    fn recognizes_sentence() {
        let grammar = animals();
        let parser = ChartParser::new(&grammar).unwrap();
        let outcome = parser.parse(&["the", "dog", "chased", "the", "cat"]);

        assert!(outcome.recognized);
        assert!(outcome.chart.contains(0, 5, "S"));
        assert!(outcome.chart.contains(2, 5, "VP"));
        assert_eq!(
            outcome.backpointers.witnesses(0, 5, "S"),
            Some(&[Witness { left: "NP", right: "VP", split: 2 }][..])
        );
        assert_eq!(outcome.backpointers.witnesses(0, 5, "VP"), None);
    }

    #[test]
    fn rejects_sentence_with_partial_constituents() {
        let grammar = animals();
        let parser = ChartParser::new(&grammar).unwrap();
        let tokens = ["the", "dog", "dog"];
        let outcome = parser.parse(&tokens);

        assert!(!outcome.recognized);
        assert_eq!(outcome.chart.constituents(&tokens), vec![
            Constituent { start: 0, end: 1, text: "the".to_string(), labels: vec!["Det"] },
            Constituent { start: 0, end: 2, text: "the dog".to_string(), labels: vec!["NP"] },
            Constituent { start: 1, end: 2, text: "dog".to_string(), labels: vec!["N"] },
            Constituent { start: 2, end: 3, text: "dog".to_string(), labels: vec!["N"] },
        ]);
    }

    #[test]
    fn unknown_tokens_leave_cells_empty() {
        let grammar = animals();
        let parser = ChartParser::new(&grammar).unwrap();
        let outcome = parser.parse(&["the", "wolf"]);

        assert!(!outcome.recognized);
        assert_eq!(outcome.chart.cell(1, 2).map(IndexSet::len), Some(0));
        assert!(outcome.chart.cell(0, 2).is_some_and(IndexSet::is_empty));
    }

    #[test]
    fn empty_input_is_never_recognized() {
        let grammar = animals();
        let parser = ChartParser::new(&grammar).unwrap();
        let outcome = parser.parse::<&str>(&[]);

        assert!(!outcome.recognized);
        assert!(outcome.chart.is_empty());
        assert_eq!(outcome.chart.cell(0, 0), None);
        assert!(outcome.chart.constituents::<&str>(&[]).is_empty());
    }

    #[test]
    fn ambiguity_is_recorded() {
        let grammar = parse_str("S -> X Y | X Z\nX -> a\nY -> b\nZ -> b").unwrap();
        let parser = ChartParser::new(&grammar).unwrap();
        let outcome = parser.parse(&["a", "b"]);

        assert!(outcome.recognized);
        assert_eq!(outcome.chart.cell(0, 2).map(IndexSet::len), Some(1));
        assert_eq!(
            outcome.backpointers.witnesses(0, 2, "S"),
            Some(&[
                Witness { left: "X", right: "Y", split: 1 },
                Witness { left: "X", right: "Z", split: 1 }
            ][..])
        );
    }

    #[test]
    fn ambiguity_across_split_points() {
        let grammar = parse_str("S -> S S | a").unwrap();
        let parser = ChartParser::new(&grammar).unwrap();
        let outcome = parser.parse(&["a", "a", "a"]);

        assert!(outcome.recognized);
        let splits = outcome
            .backpointers
            .witnesses(0, 3, "S")
            .unwrap_or_default()
            .iter()
            .map(|w| w.split)
            .collect::<Vec<_>>();
        assert_eq!(splits, vec![1, 2]);
    }

    #[test]
    fn explicit_start_symbol() {
        let mut grammar = animals();
        grammar.set_start_symbol("NP");
        let parser = ChartParser::new(&grammar).unwrap();

        assert_eq!(parser.start_symbol(), Some("NP"));
        assert!(parser.parse(&["the", "cat"]).recognized);
        assert!(!parser.parse(&["the", "dog", "chased", "the", "cat"]).recognized);
    }

    #[test]
    fn terminals_named_like_nonterminals() {
        // `N` the word and `N` the category are different symbols
        let grammar = parse_str("S -> N N\nN -> \"N\" | n").unwrap();
        let parser = ChartParser::new(&grammar).unwrap();

        assert!(parser.parse(&["N", "n"]).recognized);
        assert!(!parser.parse(&["S", "n"]).recognized);
    }

    #[test]
    fn refuses_unconverted_grammar() {
        let grammar = parse_str("S -> NP VP\nNP -> Det N | N\nVP -> V\nDet -> the\nN -> dog\nV -> runs").unwrap();

        assert_eq!(
            ChartParser::new(&grammar).err(),
            Some(ChartError::NotNormalized { lhs: "NP".to_string(), production: "N".to_string() })
        );

        let converted = crate::cnf::convert(&grammar).unwrap();
        let parser = ChartParser::new(&converted).unwrap();
        assert!(parser.parse(&["dog", "runs"]).recognized);
        assert!(parser.parse(&["the", "dog", "runs"]).recognized);
    }

    #[test]
    fn deadline_in_the_past() {
        let grammar = animals();
        let parser = ChartParser::new(&grammar).unwrap();
        let deadline = Instant::now();

        assert_eq!(
            parser.parse_until(&["the", "dog", "chased"], deadline).err(),
            Some(ChartError::DeadlineExceeded { width: 2 })
        );
        // Single tokens never reach a checkpoint
        assert!(parser.parse_until(&["dog"], deadline).is_ok());
    }

    #[test]
    fn deadline_in_the_future() {
        let grammar = animals();
        let parser = ChartParser::new(&grammar).unwrap();
        let deadline = Instant::now() + Duration::from_secs(60);

        let outcome = parser.parse_until(&["the", "dog", "chased", "the", "cat"], deadline).unwrap();
        assert!(outcome.recognized);
    }

    #[test]
    fn parsers_share_a_grammar_across_threads() {
        let grammar = animals();
        let parser = ChartParser::new(&grammar).unwrap();
        let sentences = [
            vec!["the", "dog", "chased", "the", "cat"],
            vec!["the", "cat", "chased", "the", "dog"],
            vec!["the", "cat", "the", "dog"],
        ];

        let parser = &parser;
        let results = std::thread::scope(|scope| {
            let handles = sentences
                .iter()
                .map(|tokens| scope.spawn(move || parser.parse(tokens.as_slice()).recognized))
                .collect::<Vec<_>>();
            handles.into_iter().map(|h| h.join().unwrap()).collect::<Vec<_>>()
        });

        assert_eq!(results, vec![true, true, false]);
    }

    #[test]
    fn error_display() {
        let error = ChartError::NotNormalized { lhs: "A".to_string(), production: "B C D".to_string() };
        assert_eq!(error.to_string(), "`A -> B C D` is not in Chomsky normal form, convert the grammar first");
    }
}
