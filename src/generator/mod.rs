/*
    This module generates random sentences from a grammar
*/

use rand::prelude::*;
use std::fmt::Display;

use crate::grammar::*;
use crate::error_handling::*;

#[derive(Debug, PartialEq)]
pub enum SampleError {
    // The grammar has no start symbol to generate from
    NoStartSymbol,
    // A nonterminal without any rules was used
    UndefinedNonterminal(String),
    // The derivation kept going past the depth limit
    TooDeep(usize),
}

impl ErrorType for SampleError {}

impl Display for SampleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleError::NoStartSymbol => write!(f, "Grammar has no start symbol"),
            SampleError::UndefinedNonterminal(nonterminal) => write!(f, "No definition for nonterminal `{}`", nonterminal),
            SampleError::TooDeep(depth) => write!(f, "Derivation went deeper than {} levels", depth),
        }
    }
}

pub type SampleResult = Result<Vec<String>, SampleError>;

// Generates a sentence starting from the grammar's start symbol
pub fn generate(grammar: &Grammar, rng: &mut impl Rng, max_depth: usize) -> SampleResult {
    let start = grammar.start_symbol().ok_or(SampleError::NoStartSymbol)?;
    generate_with_override(grammar, start, rng, max_depth)
}

// Generates a sentence in the given grammar starting with the given symbol
pub fn generate_with_override(grammar: &Grammar, start: &str, rng: &mut impl Rng, max_depth: usize) -> SampleResult {
    let mut sampler = Sampler { grammar, rng, max_depth, sentence: Vec::new() };
    sampler.generate_nonterminal(start, 0)?;
    Ok(sampler.sentence)
}

struct Sampler<'a, R> {
    grammar: &'a Grammar,
    rng: &'a mut R,
    max_depth: usize,
    sentence: Vec<String>,
}

impl<'a, R: Rng> Sampler<'a, R> {
    fn generate_nonterminal(&mut self, nonterminal: &str, depth: usize) -> Result<(), SampleError> {
        if depth >= self.max_depth {
            return Err(SampleError::TooDeep(self.max_depth));
        }

        let grammar = self.grammar;
        let alternative = grammar
            .productions_for(nonterminal)
            .choose(&mut *self.rng)
            .ok_or_else(|| SampleError::UndefinedNonterminal(nonterminal.to_string()))?;

        for symbol in alternative {
            match symbol {
                Symbol::Nonterminal(name) => self.generate_nonterminal(name, depth + 1)?,
                Symbol::Terminal(text) => self.sentence.push(text.clone()),
            }
        }

        Ok(())
    }
}
