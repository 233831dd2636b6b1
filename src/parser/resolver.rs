use std::collections::HashSet;

use log::trace;

use crate::grammar::{Grammar, Production, Symbol};
use super::{RawAlternative, Rule, Token};

type DefinedSymbols<'a> = HashSet<&'a str>;

fn resolve_token(token: &Token, defined: &DefinedSymbols) -> Option<Symbol> {
    match token {
        Token::Word(word) if defined.contains(word.as_str()) => Some(Symbol::Nonterminal(word.clone())),
        Token::Word(word) | Token::Quoted(word) => Some(Symbol::Terminal(word.clone())),
        // Separators never survive parse_line
        Token::Arrow | Token::Or => None
    }
}

fn resolve_alternative(alternative: &RawAlternative, defined: &DefinedSymbols) -> Production {
    alternative.iter()
        .filter_map(|token| resolve_token(token, defined))
        .collect()
}

// Bare words become nonterminals iff some line defines them; this is decided
// here, once, with every rule of the file in view
pub(super) fn grammar_from_rules(rules: Vec<Rule>) -> Grammar {
    let defined: DefinedSymbols = rules.iter().map(|rule| rule.symbol.as_str()).collect();

    let mut grammar = Grammar::new();
    for rule in &rules {
        trace!("{}: {} alternatives for `{}`", rule.location, rule.alternatives.len(), rule.symbol);
        for alternative in &rule.alternatives {
            grammar.add_rule(&rule.symbol, resolve_alternative(alternative, &defined));
        }
    }

    grammar
}
