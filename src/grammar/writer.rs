/*
    This module writes grammars back out in the rule file format
*/

use std::fmt::{Display, Write};
use std::path::Path;

use itertools::Itertools;
use log::{debug, warn};

use super::{Grammar, Production, Symbol};
use crate::error_handling::*;

#[derive(Debug)]
pub enum SaveErrorType {
    // A symbol that cannot be spelled in the rule format at all
    Unrepresentable(String),
    // There was an issue with writing a file
    FileError(std::io::Error),
}

impl ErrorType for SaveErrorType {}

impl PartialEq for SaveErrorType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (SaveErrorType::FileError(a), SaveErrorType::FileError(b)) => a.kind() == b.kind(),
            (SaveErrorType::Unrepresentable(a), SaveErrorType::Unrepresentable(b)) => a == b,
            _ => false,
        }
    }
}

impl Display for SaveErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveErrorType::Unrepresentable(symbol) => write!(f, "Symbol `{}` cannot be written in a rule file", symbol),
            SaveErrorType::FileError(e) => write!(f, "File error: {}", e),
        }
    }
}

pub type SaveError = Error<SaveErrorType>;

type Result<T> = std::result::Result<T, SaveErrorType>;

// A bare word would be lexed as something else
fn needs_quotes(text: &str) -> bool {
    text.is_empty()
        || text.starts_with('"')
        || text == "->"
        || text == "|"
        || text.chars().any(char::is_whitespace)
}

fn write_nonterminal(out: &mut String, name: &str) -> Result<()> {
    if needs_quotes(name) {
        return Err(SaveErrorType::Unrepresentable(name.to_string()));
    }
    out.push_str(name);
    Ok(())
}

fn write_terminal(out: &mut String, text: &str, grammar: &Grammar) -> Result<()> {
    // Bare terminals that share a name with a nonterminal would be read back
    // as that nonterminal
    if !needs_quotes(text) && grammar.is_terminal(text) {
        out.push_str(text);
    } else if text.contains('"') {
        return Err(SaveErrorType::Unrepresentable(text.to_string()));
    } else {
        // Infallible for String
        let _ = write!(out, "\"{}\"", text);
    }
    Ok(())
}

fn write_production(out: &mut String, production: &Production, grammar: &Grammar) -> Result<()> {
    for (i, symbol) in production.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        match symbol {
            Symbol::Terminal(text) => write_terminal(out, text, grammar)?,
            Symbol::Nonterminal(name) => {
                if grammar.is_terminal(name) {
                    warn!("nonterminal `{}` has no rules and will load back as a terminal", name);
                }
                write_nonterminal(out, name)?
            }
        }
    }
    Ok(())
}

fn write_line(out: &mut String, lhs: &str, rewrite: &[Production], grammar: &Grammar) -> Result<()> {
    if lhs.starts_with("//") {
        return Err(SaveErrorType::Unrepresentable(lhs.to_string()));
    }
    write_nonterminal(out, lhs)?;
    out.push_str(" ->");
    for (i, production) in rewrite.iter().enumerate() {
        out.push_str(if i == 0 { " " } else { " | " });
        write_production(out, production, grammar)?;
    }
    out.push('\n');
    Ok(())
}

/// Renders a grammar in the rule file format, one nonterminal per line.
/// The start symbol's line comes first so that loading the text back picks
/// the same start symbol.
pub fn render(grammar: &Grammar) -> Result<String> {
    let mut out = String::new();
    let start = grammar.start_symbol();

    let start_rule = start.map(|s| (s, grammar.productions_for(s))).filter(|(_, r)| !r.is_empty());
    let others = grammar.rules().filter(|(lhs, _)| Some(*lhs) != start);

    for (lhs, rewrite) in start_rule.into_iter().chain(others).filter(|(_, r)| !r.is_empty()) {
        write_line(&mut out, lhs, rewrite, grammar)?;
    }

    Ok(out)
}

pub fn save_file(grammar: &Grammar, path: &Path) -> std::result::Result<(), SaveError> {
    let location = Location::new(path, 0);
    let text = render(grammar).map_err(|error| SaveError { location: location.clone(), error })?;

    std::fs::write(path, text).map_err(|e| SaveError {
        location,
        error: SaveErrorType::FileError(e)
    })?;

    debug!(
        "saved {} rules for {} nonterminals to {}",
        grammar.production_count(),
        grammar.len(),
        path.display()
    );
    Ok(())
}

// Used by the parse tree printer and error messages
pub(crate) fn production_text(production: &Production) -> String {
    production.iter().map(Symbol::name).join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    fn t(text: &str) -> Symbol {
        Symbol::terminal(text)
    }

    fn n(text: &str) -> Symbol {
        Symbol::nonterminal(text)
    }

    fn english() -> Grammar {
        let mut grammar = Grammar::new();
        grammar.add_rule("S", vec![n("NP"), n("VP")]);
        grammar.add_rule("NP", vec![n("Det"), n("N")]);
        grammar.add_rule("NP", vec![n("N")]);
        grammar.add_rule("VP", vec![n("V"), n("NP")]);
        grammar.add_rule("Det", vec![t("the")]);
        grammar.add_rule("N", vec![t("dog")]);
        grammar.add_rule("N", vec![t("cat")]);
        grammar.add_rule("V", vec![t("chased")]);
        grammar
    }

    #[test]
    fn render_plain_grammar() {
        assert_eq!(render(&english()).unwrap(), "\
S -> NP VP
NP -> Det N | N
VP -> V NP
Det -> the
N -> dog | cat
V -> chased
");
    }

    #[test]
    fn render_quotes_ambiguous_terminals() {
        let mut grammar = Grammar::new();
        grammar.add_rule("S", vec![t("S"), n("A")]);
        grammar.add_rule("A", vec![t("->"), t("|"), t("two words"), t("")]);

        assert_eq!(render(&grammar).unwrap(), "S -> \"S\" A\nA -> \"->\" \"|\" \"two words\" \"\"\n");
    }

    #[test]
    fn render_start_symbol_first() {
        let mut grammar = english();
        grammar.set_start_symbol("VP");
        let text = render(&grammar).unwrap();

        assert!(text.starts_with("VP -> V NP\nS -> NP VP\n"));
        assert_eq!(parser::parse_str(&text).unwrap().start_symbol(), Some("VP"));
    }

    #[test]
    fn render_unrepresentable() {
        let mut grammar = Grammar::new();
        grammar.add_rule("S", vec![t("say \"hi\"")]);
        assert_eq!(render(&grammar), Err(SaveErrorType::Unrepresentable("say \"hi\"".to_string())));

        let mut grammar = Grammar::new();
        grammar.add_rule("noun phrase", vec![t("x")]);
        assert_eq!(render(&grammar), Err(SaveErrorType::Unrepresentable("noun phrase".to_string())));

        let mut grammar = Grammar::new();
        grammar.add_rule("//S", vec![t("x")]);
        assert_eq!(render(&grammar), Err(SaveErrorType::Unrepresentable("//S".to_string())));
    }

    #[test]
    fn round_trip_in_memory() {
        let mut grammar = english();
        grammar.add_rule("N", vec![t("N")]);
        grammar.add_rule("VP", vec![n("V"), t("quietly"), t("")]);

        let reloaded = parser::parse_str(&render(&grammar).unwrap()).unwrap();
        assert_eq!(reloaded, grammar);

        // Order of alternatives survives too, not just the set
        for (lhs, rewrite) in grammar.rules() {
            assert_eq!(reloaded.productions_for(lhs), rewrite);
        }
    }

    #[test]
    fn round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("english.cfg");

        let grammar = english();
        save_file(&grammar, &path).unwrap();
        let reloaded = parser::parse_file(&path).unwrap();

        assert_eq!(reloaded, grammar);
        assert_eq!(reloaded.nonterminals().collect::<Vec<_>>(), grammar.nonterminals().collect::<Vec<_>>());
    }

    #[test]
    fn save_to_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("english.cfg");

        let error = save_file(&english(), &path).unwrap_err();
        assert_eq!(error.location, Location::new(&path, 0));
        assert_eq!(error.error, SaveErrorType::FileError(std::io::ErrorKind::NotFound.into()));
    }

    #[test]
    fn production_text_joins_names() {
        assert_eq!(production_text(&vec![n("Det"), t("dog")]), "Det dog");
    }
}
