/*
    This module reads grammar rule files

    Every non-blank line that does not start with `//` holds one rule:
        LHS -> alternative | alternative | ...
*/

mod lexer;
mod resolver;

use std::fmt::Display;
use std::fs::File;
use std::io::BufRead;
use std::path::Path;

use crate::grammar::*;
use crate::error_handling::*;
use itertools::Itertools;
use lexer::*;
use log::debug;
use resolver::grammar_from_rules;

#[derive(Debug)]
pub enum CompileErrorType {
    // A line which should contain a rule does not have `->`
    MissingArrow,
    // A rule has multiple arrows
    UnexpectedArrow,
    // The user starts a rule line with something other than a bare symbol
    MissingNonterminal,
    // More than one symbol before the arrow
    MultipleNonterminals,
    // There is an unclosed quote
    UnmatchedQuote,
    // An alternative with no symbols, such as `A -> a | | b`
    EmptyAlternative,
    // There was an issue with reading a file
    FileError(std::io::Error),
}

impl ErrorType for CompileErrorType {}

impl PartialEq for CompileErrorType {
    fn eq(&self, other: &Self) -> bool {
        if let CompileErrorType::FileError(a) = self {
            if let CompileErrorType::FileError(b) = other {
                return a.kind() == b.kind();
            }
        }
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl Display for CompileErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileErrorType::MissingArrow => write!(f, "Expected `->` after nonterminal"),
            CompileErrorType::UnexpectedArrow => write!(f, "Unexpected `->` encountered"),
            CompileErrorType::MissingNonterminal => write!(f, "Tried to define something other than a nonterminal"),
            CompileErrorType::MultipleNonterminals => write!(f, "Expected exactly one symbol before `->`"),
            CompileErrorType::UnmatchedQuote => write!(f, "Unmatched quotes"),
            CompileErrorType::EmptyAlternative => write!(f, "Alternatives must contain at least one symbol"),
            CompileErrorType::FileError(e) => write!(f, "File error: {}", e),
        }
    }
}

pub type CompileError = Error<CompileErrorType>;
pub type CompileErrors = Errors<CompileErrorType>;

fn io_error(error: std::io::Error, file: &Path) -> CompileError {
    CompileError {
        location: Location::new(file, 0),
        error: CompileErrorType::FileError(error)
    }
}

pub type Result<T> = std::result::Result<T, CompileErrorType>;
pub type LineResult<T> = std::result::Result<T, CompileError>;
pub type FileResult<T> = std::result::Result<T, CompileErrors>;

// Alternatives are kept as tokens until every left-hand side is known
type RawAlternative = Vec<Token>;

#[derive(PartialEq, Debug)]
struct Rule {
    symbol: String,
    alternatives: Vec<RawAlternative>,
    location: Location
}

fn parse_alternative(tokens: &[Token]) -> Result<RawAlternative> {
    if tokens.is_empty() {
        return Err(CompileErrorType::EmptyAlternative);
    }
    tokens.iter().map(|t| match t {
        Token::Arrow => Err(CompileErrorType::UnexpectedArrow),
        Token::Or => Err(CompileErrorType::EmptyAlternative),
        Token::Word(_) | Token::Quoted(_) => Ok(t.clone())
    }).collect()
}

fn parse_rewrite(tokens: &[Token]) -> Result<Vec<RawAlternative>> {
    tokens.split(|t| *t == Token::Or).map(parse_alternative).collect()
}

fn parse_line(tokens: &[Token], location: Location) -> Result<Rule> {
    let arrow = tokens
        .iter()
        .position(|t| *t == Token::Arrow)
        .ok_or(CompileErrorType::MissingArrow)?;

    let symbol = match &tokens[..arrow] {
        [Token::Word(s)] => Ok(s.clone()),
        [Token::Word(_), ..] => Err(CompileErrorType::MultipleNonterminals),
        _ => Err(CompileErrorType::MissingNonterminal)
    }?;

    let alternatives = parse_rewrite(&tokens[arrow + 1..])?;

    Ok(Rule {
        symbol,
        alternatives,
        location
    })
}

fn parse_lex_line(line: &str, location: Location) -> LineResult<Rule> {
    lexer::lex_line(line)
        .and_then(|lexed_line| parse_line(&lexed_line, location.clone()))
        .map_err(|error| CompileError { location, error })
}

fn is_rule_line(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty() && !line.starts_with("//")
}

// Parses numbered lines, reporting every malformed line rather than the first
fn parse_lines(
    lines: impl Iterator<Item = (usize, LineResult<String>)>,
    locate: impl Fn(usize) -> Location
) -> FileResult<Grammar> {
    let parsed_lines = lines
        .filter(|(_, line)| line.as_ref().map_or(true, |l| is_rule_line(l)))
        .map(|(num, line_res)| line_res.and_then(|line| parse_lex_line(&line, locate(num))));

    let (rules, errors): (Vec<_>, Vec<_>) = parsed_lines.partition_result();
    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(grammar_from_rules(rules))
}

pub fn parse_file(path: &Path) -> FileResult<Grammar> {
    let file = File::open(path).map_err(|e| vec![io_error(e, path)])?;
    let lines = std::io::BufReader::new(file)
        .lines()
        .map(|line| line.map_err(|e| io_error(e, path)))
        .enumerate()
        .map(|(num, line)| (num + 1, line));

    let grammar = parse_lines(lines, |num| Location::new(path, num))?;
    debug!(
        "loaded {} rules for {} nonterminals from {}",
        grammar.production_count(),
        grammar.len(),
        path.display()
    );
    Ok(grammar)
}

// Same as parse_file, for grammars that are already in memory
pub fn parse_str(text: &str) -> FileResult<Grammar> {
    let lines = text
        .lines()
        .enumerate()
        .map(|(num, line)| (num + 1, Ok(line.to_string())));

    parse_lines(lines, Location::unnamed)
}
