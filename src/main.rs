mod cli;

use std::fmt::Display;
use std::io::{self, BufRead};
use std::path::Path;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use itertools::Itertools;
use log::{info, warn};
use rand::thread_rng;

use cykparse::chart::ChartParser;
use cykparse::cnf;
use cykparse::generator;
use cykparse::grammar::{self, Grammar};
use cykparse::parser;
use cykparse::tree;

use cli::{Cli, Command};

const DEFAULT_MAX_DEPTH: usize = 32;

type CommandResult = Result<(), String>;

fn main() -> ExitCode {
    env_logger::init();

    let result = match Cli::parse().command {
        Command::Convert { file, output } => convert(&file, output.as_deref()),
        Command::Parse { file, words, start, cnf, lowercase, all, timeout_ms } => {
            let options = ParseOptions {
                cnf,
                lowercase,
                trees: all.unwrap_or(1),
                timeout: timeout_ms.map(Duration::from_millis)
            };
            parse(&file, words, start.as_deref(), &options)
        }
        Command::Sample { file, start, amount, max_depth } => sample(
            &file,
            start.as_deref(),
            amount.unwrap_or(1),
            max_depth.unwrap_or(DEFAULT_MAX_DEPTH)
        ),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{}", message);
            ExitCode::FAILURE
        }
    }
}

fn report<E: Display>(errors: impl IntoIterator<Item = E>) -> String {
    errors.into_iter().join("\n")
}

// Loads a grammar, replacing its start symbol if one was asked for
fn load(file: &Path, start: Option<&str>) -> Result<Grammar, String> {
    let mut grammar = parser::parse_file(file).map_err(report)?;

    if let Some(start) = start {
        if grammar.productions_for(start).is_empty() {
            return Err(format!("No definition for start symbol `{}`", start));
        }
        grammar.set_start_symbol(start);
    }

    Ok(grammar)
}

fn convert(file: &Path, output: Option<&Path>) -> CommandResult {
    let grammar = load(file, None)?;
    let converted = cnf::convert(&grammar).map_err(|e| e.to_string())?;
    info!(
        "converted {} rules into {} rules in normal form",
        grammar.production_count(),
        converted.production_count()
    );

    match output {
        Some(path) => grammar::save_file(&converted, path).map_err(|e| e.to_string()),
        None => {
            print!("{}", grammar::render(&converted).map_err(|e| e.to_string())?);
            Ok(())
        }
    }
}

struct ParseOptions {
    cnf: bool,
    lowercase: bool,
    trees: usize,
    timeout: Option<Duration>
}

fn parse(file: &Path, words: Vec<String>, start: Option<&str>, options: &ParseOptions) -> CommandResult {
    let grammar = load(file, start)?;
    let grammar = if options.cnf {
        grammar
    } else {
        cnf::convert(&grammar).map_err(|e| e.to_string())?
    };

    let chart_parser = ChartParser::new(&grammar).map_err(|e| e.to_string())?;

    if !words.is_empty() {
        return parse_sentence(&chart_parser, words, options);
    }

    for line in io::stdin().lock().lines() {
        let line = line.map_err(|e| e.to_string())?;
        if line.trim().is_empty() {
            continue;
        }
        let words = line.split_whitespace().map(str::to_string).collect();
        parse_sentence(&chart_parser, words, options)?;
    }

    Ok(())
}

fn parse_sentence(chart_parser: &ChartParser, words: Vec<String>, options: &ParseOptions) -> CommandResult {
    let start = chart_parser.start_symbol().ok_or("Grammar has no start symbol")?;
    let tokens: Vec<String> = if options.lowercase {
        words.iter().map(|word| word.to_lowercase()).collect()
    } else {
        words
    };

    let outcome = match options.timeout {
        Some(timeout) => match chart_parser.parse_until(&tokens, Instant::now() + timeout) {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!("gave up on `{}`", tokens.join(" "));
                println!("{}", error);
                return Ok(());
            }
        },
        None => chart_parser.parse(&tokens),
    };

    if !outcome.recognized {
        println!("Sentence cannot be parsed.");
        println!("Recognized constituents:");
        for constituent in outcome.chart.constituents(&tokens) {
            println!("{}", constituent);
        }
        return Ok(());
    }

    println!("Sentence can be parsed.");
    let trees: Vec<tree::ParseTree> = if options.trees == 1 {
        tree::extract(&tokens, &outcome.chart, &outcome.backpointers, start).into_iter().collect()
    } else {
        tree::extract_all(&tokens, &outcome.chart, &outcome.backpointers, start, options.trees)
    };
    for (i, tree) in trees.iter().enumerate() {
        if i > 0 {
            println!();
        }
        print!("{}", tree.pretty());
    }

    Ok(())
}

fn sample(file: &Path, start: Option<&str>, amount: u32, max_depth: usize) -> CommandResult {
    let grammar = load(file, start)?;
    let mut rng = thread_rng();

    for _ in 0..amount {
        let sentence = generator::generate(&grammar, &mut rng, max_depth).map_err(|e| e.to_string())?;
        println!("{}", sentence.join(" "));
    }

    Ok(())
}
