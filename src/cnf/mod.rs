/*
    This module converts grammars into Chomsky normal form, where every
    rule rewrites to either a single terminal or exactly two nonterminals
*/

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::Display;

use log::{debug, trace, warn};

use crate::error_handling::ErrorType;
use crate::grammar::*;

#[derive(Debug, PartialEq)]
pub enum CnfError {
    // Unit elimination processed more (lhs, target) pairs than can exist
    CyclicUnit { lhs: String, target: String },
}

impl ErrorType for CnfError {}

impl Display for CnfError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CnfError::CyclicUnit { lhs, target } => write!(
                f,
                "Unit rule elimination did not terminate at `{} -> {}`",
                lhs, target
            ),
        }
    }
}

// Hands out symbol names that nothing in the source grammar uses
struct Names<'g> {
    taken: HashSet<&'g str>,
    next_index: usize,
}

impl<'g> Names<'g> {
    fn new(grammar: &'g Grammar) -> Self {
        Names {
            taken: grammar.symbol_names(),
            next_index: 0,
        }
    }

    // `T_0`, `X_1`, ... with one counter shared by every prefix
    fn fresh(&mut self, prefix: &str) -> String {
        loop {
            let name = format!("{}_{}", prefix, self.next_index);
            self.next_index += 1;
            if !self.taken.contains(name.as_str()) {
                return name;
            }
        }
    }

    // `S'`, `S''`, ...
    fn primed(&self, base: &str) -> String {
        let mut name = format!("{}'", base);
        while self.taken.contains(name.as_str()) {
            name.push('\'');
        }
        name
    }
}

struct Converter<'g> {
    names: Names<'g>,
    output: Grammar,
    // Terminal text to the nonterminal that rewrites to it
    hoisted: HashMap<String, String>,
    // Terminal rules minted while rewriting the current production
    pending: Vec<(String, String)>,
}

impl<'g> Converter<'g> {
    fn hoist(&mut self, terminal: &str) -> Symbol {
        if let Some(name) = self.hoisted.get(terminal) {
            return Symbol::Nonterminal(name.clone());
        }

        let name = self.names.fresh("T");
        trace!("hoisting terminal `{}` into `{}`", terminal, name);
        self.hoisted.insert(terminal.to_string(), name.clone());
        self.pending.push((name.clone(), terminal.to_string()));
        Symbol::Nonterminal(name)
    }

    fn add_production(&mut self, lhs: &str, production: &[Symbol]) {
        if production.is_empty() {
            warn!("dropping empty alternative of `{}`", lhs);
            return;
        }

        let mut rest: Production = if production.len() > 1 {
            production
                .iter()
                .map(|symbol| match symbol {
                    Symbol::Terminal(text) => self.hoist(text),
                    Symbol::Nonterminal(_) => symbol.clone(),
                })
                .collect()
        } else {
            production.to_vec()
        };

        // A -> w x y z  becomes  A -> w X_0, X_0 -> x X_1, X_1 -> y z
        let mut current = lhs.to_string();
        while rest.len() > 2 {
            let chain = self.names.fresh("X");
            let tail = rest.split_off(1);
            rest.push(Symbol::Nonterminal(chain.clone()));
            self.output.add_rule(&current, rest);
            current = chain;
            rest = tail;
        }
        self.output.add_rule(&current, rest);

        for (name, terminal) in std::mem::take(&mut self.pending) {
            self.output.add_rule(&name, vec![Symbol::Terminal(terminal)]);
        }
    }
}

fn unit_target(production: &[Symbol]) -> Option<&str> {
    match production {
        [Symbol::Nonterminal(name)] => Some(name),
        _ => None,
    }
}

// Replaces every `A -> B` by the non-unit rules of everything `B` reaches
// through unit rules. Each (A, B) pair is expanded at most once, which is
// what makes cycles like `A -> B`, `B -> A` terminate.
fn eliminate_units(grammar: Grammar) -> Result<Grammar, CnfError> {
    let nonterminal_count = grammar
        .rules()
        .flat_map(|(lhs, rewrite)| {
            let used = rewrite.iter().flatten().filter(|s| !s.is_terminal()).map(Symbol::name);
            std::iter::once(lhs).chain(used)
        })
        .collect::<HashSet<_>>()
        .len();

    // At most n² pairs get expanded, and each expansion queues at most n
    // more, on top of the n² unit rules seeded at the start
    let max_steps = nonterminal_count * nonterminal_count * (nonterminal_count + 1);
    eliminate_units_within(grammar, max_steps)
}

// Pops at most `max_steps` pairs off the worklist before giving up
fn eliminate_units_within(mut grammar: Grammar, max_steps: usize) -> Result<Grammar, CnfError> {
    let units: Vec<(String, Production)> = grammar
        .rules()
        .flat_map(|(lhs, rewrite)| {
            rewrite
                .iter()
                .filter(|p| unit_target(p).is_some())
                .map(move |p| (lhs.to_string(), p.clone()))
        })
        .collect();

    let mut worklist: VecDeque<(String, String)> = units
        .iter()
        .filter_map(|(lhs, p)| unit_target(p).map(|target| (lhs.clone(), target.to_string())))
        .collect();
    let mut visited = HashSet::new();
    let mut inlined = Vec::new();
    let mut steps = 0;

    while let Some((lhs, target)) = worklist.pop_front() {
        steps += 1;
        if steps > max_steps {
            return Err(CnfError::CyclicUnit { lhs, target });
        }
        if visited.contains(&(lhs.clone(), target.clone())) {
            continue;
        }

        for production in grammar.productions_for(&target) {
            match unit_target(production) {
                Some(next) => worklist.push_back((lhs.clone(), next.to_string())),
                None => inlined.push((lhs.clone(), production.clone())),
            }
        }
        visited.insert((lhs, target));
    }
    debug!("expanded {} unit pairs in {} steps from {} unit rules", visited.len(), steps, units.len());

    for (lhs, unit) in &units {
        grammar.remove_production(lhs, unit);
    }
    for (lhs, production) in inlined {
        grammar.add_rule(&lhs, production);
    }
    Ok(grammar)
}

/// Converts `grammar` into an equivalent grammar in Chomsky normal form.
///
/// The input is left untouched. Conversion happens in four passes:
///
/// 1. if the start symbol `S` is used on a right-hand side, a new start
///    symbol `S'` with the single rule `S' -> S` is added in front;
/// 2. terminals inside rules of two or more symbols are replaced by fresh
///    nonterminals `T_n` rewriting to them, one per distinct terminal;
/// 3. rules longer than two symbols are split into chains of fresh `X_n`
///    nonterminals;
/// 4. unit rules `A -> B` are replaced by the rules of `B`.
///
/// Empty alternatives are dropped, as are nonterminals left with no rules.
pub fn convert(grammar: &Grammar) -> Result<Grammar, CnfError> {
    let Some(start) = grammar.start_symbol() else {
        return Ok(grammar.clone());
    };

    let names = Names::new(grammar);
    let mut output = Grammar::with_start_symbol(start);

    if grammar.references(&Symbol::nonterminal(start)) {
        let new_start = names.primed(start);
        debug!("`{}` appears on a right-hand side, adding start symbol `{}`", start, new_start);
        output.set_start_symbol(&new_start);
        output.add_rule(&new_start, vec![Symbol::nonterminal(start)]);
    }

    let mut converter = Converter {
        names,
        output,
        hoisted: HashMap::new(),
        pending: Vec::new(),
    };
    for (lhs, rewrite) in grammar.rules() {
        for production in rewrite {
            converter.add_production(lhs, production);
        }
    }
    debug!(
        "hoisted {} terminals, {} rules before unit elimination",
        converter.hoisted.len(),
        converter.output.production_count()
    );

    let mut output = eliminate_units(converter.output)?;
    output.remove_empty();

    if let Some(start) = output.start_symbol() {
        if output.productions_for(start).is_empty() {
            warn!("start symbol `{}` derives no sentences", start);
        }
    }
    debug!(
        "normal form has {} rules for {} nonterminals",
        output.production_count(),
        output.len()
    );

    Ok(output)
}
