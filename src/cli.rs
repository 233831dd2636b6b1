use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command
}

#[derive(Subcommand)]
pub enum Command {
    /// Convert a grammar to Chomsky normal form
    Convert {
        /// File containing the grammar
        file: PathBuf,

        /// Where to save the converted grammar (default: stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>
    },

    /// Check sentences against a grammar and print their parse trees
    Parse {
        /// File containing the grammar
        file: PathBuf,

        /// Words of the sentence (default: one sentence per line of stdin)
        words: Vec<String>,

        /// Start symbol (default: first in the file)
        #[arg(short, long, value_name = "SYMBOL")]
        start: Option<String>,

        /// The grammar is already in Chomsky normal form
        #[arg(long)]
        cnf: bool,

        /// Lowercase the input before parsing
        #[arg(short, long)]
        lowercase: bool,

        /// Print up to this many parse trees per sentence (default: 1)
        #[arg(short = 'a', long, value_name = "AMOUNT")]
        all: Option<usize>,

        /// Give up on a sentence after this many milliseconds
        #[arg(short, long, value_name = "MS")]
        timeout_ms: Option<u64>
    },

    /// Generate random sentences from a grammar
    Sample {
        /// File containing the grammar
        file: PathBuf,

        /// Start symbol (default: first in the file)
        #[arg(short, long, value_name = "SYMBOL")]
        start: Option<String>,

        /// Amount to generate (default: 1)
        #[arg(short = 'n', long, value_name = "AMOUNT")]
        amount: Option<u32>,

        /// Deepest derivation to try before giving up (default: 32)
        #[arg(short = 'd', long, value_name = "DEPTH")]
        max_depth: Option<usize>
    }
}
