pub mod chart;
pub mod cnf;
pub mod error_handling;
pub mod generator;
pub mod grammar;
pub mod parser;
pub mod tree;
