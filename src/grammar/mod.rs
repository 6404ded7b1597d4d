pub mod derivation;
pub mod grammar;
pub mod llk_table;
pub mod lookahead;
pub mod nullable;
pub mod parse;
pub mod pretty_print;
pub use grammar::{Grammar, GrammarError, NonTerminal, Rule, Symbol, Terminal};

pub const EPSILON: &str = "eps";
