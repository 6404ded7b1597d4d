//! Interchangeable recognizers sharing the [`Recognizer`] contract.
//!
//! Every call to [`Recognizer::parse`] owns its working state (stack, cursor,
//! checkpoints), so a recognizer can be reused and shared freely.

mod bottom_up;
mod table_driven;
mod top_down;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub use bottom_up::BacktrackBottomUp;
pub use table_driven::{parse_table_driven, TableDriven};
pub use top_down::BacktrackTopDown;

use crate::grammar::derivation::Derivation;
use crate::grammar::grammar::join_symbols;
use crate::grammar::llk_table::TableError;
use crate::grammar::lookahead::Lookahead;
use crate::grammar::{Grammar, NonTerminal, Terminal};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("position {position}: unexpected end of input, expected {expected}")]
    UnexpectedEnd { position: usize, expected: Terminal },
    #[error("position {position}: expected {expected}, found '{found}'")]
    Mismatch {
        position: usize,
        expected: Terminal,
        found: char,
    },
    #[error(
        "position {position}: no rule of {nonterminal} for lookahead {}",
        join_symbols(.lookahead)
    )]
    UnrecognizedLookahead {
        position: usize,
        nonterminal: NonTerminal,
        lookahead: Lookahead,
    },
    #[error("position {position}: trailing input")]
    TrailingInput { position: usize },
    #[error("no derivation of the input exists")]
    NoDerivation,
    #[error("search stopped after {0} steps")]
    StepLimitExceeded(usize),
}

pub trait Recognizer {
    fn name(&self) -> &'static str;

    /// Returns the derivation of `input`, or why there is none.
    fn parse(&self, input: &str) -> Result<Derivation, ParseError>;

    fn verify(&self, input: &str) -> bool {
        self.parse(input).is_ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    TableDriven,
    TopDown,
    BottomUp,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::TableDriven, Strategy::TopDown, Strategy::BottomUp];

    pub fn build(
        self,
        grammar: &Grammar,
        config: &RecognizerConfig,
    ) -> Result<Box<dyn Recognizer>, TableError> {
        Ok(match self {
            Strategy::TableDriven => Box::new(TableDriven::new(grammar, config.k)?),
            Strategy::TopDown => {
                let mut parser = BacktrackTopDown::new(grammar);
                if let Some(limit) = config.step_limit {
                    parser = parser.with_step_limit(limit);
                }
                Box::new(parser)
            }
            Strategy::BottomUp => {
                let mut parser = BacktrackBottomUp::new(grammar);
                if let Some(limit) = config.step_limit {
                    parser = parser.with_step_limit(limit);
                }
                Box::new(parser)
            }
        })
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::TableDriven => "table",
            Strategy::TopDown => "top-down",
            Strategy::BottomUp => "bottom-up",
        })
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.to_string() == s)
            .ok_or_else(|| format!("unknown strategy '{}', expected table, top-down or bottom-up", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecognizerConfig {
    /// Lookahead length of the table-driven strategy.
    pub k: usize,
    /// Bound on the search steps of the backtracking strategies.
    pub step_limit: Option<usize>,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            k: 1,
            step_limit: None,
        }
    }
}

/// Counts search steps against an optional limit.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StepBudget {
    steps: usize,
    limit: Option<usize>,
}

impl StepBudget {
    pub(crate) fn new(limit: Option<usize>) -> Self {
        Self { steps: 0, limit }
    }

    pub(crate) fn tick(&mut self) -> Result<(), ParseError> {
        self.steps += 1;
        match self.limit {
            Some(limit) if self.steps > limit => Err(ParseError::StepLimitExceeded(limit)),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_names_round_trip() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.to_string().parse::<Strategy>(), Ok(strategy));
        }
        assert!("lr".parse::<Strategy>().is_err());
    }

    #[test]
    fn step_budget() {
        let mut budget = StepBudget::new(Some(2));
        assert_eq!(budget.tick(), Ok(()));
        assert_eq!(budget.tick(), Ok(()));
        assert_eq!(budget.tick(), Err(ParseError::StepLimitExceeded(2)));
        let mut unlimited = StepBudget::new(None);
        assert!((0..100).all(|_| unlimited.tick().is_ok()));
    }

    #[test]
    fn build_reports_table_conflicts() {
        let g = Grammar::parse("S -> aS | a").unwrap();
        let config = RecognizerConfig::default();
        assert!(Strategy::TableDriven.build(&g, &config).is_err());
        let parser = Strategy::BottomUp.build(&g, &config).unwrap();
        assert_eq!(parser.name(), "bottom-up");
        assert!(parser.verify("aaa"));
    }
}
