use std::collections::BTreeMap;

use crate::grammar::derivation::Derivation;
use crate::grammar::{Grammar, NonTerminal, Rule, Symbol};

use super::{ParseError, Recognizer, StepBudget};

/// Backtracking top-down recognizer over the epsilon-free variant of a grammar.
///
/// The search is a depth-first walk over states (pending symbols, cursor)
/// kept on an explicit stack of frames. Every symbol of an epsilon-free
/// grammar derives at least one character, so a state with more pending
/// symbols than unread characters is dead. Runs of unit expansions are cut
/// at the number of unit rules: a derivation that repeats a nonterminal along
/// such a run has a shorter one without the cycle.
pub struct BacktrackTopDown {
    grammar: Grammar,
    rules: BTreeMap<NonTerminal, Vec<Rule>>,
    unit_limit: usize,
    empty: Option<Vec<Rule>>,
    step_limit: Option<usize>,
}

impl BacktrackTopDown {
    pub fn new(grammar: &Grammar) -> Self {
        let nullability = grammar.nullability();
        let epsilon_free = grammar.remove_eps_rules_with(&nullability);
        Self {
            rules: epsilon_free.rules_by_lhs(),
            unit_limit: epsilon_free.rules().iter().filter(|r| r.is_unit_rule()).count(),
            empty: nullability.null_derivation(grammar.start()),
            grammar: epsilon_free,
            step_limit: None,
        }
    }

    pub fn with_step_limit(mut self, limit: usize) -> Self {
        self.step_limit = Some(limit);
        self
    }

    /// The epsilon-free grammar the search runs on.
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }
}

enum Move<'a> {
    Match,
    Expand(&'a Rule),
}

/// A state on the search path. Its top pending symbol is held here while the
/// alternatives for it are tried.
struct Frame<'a> {
    top: Symbol,
    units: usize,
    next: usize,
    current: Option<Move<'a>>,
}

struct Search<'a> {
    rules: &'a BTreeMap<NonTerminal, Vec<Rule>>,
    unit_limit: usize,
    input: Vec<char>,
    pending: Vec<Symbol>,
    cursor: usize,
    applied: Vec<&'a Rule>,
    budget: StepBudget,
}

impl<'a> Search<'a> {
    fn run(&mut self) -> Result<bool, ParseError> {
        let mut frames: Vec<Frame<'a>> = Vec::new();
        let mut units = 0;
        loop {
            self.budget.tick()?;
            let remaining = self.input.len() - self.cursor;
            if self.pending.is_empty() && remaining == 0 {
                return Ok(true);
            }
            if self.pending.len() <= remaining {
                if let Some(top) = self.pending.pop() {
                    frames.push(Frame {
                        top,
                        units,
                        next: 0,
                        current: None,
                    });
                }
            }

            loop {
                let Some(frame) = frames.last_mut() else {
                    return Ok(false);
                };
                if let Some(done) = frame.current.take() {
                    self.undo(done);
                }
                if let Some(next_units) = self.advance(frame) {
                    units = next_units;
                    break;
                }
                if let Some(exhausted) = frames.pop() {
                    self.pending.push(exhausted.top);
                }
            }
        }
    }

    /// Applies the next untried alternative of `frame` and returns the unit
    /// run length of the new state.
    fn advance(&mut self, frame: &mut Frame<'a>) -> Option<usize> {
        match &frame.top {
            Symbol::Terminal(expected) => {
                if frame.next > 0 {
                    return None;
                }
                frame.next = 1;
                let matched = self
                    .input
                    .get(self.cursor)
                    .is_some_and(|&c| expected.matches(c));
                if !matched {
                    return None;
                }
                self.cursor += 1;
                frame.current = Some(Move::Match);
                Some(0)
            }
            Symbol::NonTerminal(nt) => {
                let rules: &'a BTreeMap<NonTerminal, Vec<Rule>> = self.rules;
                let alternatives = rules.get(nt).map(Vec::as_slice).unwrap_or_default();
                while let Some(rule) = alternatives.get(frame.next) {
                    frame.next += 1;
                    let unit = rule.is_unit_rule();
                    if unit && frame.units >= self.unit_limit {
                        continue;
                    }
                    self.pending.extend(rule.rhs().iter().rev().cloned());
                    self.applied.push(rule);
                    frame.current = Some(Move::Expand(rule));
                    return Some(if unit { frame.units + 1 } else { 0 });
                }
                None
            }
        }
    }

    fn undo(&mut self, done: Move<'a>) {
        match done {
            Move::Match => self.cursor -= 1,
            Move::Expand(rule) => {
                self.pending.truncate(self.pending.len() - rule.rhs().len());
                self.applied.pop();
            }
        }
    }
}

impl Recognizer for BacktrackTopDown {
    fn name(&self) -> &'static str {
        "top-down"
    }

    fn parse(&self, input: &str) -> Result<Derivation, ParseError> {
        if input.is_empty() {
            return self
                .empty
                .clone()
                .map(Derivation::leftmost)
                .ok_or(ParseError::NoDerivation);
        }

        let mut search = Search {
            rules: &self.rules,
            unit_limit: self.unit_limit,
            input: input.chars().collect(),
            pending: vec![Symbol::NonTerminal(self.grammar.start().clone())],
            cursor: 0,
            applied: Vec::new(),
            budget: StepBudget::new(self.step_limit),
        };
        if search.run()? {
            Ok(Derivation::leftmost(
                search.applied.into_iter().cloned().collect(),
            ))
        } else {
            Err(ParseError::NoDerivation)
        }
    }
}
