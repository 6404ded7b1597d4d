use crate::grammar::derivation::Derivation;
use crate::grammar::lookahead::{epsilon_tuple, follow_k, LookaheadSets};
use crate::grammar::{Grammar, Rule, Symbol, Terminal};

use super::{ParseError, Recognizer, StepBudget};

/// Backtracking shift-reduce recognizer over the epsilon-free variant of a
/// grammar.
///
/// From every state it first tries each reduction whose body ends the stack,
/// in rule order, then a shift. A reduction to `A` is only tried when the
/// next character (or the end of input) is in FOLLOW1(A), which every step of
/// a rightmost derivation satisfies. Runs of unit reductions are cut at the
/// number of unit rules, so the search terminates on unit cycles and keeps
/// memory linear in its depth.
pub struct BacktrackBottomUp {
    grammar: Grammar,
    rules: Vec<Rule>,
    follow: LookaheadSets,
    unit_limit: usize,
    empty: Option<Vec<Rule>>,
    step_limit: Option<usize>,
}

impl BacktrackBottomUp {
    pub fn new(grammar: &Grammar) -> Self {
        let nullability = grammar.nullability();
        let epsilon_free = grammar.remove_eps_rules_with(&nullability);
        Self {
            rules: epsilon_free.rules().iter().cloned().collect(),
            follow: follow_k(&epsilon_free, 1),
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

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }
}

enum Move<'a> {
    Reduce(&'a Rule),
    Shift,
}

/// Alternatives `0..rules.len()` are reductions, `rules.len()` is the shift.
struct Frame<'a> {
    units: usize,
    next: usize,
    current: Option<Move<'a>>,
}

struct Search<'a> {
    rules: &'a [Rule],
    follow: &'a LookaheadSets,
    unit_limit: usize,
    goal: Symbol,
    input: Vec<Terminal>,
    stack: Vec<Symbol>,
    cursor: usize,
    reductions: Vec<&'a Rule>,
    budget: StepBudget,
}

impl<'a> Search<'a> {
    fn accepted(&self) -> bool {
        self.cursor == self.input.len() && self.stack.len() == 1 && self.stack[0] == self.goal
    }

    fn run(&mut self) -> Result<bool, ParseError> {
        let mut frames: Vec<Frame<'a>> = Vec::new();
        let mut units = 0;
        loop {
            self.budget.tick()?;
            if self.accepted() {
                return Ok(true);
            }
            frames.push(Frame {
                units,
                next: 0,
                current: None,
            });

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
                frames.pop();
            }
        }
    }

    fn can_reduce(&self, rule: &Rule, units: usize) -> bool {
        if !self.stack.ends_with(rule.rhs()) || (rule.is_unit_rule() && units >= self.unit_limit) {
            return false;
        }
        let lookahead = self
            .input
            .get(self.cursor)
            .map_or_else(epsilon_tuple, |next| vec![next.clone()]);
        self.follow
            .get(rule.lhs())
            .and_then(|state| state.known())
            .is_some_and(|set| set.contains(&lookahead))
    }

    /// Applies the next untried alternative of `frame` and returns the unit
    /// run length of the new state.
    fn advance(&mut self, frame: &mut Frame<'a>) -> Option<usize> {
        let rules: &'a [Rule] = self.rules;
        while let Some(rule) = rules.get(frame.next) {
            frame.next += 1;
            if !self.can_reduce(rule, frame.units) {
                continue;
            }
            self.stack.truncate(self.stack.len() - rule.rhs().len());
            self.stack.push(Symbol::NonTerminal(rule.lhs().clone()));
            self.reductions.push(rule);
            frame.current = Some(Move::Reduce(rule));
            return Some(if rule.is_unit_rule() { frame.units + 1 } else { 0 });
        }

        if frame.next > rules.len() {
            return None;
        }
        frame.next += 1;
        let next = self.input.get(self.cursor)?.clone();
        self.stack.push(Symbol::Terminal(next));
        self.cursor += 1;
        frame.current = Some(Move::Shift);
        Some(0)
    }

    fn undo(&mut self, done: Move<'a>) {
        self.stack.pop();
        match done {
            Move::Reduce(rule) => {
                self.stack.extend(rule.rhs().iter().cloned());
                self.reductions.pop();
            }
            Move::Shift => self.cursor -= 1,
        }
    }
}

impl Recognizer for BacktrackBottomUp {
    fn name(&self) -> &'static str {
        "bottom-up"
    }

    /// A successful run yields the rightmost derivation, except for the empty
    /// input whose derivation comes from the nullable start symbol.
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
            follow: &self.follow,
            unit_limit: self.unit_limit,
            goal: Symbol::NonTerminal(self.grammar.start().clone()),
            input: input.chars().map(Terminal::from_char).collect(),
            stack: Vec::new(),
            cursor: 0,
            reductions: Vec::new(),
            budget: StepBudget::new(self.step_limit),
        };
        if search.run()? {
            Ok(Derivation::rightmost(
                search.reductions.into_iter().rev().cloned().collect(),
            ))
        } else {
            Err(ParseError::NoDerivation)
        }
    }
}
