use thiserror::Error;

use super::grammar::{join_symbols, NonTerminal, Rule, Symbol, Terminal};
use super::Grammar;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReplayError {
    #[error("step {step}: rule index {index} is not part of the rule ordering")]
    UnknownRule { step: usize, index: usize },
    #[error("step {step}: no nonterminal left to replace")]
    NoNonTerminal { step: usize },
    #[error("step {step}: rule {rule} cannot replace {found}")]
    WrongNonTerminal {
        step: usize,
        rule: Rule,
        found: NonTerminal,
    },
    #[error("derivation stops at {0}, which still has nonterminals")]
    Incomplete(String),
}

/// Stable numbering of a grammar's rules, in their total order. Indices are a
/// pure function of the grammar's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOrder {
    start: NonTerminal,
    rules: Vec<Rule>,
}

impl RuleOrder {
    pub fn new(grammar: &Grammar) -> Self {
        Self {
            start: grammar.start().clone(),
            rules: grammar.rules().iter().cloned().collect(),
        }
    }

    pub fn start(&self) -> &NonTerminal {
        &self.start
    }

    pub fn rule(&self, index: usize) -> Option<&Rule> {
        self.rules.get(index)
    }

    pub fn index_of(&self, rule: &Rule) -> Option<usize> {
        self.rules.binary_search(rule).ok()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Which nonterminal of the sentential form each step replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivationOrder {
    Leftmost,
    Rightmost,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derivation {
    pub order: DerivationOrder,
    pub rules: Vec<Rule>,
}

impl Derivation {
    pub fn leftmost(rules: Vec<Rule>) -> Self {
        Self {
            order: DerivationOrder::Leftmost,
            rules,
        }
    }

    pub fn rightmost(rules: Vec<Rule>) -> Self {
        Self {
            order: DerivationOrder::Rightmost,
            rules,
        }
    }

    pub fn replay(&self, start: &NonTerminal) -> Result<Vec<Terminal>, ReplayError> {
        replay_rules(start, &self.rules, self.order)
    }

    /// Every sentential form, from `[start]` to the derived string.
    pub fn sentential_forms(&self, start: &NonTerminal) -> Result<Vec<Vec<Symbol>>, ReplayError> {
        sentential_forms(start, &self.rules, self.order)
    }

    pub fn indices(&self, order: &RuleOrder) -> Option<Vec<usize>> {
        self.rules.iter().map(|rule| order.index_of(rule)).collect()
    }
}

fn apply_rule(
    form: &mut Vec<Symbol>,
    step: usize,
    rule: &Rule,
    order: DerivationOrder,
) -> Result<(), ReplayError> {
    let is_non_terminal = |s: &Symbol| s.non_terminal().is_some();
    let position = match order {
        DerivationOrder::Leftmost => form.iter().position(is_non_terminal),
        DerivationOrder::Rightmost => form.iter().rposition(is_non_terminal),
    }
    .ok_or(ReplayError::NoNonTerminal { step })?;
    if let Some(found) = form[position].non_terminal().filter(|nt| *nt != rule.lhs()) {
        return Err(ReplayError::WrongNonTerminal {
            step,
            rule: rule.clone(),
            found: found.clone(),
        });
    }
    form.splice(position..position + 1, rule.body().iter().cloned());
    Ok(())
}

fn sentential_forms<'a>(
    start: &NonTerminal,
    rules: impl IntoIterator<Item = &'a Rule>,
    order: DerivationOrder,
) -> Result<Vec<Vec<Symbol>>, ReplayError> {
    let mut form: Vec<Symbol> = vec![Symbol::NonTerminal(start.clone())];
    let mut forms = vec![form.clone()];
    for (step, rule) in rules.into_iter().enumerate() {
        apply_rule(&mut form, step, rule, order)?;
        forms.push(form.clone());
    }
    Ok(forms)
}

/// Applies `rules` to `[start]` and returns the derived terminal string.
pub fn replay_rules<'a>(
    start: &NonTerminal,
    rules: impl IntoIterator<Item = &'a Rule>,
    order: DerivationOrder,
) -> Result<Vec<Terminal>, ReplayError> {
    let mut form: Vec<Symbol> = vec![Symbol::NonTerminal(start.clone())];
    for (step, rule) in rules.into_iter().enumerate() {
        apply_rule(&mut form, step, rule, order)?;
    }
    if form.iter().any(|s| s.non_terminal().is_some()) {
        return Err(ReplayError::Incomplete(join_symbols(&form)));
    }
    Ok(form.into_iter().filter_map(|s| s.terminal().cloned()).collect())
}

/// Regenerates the string of a leftmost derivation given as rule indices.
pub fn replay(order: &RuleOrder, sequence: &[usize]) -> Result<Vec<Terminal>, ReplayError> {
    let rules = sequence
        .iter()
        .enumerate()
        .map(|(step, &index)| order.rule(index).ok_or(ReplayError::UnknownRule { step, index }))
        .collect::<Result<Vec<&Rule>, _>>()?;
    replay_rules(order.start(), rules, DerivationOrder::Leftmost)
}
