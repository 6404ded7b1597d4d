//! FIRSTk / FOLLOWk over sets of k-truncated terminal tuples.
//!
//! A nonterminal's set is [`LookaheadState::Unknown`] until some rule gives it
//! a first member; after convergence an `Unknown` FIRSTk means the nonterminal
//! derives no terminal string, an `Unknown` FOLLOWk means it is unreachable.

use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;

use super::grammar::{NonTerminal, Rule, Symbol, Terminal};
use super::Grammar;

/// A terminal tuple of length at most k. `(eps)` stands for "nothing".
pub type Lookahead = Vec<Terminal>;
pub type LookaheadSet = BTreeSet<Lookahead>;
pub type LookaheadSets = BTreeMap<NonTerminal, LookaheadState>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LookaheadState {
    #[default]
    Unknown,
    Known(LookaheadSet),
}

impl LookaheadState {
    pub fn known(&self) -> Option<&LookaheadSet> {
        match self {
            LookaheadState::Known(set) => Some(set),
            LookaheadState::Unknown => None,
        }
    }

    pub fn into_known(self) -> Option<LookaheadSet> {
        match self {
            LookaheadState::Known(set) => Some(set),
            LookaheadState::Unknown => None,
        }
    }

    /// Returns whether the state has grown.
    fn absorb(&mut self, set: LookaheadSet) -> bool {
        match self {
            LookaheadState::Unknown => {
                *self = LookaheadState::Known(set);
                true
            }
            LookaheadState::Known(current) => {
                let before = current.len();
                current.extend(set);
                current.len() != before
            }
        }
    }
}

pub fn epsilon_tuple() -> Lookahead {
    vec![Terminal::epsilon()]
}

pub fn is_epsilon_tuple(tuple: &[Terminal]) -> bool {
    tuple.len() == 1 && tuple[0].is_epsilon()
}

fn epsilon_set() -> LookaheadSet {
    BTreeSet::from([epsilon_tuple()])
}

fn strip_epsilon(tuple: &[Terminal]) -> &[Terminal] {
    if is_epsilon_tuple(tuple) {
        &[]
    } else {
        tuple
    }
}

/// Concatenates two tuples and keeps at most `k` terminals. Never returns an
/// empty tuple: nothing is spelled `(eps)`.
pub fn kconcat_tuples(s1: &[Terminal], s2: &[Terminal], k: usize) -> Lookahead {
    let result: Lookahead = strip_epsilon(s1)
        .iter()
        .chain(strip_epsilon(s2))
        .take(k)
        .cloned()
        .collect();
    if result.is_empty() {
        epsilon_tuple()
    } else {
        result
    }
}

/// All truncated concatenations of a tuple of `a` with a tuple of `b`. An
/// empty operand yields `{(eps)}`.
pub fn kconcat_sets(a: &LookaheadSet, b: &LookaheadSet, k: usize) -> LookaheadSet {
    if a.is_empty() || b.is_empty() {
        return epsilon_set();
    }
    a.iter()
        .cartesian_product(b.iter())
        .map(|(x, y)| kconcat_tuples(x, y, k))
        .collect()
}

pub fn kconcat_all<'a>(sets: impl IntoIterator<Item = &'a LookaheadSet>, k: usize) -> LookaheadSet {
    sets.into_iter()
        .fold(epsilon_set(), |acc, set| kconcat_sets(&acc, set, k))
}

/// FIRSTk of a symbol sequence; `Unknown` as soon as one nonterminal of the
/// sequence is.
pub fn sequence_first_k(symbols: &[Symbol], first: &LookaheadSets, k: usize) -> LookaheadState {
    let mut sets: Vec<LookaheadSet> = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        match symbol {
            Symbol::Terminal(t) => sets.push(BTreeSet::from([vec![t.clone()]])),
            Symbol::NonTerminal(nt) => match first.get(nt).and_then(LookaheadState::known) {
                Some(set) => sets.push(set.clone()),
                None => return LookaheadState::Unknown,
            },
        }
    }
    LookaheadState::Known(kconcat_all(&sets, k))
}

fn unknown_for_all(grammar: &Grammar) -> LookaheadSets {
    grammar
        .nonterminals()
        .iter()
        .map(|nt| (nt.clone(), LookaheadState::Unknown))
        .collect()
}

fn relax(sets: &mut LookaheadSets, nt: &NonTerminal, set: LookaheadSet) -> bool {
    sets.entry(nt.clone()).or_default().absorb(set)
}

/// Relaxes `rules` until no FIRSTk set grows.
pub(crate) fn first_fixpoint(rules: &[&Rule], mut first: LookaheadSets, k: usize) -> LookaheadSets {
    loop {
        let mut changed = false;
        for rule in rules {
            if let LookaheadState::Known(set) = sequence_first_k(rule.rhs(), &first, k) {
                changed |= relax(&mut first, rule.lhs(), set);
            }
        }
        if !changed {
            break;
        }
    }
    first
}

/// Relaxes every nonterminal occurrence in `rules` until no FOLLOWk set
/// grows.
pub(crate) fn follow_fixpoint(
    rules: &[&Rule],
    first: &LookaheadSets,
    mut follow: LookaheadSets,
    k: usize,
) -> LookaheadSets {
    loop {
        let mut changed = false;
        for rule in rules {
            let lhs_follow = match follow.get(rule.lhs()).and_then(LookaheadState::known) {
                Some(set) => set.clone(),
                None => continue,
            };
            for (i, symbol) in rule.rhs().iter().enumerate() {
                let Some(nt) = symbol.non_terminal() else {
                    continue;
                };
                if let LookaheadState::Known(trailer) =
                    sequence_first_k(&rule.rhs()[i + 1..], first, k)
                {
                    changed |= relax(&mut follow, nt, kconcat_sets(&trailer, &lhs_follow, k));
                }
            }
        }
        if !changed {
            break;
        }
    }
    follow
}

pub fn first_k(grammar: &Grammar, k: usize) -> LookaheadSets {
    let mut first = unknown_for_all(grammar);
    for rule in grammar.rules() {
        let terminals: Option<Vec<Terminal>> = rule
            .rhs()
            .iter()
            .map(|s| s.terminal().cloned())
            .collect();
        if let Some(terminals) = terminals {
            relax(
                &mut first,
                rule.lhs(),
                BTreeSet::from([kconcat_tuples(&terminals, &[], k)]),
            );
        }
    }
    let rules: Vec<&Rule> = grammar.rules().iter().collect();
    first_fixpoint(&rules, first, k)
}

pub fn follow_k(grammar: &Grammar, k: usize) -> LookaheadSets {
    follow_k_with(grammar, &first_k(grammar, k), k)
}

/// FOLLOWk from an already computed FIRSTk.
pub fn follow_k_with(grammar: &Grammar, first: &LookaheadSets, k: usize) -> LookaheadSets {
    let mut follow = unknown_for_all(grammar);
    follow.insert(grammar.start().clone(), LookaheadState::Known(epsilon_set()));
    let rules: Vec<&Rule> = grammar.rules().iter().collect();
    follow_fixpoint(&rules, first, follow, k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LL1: &str = "S -> BA\nA -> +BA | eps\nB -> DC\nC -> *DC | eps\nD -> (S) | a";

    fn tuple(s: &str) -> Lookahead {
        if s == "eps" {
            return epsilon_tuple();
        }
        s.chars().map(Terminal::from_char).collect()
    }

    fn set(items: &[&str]) -> LookaheadSet {
        items.iter().map(|s| tuple(s)).collect()
    }

    fn nt(s: &str) -> NonTerminal {
        NonTerminal::new(s).unwrap()
    }

    fn known(sets: &LookaheadSets, name: &str) -> LookaheadSet {
        sets[&nt(name)].known().cloned().unwrap()
    }

    #[test]
    fn kconcat_tuples_truncates() {
        assert_eq!(kconcat_tuples(&tuple("ab"), &tuple("cd"), 3), tuple("abc"));
        assert_eq!(kconcat_tuples(&tuple("eps"), &tuple("cd"), 3), tuple("cd"));
        assert_eq!(kconcat_tuples(&tuple("ab"), &tuple("eps"), 1), tuple("a"));
        assert_eq!(kconcat_tuples(&tuple("eps"), &tuple("eps"), 2), tuple("eps"));
    }

    #[test]
    fn kconcat_sets_with_empty_operand() {
        let empty = LookaheadSet::new();
        assert_eq!(kconcat_sets(&empty, &set(&["a"]), 2), set(&["eps"]));
        assert_eq!(kconcat_sets(&set(&["a"]), &empty, 2), set(&["eps"]));
        assert_eq!(
            kconcat_sets(&set(&["a", "eps"]), &set(&["b", "cd"]), 2),
            set(&["ab", "ac", "b", "cd"])
        );
        assert_eq!(kconcat_all(Vec::<&LookaheadSet>::new(), 2), set(&["eps"]));
    }

    #[test]
    fn first_2_of_expression_grammar() {
        let g = Grammar::parse(LL1).unwrap();
        let first = first_k(&g, 2);
        assert_eq!(known(&first, "A"), set(&["eps", "+a", "+("]));
        assert_eq!(known(&first, "C"), set(&["eps", "*a", "*("]));
        assert_eq!(known(&first, "D"), set(&["a", "(a", "(("]));
    }

    #[test]
    fn first_1_and_follow_1() {
        let g = Grammar::parse(LL1).unwrap();
        let first = first_k(&g, 1);
        let follow = follow_k(&g, 1);
        assert_eq!(known(&first, "S"), set(&["a", "("]));
        assert_eq!(known(&follow, "S"), set(&["eps", ")"]));
        assert_eq!(known(&follow, "A"), set(&["eps", ")"]));
        assert_eq!(known(&follow, "B"), set(&["eps", ")", "+"]));
        assert_eq!(known(&follow, "D"), set(&["eps", ")", "+", "*"]));
    }

    #[test]
    fn unproductive_and_unreachable_stay_unknown() {
        let g = Grammar::parse("S -> a | X\nX -> aX\nY -> b").unwrap();
        let first = first_k(&g, 1);
        let follow = follow_k(&g, 1);
        assert_eq!(first[&nt("X")], LookaheadState::Unknown);
        assert_eq!(known(&first, "S"), set(&["a"]));
        assert_eq!(known(&first, "Y"), set(&["b"]));
        assert_eq!(follow[&nt("Y")], LookaheadState::Unknown);
        assert_eq!(known(&follow, "X"), set(&["eps"]));
    }

    #[test]
    fn fixpoint_is_idempotent() {
        let g = Grammar::parse(LL1).unwrap();
        let rules: Vec<&Rule> = g.rules().iter().collect();
        let first = first_k(&g, 2);
        assert_eq!(first_fixpoint(&rules, first.clone(), 2), first);
        let follow = follow_k_with(&g, &first, 2);
        assert_eq!(follow_fixpoint(&rules, &first, follow.clone(), 2), follow);
    }

    #[test]
    fn fixpoint_ignores_rule_order() {
        let g = Grammar::parse(LL1).unwrap();
        let mut rules: Vec<&Rule> = g.rules().iter().collect();
        rules.reverse();
        let first = first_fixpoint(&rules, unknown_for_all(&g), 2);
        assert_eq!(first, first_k(&g, 2));

        let mut seed = unknown_for_all(&g);
        seed.insert(g.start().clone(), LookaheadState::Known(epsilon_set()));
        rules.rotate_left(3);
        assert_eq!(follow_fixpoint(&rules, &first, seed, 2), follow_k(&g, 2));
    }
}
