use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;

use super::grammar::{NonTerminal, Rule, Symbol};
use super::Grammar;

/// Nullable nonterminals of one grammar, each with the rule that first
/// proved it nullable. Every nonterminal in a witness body was proved earlier.
#[derive(Debug, Clone)]
pub struct Nullability<'g> {
    witnesses: BTreeMap<NonTerminal, &'g Rule>,
}

impl<'g> Nullability<'g> {
    pub fn contains(&self, nt: &NonTerminal) -> bool {
        self.witnesses.contains_key(nt)
    }

    pub fn set(&self) -> BTreeSet<NonTerminal> {
        self.witnesses.keys().cloned().collect()
    }

    /// A leftmost derivation of the empty string from `nt`, or `None` when
    /// `nt` is not nullable.
    pub fn null_derivation(&self, nt: &NonTerminal) -> Option<Vec<Rule>> {
        let mut derivation = Vec::new();
        let mut pending = vec![nt];
        while let Some(current) = pending.pop() {
            let rule = *self.witnesses.get(current)?;
            derivation.push(rule.clone());
            pending.extend(rule.rhs().iter().rev().filter_map(Symbol::non_terminal));
        }
        Some(derivation)
    }
}

impl Grammar {
    pub fn nullability(&self) -> Nullability<'_> {
        let mut witnesses: BTreeMap<NonTerminal, &Rule> = BTreeMap::new();
        let mut changed = true;
        while changed {
            changed = false;
            for rule in self.rules() {
                if witnesses.contains_key(rule.lhs()) {
                    continue;
                }
                let nullable = rule.is_epsilon_rule()
                    || rule.rhs().iter().all(|s| match s {
                        Symbol::Terminal(_) => false,
                        Symbol::NonTerminal(nt) => witnesses.contains_key(nt),
                    });
                if nullable {
                    witnesses.insert(rule.lhs().clone(), rule);
                    changed = true;
                }
            }
        }
        Nullability { witnesses }
    }

    pub fn nullable_set(&self) -> BTreeSet<NonTerminal> {
        self.nullability().set()
    }

    pub fn is_nullable(&self, nt: &NonTerminal) -> bool {
        self.nullability().contains(nt)
    }

    pub fn null_derivation(&self, nt: &NonTerminal) -> Option<Vec<Rule>> {
        self.nullability().null_derivation(nt)
    }

    /// Returns an equivalent grammar without `A -> eps` rules. Every rule is
    /// expanded into the variants that keep or drop each nullable occurrence,
    /// so a rule with m nullable occurrences yields up to 2^m rules. The empty
    /// string itself is no longer derivable.
    pub fn remove_eps_rules(&self) -> Grammar {
        self.remove_eps_rules_with(&self.nullability())
    }

    /// [`Grammar::remove_eps_rules`] with the nullability of `self` already
    /// computed.
    pub(crate) fn remove_eps_rules_with(&self, nullability: &Nullability<'_>) -> Grammar {
        let mut rules: BTreeSet<Rule> = BTreeSet::new();
        for rule in self.rules() {
            let optional: Vec<usize> = rule
                .rhs()
                .iter()
                .positions(|s| s.non_terminal().is_some_and(|nt| nullability.contains(nt)))
                .collect();
            for dropped in optional.into_iter().powerset() {
                let dropped: BTreeSet<usize> = dropped.into_iter().collect();
                rules.extend(rule.drop_symbols(&dropped));
            }
        }
        Grammar::from_rules(self.start().clone(), rules)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use pretty_assertions::assert_eq;

    use crate::grammar::{NonTerminal, Rule};
    use crate::Grammar;

    fn nt(s: &str) -> NonTerminal {
        NonTerminal::new(s).unwrap()
    }

    fn rule_strings(g: &Grammar) -> Vec<String> {
        g.rules().iter().map(|r| r.to_string()).collect()
    }

    #[test]
    fn simple_nullable() {
        let g = Grammar::parse("Z -> d | XYZ\nY -> eps | c\nX -> Y | a").unwrap();
        assert_eq!(g.nullable_set(), BTreeSet::from([nt("X"), nt("Y")]));
        assert!(!g.is_nullable(&nt("Z")));
    }

    #[test]
    fn nullable_through_chain() {
        let g = Grammar::parse("S -> AB\nA -> B\nB -> eps | b").unwrap();
        assert_eq!(g.nullable_set(), BTreeSet::from([nt("A"), nt("B"), nt("S")]));
    }

    #[test]
    fn null_derivation_is_leftmost() {
        let g = Grammar::parse("S -> AB\nA -> B\nB -> eps | b").unwrap();
        let derivation: Vec<String> = g
            .null_derivation(&nt("S"))
            .unwrap()
            .iter()
            .map(Rule::to_string)
            .collect();
        assert_eq!(
            derivation,
            vec!["S -> AB", "A -> B", "B -> [eps]", "B -> [eps]"]
        );
        assert_eq!(g.null_derivation(&nt("X")), None);
    }

    #[test]
    fn remove_eps_rules_expands_variants() {
        let g = Grammar::parse("S -> BA\nA -> +BA | eps\nB -> DC\nC -> *DC | eps\nD -> (S) | a")
            .unwrap();
        let free = g.remove_eps_rules();
        assert_eq!(
            rule_strings(&free),
            vec![
                "A -> +B",
                "A -> +BA",
                "B -> D",
                "B -> DC",
                "C -> *D",
                "C -> *DC",
                "D -> (S)",
                "D -> a",
                "S -> B",
                "S -> BA",
            ]
        );
        assert!(free.rules().iter().all(|r| !r.is_epsilon_rule()));
        assert_eq!(free.start(), g.start());
        assert!(free.nullable_set().is_empty());
    }

    #[test]
    fn remove_eps_rules_deduplicates() {
        let g = Grammar::parse("S -> AA | a\nA -> a | eps").unwrap();
        let free = g.remove_eps_rules();
        assert_eq!(rule_strings(&free), vec!["A -> a", "S -> a", "S -> A", "S -> AA"]);
    }

    #[test]
    fn one_nullability_answers_every_query() {
        let g = Grammar::parse("S -> AB\nA -> B\nB -> eps | b\nC -> c").unwrap();
        let nullability = g.nullability();
        assert_eq!(nullability.set(), g.nullable_set());
        assert!(nullability.contains(&nt("A")));
        assert!(!nullability.contains(&nt("C")));
        assert_eq!(nullability.null_derivation(&nt("S")), g.null_derivation(&nt("S")));
        assert_eq!(g.remove_eps_rules_with(&nullability), g.remove_eps_rules());
    }

    #[test]
    fn remove_eps_rules_keeps_start_of_empty_language() {
        let g = Grammar::parse("S -> eps").unwrap();
        let free = g.remove_eps_rules();
        assert!(free.rules().is_empty());
        assert!(free.nonterminals().contains(&nt("S")));
    }
}
