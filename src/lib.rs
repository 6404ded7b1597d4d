extern crate wasm_bindgen;

use std::collections::BTreeMap;

use wasm_bindgen::prelude::*;

pub mod grammar;
pub mod recognizer;

pub use grammar::derivation::{replay, Derivation, DerivationOrder, ReplayError, RuleOrder};
pub use grammar::llk_table::{build_ll_table, LlkTable, TableError};
pub use grammar::lookahead::{Lookahead, LookaheadSet, LookaheadSets, LookaheadState};
pub use grammar::{Grammar, GrammarError, NonTerminal, Rule, Symbol, Terminal};
pub use recognizer::{
    parse_table_driven, BacktrackBottomUp, BacktrackTopDown, ParseError, Recognizer,
    RecognizerConfig, Strategy, TableDriven,
};

use grammar::lookahead::{first_k, follow_k};
use grammar::pretty_print::error_json;

/// Bound on the backtracking search of [`verify_to_json`].
const WASM_STEP_LIMIT: usize = 1_000_000;

fn known_sets(sets: LookaheadSets) -> BTreeMap<NonTerminal, LookaheadSet> {
    sets.into_iter()
        .filter_map(|(nt, state)| state.into_known().map(|set| (nt, set)))
        .collect()
}

/// FIRSTk of every nonterminal that derives some terminal string.
pub fn build_lookahead_sets(grammar: &Grammar, k: usize) -> BTreeMap<NonTerminal, LookaheadSet> {
    known_sets(first_k(grammar, k))
}

/// FOLLOWk of every nonterminal reachable from the start symbol.
pub fn build_follow_sets(grammar: &Grammar, k: usize) -> BTreeMap<NonTerminal, LookaheadSet> {
    known_sets(follow_k(grammar, k))
}

#[wasm_bindgen]
pub fn lookahead_sets_to_json(grammar: &str, k: usize) -> String {
    match Grammar::parse(grammar) {
        Ok(g) => g.to_lookahead_output_vec(k).to_json(),
        Err(e) => error_json(&e),
    }
}

#[wasm_bindgen]
pub fn llk_table_to_json(grammar: &str, k: usize) -> String {
    let table = Grammar::parse(grammar)
        .map_err(|e| e.to_string())
        .and_then(|g| g.llk_table(k).map_err(|e| e.to_string()));
    match table {
        Ok(table) => table.to_output().to_json(),
        Err(e) => error_json(&e),
    }
}

#[wasm_bindgen]
pub fn verify_to_json(grammar: &str, k: usize, strategy: &str, input: &str) -> String {
    let run = || -> Result<String, String> {
        let g = Grammar::parse(grammar).map_err(|e| e.to_string())?;
        let strategy: Strategy = strategy.parse()?;
        let config = RecognizerConfig {
            k,
            step_limit: Some(WASM_STEP_LIMIT),
        };
        let recognizer = strategy.build(&g, &config).map_err(|e| e.to_string())?;
        let derivation = recognizer.parse(input).map_err(|e| e.to_string())?;
        let output = derivation.to_output(g.start()).map_err(|e| e.to_string())?;
        Ok(output.to_json())
    };
    run().unwrap_or_else(|e| error_json(&e))
}

#[cfg(test)]
mod parse_tests {
    use crate::grammar::{GrammarError, NonTerminal, Rule, Symbol, Terminal};

    #[test]
    fn simple_parse() {
        let g = crate::Grammar::parse("S -> a").unwrap();
        let s = NonTerminal::new("S").unwrap();
        let a = Terminal::new("a").unwrap();

        assert_eq!(g.start(), &s);
        assert!(g.terminals().contains(&a));
        assert!(!g.is_nullable(&s));
        assert_eq!(
            g.rules_of(&s).cloned().collect::<Vec<_>>(),
            vec![Rule::new(s.clone(), vec![Symbol::Terminal(a)]).unwrap()]
        );
    }

    #[test]
    fn simple_parse_with_space_and_newline() {
        let g = crate::Grammar::parse("  S -> a \n | b c").unwrap();
        let s = NonTerminal::new("S").unwrap();
        let rights: Vec<String> = g
            .rules_of(&s)
            .map(|r| crate::grammar::grammar::join_symbols(r.rhs()))
            .collect();
        assert_eq!(rights, vec!["a", "bc"]);
    }

    #[test]
    fn empty_parse() {
        assert_eq!(
            crate::Grammar::parse("  \n  "),
            Err(GrammarError::NoProductions)
        );
    }

    #[test]
    fn two_rightarrows_parse() {
        assert_eq!(
            crate::Grammar::parse("S -> a -> b"),
            Err(GrammarError::TooManyArrows(1))
        );
    }

    #[test]
    fn no_left_parse() {
        assert_eq!(
            crate::Grammar::parse("-> a"),
            Err(GrammarError::EmptyLeftSide(1))
        );
    }

    #[test]
    fn no_previous_left_parse() {
        assert_eq!(
            crate::Grammar::parse("| a b\n S -> a"),
            Err(GrammarError::NoPreviousLeftSide(1))
        );
    }

    #[test]
    fn lowercase_left_side() {
        assert!(matches!(
            crate::Grammar::parse("s -> x"),
            Err(GrammarError::AtLine { line: 1, .. })
        ));
    }
}

#[cfg(test)]
mod fixture_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LL1: &str = "S -> BA\nA -> +BA | eps\nB -> DC\nC -> *DC | eps\nD -> (S) | a";
    const LL2: &str = "S -> aaA\nA -> aAc | bBc\nB -> bBc | bc";
    const LL3: &str = "S -> aSA\nS -> eps\nA -> aabS | c";

    fn tuple(s: &str) -> Lookahead {
        s.chars().map(Terminal::from_char).collect()
    }

    fn recognizers(grammar: &Grammar, k: usize) -> Vec<Box<dyn Recognizer>> {
        let config = RecognizerConfig { k, step_limit: None };
        Strategy::ALL
            .into_iter()
            .map(|strategy| strategy.build(grammar, &config).unwrap())
            .collect()
    }

    #[test]
    fn first_two_of_expression_grammar() {
        let g = Grammar::parse(LL1).unwrap();
        let first = build_lookahead_sets(&g, 2);
        let a = NonTerminal::new("A").unwrap();
        let expected: LookaheadSet = [vec![Terminal::epsilon()], tuple("+a"), tuple("+(")]
            .into_iter()
            .collect();
        assert_eq!(first[&a], expected);
    }

    #[test]
    fn unknown_sets_are_absent() {
        let g = Grammar::parse("S -> a\nX -> Xb\nY -> c").unwrap();
        let first = build_lookahead_sets(&g, 1);
        let follow = build_follow_sets(&g, 1);
        assert!(!first.contains_key(&NonTerminal::new("X").unwrap()));
        assert!(first.contains_key(&NonTerminal::new("Y").unwrap()));
        assert!(!follow.contains_key(&NonTerminal::new("Y").unwrap()));
    }

    #[test]
    fn all_strategies_agree() {
        let cases: [(&str, usize, &[&str], &[&str]); 3] = [
            (LL1, 1, &["(a+a)*a", "a+a", "a", "((a))"], &["abc", "(a", "a+", ""]),
            (
                LL2,
                2,
                &["aaabbccc", "aabbcc", "aaaabbbbbccccccc"],
                &["aaaabbbbbcccccc", "aa", "aabc"],
            ),
            (LL3, 3, &["aaab", "aaabaaab", "aaabaaabac", ""], &["aab", "c", "aaabc"]),
        ];
        for (text, k, accepted, rejected) in cases {
            let g = Grammar::parse(text).unwrap();
            for recognizer in recognizers(&g, k) {
                for input in accepted {
                    assert!(
                        recognizer.verify(input),
                        "{} rejected {:?}",
                        recognizer.name(),
                        input
                    );
                }
                for input in rejected {
                    assert!(
                        !recognizer.verify(input),
                        "{} accepted {:?}",
                        recognizer.name(),
                        input
                    );
                }
            }
        }
    }

    #[test]
    fn derivations_replay_to_input() {
        let g = Grammar::parse(LL1).unwrap();
        for recognizer in recognizers(&g, 1) {
            for input in ["(a+a)*a", "a*a*a", "(a)"] {
                let derivation = recognizer.parse(input).unwrap();
                let derived = derivation.replay(g.start()).unwrap();
                assert_eq!(
                    grammar::grammar::join_symbols(&derived),
                    input,
                    "{}",
                    recognizer.name()
                );
            }
        }
    }

    #[test]
    fn backtracking_handles_long_inputs_within_wasm_budget() {
        for n in [12, 300] {
            let input = vec!["a"; n].join("+");
            let expected = format!("\"derived\":\"{}\"", input);
            for strategy in ["top-down", "bottom-up"] {
                let json = verify_to_json(LL1, 1, strategy, &input);
                assert!(json.contains(&expected), "{} on {} chars", strategy, input.len());
            }
        }
    }

    #[test]
    fn table_sequence_round_trip() {
        let g = Grammar::parse(LL3).unwrap();
        let table = build_ll_table(&g, 3).unwrap();
        let sequence = parse_table_driven("aaabaaabac", &g, &table).unwrap();
        assert_eq!(replay(table.order(), &sequence), Ok(tuple("aaabaaabac")));
    }

    #[test]
    fn not_strong_ll_below_k() {
        assert!(build_ll_table(&Grammar::parse(LL2).unwrap(), 1).is_none());
        assert!(build_ll_table(&Grammar::parse(LL3).unwrap(), 2).is_none());
    }

    #[test]
    fn json_entry_points() {
        assert!(lookahead_sets_to_json(LL1, 1).starts_with("{\"k\":1,"));
        assert!(llk_table_to_json("S -> aS | a", 1).starts_with("{\"error\":"));
        assert!(llk_table_to_json("S -> aS | a", 2).contains("\"rows\""));
        assert!(verify_to_json(LL1, 1, "top-down", "a+a").contains("\"derived\":\"a+a\""));
        assert!(verify_to_json(LL1, 1, "lr", "a").contains("unknown strategy"));
        assert!(verify_to_json(LL1, 1, "table", "a+").starts_with("{\"error\":"));
    }
}
