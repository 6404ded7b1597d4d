use std::collections::{BTreeMap, BTreeSet};

use crowbook_text_processing::escape::tex as escape_tex;
use serde::Serialize;
use thiserror::Error;

use super::derivation::RuleOrder;
use super::grammar::{join_symbols, NonTerminal, Rule, Terminal};
use super::lookahead::{
    first_k, follow_k_with, kconcat_sets, sequence_first_k, Lookahead, LookaheadSet,
    LookaheadSets, LookaheadState,
};
use super::Grammar;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("lookahead length must be at least 1")]
    ZeroLookahead,
    #[error(
        "grammar is not strong LL({k}): {nonterminal} has both {first} and {second} for lookahead {}",
        join_symbols(.lookahead)
    )]
    Conflict {
        k: usize,
        nonterminal: NonTerminal,
        lookahead: Lookahead,
        first: Rule,
        second: Rule,
    },
}

/// Strong LL(k) parse table: for each nonterminal, lookahead tuple to rule
/// index in [`LlkTable::order`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlkTable {
    k: usize,
    order: RuleOrder,
    entries: BTreeMap<NonTerminal, BTreeMap<Lookahead, usize>>,
}

impl LlkTable {
    pub fn k(&self) -> usize {
        self.k
    }

    pub fn order(&self) -> &RuleOrder {
        &self.order
    }

    pub fn get(&self, nt: &NonTerminal, lookahead: &[Terminal]) -> Option<usize> {
        self.entries.get(nt)?.get(lookahead).copied()
    }

    pub fn rule_for(&self, nt: &NonTerminal, lookahead: &[Terminal]) -> Option<&Rule> {
        self.get(nt, lookahead).and_then(|index| self.order.rule(index))
    }

    pub fn row(&self, nt: &NonTerminal) -> Option<&BTreeMap<Lookahead, usize>> {
        self.entries.get(nt)
    }

    pub fn entries(&self) -> &BTreeMap<NonTerminal, BTreeMap<Lookahead, usize>> {
        &self.entries
    }
}

/// `FIRSTk(rhs) . FOLLOWk(lhs)`, or `None` when the rule can never be used
/// in a derivation from the start symbol.
pub fn rule_lookahead(
    rule: &Rule,
    first: &LookaheadSets,
    follow: &LookaheadSets,
    k: usize,
) -> Option<LookaheadSet> {
    let body = sequence_first_k(rule.rhs(), first, k).into_known()?;
    let trailer = follow.get(rule.lhs()).and_then(LookaheadState::known)?;
    Some(kconcat_sets(&body, trailer, k))
}

impl Grammar {
    pub fn llk_table(&self, k: usize) -> Result<LlkTable, TableError> {
        if k == 0 {
            return Err(TableError::ZeroLookahead);
        }
        let first = first_k(self, k);
        let follow = follow_k_with(self, &first, k);
        let order = RuleOrder::new(self);

        let mut entries: BTreeMap<NonTerminal, BTreeMap<Lookahead, usize>> = self
            .nonterminals()
            .iter()
            .map(|nt| (nt.clone(), BTreeMap::new()))
            .collect();
        for (index, rule) in order.rules().iter().enumerate() {
            let Some(lookaheads) = rule_lookahead(rule, &first, &follow, k) else {
                continue;
            };
            let row = entries.entry(rule.lhs().clone()).or_default();
            for lookahead in lookaheads {
                match row.get(&lookahead) {
                    Some(&other) if other != index => {
                        return Err(TableError::Conflict {
                            k,
                            nonterminal: rule.lhs().clone(),
                            lookahead,
                            first: order.rules()[other].clone(),
                            second: rule.clone(),
                        });
                    }
                    _ => {
                        row.insert(lookahead, index);
                    }
                }
            }
        }

        Ok(LlkTable {
            k,
            order,
            entries,
        })
    }

    /// Tries k = 1, 2, ..., `max_k` and returns the first table that exists.
    pub fn smallest_llk(&self, max_k: usize) -> Option<LlkTable> {
        (1..=max_k).find_map(|k| self.llk_table(k).ok())
    }
}

/// `None` when the grammar is not strong LL(k).
pub fn build_ll_table(grammar: &Grammar, k: usize) -> Option<LlkTable> {
    grammar.llk_table(k).ok()
}

#[derive(Serialize)]
struct LlkRowOutput {
    left: String,
    cells: Vec<String>,
}

#[derive(Serialize)]
pub struct LlkTableOutput {
    k: usize,
    lookaheads: Vec<String>,
    rows: Vec<LlkRowOutput>,
}

impl LlkTableOutput {
    pub fn to_plaintext(&self) -> String {
        let mut header: Vec<String> = vec![String::new()];
        header.extend(self.lookaheads.iter().cloned());
        let mut output: Vec<Vec<String>> = vec![header];
        for row in &self.rows {
            let mut line: Vec<String> = vec![row.left.clone()];
            line.extend(row.cells.iter().cloned());
            output.push(line);
        }

        let width: Vec<usize> = (0..output[0].len())
            .map(|j| output.iter().map(|line| line[j].len()).max().unwrap_or(0))
            .collect();
        output
            .iter()
            .map(|line| {
                line.iter()
                    .enumerate()
                    .map(|(i, s)| format!("{:>width$}", s, width = width[i]))
                    .collect::<Vec<_>>()
                    .join(" | ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn to_latex(&self) -> String {
        let mut header: Vec<String> = vec![format!(
            "\\[\\begin{{array}}{{c{}}}\n",
            "|l".repeat(self.lookaheads.len()),
        )];
        header.extend(
            self.lookaheads
                .iter()
                .map(|t| format!("\\text{{{}}}", escape_tex(t.as_str()))),
        );
        let header = header.join(" & ");

        let output = self
            .rows
            .iter()
            .map(|row| {
                std::iter::once(escape_tex(row.left.as_str()).to_string())
                    .chain(
                        row.cells
                            .iter()
                            .map(|cell| escape_tex(cell.as_str()).replace("->", "\\rightarrow ")),
                    )
                    .collect::<Vec<_>>()
                    .join(" & ")
            })
            .collect::<Vec<_>>()
            .join("\\\\\n");

        header + "\\\\\\hline\n" + &output + "\n\\end{array}\\]"
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| super::pretty_print::error_json(&e))
    }
}

impl LlkTable {
    pub fn to_output(&self) -> LlkTableOutput {
        let lookaheads: BTreeSet<&Lookahead> =
            self.entries.values().flat_map(|row| row.keys()).collect();
        let lookaheads: Vec<&Lookahead> = lookaheads.into_iter().collect();

        let rows = self
            .entries
            .iter()
            .map(|(nt, row)| LlkRowOutput {
                left: nt.to_string(),
                cells: lookaheads
                    .iter()
                    .map(|lookahead| {
                        row.get(*lookahead)
                            .and_then(|&index| self.order.rule(index))
                            .map(Rule::to_string)
                            .unwrap_or_default()
                    })
                    .collect(),
            })
            .collect();

        LlkTableOutput {
            k: self.k,
            lookaheads: lookaheads.iter().map(|l| join_symbols(l.as_slice())).collect(),
            rows,
        }
    }
}
