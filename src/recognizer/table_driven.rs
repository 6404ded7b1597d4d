use crate::grammar::derivation::Derivation;
use crate::grammar::llk_table::{LlkTable, TableError};
use crate::grammar::lookahead::{epsilon_tuple, Lookahead};
use crate::grammar::{Grammar, NonTerminal, Rule, Symbol, Terminal};

use super::{ParseError, Recognizer};

/// Up to `k` unread characters, or `(eps)` at the end of the input.
fn lookahead_at(input: &[char], cursor: usize, k: usize) -> Lookahead {
    let tuple: Lookahead = input[cursor..]
        .iter()
        .take(k)
        .map(|&c| Terminal::from_char(c))
        .collect();
    if tuple.is_empty() {
        epsilon_tuple()
    } else {
        tuple
    }
}

/// The applied rules with their indices in `table.order()`.
fn run<'t>(
    input: &str,
    start: &NonTerminal,
    table: &'t LlkTable,
) -> Result<Vec<(usize, &'t Rule)>, ParseError> {
    let input: Vec<char> = input.chars().collect();
    let mut stack: Vec<Symbol> = vec![Symbol::NonTerminal(start.clone())];
    let mut cursor = 0;
    let mut sequence: Vec<(usize, &Rule)> = Vec::new();

    while let Some(top) = stack.pop() {
        match top {
            Symbol::Terminal(expected) if expected.is_epsilon() => {}
            Symbol::Terminal(expected) => match input.get(cursor) {
                None => {
                    return Err(ParseError::UnexpectedEnd {
                        position: cursor,
                        expected,
                    })
                }
                Some(&found) if !expected.matches(found) => {
                    return Err(ParseError::Mismatch {
                        position: cursor,
                        expected,
                        found,
                    })
                }
                Some(_) => cursor += 1,
            },
            Symbol::NonTerminal(nt) => {
                let lookahead = lookahead_at(&input, cursor, table.k());
                let rule = table.get(&nt, &lookahead).and_then(|index| {
                    table.order().rule(index).map(|rule| (index, rule))
                });
                let Some((index, rule)) = rule else {
                    return Err(ParseError::UnrecognizedLookahead {
                        position: cursor,
                        nonterminal: nt,
                        lookahead,
                    });
                };
                sequence.push((index, rule));
                stack.extend(rule.body().iter().rev().cloned());
            }
        }
    }

    if cursor < input.len() {
        return Err(ParseError::TrailingInput { position: cursor });
    }
    Ok(sequence)
}

/// Runs the strong LL(k) stack machine and returns the applied rule indices,
/// a leftmost derivation in `table.order()`.
pub fn parse_table_driven(
    input: &str,
    grammar: &Grammar,
    table: &LlkTable,
) -> Result<Vec<usize>, ParseError> {
    let sequence = run(input, grammar.start(), table)?;
    Ok(sequence.into_iter().map(|(index, _)| index).collect())
}

pub struct TableDriven {
    start: NonTerminal,
    table: LlkTable,
}

impl TableDriven {
    pub fn new(grammar: &Grammar, k: usize) -> Result<Self, TableError> {
        Ok(Self::from_table(grammar, grammar.llk_table(k)?))
    }

    pub fn from_table(grammar: &Grammar, table: LlkTable) -> Self {
        Self {
            start: grammar.start().clone(),
            table,
        }
    }

    pub fn table(&self) -> &LlkTable {
        &self.table
    }

    pub fn parse_indices(&self, input: &str) -> Result<Vec<usize>, ParseError> {
        let sequence = run(input, &self.start, &self.table)?;
        Ok(sequence.into_iter().map(|(index, _)| index).collect())
    }
}

impl Recognizer for TableDriven {
    fn name(&self) -> &'static str {
        "table"
    }

    fn parse(&self, input: &str) -> Result<Derivation, ParseError> {
        let sequence = run(input, &self.start, &self.table)?;
        Ok(Derivation::leftmost(
            sequence.into_iter().map(|(_, rule)| rule.clone()).collect(),
        ))
    }
}
