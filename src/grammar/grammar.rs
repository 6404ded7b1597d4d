use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display};

use thiserror::Error;

use super::EPSILON;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GrammarError {
    #[error("Line {0}: missing \"->\"")]
    MissingArrow(usize),
    #[error("Line {0}: too many \"->\"")]
    TooManyArrows(usize),
    #[error("Line {0}: empty left side")]
    EmptyLeftSide(usize),
    #[error("Line {0}: cannot find left side")]
    NoPreviousLeftSide(usize),
    #[error("Line {0}: empty alternative")]
    EmptyAlternative(usize),
    #[error("Line {line}: {source}")]
    AtLine {
        line: usize,
        source: Box<GrammarError>,
    },
    #[error("'{0}' is not a nonterminal, nonterminals start with an uppercase letter")]
    InvalidNonTerminal(String),
    #[error("'{0}' is not a terminal, terminals are a lowercase letter, a non-alphabetic character or eps")]
    InvalidTerminal(String),
    #[error("a rule of {0} has an empty right side")]
    EmptyRightSide(String),
    #[error("a rule of {0} uses eps next to other symbols")]
    MisplacedEpsilon(String),
    #[error("'{0}' appears in a rule but is not part of the vocabulary")]
    UndeclaredSymbol(String),
    #[error("start symbol {0} is not a nonterminal of the grammar")]
    StartNotNonTerminal(String),
    #[error("the grammar has no productions")]
    NoProductions,
}

impl GrammarError {
    pub(crate) fn at_line(self, line: usize) -> Self {
        GrammarError::AtLine {
            line,
            source: Box::new(self),
        }
    }
}

/// Writes `text`, bracketed when it is longer than one character so that it
/// cannot be read as a sequence of symbols.
fn write_symbol_text(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    if text.chars().count() > 1 {
        write!(f, "[{}]", text)
    } else {
        write!(f, "{}", text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Terminal(String);

impl Terminal {
    pub fn new(text: &str) -> Result<Self, GrammarError> {
        let mut chars = text.chars();
        let valid = text == EPSILON
            || match (chars.next(), chars.next()) {
                (Some(c), None) => c.is_lowercase() || !c.is_alphabetic(),
                _ => false,
            };
        if valid {
            Ok(Terminal(text.to_string()))
        } else {
            Err(GrammarError::InvalidTerminal(text.to_string()))
        }
    }

    pub fn epsilon() -> Self {
        Terminal(EPSILON.to_string())
    }

    /// Input characters are compared against terminals without validation:
    /// a character no terminal can spell simply never matches.
    pub(crate) fn from_char(c: char) -> Self {
        Terminal(c.to_string())
    }

    pub fn is_epsilon(&self) -> bool {
        self.0 == EPSILON
    }

    pub fn matches(&self, c: char) -> bool {
        let mut chars = self.0.chars();
        !self.is_epsilon() && chars.next() == Some(c) && chars.next().is_none()
    }

    pub fn text(&self) -> &str {
        &self.0
    }
}

impl Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_symbol_text(f, &self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonTerminal(String);

impl NonTerminal {
    pub fn new(text: &str) -> Result<Self, GrammarError> {
        let starts_upper = text.chars().next().is_some_and(|c| c.is_uppercase());
        if starts_upper && !text.chars().any(|c| c.is_whitespace()) {
            Ok(NonTerminal(text.to_string()))
        } else {
            Err(GrammarError::InvalidNonTerminal(text.to_string()))
        }
    }

    pub fn text(&self) -> &str {
        &self.0
    }
}

impl Display for NonTerminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_symbol_text(f, &self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    Terminal(Terminal),
    NonTerminal(NonTerminal),
}

impl Symbol {
    /// The case of the first character decides the kind of symbol.
    pub fn parse(text: &str) -> Result<Self, GrammarError> {
        if text.chars().next().is_some_and(|c| c.is_uppercase()) {
            NonTerminal::new(text).map(Symbol::NonTerminal)
        } else {
            Terminal::new(text).map(Symbol::Terminal)
        }
    }

    pub fn terminal(&self) -> Option<&Terminal> {
        match self {
            Symbol::Terminal(t) => Some(t),
            Symbol::NonTerminal(_) => None,
        }
    }

    pub fn non_terminal(&self) -> Option<&NonTerminal> {
        match self {
            Symbol::NonTerminal(nt) => Some(nt),
            Symbol::Terminal(_) => None,
        }
    }

    pub fn is_epsilon(&self) -> bool {
        self.terminal().is_some_and(Terminal::is_epsilon)
    }
}

impl From<Terminal> for Symbol {
    fn from(t: Terminal) -> Self {
        Symbol::Terminal(t)
    }
}

impl From<NonTerminal> for Symbol {
    fn from(nt: NonTerminal) -> Self {
        Symbol::NonTerminal(nt)
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Terminal(t) => t.fmt(f),
            Symbol::NonTerminal(nt) => nt.fmt(f),
        }
    }
}

/// Concatenates the display form of `symbols`.
pub fn join_symbols<T: Display>(symbols: &[T]) -> String {
    symbols.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rule {
    lhs: NonTerminal,
    rhs: Vec<Symbol>,
}

impl Rule {
    /// `rhs` must not be empty; the empty production is spelled `[eps]`.
    pub fn new(lhs: NonTerminal, rhs: Vec<Symbol>) -> Result<Self, GrammarError> {
        if rhs.is_empty() {
            return Err(GrammarError::EmptyRightSide(lhs.to_string()));
        }
        if rhs.len() > 1 && rhs.iter().any(Symbol::is_epsilon) {
            return Err(GrammarError::MisplacedEpsilon(lhs.to_string()));
        }
        Ok(Rule { lhs, rhs })
    }

    pub fn epsilon(lhs: NonTerminal) -> Self {
        Rule {
            lhs,
            rhs: vec![Symbol::Terminal(Terminal::epsilon())],
        }
    }

    pub fn lhs(&self) -> &NonTerminal {
        &self.lhs
    }

    pub fn rhs(&self) -> &[Symbol] {
        &self.rhs
    }

    /// The symbols the rule actually produces: empty for `A -> eps`.
    pub fn body(&self) -> &[Symbol] {
        if self.is_epsilon_rule() {
            &[]
        } else {
            &self.rhs
        }
    }

    pub fn is_epsilon_rule(&self) -> bool {
        self.rhs.len() == 1 && self.rhs[0].is_epsilon()
    }

    /// `A -> B` with a single nonterminal on the right.
    pub fn is_unit_rule(&self) -> bool {
        self.rhs.len() == 1 && self.rhs[0].non_terminal().is_some()
    }

    /// The rule without the right-side symbols at `positions`, or `None` when
    /// nothing would remain. Epsilon rules have no droppable symbols.
    pub(crate) fn drop_symbols(&self, positions: &BTreeSet<usize>) -> Option<Rule> {
        if self.is_epsilon_rule() {
            return None;
        }
        let rhs: Vec<Symbol> = self
            .rhs
            .iter()
            .enumerate()
            .filter(|(i, _)| !positions.contains(i))
            .map(|(_, symbol)| symbol.clone())
            .collect();
        if rhs.is_empty() {
            return None;
        }
        Some(Rule {
            lhs: self.lhs.clone(),
            rhs,
        })
    }
}

impl Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.lhs, join_symbols(&self.rhs))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    nonterminals: BTreeSet<NonTerminal>,
    terminals: BTreeSet<Terminal>,
    rules: BTreeSet<Rule>,
    start: NonTerminal,
}

impl Grammar {
    pub fn new(
        nonterminals: BTreeSet<NonTerminal>,
        terminals: BTreeSet<Terminal>,
        rules: BTreeSet<Rule>,
        start: NonTerminal,
    ) -> Result<Self, GrammarError> {
        if !nonterminals.contains(&start) {
            return Err(GrammarError::StartNotNonTerminal(start.to_string()));
        }
        for rule in &rules {
            let symbols = std::iter::once(Symbol::NonTerminal(rule.lhs.clone()))
                .chain(rule.rhs.iter().cloned());
            for symbol in symbols {
                let declared = match &symbol {
                    Symbol::Terminal(t) => terminals.contains(t),
                    Symbol::NonTerminal(nt) => nonterminals.contains(nt),
                };
                if !declared {
                    return Err(GrammarError::UndeclaredSymbol(symbol.to_string()));
                }
            }
        }

        Ok(Self {
            nonterminals,
            terminals,
            rules,
            start,
        })
    }

    /// Builds a grammar whose vocabulary is exactly what `rules` and `start`
    /// mention.
    pub fn from_rules(start: NonTerminal, rules: impl IntoIterator<Item = Rule>) -> Self {
        let rules: BTreeSet<Rule> = rules.into_iter().collect();
        let mut nonterminals = BTreeSet::from([start.clone()]);
        let mut terminals = BTreeSet::new();
        for rule in &rules {
            nonterminals.insert(rule.lhs.clone());
            for symbol in &rule.rhs {
                match symbol {
                    Symbol::Terminal(t) => terminals.insert(t.clone()),
                    Symbol::NonTerminal(nt) => nonterminals.insert(nt.clone()),
                };
            }
        }

        Self {
            nonterminals,
            terminals,
            rules,
            start,
        }
    }

    pub fn nonterminals(&self) -> &BTreeSet<NonTerminal> {
        &self.nonterminals
    }

    pub fn terminals(&self) -> &BTreeSet<Terminal> {
        &self.terminals
    }

    pub fn rules(&self) -> &BTreeSet<Rule> {
        &self.rules
    }

    pub fn start(&self) -> &NonTerminal {
        &self.start
    }

    pub fn vocabulary(&self) -> BTreeSet<Symbol> {
        self.terminals
            .iter()
            .cloned()
            .map(Symbol::Terminal)
            .chain(self.nonterminals.iter().cloned().map(Symbol::NonTerminal))
            .collect()
    }

    /// Rules of `nt` in their stable order.
    pub fn rules_of<'a>(&'a self, nt: &'a NonTerminal) -> impl Iterator<Item = &'a Rule> + 'a {
        self.rules.iter().filter(move |rule| &rule.lhs == nt)
    }

    pub fn rules_by_lhs(&self) -> BTreeMap<NonTerminal, Vec<Rule>> {
        let mut map: BTreeMap<NonTerminal, Vec<Rule>> = BTreeMap::new();
        for rule in &self.rules {
            map.entry(rule.lhs.clone()).or_default().push(rule.clone());
        }
        map
    }
}
