use super::grammar::{GrammarError, NonTerminal, Rule, Symbol};
use super::{Grammar, EPSILON};

impl Grammar {
    /// Reads productions of the form `A -> BcD | eps`, one left side per
    /// line. A line starting with `|` continues the previous left side. The
    /// first left side is the start symbol.
    pub fn parse(grammar: &str) -> Result<Self, GrammarError> {
        let mut raw_productions: Vec<(usize, NonTerminal, String)> = Vec::new();

        let mut previous_left: Option<NonTerminal> = None;
        for (i, line) in grammar.lines().enumerate() {
            let line: String = line.chars().filter(|c| !c.is_whitespace()).collect();
            if line.is_empty() {
                continue;
            }
            let parts: Vec<&str> = line.split("->").collect();
            if parts.len() > 2 {
                return Err(GrammarError::TooManyArrows(i + 1));
            }
            let (left, rights): (NonTerminal, &str) = if parts.len() == 2 {
                if parts[0].is_empty() {
                    return Err(GrammarError::EmptyLeftSide(i + 1));
                }
                let left = NonTerminal::new(parts[0]).map_err(|e| e.at_line(i + 1))?;
                (left, parts[1])
            } else if let Some(rest) = line.strip_prefix('|') {
                match &previous_left {
                    Some(left) => (left.clone(), rest),
                    None => return Err(GrammarError::NoPreviousLeftSide(i + 1)),
                }
            } else {
                return Err(GrammarError::MissingArrow(i + 1));
            };

            previous_left = Some(left.clone());

            raw_productions.push((i + 1, left, rights.to_string()));
        }

        let start = match raw_productions.first() {
            Some((_, left, _)) => left.clone(),
            None => return Err(GrammarError::NoProductions),
        };

        let mut rules: Vec<Rule> = Vec::new();
        for (line, left, rights) in raw_productions {
            for right in rights.split('|') {
                if right.is_empty() {
                    return Err(GrammarError::EmptyAlternative(line));
                }
                if right == EPSILON {
                    rules.push(Rule::epsilon(left.clone()));
                    continue;
                }
                let symbols = right
                    .chars()
                    .map(|c| Symbol::parse(&c.to_string()))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| e.at_line(line))?;
                rules.push(Rule::new(left.clone(), symbols).map_err(|e| e.at_line(line))?);
            }
        }

        Ok(Grammar::from_rules(start, rules))
    }
}

#[cfg(test)]
mod tests {
    use crate::grammar::{GrammarError, NonTerminal, Rule, Symbol, Terminal};
    use crate::Grammar;

    fn symbols(s: &str) -> Vec<Symbol> {
        s.chars().map(|c| Symbol::parse(&c.to_string()).unwrap()).collect()
    }

    #[test]
    fn alternatives_and_eps() {
        let g = Grammar::parse("S -> BA\nA -> +BA | eps").unwrap();
        let a = NonTerminal::new("A").unwrap();

        assert_eq!(g.start().text(), "S");
        assert_eq!(g.rules().len(), 3);
        let rules: Vec<&Rule> = g.rules_of(&a).collect();
        assert_eq!(rules[0], &Rule::new(a.clone(), symbols("+BA")).unwrap());
        assert!(rules[1].is_epsilon_rule());
        assert!(g.terminals().contains(&Terminal::epsilon()));
    }

    #[test]
    fn continuation_lines() {
        let g = Grammar::parse("  S -> a \n | b c").unwrap();
        let s = NonTerminal::new("S").unwrap();

        let rules: Vec<&Rule> = g.rules_of(&s).collect();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].rhs(), symbols("a").as_slice());
        assert_eq!(rules[1].rhs(), symbols("bc").as_slice());
    }

    #[test]
    fn multi_character_left_side() {
        let g = Grammar::parse("Expr -> a").unwrap();
        assert_eq!(g.start().to_string(), "[Expr]");
    }

    #[test]
    fn errors_carry_line_numbers() {
        assert_eq!(Grammar::parse("S -> a -> b"), Err(GrammarError::TooManyArrows(1)));
        assert_eq!(Grammar::parse("S -> a\n-> b"), Err(GrammarError::EmptyLeftSide(2)));
        assert_eq!(
            Grammar::parse("| a b\n S -> a"),
            Err(GrammarError::NoPreviousLeftSide(1))
        );
        assert_eq!(Grammar::parse("S a"), Err(GrammarError::MissingArrow(1)));
        assert_eq!(Grammar::parse("S -> a||b"), Err(GrammarError::EmptyAlternative(1)));
        assert_eq!(
            Grammar::parse("s -> a"),
            Err(GrammarError::InvalidNonTerminal("s".to_string()).at_line(1))
        );
        assert_eq!(Grammar::parse("  \n  "), Err(GrammarError::NoProductions));
    }
}
