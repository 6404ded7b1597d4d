use std::fmt::Display;

use crowbook_text_processing::escape;
use serde::Serialize;

use super::derivation::{Derivation, ReplayError};
use super::grammar::{join_symbols, NonTerminal, Terminal};
use super::lookahead::{first_k, follow_k_with, LookaheadState};
use super::Grammar;

const EPSILON_DISPLAY: &str = "[eps]";

pub fn error_json(e: &impl Display) -> String {
    serde_json::json!({ "error": e.to_string() }).to_string()
}

fn tex(s: &str) -> String {
    escape::tex(s).replace(&*escape::tex(EPSILON_DISPLAY), "\\epsilon ")
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductionOutput {
    pub left: String,
    pub rights: Vec<String>,
}

impl ProductionOutput {
    pub fn to_plaintext(&self, left_width: usize, multiline: bool) -> String {
        self.rights
            .iter()
            .enumerate()
            .map(|(i, right)| {
                if i == 0 {
                    format!("{:>width$} -> {}", self.left, right, width = left_width)
                } else if multiline {
                    format!("{:>width$}  | {}", "", right, width = left_width)
                } else {
                    format!(" | {}", right)
                }
            })
            .collect::<Vec<_>>()
            .join(if multiline { "\n" } else { "" })
    }

    pub fn to_latex(&self, and_sign: bool) -> String {
        if self.rights.is_empty() {
            return String::new();
        }

        let left = if and_sign {
            format!("{} & \\rightarrow &", tex(&self.left))
        } else {
            format!("{} \\rightarrow ", tex(&self.left))
        };
        let right = self
            .rights
            .iter()
            .map(|right| tex(right))
            .collect::<Vec<_>>()
            .join(" \\mid ");

        left + &right
    }
}

#[derive(Serialize)]
pub struct ProductionOutputVec {
    productions: Vec<ProductionOutput>,
}

impl ProductionOutputVec {
    pub fn to_plaintext(&self) -> String {
        let left_max_len = self
            .productions
            .iter()
            .map(|p| p.left.len())
            .max()
            .unwrap_or(0);
        self.productions
            .iter()
            .map(|s| s.to_plaintext(left_max_len, true))
            .collect::<Vec<String>>()
            .join("\n")
    }

    pub fn to_latex(&self) -> String {
        std::iter::once("\\[\\begin{array}{cll}".to_string())
            .chain(self.productions.iter().map(|s| s.to_latex(true)))
            .chain(std::iter::once("\\end{array}\\]".to_string()))
            .collect::<Vec<String>>()
            .join("\\\\\n")
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| error_json(&e))
    }
}

impl Grammar {
    /// Nonterminals in order, start symbol first.
    fn display_order(&self) -> Vec<&NonTerminal> {
        std::iter::once(self.start())
            .chain(self.nonterminals().iter().filter(|nt| *nt != self.start()))
            .collect()
    }

    pub fn to_production_output_vec(&self) -> ProductionOutputVec {
        let productions = self
            .display_order()
            .into_iter()
            .map(|nt| ProductionOutput {
                left: nt.to_string(),
                rights: self
                    .rules_of(nt)
                    .map(|rule| join_symbols(rule.rhs()))
                    .collect(),
            })
            .filter(|p| !p.rights.is_empty())
            .collect();
        ProductionOutputVec { productions }
    }
}

#[derive(Serialize)]
struct LookaheadOutput {
    name: String,
    nullable: bool,
    first: Option<Vec<String>>,
    follow: Option<Vec<String>>,
}

impl LookaheadOutput {
    fn to_plaintext(&self) -> String {
        fn f(a: &Option<Vec<String>>) -> String {
            match a {
                Some(tuples) => tuples.join(", "),
                None => "-".to_string(),
            }
        }

        format!(
            "{} | {} | {} | {}",
            self.name,
            self.nullable,
            f(&self.first),
            f(&self.follow)
        )
    }

    fn to_latex(&self) -> String {
        fn f(a: &Option<Vec<String>>) -> String {
            match a {
                Some(tuples) => tuples
                    .iter()
                    .map(|s| tex(s))
                    .collect::<Vec<_>>()
                    .join(r",\ "),
                None => r"$\emptyset$".to_string(),
            }
        }

        format!(
            "{} & {} & {} & {}",
            tex(&self.name),
            self.nullable,
            f(&self.first),
            f(&self.follow)
        )
    }
}

#[derive(Serialize)]
pub struct LookaheadOutputVec {
    k: usize,
    data: Vec<LookaheadOutput>,
}

impl LookaheadOutputVec {
    pub fn to_plaintext(&self) -> String {
        self.data
            .iter()
            .map(|s| s.to_plaintext())
            .collect::<Vec<String>>()
            .join("\n")
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| error_json(&e))
    }

    pub fn to_latex(&self) -> String {
        let content = self
            .data
            .iter()
            .map(|e| e.to_latex())
            .collect::<Vec<_>>()
            .join("\\\\\n ");

        "\\begin{tabular}{c|c|c|c}\n".to_string()
            + &format!(
                "Symbol & Nullable & First$_{k}$ & Follow$_{k}$\\\\\\hline\n",
                k = self.k
            )
            + &content
            + "\\\\\n\\end{tabular}"
    }
}

impl Grammar {
    pub fn to_lookahead_output_vec(&self, k: usize) -> LookaheadOutputVec {
        fn strings(state: Option<&LookaheadState>) -> Option<Vec<String>> {
            state
                .and_then(LookaheadState::known)
                .map(|set| set.iter().map(|tuple| join_symbols(tuple)).collect())
        }

        let first = first_k(self, k);
        let follow = follow_k_with(self, &first, k);
        let nullable = self.nullable_set();
        let data = self
            .display_order()
            .into_iter()
            .map(|nt| LookaheadOutput {
                name: nt.to_string(),
                nullable: nullable.contains(nt),
                first: strings(first.get(nt)),
                follow: strings(follow.get(nt)),
            })
            .collect();
        LookaheadOutputVec { k, data }
    }
}

#[derive(Serialize)]
struct DerivationStepOutput {
    rule: Option<String>,
    form: String,
}

#[derive(Serialize)]
pub struct DerivationOutput {
    accepted: bool,
    derived: String,
    steps: Vec<DerivationStepOutput>,
}

impl DerivationOutput {
    pub fn to_plaintext(&self) -> String {
        self.steps
            .iter()
            .map(|step| match &step.rule {
                Some(rule) => format!("=> {:<width$}  ({})", step.form, rule, width = self.width()),
                None => format!("   {}", step.form),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn to_latex(&self) -> String {
        let forms = self
            .steps
            .iter()
            .map(|step| tex(&step.form))
            .collect::<Vec<_>>()
            .join(" \\Rightarrow ");
        format!("\\[{}\\]", forms)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| error_json(&e))
    }

    fn width(&self) -> usize {
        self.steps.iter().map(|s| s.form.len()).max().unwrap_or(0)
    }
}

impl Derivation {
    pub fn to_output(&self, start: &NonTerminal) -> Result<DerivationOutput, ReplayError> {
        let forms = self.sentential_forms(start)?;
        let derived: Vec<Terminal> = self.replay(start)?;
        let steps = forms
            .iter()
            .enumerate()
            .map(|(i, form)| DerivationStepOutput {
                rule: i.checked_sub(1).map(|r| self.rules[r].to_string()),
                form: join_symbols(form),
            })
            .collect();
        Ok(DerivationOutput {
            accepted: true,
            derived: join_symbols(&derived),
            steps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Rule;
    use pretty_assertions::assert_eq;

    #[test]
    fn productions_plaintext() {
        let g = Grammar::parse("S -> aA\nA -> +A | eps").unwrap();
        assert_eq!(
            g.to_production_output_vec().to_plaintext(),
            "S -> aA\nA -> +A\n   | [eps]"
        );
    }

    #[test]
    fn lookahead_plaintext() {
        let g = Grammar::parse("S -> aA\nA -> +A | eps\nX -> X").unwrap();
        assert_eq!(
            g.to_lookahead_output_vec(1).to_plaintext(),
            "S | false | a | [eps]\nA | true | +, [eps] | [eps]\nX | false | - | -"
        );
    }

    #[test]
    fn derivation_output_lists_forms() {
        let g = Grammar::parse("S -> aA\nA -> b").unwrap();
        let rules: Vec<Rule> = g.rules().iter().rev().cloned().collect();
        let output = Derivation::leftmost(rules).to_output(g.start()).unwrap();
        assert_eq!(output.derived, "ab");
        assert_eq!(output.to_plaintext(), "   S\n=> aA  (S -> aA)\n=> ab  (A -> b)");
        assert!(output.to_json().contains("\"derived\":\"ab\""));
    }

    #[test]
    fn errors_as_json() {
        assert_eq!(error_json(&"bad \"input\""), r#"{"error":"bad \"input\""}"#);
    }
}
