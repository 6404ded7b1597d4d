use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::{fs, io};

use clap::{Parser, ValueEnum};
use thiserror::Error;

use llk_course_helper::{
    Grammar, GrammarError, ParseError, RecognizerConfig, ReplayError, Strategy, TableError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Output {
    /// Productions
    Prod,
    /// Productions after removing epsilon rules
    Eps,
    /// Nullable, FIRSTk and FOLLOWk sets
    Lookahead,
    /// Strong LL(k) parsing table
    Table,
    /// Derivation of --input
    Parse,
}

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// What to print, in order
    #[arg(value_enum, required = true)]
    outputs: Vec<Output>,

    /// File containing the grammar (default: stdin)
    #[arg(short, long)]
    grammar: Option<PathBuf>,

    /// Lookahead length
    #[arg(short, default_value_t = 1)]
    k: usize,

    /// String to recognize
    #[arg(short, long)]
    input: Option<String>,

    /// Recognizer: table, top-down or bottom-up
    #[arg(short, long, default_value_t = Strategy::TableDriven)]
    strategy: Strategy,

    /// Give up a backtracking search after this many steps
    #[arg(long, value_name = "STEPS")]
    steps: Option<usize>,

    /// Print in LaTeX format
    #[arg(short, conflicts_with = "json")]
    latex: bool,

    /// Print in JSON format
    #[arg(short)]
    json: bool,
}

#[derive(Debug, Error)]
enum Error {
    #[error("cannot read grammar: {0}")]
    InputFile(#[from] io::Error),
    #[error(transparent)]
    Grammar(#[from] GrammarError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("input rejected: {0}")]
    Rejected(#[from] ParseError),
    #[error(transparent)]
    Replay(#[from] ReplayError),
    #[error("the parse output needs --input")]
    MissingInput,
}

enum OutputFormat {
    Plain,
    LaTeX,
    JSON,
}

macro_rules! render {
    ($format:expr, $t:expr) => {
        match $format {
            OutputFormat::Plain => $t.to_plaintext(),
            OutputFormat::LaTeX => $t.to_latex(),
            OutputFormat::JSON => $t.to_json(),
        }
    };
}

fn read_grammar(path: Option<&PathBuf>) -> Result<String, io::Error> {
    match path {
        Some(path) => fs::read_to_string(path),
        None => {
            let mut text = String::new();
            io::stdin().lock().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

fn run(cli: &Cli) -> Result<(), Error> {
    let format = if cli.latex {
        OutputFormat::LaTeX
    } else if cli.json {
        OutputFormat::JSON
    } else {
        OutputFormat::Plain
    };
    let g = Grammar::parse(&read_grammar(cli.grammar.as_ref())?)?;

    for output in &cli.outputs {
        let text = match output {
            Output::Prod => render!(format, g.to_production_output_vec()),
            Output::Eps => render!(format, g.remove_eps_rules().to_production_output_vec()),
            Output::Lookahead => render!(format, g.to_lookahead_output_vec(cli.k)),
            Output::Table => render!(format, g.llk_table(cli.k)?.to_output()),
            Output::Parse => {
                let input = cli.input.as_deref().ok_or(Error::MissingInput)?;
                let config = RecognizerConfig {
                    k: cli.k,
                    step_limit: cli.steps,
                };
                let derivation = cli.strategy.build(&g, &config)?.parse(input)?;
                render!(format, derivation.to_output(g.start())?)
            }
        };
        println!("{}", text);
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
