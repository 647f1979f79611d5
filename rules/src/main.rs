//! `rules` CLI: query a rule model from the command line.
//!
//! Models are XML documents or rule files with one
//! `qualifier => key = value ; priority` rule per line. Results print as JSON
//! on stdout; the exit code tells a matched value apart from no match and
//! from a cyclic rule reference.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rules::check::check_model_files;
use rules::exit_codes;
use rules::query::{
    QueryOutcome, QuerySource, build_context, candidate_lines, load_source_model, parse_override,
    query,
};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "rules", version, about = "Priority-ranked rule inference")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the value of KEY (a key or keypath) as JSON.
    Query {
        key: String,
        #[command(flatten)]
        source: SourceArgs,
        /// Store a value before querying; values use the rule value syntax.
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
        /// Print the values of all matching rules, best-ranked first.
        #[arg(long)]
        all: bool,
    },
    /// Print the candidate rules for KEY in rank order.
    Candidates {
        key: String,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Load model files strictly and print their rule counts.
    Check {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

#[derive(Args, Debug, Default)]
struct SourceArgs {
    /// Model file (`.xml` or rule file). Repeatable, loaded in order.
    #[arg(short, long = "model", value_name = "PATH")]
    models: Vec<PathBuf>,
    /// TOML config naming models and stored values.
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,
}

impl SourceArgs {
    fn into_source(self, overrides: Vec<(String, Value)>) -> QuerySource {
        QuerySource {
            config_path: self.config,
            models: self.models,
            overrides,
        }
    }
}

fn main() {
    rules::logging::init();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Help and version go to stdout and are not failures.
            let code = if err.use_stderr() {
                exit_codes::INVALID
            } else {
                exit_codes::OK
            };
            let _ = err.print();
            std::process::exit(code);
        }
    };
    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Query {
            key,
            source,
            set,
            all,
        } => cmd_query(&key, source, &set, all),
        Command::Candidates { key, source } => cmd_candidates(&key, source),
        Command::Check { paths } => cmd_check(&paths),
    }
}

fn cmd_query(key: &str, source: SourceArgs, set: &[String], all: bool) -> Result<i32> {
    let overrides = set
        .iter()
        .map(|text| parse_override(text))
        .collect::<Result<Vec<_>>>()?;
    let context = build_context(&source.into_source(overrides))?;
    match query(&context, key, all)? {
        QueryOutcome::Value(value) => {
            print_json(&value)?;
            Ok(exit_codes::OK)
        }
        QueryOutcome::Values(values) => {
            print_json(&Value::Array(values))?;
            Ok(exit_codes::OK)
        }
        QueryOutcome::NoValue => {
            eprintln!("no value for '{}'", key);
            Ok(exit_codes::NO_VALUE)
        }
        QueryOutcome::Cycle(chain) => {
            eprintln!("cyclic rule reference: {}", chain.join(" -> "));
            Ok(exit_codes::CYCLE)
        }
    }
}

fn cmd_candidates(key: &str, source: SourceArgs) -> Result<i32> {
    let model = load_source_model(&source.into_source(Vec::new()))?;
    let lines = candidate_lines(&model, key);
    if lines.is_empty() {
        eprintln!("no candidate rules for '{}'", key);
        return Ok(exit_codes::NO_VALUE);
    }
    for line in lines {
        println!("{}", line);
    }
    Ok(exit_codes::OK)
}

fn cmd_check(paths: &[PathBuf]) -> Result<i32> {
    for report in check_model_files(paths)? {
        println!("{}: {} rules", report.path.display(), report.rules);
    }
    Ok(exit_codes::OK)
}

fn print_json(value: &Value) -> Result<()> {
    let payload = serde_json::to_string(value).context("serialize value")?;
    println!("{}", payload);
    Ok(())
}
