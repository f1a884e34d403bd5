//! # ceval CLI entry point
//!
//! Parses arguments, sets up logging, loads configuration, and dispatches
//! to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ceval_cli::config::CliConfig;
use ceval_cli::evaluate::{run_evaluate, EvaluateArgs};
use ceval_cli::keygen::{run_keygen, KeygenArgs};
use ceval_cli::matrix::{run_matrix, MatrixArgs};

/// Confidential eligibility evaluation.
///
/// Encrypts an applicant's answers, has an evaluator classify them over
/// ciphertext, and decrypts the category under the requester's own
/// authorization.
#[derive(Parser, Debug)]
#[command(name = "ceval", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    /// Path to a YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one encrypted evaluation end to end.
    Evaluate(EvaluateArgs),

    /// Run the acceptance matrix and report mismatches.
    Matrix(MatrixArgs),

    /// Generate a requester signing seed.
    Keygen(KeygenArgs),
}

fn init_tracing(verbose: u8, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);
    tracing::debug!("ceval CLI starting");

    let result = match CliConfig::load(cli.config.as_deref()) {
        Err(e) => Err(e),
        Ok(config) => match cli.command {
            Commands::Evaluate(args) => run_evaluate(&args, &config).await,
            Commands::Matrix(args) => run_matrix(&args, &config).await,
            Commands::Keygen(args) => run_keygen(&args),
        },
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_evaluate() {
        let cli = Cli::try_parse_from([
            "ceval",
            "evaluate",
            "--age",
            "42",
            "--history",
            "false",
            "--chronic",
            "true",
            "--lifestyle",
            "false",
        ])
        .unwrap();
        match cli.command {
            Commands::Evaluate(args) => {
                assert_eq!(args.age, "42");
                assert_eq!(args.history, Some(false));
                assert_eq!(args.chronic, Some(true));
                assert_eq!(args.lifestyle, Some(false));
                assert!(!args.json);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn evaluate_flags_are_optional() {
        let cli = Cli::try_parse_from(["ceval", "evaluate", "--age", "42"]).unwrap();
        if let Commands::Evaluate(args) = cli.command {
            assert!(args.history.is_none());
        }
    }

    #[test]
    fn global_flags() {
        let cli = Cli::try_parse_from([
            "ceval", "-vv", "--log-json", "--config", "c.yaml", "keygen", "--json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.log_json);
        assert_eq!(cli.config, Some(PathBuf::from("c.yaml")));
        assert!(matches!(cli.command, Commands::Keygen(KeygenArgs { json: true })));
    }

    #[test]
    fn matrix_ages_are_range_checked() {
        let cli = Cli::try_parse_from(["ceval", "matrix", "--ages", "17", "18"]).unwrap();
        if let Commands::Matrix(args) = cli.command {
            assert_eq!(args.ages, vec![17, 18]);
        }
        assert!(Cli::try_parse_from(["ceval", "matrix", "--ages", "0"]).is_err());
        assert!(Cli::try_parse_from(["ceval", "matrix", "--ages", "151"]).is_err());
    }

    #[test]
    fn subcommand_required() {
        assert!(Cli::try_parse_from(["ceval"]).is_err());
    }
}
