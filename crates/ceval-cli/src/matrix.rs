//! # Matrix Subcommand
//!
//! Runs the acceptance matrix end to end: representative ages on both
//! sides of both band edges, crossed with all eight risk-flag triples.
//! Every row is a separate requester identity against one shared
//! evaluator. The expected column comes from a plaintext reference of the
//! rule, used here only to check the encrypted result.
//!
//! Exit code `0` when every row matches, `1` otherwise.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use ceval_core::{ApplicantForm, Category};
use ceval_crypto::LocalKeyProvider;
use ceval_evaluator::{AGE_BAND_MAX, AGE_BAND_MIN};

use crate::config::CliConfig;
use crate::session::LocalSession;

/// Ages exercised by default: both edges of the band, one step outside
/// each, and a midpoint.
pub const DEFAULT_AGES: [u8; 5] = [17, 18, 40, 64, 65];

/// Arguments for `ceval matrix`.
#[derive(Args, Debug)]
pub struct MatrixArgs {
    /// Ages to test (default: 17 18 40 64 65).
    #[arg(long, num_args = 1.., value_parser = clap::value_parser!(u8).range(1..=150))]
    pub ages: Vec<u8>,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// One matrix row.
#[derive(Debug, Clone, Serialize)]
pub struct MatrixRow {
    /// Age.
    pub age: u8,
    /// `[history, chronic, lifestyle]`.
    pub flags: [bool; 3],
    /// Plaintext reference.
    pub expected: Category,
    /// Encrypted pipeline result, or the error.
    pub got: Result<Category, String>,
}

impl MatrixRow {
    /// Whether the pipeline agreed with the reference.
    pub fn passed(&self) -> bool {
        matches!(&self.got, Ok(c) if *c == self.expected)
    }
}

/// Plaintext reference of the eligibility rule.
pub fn expected_category(age: u8, flags: [bool; 3]) -> Category {
    let in_band = (AGE_BAND_MIN..=AGE_BAND_MAX).contains(&age);
    let any_risk = flags.iter().any(|f| *f);
    match (in_band, any_risk) {
        (true, false) => Category::Eligible,
        (true, true) => Category::Moderate,
        (false, _) => Category::NotEligible,
    }
}

/// All eight flag triples, `FFF` first.
pub fn flag_triples() -> impl Iterator<Item = [bool; 3]> {
    (0u8..8).map(|bits| [bits & 4 != 0, bits & 2 != 0, bits & 1 != 0])
}

/// Run every row against `session`.
pub async fn run_rows(session: &LocalSession, ages: &[u8]) -> Vec<MatrixRow> {
    let mut rows = Vec::with_capacity(ages.len() * 8);
    for &age in ages {
        for flags in flag_triples() {
            let workflow = session.workflow(Arc::new(LocalKeyProvider::generate()));
            let form = ApplicantForm::new(i64::from(age), flags[0], flags[1], flags[2]);
            let got = session
                .submit(&workflow, &form)
                .await
                .map_err(|e| e.to_string());
            rows.push(MatrixRow {
                age,
                flags,
                expected: expected_category(age, flags),
                got,
            });
        }
    }
    rows
}

/// Run `ceval matrix`.
pub async fn run_matrix(args: &MatrixArgs, config: &CliConfig) -> Result<u8> {
    let session = LocalSession::new(config)?;
    let ages: &[u8] = if args.ages.is_empty() {
        &DEFAULT_AGES
    } else {
        &args.ages
    };
    let rows = run_rows(&session, ages).await;
    let failures = rows.iter().filter(|r| !r.passed()).count();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        println!("age  hist chron life  expected      got");
        for r in &rows {
            let got = match &r.got {
                Ok(c) => c.label().to_string(),
                Err(e) => format!("ERROR {e}"),
            };
            println!(
                "{:>3}  {:<4} {:<5} {:<4}  {:<12}  {}{}",
                r.age,
                yes_no(r.flags[0]),
                yes_no(r.flags[1]),
                yes_no(r.flags[2]),
                r.expected.label(),
                got,
                if r.passed() { "" } else { "  <-- MISMATCH" },
            );
        }
        println!("{} rows, {} mismatches", rows.len(), failures);
    }
    tracing::info!(rows = rows.len(), failures, "matrix finished");
    Ok(if failures == 0 { 0 } else { 1 })
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "yes"
    } else {
        "no"
    }
}
