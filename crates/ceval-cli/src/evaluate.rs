//! # Evaluate Subcommand
//!
//! `ceval evaluate --age 42 --history false --chronic false --lifestyle true`
//!
//! Runs one attempt end to end against an in-process evaluator and prints
//! the recovered category. A flag left off stays unset and the form is
//! rejected locally, as is an age that is not a whole number in
//! `1..=150`.
//!
//! Exit codes: `0` complete, `2` rejected locally, `1` attempt failed.
//! A failed attempt also reports its failure code and whether running the
//! same command again can succeed unchanged.

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use ceval_core::{ApplicantForm, Category, RiskFlag};
use ceval_state::FailureKind;
use ceval_workflow::WorkflowError;

use crate::config::CliConfig;
use crate::session::{requester_key, LocalSession};

/// Arguments for `ceval evaluate`.
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Age in whole years.
    #[arg(long)]
    pub age: String,

    /// Prior claims or medical history.
    #[arg(long)]
    pub history: Option<bool>,

    /// Chronic condition.
    #[arg(long)]
    pub chronic: Option<bool>,

    /// Lifestyle risk.
    #[arg(long)]
    pub lifestyle: Option<bool>,

    /// Wall-clock limit in milliseconds (overrides the config file).
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// After completing, replay the stored result as well.
    #[arg(long)]
    pub replay: bool,

    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct EvaluateOutput {
    identity: String,
    category: Option<u8>,
    label: Option<&'static str>,
    replayed: Option<&'static str>,
    error: Option<String>,
    failure: Option<&'static str>,
    resubmittable: Option<bool>,
}

/// Next step shown after a failed attempt.
fn retry_hint(kind: FailureKind) -> &'static str {
    if kind.is_resubmittable() {
        "transient failure; run the same command again to retry"
    } else {
        match kind {
            FailureKind::UserRejected => "the signature was declined; approve it to continue",
            _ => "resubmitting unchanged will fail the same way",
        }
    }
}

impl EvaluateArgs {
    /// The form as entered. Unset flags stay unset.
    pub fn form(&self) -> Result<ApplicantForm, ceval_core::ValidationError> {
        let flag = |v: Option<bool>| v.map(RiskFlag::from).unwrap_or_default();
        Ok(ApplicantForm {
            age: Some(ApplicantForm::parse_age(&self.age)?),
            has_history: flag(self.history),
            has_chronic: flag(self.chronic),
            lifestyle_risk: flag(self.lifestyle),
        })
    }
}

/// Run `ceval evaluate`.
pub async fn run_evaluate(args: &EvaluateArgs, config: &CliConfig) -> Result<u8> {
    let mut session = LocalSession::new(config)?;
    if let Some(ms) = args.timeout_ms {
        session.set_timeout(Some(Duration::from_millis(ms)));
    }
    let workflow = session.workflow(requester_key()?);
    let identity = workflow.identity();

    let outcome = match args.form() {
        Ok(form) => session.submit(&workflow, &form).await,
        Err(e) => Err(WorkflowError::Validation(e)),
    };

    let replayed = match (&outcome, args.replay) {
        (Ok(_), true) => Some(workflow.load_last_result().await),
        _ => None,
    };

    let failure = outcome.as_ref().err().and_then(WorkflowError::failure_kind);
    let (code, category, error) = match outcome {
        Ok(c) => (0, Some(c), None),
        Err(e @ WorkflowError::Validation(_)) => (2, None, Some(e.to_string())),
        Err(e) => (1, None, Some(e.to_string())),
    };
    if let Some(kind) = failure {
        tracing::warn!(
            failure = kind.code(),
            resubmittable = kind.is_resubmittable(),
            "attempt failed"
        );
    }
    let replayed_label = match &replayed {
        Some(Ok(c)) => Some(c.label()),
        _ => None,
    };
    if let Some(Err(e)) = &replayed {
        tracing::error!(error = %e, "replay failed");
    }

    if args.json {
        let out = EvaluateOutput {
            identity: identity.to_hex(),
            category: category.map(|c| c.value()),
            label: category.map(|c| c.label()),
            replayed: replayed_label,
            error,
            failure: failure.map(|k| k.code()),
            resubmittable: failure.map(|k| k.is_resubmittable()),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_text(&identity.to_string(), category, replayed_label, error.as_deref());
        if let Some(kind) = failure {
            println!("hint:      {}", retry_hint(kind));
        }
    }
    Ok(code)
}

fn print_text(
    identity: &str,
    category: Option<Category>,
    replayed: Option<&str>,
    error: Option<&str>,
) {
    println!("requester: {identity}");
    match (category, error) {
        (Some(c), _) => println!("result:    {} ({})", c.label(), c.value()),
        (None, Some(e)) => println!("error:     {e}"),
        (None, None) => {}
    }
    if let Some(label) = replayed {
        println!("replayed:  {label}");
    }
}
