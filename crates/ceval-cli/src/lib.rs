//! # ceval-cli — Confidential Eligibility Evaluation CLI
//!
//! ## Subcommands
//!
//! - `evaluate`: one encrypted evaluation end to end, printing the
//!   recovered category.
//! - `matrix`: the acceptance matrix (ages × all flag triples) with a
//!   pass/fail table.
//! - `keygen`: a fresh requester seed and its identity.
//!
//! ## Crate Policy
//!
//! - Argument parsing lives in the subcommand modules; business logic lives
//!   in the domain crates.
//! - Handlers return an exit code; errors bubble up as `anyhow::Error`.
//! - The wall-clock limit is applied here, never in the workflow crate.

pub mod config;
pub mod evaluate;
pub mod keygen;
pub mod matrix;
pub mod session;
