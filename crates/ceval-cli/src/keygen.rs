//! # Keygen Subcommand
//!
//! Prints a fresh Ed25519 seed and the identity it derives. Export the
//! seed as `CEVAL_SIGNING_KEY` to keep the same requester identity across
//! runs, or put it in the config file as `evaluator_seed_hex`.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use ceval_crypto::{Ed25519KeyPair, SIGNING_KEY_ENV};

/// Arguments for `ceval keygen`.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Print JSON instead of shell `export` lines.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct KeygenOutput {
    seed_hex: String,
    identity: String,
}

/// Run `ceval keygen`.
pub fn run_keygen(args: &KeygenArgs) -> Result<u8> {
    let kp = Ed25519KeyPair::generate();
    let out = KeygenOutput {
        seed_hex: kp.seed_hex(),
        identity: kp.identity().to_hex(),
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("export {SIGNING_KEY_ENV}={}", out.seed_hex);
        println!("# identity {}", out.identity);
    }
    Ok(0)
}
