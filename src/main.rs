//! Carbon Ledger CLI
//!
//! Replays a CSV stream of ledger calls against a fresh ledger and prints a
//! report of the final state.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- calls.csv > products.csv
//! cargo run -- calls.csv consumers > consumers.csv
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug` or `warn` to control logging verbosity
//! - `CARBON_LEDGER_OWNER`: owner identity (default `owner`)
//! - `CARBON_LEDGER_OFFSET_RATE`: initial offset rate (default `1000000`)

use carbon_ledger::{CarbonLedger, InMemorySettlement, LedgerConfig, LedgerError, Result};
use std::env;
use std::fs::File;
use std::io::{self, BufReader};
use std::process;

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        return Err(LedgerError::MissingArgument);
    }
    let report = args.get(2).map(String::as_str).unwrap_or("products");
    if report != "products" && report != "consumers" {
        return Err(LedgerError::Config(format!(
            "unknown report '{}', expected products or consumers",
            report
        )));
    }

    let config = LedgerConfig::from_env()?;
    let input_path = &args[1];
    let file = File::open(input_path)?;
    let reader = BufReader::new(file);

    let mut ledger =
        CarbonLedger::with_offset_rate(config.owner, config.offset_rate, InMemorySettlement::new());
    ledger.process_csv(reader)?;

    let stdout = io::stdout();
    let handle = stdout.lock();
    if report == "consumers" {
        ledger.write_consumers(handle)?;
    } else {
        ledger.write_products(handle)?;
    }

    Ok(())
}
