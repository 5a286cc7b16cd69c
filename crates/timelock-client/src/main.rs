//! Timelock CLI - create, finish and cancel time-locked escrows
//!
//! # Quick Start
//!
//! ```bash
//! # Start the server against the in-process ledger
//! cargo run -p timelock-server -- --network local-sim
//!
//! # Then drive it
//! timelock create --amount 10 --refund-window 120
//! timelock finish --sequence 4
//! timelock demo
//! ```
//!
//! When the server cannot be reached, escrow commands print a simulated
//! receipt instead of failing. Pass `--no-fallback` to disable this.

use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::*;
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

use timelock_client::{
    display, ClientResult, EscrowOutcome, ResilientApiClient, TransactionLog, DEFAULT_SERVER_URL,
};
use timelock_types::{EscrowAction, DEFAULT_GRACE_PERIOD_SECS};

/// Timelock CLI - Time-locked XRP escrows
#[derive(Parser)]
#[command(name = "timelock")]
#[command(version)]
#[command(about = "Create, release and refund time-locked escrows", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Escrow service URL
    #[arg(long, global = true, env = "TIMELOCK_SERVER", default_value = DEFAULT_SERVER_URL)]
    server: String,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value_t = 90)]
    timeout: u64,

    /// Report an unreachable server as an error instead of simulating
    #[arg(long, global = true)]
    no_fallback: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lock XRP from the buyer for the seller
    Create {
        /// Amount in XRP
        #[arg(long, allow_hyphen_values = true)]
        amount: Decimal,

        /// Invoice identifier; its digits become the destination tag
        #[arg(long)]
        invoice_id: Option<String>,

        /// Seconds until the buyer may reclaim the funds
        #[arg(long, default_value_t = 120, allow_hyphen_values = true)]
        refund_window: i64,
    },

    /// Release an escrow to the seller
    Finish {
        /// Sequence returned by create
        #[arg(long, allow_hyphen_values = true)]
        sequence: i64,
    },

    /// Refund an escrow to the buyer
    Cancel {
        /// Sequence returned by create
        #[arg(long, allow_hyphen_values = true)]
        sequence: i64,
    },

    /// Check server and ledger status
    Health,

    /// Run a full escrow lifecycle and print the transaction log
    Demo {
        /// Amount in XRP
        #[arg(long, default_value = "10")]
        amount: Decimal,

        /// Seconds until the buyer may reclaim the funds
        #[arg(long, default_value_t = 30)]
        refund_window: i64,

        /// Refund the buyer instead of paying the seller
        #[arg(long)]
        refund: bool,

        /// Grace period the server enforces before finish; match its `--grace-period`
        #[arg(long, default_value_t = DEFAULT_GRACE_PERIOD_SECS)]
        grace_period: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut client = ResilientApiClient::with_timeout(&cli.server, Duration::from_secs(cli.timeout))
        .context("Failed to build HTTP client")?;
    if cli.no_fallback {
        client = client.without_fallback();
    }

    match cli.command {
        Commands::Create {
            amount,
            invoice_id,
            refund_window,
        } => {
            let invoice_id =
                invoice_id.unwrap_or_else(|| format!("INV-{}", Utc::now().timestamp_millis()));
            display::section("Create Escrow");
            display::info(&format!(
                "Locking {} XRP for invoice {} (refundable after {}s)",
                amount, invoice_id, refund_window
            ));
            let result = client.create_escrow(amount, &invoice_id, refund_window).await;
            report(EscrowAction::Create, &result);
            result.context("create failed")?;
        }

        Commands::Finish { sequence } => {
            display::section("Finish Escrow");
            let result = client.finish_escrow(sequence).await;
            report(EscrowAction::Finish, &result);
            result.context("finish failed")?;
        }

        Commands::Cancel { sequence } => {
            display::section("Cancel Escrow");
            let result = client.cancel_escrow(sequence).await;
            report(EscrowAction::Cancel, &result);
            result.context("cancel failed")?;
        }

        Commands::Health => {
            display::section("Server Health");
            display::info(&format!("Server: {}", client.base_url()));
            match client.health().await {
                Ok(health) => display::health(&health),
                Err(e) => {
                    display::error(&e.display_message());
                    anyhow::bail!("health check failed");
                }
            }
        }

        Commands::Demo {
            amount,
            refund_window,
            refund,
            grace_period,
        } => {
            run_demo(&client, amount, refund_window, refund, grace_period).await?;
        }
    }

    Ok(())
}

/// Print the result of one escrow call.
fn report(action: EscrowAction, result: &ClientResult<EscrowOutcome>) {
    match result {
        Ok(outcome) if outcome.is_simulated() => {
            display::simulated(action);
            display::outcome(outcome);
        }
        Ok(outcome) => {
            display::success(&format!("Escrow {}", display::past_tense(action)));
            display::outcome(outcome);
        }
        Err(e) => display::error(&e.display_message()),
    }
}

async fn run_demo(
    client: &ResilientApiClient,
    amount: Decimal,
    refund_window: i64,
    refund: bool,
    grace_period: i64,
) -> anyhow::Result<()> {
    let mut log = TransactionLog::new();

    println!();
    println!("{}", "Timelock escrow demo".bright_white().bold());
    println!("  Server: {}", client.base_url().bright_cyan());

    display::section("1. Create");
    let invoice_id = format!("INV-{}", Utc::now().timestamp_millis());
    let created = client.create_escrow(amount, &invoice_id, refund_window).await;
    let sequence = created
        .as_ref()
        .ok()
        .and_then(|outcome| outcome.escrow_sequence())
        .map(|s| s.value() as i64);
    let simulated = created.as_ref().map(|o| o.is_simulated()).unwrap_or(false);
    log.record(EscrowAction::Create, &created);
    report(EscrowAction::Create, &created);
    if let Err(e) = created {
        display::section("Transaction Log");
        display::log(&log);
        return Err(anyhow::Error::new(e).context("create failed"));
    }

    let sequence = sequence.context("create returned no escrow sequence")?;

    let (action, wait_secs) = if refund {
        (EscrowAction::Cancel, refund_window + 1)
    } else {
        (EscrowAction::Finish, grace_period + 1)
    };

    display::section(&format!("2. {}", if refund { "Cancel" } else { "Finish" }));
    if simulated {
        display::info("Simulated escrow, nothing to wait for");
    } else {
        display::info(&format!("Waiting {}s for the time lock", wait_secs));
        tokio::time::sleep(Duration::from_secs(wait_secs.max(0) as u64)).await;
    }

    let resolved = match action {
        EscrowAction::Cancel => client.cancel_escrow(sequence).await,
        _ => client.finish_escrow(sequence).await,
    };
    log.record(action, &resolved);
    report(action, &resolved);

    display::section("Transaction Log");
    display::log(&log);
    resolved
        .map(|_| ())
        .map_err(|e| anyhow::Error::new(e).context(format!("{} failed", action)))
}
