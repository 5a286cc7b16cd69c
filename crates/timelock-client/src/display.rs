//! Terminal output for the CLI

use std::fmt::Display;

use colored::*;

use timelock_types::{EscrowAction, HealthResponse};

use crate::{EscrowOutcome, TransactionLog};

const RULE_WIDTH: usize = 56;

fn line(marker: ColoredString, message: impl Display) {
    println!("  {:>4} {}", marker, message);
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{} {}", "▸".bright_cyan(), title.to_uppercase().bold());
    println!("{}", "─".repeat(RULE_WIDTH).bright_black());
}

pub fn success(message: &str) {
    line("ok".bright_green().bold(), message);
}

pub fn error(message: &str) {
    line("fail".bright_red().bold(), message.bright_red());
}

pub fn info(message: &str) {
    line("··".bright_blue(), message);
}

pub fn warning(message: &str) {
    line("warn".yellow().bold(), message.yellow());
}

/// Headline for a result synthesized while the service was offline
pub fn simulated(action: EscrowAction) {
    line(
        "sim".black().on_yellow(),
        format!("Escrow {} locally, nothing reached the ledger", past_tense(action)).yellow(),
    );
}

pub fn past_tense(action: EscrowAction) -> &'static str {
    match action {
        EscrowAction::Create => "created",
        EscrowAction::Finish => "finished",
        EscrowAction::Cancel => "cancelled",
    }
}

/// Print an indented `key  value` line
pub fn kv(key: &str, value: &str) {
    println!("       {} {}", format!("{:<16}", key).bright_black(), value.bright_cyan());
}

/// Print the receipt of an escrow call
pub fn outcome(outcome: &EscrowOutcome) {
    let receipt = outcome.receipt();
    if let Some(note) = outcome.note() {
        warning(note);
    }
    kv("tx hash", &receipt.tx_hash);
    if let Some(sequence) = receipt.escrow_sequence {
        kv("escrow sequence", &sequence.to_string());
    }
    kv("explorer", &receipt.explorer_url);
}

pub fn health(health: &HealthResponse) {
    let connected = if health.connected {
        "● connected".bright_green()
    } else {
        "○ idle".yellow()
    };
    println!("  {}: {}", "Status".bright_white(), health.status.bright_cyan());
    println!("  {}: {}", "Network".bright_white(), health.network.bright_cyan());
    println!("  {}: {}", "Ledger".bright_white(), connected);
    println!("  {}: {}", "Checked".bright_white(), health.timestamp.to_rfc3339().bright_black());
}

/// Print the transaction log, newest first
pub fn log(log: &TransactionLog) {
    if log.is_empty() {
        println!("  {}", "No transactions yet".bright_black());
        return;
    }

    for entry in log.entries() {
        let status = if entry.is_success() {
            "✓".bright_green()
        } else {
            "✗".bright_red()
        };
        let mode = if entry.simulated {
            " [simulated]".yellow().to_string()
        } else {
            String::new()
        };
        println!(
            "  {} {:<7} {}{}",
            status,
            entry.action.as_str().bright_white(),
            entry.timestamp.format("%H:%M:%S").to_string().bright_black(),
            mode
        );

        if let Some(hash) = &entry.tx_hash {
            kv("tx hash", hash);
        }
        if let Some(sequence) = entry.escrow_sequence {
            kv("escrow sequence", &sequence.to_string());
        }
        if let Some(err) = &entry.error {
            println!("      {}", err.bright_red());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_past_tense() {
        assert_eq!(past_tense(EscrowAction::Create), "created");
        assert_eq!(past_tense(EscrowAction::Cancel), "cancelled");
    }
}
