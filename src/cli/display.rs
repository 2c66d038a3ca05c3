use owo_colors::OwoColorize as _;

use crate::address::AddressSummary;
use crate::chain::ChainStore;
use crate::error::TraceError;
use crate::transaction::Transaction;

const BANNER: &str = r"
 _     _ _                          _
| |   (_) |                        | |
| |__  _| |_ ___ _ __ __ ___      _| | ___ _ __
| '_ \| | __/ __| '__/ _` \ \ /\ / / |/ _ \ '__|
| |_) | | || (__| | | (_| |\ V  V /| |  __/ |
|_.__/|_|\__\___|_|  \__,_| \_/\_/ |_|\___|_|
";

pub fn print_banner() {
    println!("{}", BANNER.yellow().bold());
    println!(
        "{}",
        format!("{:>44}", concat!("v", env!("CARGO_PKG_VERSION"))).yellow()
    );
}

pub fn print_main_menu() {
    println!("\n{}", "MAIN MENU".yellow().bold());
    println!("{}", "-".repeat(40).dimmed());
    println!("  <txid>        Trace from a transaction");
    println!("  <address>     List an address's recent transactions");
    println!("  load <file>   Resume a dumped chain");
    println!("  exit          Quit");
    println!("{}", "-".repeat(40).dimmed());
    println!("Type 'm' anytime to return here, or 'exit' to quit.");
}

pub fn print_navigation_help() {
    println!("\n{}", "TRANSACTION NAVIGATION".yellow().bold());
    println!("{}", "-".repeat(40).dimmed());
    println!("  iN     Follow input N backward (e.g. i3)");
    println!("  oN     Follow output N forward (e.g. o2)");
    println!("  chain  Show the traced chain");
    println!("  dump   Dump the chain to JSON");
    println!("  m      Return to main menu (discards an undumped chain)");
    println!("  exit   Quit");
    println!("{}", "-".repeat(40).dimmed());
}

pub fn print_address(summary: &AddressSummary) {
    println!("\n{} {}", "Address:".green().bold(), summary.address.green());
    println!("Balance: {}", format_sats(summary.balance));
    if summary.unconfirmed_delta != 0 {
        println!("Unconfirmed: {:+} sat", summary.unconfirmed_delta);
    }
    println!("Total Transactions: {}", summary.tx_count);

    if summary.transactions.is_empty() {
        println!("No recent transactions.");
        return;
    }
    println!(
        "\n{}",
        format!("Recent Transactions (up to {}):", summary.transactions.len()).yellow()
    );
    for (i, tx) in summary.transactions.iter().enumerate() {
        println!(
            "{}. {} - {}",
            i + 1,
            tx.txid.green(),
            confirmation_label(tx.confirmed)
        );
    }
}

pub fn print_transaction(transaction: &Transaction, position: usize) {
    println!(
        "\n{} {} {}",
        "Transaction:".blue().bold(),
        transaction.txid.blue(),
        format!("[chain #{}]", position + 1).dimmed()
    );
    println!("Status: {}", confirmation_label(transaction.is_confirmed()));
    if let Some(height) = transaction.status.block_height {
        println!("Block: {height}");
    }
    println!("Timestamp: {}", format_timestamp(transaction));
    if let Some(fee) = transaction.fee {
        println!("Fee: {}", format_sats(fee));
    }
    match transaction.total_input() {
        Some(total_in) => println!(
            "Total: {} in, {} out",
            format_sats(total_in),
            format_sats(transaction.total_output())
        ),
        None => println!("Total: {} out", format_sats(transaction.total_output())),
    }

    println!(
        "{}",
        format!("Inputs ({}):", transaction.inputs.len()).yellow()
    );
    for (i, input) in transaction.inputs.iter().enumerate() {
        match &input.previous_output {
            Some(prev) => println!(
                "  Input {}: {} from {}, vout: {}",
                i + 1,
                input
                    .amount
                    .map(format_sats)
                    .unwrap_or_else(|| "? sat".to_string()),
                prev.txid.green(),
                prev.vout
            ),
            None => println!("  Input {}: {}", i + 1, "coinbase".dimmed()),
        }
    }

    println!("{}", outputs_heading(transaction).yellow());
    for (i, output) in transaction.outputs.iter().enumerate() {
        let spent = match &output.spent_by {
            Some(spent) => format!("spent by {}", spent.txid),
            None => "unspent".to_string(),
        };
        println!(
            "  Output {}: {} to {} ({})",
            i + 1,
            format_sats(output.amount).green(),
            output.address.as_deref().unwrap_or("N/A").green(),
            spent.dimmed()
        );
    }
}

pub fn print_chain(chain: &ChainStore) {
    if chain.is_empty() {
        println!("Chain is empty.");
        return;
    }
    let origin = chain
        .origin()
        .map(ToString::to_string)
        .unwrap_or_default();
    println!(
        "\n{} {}",
        format!("Chain ({} transactions):", chain.len()).yellow(),
        origin.dimmed()
    );
    for (i, entry) in chain.entries().iter().enumerate() {
        let via = entry
            .edge
            .map(|edge| format!("via {edge}"))
            .unwrap_or_else(|| "start".to_string());
        println!("{:>4}. {} ({})", i + 1, entry.transaction.txid.green(), via);
    }
}

pub fn print_error(err: &TraceError) {
    println!("{} {}", "Error:".red().bold(), err.to_string().red());
}

fn outputs_heading(transaction: &Transaction) -> String {
    let unspent = transaction
        .outputs
        .iter()
        .filter(|output| !output.is_spent())
        .count();
    format!("Outputs ({}, {unspent} unspent):", transaction.outputs.len())
}

fn confirmation_label(confirmed: bool) -> &'static str {
    if confirmed {
        "Confirmed"
    } else {
        "Unconfirmed"
    }
}

pub fn format_sats(amount: u64) -> String {
    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{grouped} sat")
}

pub fn format_timestamp(transaction: &Transaction) -> String {
    transaction
        .timestamp()
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}
