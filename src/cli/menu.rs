use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::warn;

use crate::cli::display;
use crate::error::TraceError;
use crate::navigation::{Command, NavState, Outcome, Session};
use crate::source::LedgerSource;

/// Reads stdin on its own thread so a prompt can be raced against Ctrl-C.
struct LineReader {
    lines: mpsc::UnboundedReceiver<String>,
}

impl LineReader {
    fn spawn() -> Self {
        let (sender, lines) = mpsc::unbounded_channel();
        std::thread::spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if sender.send(line).is_err() {
                    break;
                }
            }
        });
        LineReader { lines }
    }

    /// `None` on end of input or Ctrl-C.
    async fn prompt(&mut self, label: &str) -> io::Result<Option<String>> {
        print!("{label}");
        io::stdout().flush()?;
        tokio::select! {
            line = self.lines.recv() => Ok(line),
            _ = tokio::signal::ctrl_c() => {
                println!();
                Ok(None)
            }
        }
    }
}

fn prompt_label(state: &NavState) -> String {
    match state {
        NavState::MainMenu => "Enter txid, address, 'load <file>' or 'exit': ".to_string(),
        NavState::ViewingAddress(_) => {
            "Enter a transaction number to explore or press ENTER to skip: ".to_string()
        }
        NavState::ViewingTransaction { txid, position } => {
            let short = txid.get(..8).unwrap_or(txid);
            format!("[#{} {short}] Enter command: ", position + 1)
        }
        NavState::Exited => String::new(),
    }
}

/// Runs the prompt loop until the operator exits.
///
/// A command that is still waiting on the ledger source when Ctrl-C arrives is
/// abandoned; the chain is only ever extended after a fetch completes, so it
/// stays exactly as it was.
pub async fn run_interactive_mode<S: LedgerSource>(
    mut session: Session<S>,
    resume_from: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    display::print_banner();
    display::print_main_menu();

    if let Some(path) = resume_from {
        execute(&mut session, Command::Load(path)).await;
    }

    let mut input = LineReader::spawn();
    while !session.is_finished() {
        let Some(line) = input.prompt(&prompt_label(session.state())).await? else {
            println!("Exiting gracefully...");
            break;
        };
        match Command::parse(&line) {
            Ok(command) => execute(&mut session, command).await,
            Err(e) => report(&e),
        }
    }

    Ok(())
}

async fn execute<S: LedgerSource>(session: &mut Session<S>, command: Command) {
    let result = tokio::select! {
        result = session.handle(command) => result,
        _ = tokio::signal::ctrl_c() => Err(TraceError::Interrupted),
    };
    match result {
        Ok(outcome) => render(session, outcome),
        Err(e) => report(&e),
    }
}

fn render<S: LedgerSource>(session: &Session<S>, outcome: Outcome) {
    let position = match session.state() {
        NavState::ViewingTransaction { position, .. } => *position,
        _ => 0,
    };
    match outcome {
        Outcome::MainMenu => display::print_main_menu(),
        Outcome::Address(summary) => display::print_address(&summary),
        Outcome::Transaction(transaction) => {
            display::print_transaction(&transaction, position);
            display::print_navigation_help();
        }
        Outcome::Loaded {
            entries,
            transaction,
        } => {
            println!("Chain loaded ({entries} transactions).");
            match transaction {
                Some(transaction) => {
                    display::print_chain(session.chain());
                    display::print_transaction(&transaction, position);
                    display::print_navigation_help();
                }
                None => display::print_main_menu(),
            }
        }
        Outcome::Dumped(path) => println!("Chain dumped to {}", path.display()),
        Outcome::Chain => display::print_chain(session.chain()),
        Outcome::Nothing => {
            if matches!(session.state(), NavState::ViewingTransaction { .. }) {
                display::print_navigation_help();
            }
        }
        Outcome::Exit => println!("\nExiting gracefully..."),
    }
}

fn report(err: &TraceError) {
    warn!(error = %err, "command failed");
    display::print_error(err);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::AddressSummary;

    #[test]
    fn test_prompt_depends_on_state() {
        assert!(prompt_label(&NavState::MainMenu).contains("txid"));
        assert_eq!(
            prompt_label(&NavState::ViewingTransaction {
                txid: "abc".to_string(),
                position: 0
            }),
            "[#1 abc] Enter command: "
        );
        assert_eq!(
            prompt_label(&NavState::ViewingTransaction {
                txid: "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b"
                    .to_string(),
                position: 2
            }),
            "[#3 4a5e1e4b] Enter command: "
        );
        let summary = AddressSummary {
            address: "addr".to_string(),
            balance: 0,
            unconfirmed_delta: 0,
            tx_count: 0,
            transactions: Vec::new(),
        };
        assert!(prompt_label(&NavState::ViewingAddress(summary)).contains("ENTER"));
    }
}
