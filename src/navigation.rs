//! Operator commands and the session state machine that decides which of them
//! are legal where.
//!
//! Raw input is parsed once into a [`Command`]; a [`Session`] checks it against
//! its [`NavState`] and runs it through the [`Tracer`]. A failing command never
//! changes the state.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::address::{validate_address, AddressSummary};
use crate::chain::{ChainOrigin, ChainStore};
use crate::config::TracerConfig;
use crate::engine::Tracer;
use crate::error::{TraceError, TraceResult};
use crate::source::LedgerSource;
use crate::transaction::{validate_txid, Transaction};

/// What a main-menu query asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryTarget {
    Transaction(String),
    Address(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `oN`
    FollowOutput(usize),
    /// `iN`
    FollowInput(usize),
    Dump,
    /// `m`
    MainMenu,
    Exit,
    Query(QueryTarget),
    /// A number picked from an address's transaction list
    Select(usize),
    /// `load <path>`
    Load(PathBuf),
    /// `chain`
    ShowChain,
    /// Empty line
    Skip,
}

impl Command {
    pub fn parse(input: &str) -> TraceResult<Command> {
        let token = input.trim();
        if token.is_empty() {
            return Ok(Command::Skip);
        }

        let lower = token.to_ascii_lowercase();
        match lower.as_str() {
            "m" => return Ok(Command::MainMenu),
            "exit" | "quit" => return Ok(Command::Exit),
            "dump" => return Ok(Command::Dump),
            "chain" => return Ok(Command::ShowChain),
            "load" => {
                return Err(TraceError::IllegalCommand(
                    "load needs a file path, e.g. 'load chain_dump_1700000000.json'".to_string(),
                ))
            }
            _ => {}
        }

        if lower.starts_with("load ") {
            return Ok(Command::Load(PathBuf::from(token[5..].trim())));
        }
        if token.len() == 64 && token.chars().all(|c| c.is_ascii_hexdigit()) {
            return Ok(Command::Query(QueryTarget::Transaction(lower)));
        }
        if let Some(n) = parse_index(&lower) {
            return n.map(Command::Select);
        }
        if let Some(rest) = lower.strip_prefix('o') {
            if let Some(n) = parse_index(rest) {
                return n.map(Command::FollowOutput);
            }
        }
        if let Some(rest) = lower.strip_prefix('i') {
            if let Some(n) = parse_index(rest) {
                return n.map(Command::FollowInput);
            }
        }
        if (14..=90).contains(&token.len()) && token.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Ok(Command::Query(QueryTarget::Address(token.to_string())));
        }

        Err(TraceError::IllegalCommand(format!("unrecognized command '{token}'")))
    }
}

/// `None` if `digits` is not a number at all, `Some(Err)` if it is one but too large.
fn parse_index(digits: &str) -> Option<TraceResult<usize>> {
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(
        digits
            .parse()
            .map_err(|_| TraceError::IllegalCommand(format!("{digits} is not a usable index"))),
    )
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::FollowOutput(n) => write!(f, "o{n}"),
            Command::FollowInput(n) => write!(f, "i{n}"),
            Command::Dump => write!(f, "dump"),
            Command::MainMenu => write!(f, "m"),
            Command::Exit => write!(f, "exit"),
            Command::Query(QueryTarget::Transaction(txid)) => write!(f, "transaction query {txid}"),
            Command::Query(QueryTarget::Address(address)) => write!(f, "address query {address}"),
            Command::Select(n) => write!(f, "selection {n}"),
            Command::Load(path) => write!(f, "load {}", path.display()),
            Command::ShowChain => write!(f, "chain"),
            Command::Skip => write!(f, "empty input"),
        }
    }
}

/// Where the operator currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavState {
    MainMenu,
    ViewingAddress(AddressSummary),
    ViewingTransaction {
        txid: String,
        /// 0-based position of the node in the chain
        position: usize,
    },
    Exited,
}

impl NavState {
    pub fn accepts(&self, command: &Command) -> bool {
        if matches!(self, NavState::Exited) {
            return false;
        }
        if matches!(command, Command::MainMenu | Command::Exit | Command::Skip) {
            return true;
        }
        match self {
            NavState::MainMenu => matches!(command, Command::Query(_) | Command::Load(_)),
            NavState::ViewingAddress(_) => matches!(command, Command::Select(_) | Command::Dump),
            NavState::ViewingTransaction { .. } => matches!(
                command,
                Command::FollowOutput(_)
                    | Command::FollowInput(_)
                    | Command::Dump
                    | Command::ShowChain
            ),
            NavState::Exited => false,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            NavState::MainMenu => "in the main menu",
            NavState::ViewingAddress(_) => "while viewing an address",
            NavState::ViewingTransaction { .. } => "while viewing a transaction",
            NavState::Exited => "after exit",
        }
    }
}

/// Result of a successfully handled command, for the front-end to render.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    MainMenu,
    Address(AddressSummary),
    Transaction(Transaction),
    /// `transaction` is the node the chain resumes at, `None` for an empty snapshot
    Loaded {
        entries: usize,
        transaction: Option<Transaction>,
    },
    Dumped(PathBuf),
    Chain,
    Nothing,
    Exit,
}

/// One interactive tracing session: the navigation state plus the tracer
/// that owns the chain and the transaction cache.
pub struct Session<S> {
    state: NavState,
    tracer: Tracer<S>,
    dump_dir: PathBuf,
}

impl<S: LedgerSource> Session<S> {
    pub fn new(tracer: Tracer<S>, dump_dir: PathBuf) -> Self {
        Session {
            state: NavState::MainMenu,
            tracer,
            dump_dir,
        }
    }

    pub fn with_config(source: S, config: &TracerConfig) -> Self {
        let tracer = Tracer::new(source, config.bitcoin_network(), config.recent_tx_count);
        Self::new(tracer, config.dump_dir.clone())
    }

    pub fn state(&self) -> &NavState {
        &self.state
    }

    pub fn tracer(&self) -> &Tracer<S> {
        &self.tracer
    }

    pub fn chain(&self) -> &ChainStore {
        self.tracer.chain()
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, NavState::Exited)
    }

    pub async fn handle(&mut self, command: Command) -> TraceResult<Outcome> {
        if !self.state.accepts(&command) {
            return Err(TraceError::IllegalCommand(format!(
                "{command} is not available {}",
                self.state.describe()
            )));
        }
        debug!(%command, "handling command");

        match command {
            Command::Exit => {
                self.state = NavState::Exited;
                Ok(Outcome::Exit)
            }
            Command::MainMenu => {
                if !self.tracer.chain().is_empty() {
                    info!(entries = self.tracer.chain().len(), "discarding chain");
                }
                self.tracer.reset();
                self.state = NavState::MainMenu;
                Ok(Outcome::MainMenu)
            }
            Command::Skip => match self.state {
                NavState::ViewingAddress(_) => {
                    self.state = NavState::MainMenu;
                    Ok(Outcome::MainMenu)
                }
                _ => Ok(Outcome::Nothing),
            },
            Command::Query(QueryTarget::Transaction(txid)) => {
                validate_txid(&txid)?;
                self.begin(&txid, ChainOrigin::TransactionQuery).await
            }
            Command::Query(QueryTarget::Address(address)) => {
                validate_address(&address, self.tracer.network())?;
                let summary = self.tracer.lookup_address(&address).await?;
                self.state = NavState::ViewingAddress(summary.clone());
                Ok(Outcome::Address(summary))
            }
            Command::Select(n) => {
                let NavState::ViewingAddress(summary) = &self.state else {
                    return Err(TraceError::IllegalCommand(format!(
                        "selection {n} needs an address view"
                    )));
                };
                let entry = summary.transaction(n).ok_or_else(|| {
                    TraceError::InvalidQuery(format!(
                        "no transaction {n} in the list (1-{})",
                        summary.transactions.len()
                    ))
                })?;
                let (txid, address) = (entry.txid.clone(), summary.address.clone());
                self.begin(&txid, ChainOrigin::Address { address }).await
            }
            Command::FollowOutput(n) => {
                let transaction = self.tracer.follow_output(n).await?.clone();
                self.view_current(&transaction);
                Ok(Outcome::Transaction(transaction))
            }
            Command::FollowInput(n) => {
                let transaction = self.tracer.follow_input(n).await?.clone();
                self.view_current(&transaction);
                Ok(Outcome::Transaction(transaction))
            }
            Command::Dump => {
                let path = self.tracer.chain().dump_to_dir(&self.dump_dir)?;
                Ok(Outcome::Dumped(path))
            }
            Command::Load(path) => self.load(path),
            Command::ShowChain => Ok(Outcome::Chain),
        }
    }

    async fn begin(&mut self, txid: &str, origin: ChainOrigin) -> TraceResult<Outcome> {
        let transaction = self.tracer.start(txid, origin).await?.clone();
        self.view_current(&transaction);
        Ok(Outcome::Transaction(transaction))
    }

    fn load(&mut self, path: PathBuf) -> TraceResult<Outcome> {
        let chain = ChainStore::load_from_file(&path)?;
        if chain.network() != self.tracer.network() {
            return Err(TraceError::CorruptSnapshot(format!(
                "{} was recorded on {}, this session traces {}",
                path.display(),
                chain.network(),
                self.tracer.network()
            )));
        }
        let entries = chain.len();
        info!(path = %path.display(), entries, "chain loaded");

        let transaction = chain.current().ok().cloned();
        self.tracer.resume(chain);
        match &transaction {
            Some(transaction) => self.view_current(transaction),
            None => self.state = NavState::MainMenu,
        }
        Ok(Outcome::Loaded {
            entries,
            transaction,
        })
    }

    fn view_current(&mut self, transaction: &Transaction) {
        self.state = NavState::ViewingTransaction {
            txid: transaction.txid.clone(),
            position: self.tracer.chain().len().saturating_sub(1),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_navigation_commands() {
        assert_eq!(Command::parse("o2").unwrap(), Command::FollowOutput(2));
        assert_eq!(Command::parse(" I13 ").unwrap(), Command::FollowInput(13));
        assert_eq!(Command::parse("o0").unwrap(), Command::FollowOutput(0));
        assert_eq!(Command::parse("dump").unwrap(), Command::Dump);
        assert_eq!(Command::parse("M").unwrap(), Command::MainMenu);
        assert_eq!(Command::parse("exit").unwrap(), Command::Exit);
        assert_eq!(Command::parse("chain").unwrap(), Command::ShowChain);
        assert_eq!(Command::parse("").unwrap(), Command::Skip);
        assert_eq!(Command::parse("3").unwrap(), Command::Select(3));
    }

    #[test]
    fn test_all_digit_txid_is_a_query() {
        let txid = "1".repeat(64);
        assert_eq!(
            Command::parse(&txid).unwrap(),
            Command::Query(QueryTarget::Transaction(txid.clone()))
        );
        assert!(matches!(
            Command::parse(&"1".repeat(63)),
            Err(TraceError::IllegalCommand(_))
        ));
    }

    #[test]
    fn test_parse_queries() {
        let txid = "4A5E1E4BAAB89F3A32518A88C31BC87F618F76673E2CC77AB2127B7AFDEDA33B";
        assert_eq!(
            Command::parse(txid).unwrap(),
            Command::Query(QueryTarget::Transaction(txid.to_ascii_lowercase()))
        );
        assert_eq!(
            Command::parse("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa").unwrap(),
            Command::Query(QueryTarget::Address(
                "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa".to_string()
            ))
        );
        assert_eq!(
            Command::parse("load  dumps/chain.json").unwrap(),
            Command::Load(PathBuf::from("dumps/chain.json"))
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for input in ["o", "ix", "o-1", "help", "load", "hello world", "o99999999999999999999999"] {
            assert!(
                matches!(Command::parse(input), Err(TraceError::IllegalCommand(_))),
                "{input} should be rejected"
            );
        }
    }

    #[test]
    fn test_legality_table() {
        let viewing_tx = NavState::ViewingTransaction {
            txid: "abc".to_string(),
            position: 0,
        };
        let viewing_addr = NavState::ViewingAddress(AddressSummary {
            address: "addr".to_string(),
            balance: 0,
            unconfirmed_delta: 0,
            tx_count: 0,
            transactions: Vec::new(),
        });
        let query = Command::Query(QueryTarget::Transaction("abc".to_string()));

        assert!(!NavState::MainMenu.accepts(&Command::FollowOutput(1)));
        assert!(!NavState::MainMenu.accepts(&Command::Dump));
        assert!(!NavState::MainMenu.accepts(&Command::Select(1)));
        assert!(NavState::MainMenu.accepts(&query));
        assert!(NavState::MainMenu.accepts(&Command::Load(PathBuf::from("x.json"))));

        assert!(viewing_addr.accepts(&Command::Select(1)));
        assert!(viewing_addr.accepts(&Command::Dump));
        assert!(!viewing_addr.accepts(&Command::FollowInput(1)));
        assert!(!viewing_addr.accepts(&query));

        assert!(viewing_tx.accepts(&Command::FollowOutput(1)));
        assert!(viewing_tx.accepts(&Command::FollowInput(1)));
        assert!(viewing_tx.accepts(&Command::ShowChain));
        assert!(!viewing_tx.accepts(&query));
        assert!(!viewing_tx.accepts(&Command::Select(1)));

        for state in [NavState::MainMenu, viewing_addr, viewing_tx] {
            assert!(state.accepts(&Command::MainMenu));
            assert!(state.accepts(&Command::Exit));
        }
        assert!(!NavState::Exited.accepts(&Command::MainMenu));
    }
}
