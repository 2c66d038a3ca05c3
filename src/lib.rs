//! # bitcrawler
//!
//! Follows the flow of bitcoin through the ledger one transaction at a time.
//! Starting from a transaction id or an address, the operator steps backward
//! along inputs (`iN`) or forward along spent outputs (`oN`); every step is
//! recorded in a [`ChainStore`] which can be dumped to JSON and resumed later
//! without refetching anything.
//!
//! The pieces, leaf first:
//! - [`source`]: the [`LedgerSource`] trait and its Esplora implementation
//! - [`transaction`] / [`address`]: the normalized ledger model
//! - [`chain`]: the traced path and its snapshot format
//! - [`engine`]: the [`Tracer`], which resolves edges through a per-session cache
//! - [`navigation`]: command parsing and the [`Session`] state machine
//! - [`cli`]: the interactive terminal front-end

pub mod address;
pub mod chain;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod esplora;
pub mod navigation;
pub mod source;
pub mod transaction;

pub use address::{AddressSummary, AddressTx, NetworkType};
pub use chain::{ChainOrigin, ChainSnapshot, ChainStore, Direction, Edge};
pub use config::TracerConfig;
pub use engine::Tracer;
pub use error::{LookupKind, TraceError, TraceResult};
pub use navigation::{Command, NavState, Outcome, QueryTarget, Session};
pub use source::{EsploraClient, LedgerSource};
pub use transaction::{Transaction, TxInput, TxOutput, TxStatus};
