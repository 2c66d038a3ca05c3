use std::io;

use thiserror::Error;

use crate::chain::Direction;

/// What kind of ledger object a lookup was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    Address,
    Transaction,
}

impl std::fmt::Display for LookupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupKind::Address => write!(f, "address"),
            LookupKind::Transaction => write!(f, "transaction"),
        }
    }
}

/// Every failure the tracer can report to the operator.
///
/// All variants are recoverable at the session boundary: the command fails,
/// the navigation state stays where it was and the message is shown.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("{kind} {id} not found")]
    NotFound { kind: LookupKind, id: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed response from ledger source: {0}")]
    MalformedResponse(String),
    #[error("{direction} {index} is out of range (transaction has {count})")]
    IndexOutOfRange {
        direction: Direction,
        index: usize,
        count: usize,
    },
    #[error("output {0} is unspent, there is no spending transaction to follow")]
    UnspentOutput(usize),
    #[error("input {0} is a coinbase input, there is no previous transaction")]
    CoinbaseInput(usize),
    #[error("illegal command: {0}")]
    IllegalCommand(String),
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),
    #[error("chain is empty")]
    EmptyChain,
    #[error("invalid edge: {0}")]
    InvalidEdge(String),
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("interrupted")]
    Interrupted,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl TraceError {
    pub fn not_found(kind: LookupKind, id: impl Into<String>) -> Self {
        TraceError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Only network failures are worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, TraceError::Network(_))
    }
}

pub type TraceResult<T> = Result<T, TraceError>;
