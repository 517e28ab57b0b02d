use std::{error::Error, fmt};

use backtrace::Backtrace;
use log::error;

/// The category of a `SmallError`, callers match on it to decide
/// whether to abort, retry or give up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A lock could not be acquired within the admission timeout. The
    /// caller is expected to abort the transaction.
    TransactionAborted,

    /// Every cached page is dirty, no victim can be evicted.
    BufferPoolFull,

    Io,

    /// The table, page or tuple doesn't exist.
    NotFound,

    SchemaMismatch,

    Internal,
}

#[derive(Debug)]
pub struct SmallError {
    kind: ErrorKind,
    details: String,
}

impl SmallError {
    pub fn new(msg: &str) -> SmallError {
        Self::with_kind(ErrorKind::Internal, msg)
    }

    pub fn with_kind(kind: ErrorKind, msg: &str) -> SmallError {
        SmallError {
            kind,
            details: msg.to_string(),
        }
    }

    pub fn aborted(msg: &str) -> SmallError {
        Self::with_kind(ErrorKind::TransactionAborted, msg)
    }

    pub fn not_found(msg: &str) -> SmallError {
        Self::with_kind(ErrorKind::NotFound, msg)
    }

    pub fn io(msg: &str) -> SmallError {
        Self::with_kind(ErrorKind::Io, msg)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn is_aborted(&self) -> bool {
        self.kind == ErrorKind::TransactionAborted
    }

    pub fn show_backtrace(&self) {
        let bt = Backtrace::new();
        error!("error: [{}], backtrace: {:?}", self, bt);
    }
}

impl fmt::Display for SmallError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.details)
    }
}

impl Error for SmallError {}

impl From<std::io::Error> for SmallError {
    fn from(e: std::io::Error) -> Self {
        SmallError::io(&e.to_string())
    }
}
