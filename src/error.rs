use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("Wallet tidak ditemukan: {0}")]
    WalletNotFound(String),

    #[error("more than one wallet is named {0:?}")]
    AmbiguousWallet(String),

    #[error("wallet already exists for eWalletType {e_wallet_type} and walletName {wallet_name:?}")]
    AlreadyExists {
        e_wallet_type: String,
        wallet_name: String,
    },

    #[error("{0}")]
    Validation(String),

    #[error("credential hashing failed: {0}")]
    Credential(String),

    /// Balance write lost a compare-and-swap on the wallet's version.
    #[error("wallet {0} was modified concurrently")]
    Conflict(i64),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("operation timed out after {0} ms")]
    Timeout(u64),

    #[error("background task failed: {0}")]
    Join(String),

    #[error("connection lock poisoned: {0}")]
    Lock(String),
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation(message.into())
    }

    /// True when the failure happened before anything was committed and the
    /// same call may simply be issued again.
    pub fn is_transient(&self) -> bool {
        match self {
            LedgerError::Conflict(_) => true,
            LedgerError::Storage(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }

    /// True for outcomes the user caused and can correct: bad input, a
    /// missing or duplicate wallet. Everything else is a fault in the store
    /// or runtime.
    pub fn is_refusal(&self) -> bool {
        matches!(
            self,
            LedgerError::NotFound(_)
                | LedgerError::WalletNotFound(_)
                | LedgerError::AmbiguousWallet(_)
                | LedgerError::AlreadyExists { .. }
                | LedgerError::Validation(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
