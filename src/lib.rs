//! Wallet ledger core: wallets, the transactions recorded against them, and
//! the lookups screens use to find a wallet from a route.

pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod nav;
pub mod recorder;
pub mod resolve;
pub mod service;
pub mod summary;
pub mod users;
pub mod wallet;

pub use config::{Config, ConfigPayload, OtherWalletPolicy};
pub use error::{LedgerError, Result};
pub use model::{EWalletType, Transaction, TransactionType, Wallet};
pub use nav::{NavEvent, Navigator, Route};
pub use recorder::{NewTransaction, Recorded, TransactionForm};
pub use resolve::{LoadState, Resolution};
pub use service::Ledger;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the global `tracing` subscriber. Honors `RUST_LOG`, defaulting to
/// `info`. Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init();
}
