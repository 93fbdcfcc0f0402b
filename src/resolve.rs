//! Mapping route parameters back to wallet records.

use rusqlite::Connection;

use crate::{
    error::{LedgerError, Result},
    model::{EWalletType, Wallet},
    wallet,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Found(Wallet),
    NotFound,
}

/// The segment the home list puts in `walletDetails/{navigationPoint}`.
pub fn navigation_point(wallet: &Wallet) -> &str {
    if wallet.e_wallet_type.is_named() {
        wallet.e_wallet_type.as_str()
    } else {
        &wallet.wallet_name
    }
}

/// Resolves a wallet-details navigation point.
///
/// GoPay, Ovo and ShopeePay are looked up by type whatever the wallet is
/// called; anything else is taken as a wallet name.
pub fn resolve(conn: &Connection, navigation_point: &str) -> Result<Resolution> {
    let found = match navigation_point.parse::<EWalletType>() {
        Ok(kind) if kind.is_named() => wallet::find_by_type(conn, kind)?,
        _ => wallet::find_by_name(conn, navigation_point)?.into_iter().next(),
    };

    match found {
        Some(wallet) => Ok(Resolution::Found(wallet)),
        None => {
            tracing::debug!(navigation_point, "no wallet for navigation point");
            Ok(Resolution::NotFound)
        }
    }
}

/// Resolves the `add_transaction/{walletName}/{eWalletType}` pair, which
/// must match a wallet on both fields.
pub fn resolve_exact(conn: &Connection, wallet_name: &str, e_wallet_type: &str) -> Result<Resolution> {
    let kind: EWalletType = e_wallet_type.parse()?;
    Ok(match wallet::find_by_identity(conn, kind, wallet_name)? {
        Some(wallet) => Resolution::Found(wallet),
        None => Resolution::NotFound,
    })
}

/// What a screen shows while its data is loading.
///
/// `NotFound` and `Failed` are terminal, so a screen never waits forever on a
/// lookup that already finished empty.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState<T> {
    Pending,
    Ready(T),
    NotFound,
    Failed(String),
}

impl<T> LoadState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, LoadState::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }
}

impl LoadState<Wallet> {
    /// The state a lookup settles into once the store answers.
    pub fn settle(result: Result<Resolution>) -> Self {
        match result {
            Ok(Resolution::Found(wallet)) => LoadState::Ready(wallet),
            Ok(Resolution::NotFound) => LoadState::NotFound,
            Err(LedgerError::NotFound(_)) | Err(LedgerError::WalletNotFound(_)) => {
                LoadState::NotFound
            }
            Err(err) => {
                tracing::warn!(error = %err, "wallet lookup failed");
                LoadState::Failed(err.to_string())
            }
        }
    }
}
