use std::collections::HashMap;

use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    db::get_decimal,
    error::Result,
    model::{TransactionType, Wallet},
    wallet,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletSummary {
    pub wallet: Wallet,
    pub total_in: Decimal,
    pub total_out: Decimal,
    pub tx_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceSummary {
    pub wallets: Vec<WalletSummary>,
    /// Sum of every wallet's current balance.
    pub net_balance: Decimal,
    pub total_in: Decimal,
    pub total_out: Decimal,
}

#[derive(Default)]
struct Totals {
    total_in: Decimal,
    total_out: Decimal,
    tx_count: i64,
}

impl Totals {
    fn add(&mut self, kind: TransactionType, amount: Decimal) {
        match kind {
            TransactionType::Pemasukan => self.total_in += amount,
            TransactionType::Pengeluaran => self.total_out += amount,
        }
        self.tx_count += 1;
    }
}

// Amounts are TEXT, so they are summed here rather than with SUM().
//
// Totals are keyed by wallet id. Rows without one predate the column and
// count toward a wallet only when exactly one wallet carries their name;
// they still count toward the ledger-wide totals.
fn totals_by_wallet(conn: &Connection, wallets: &[Wallet]) -> Result<(HashMap<i64, Totals>, Totals)> {
    let mut by_name: HashMap<&str, Option<i64>> = HashMap::new();
    for wallet in wallets {
        by_name
            .entry(wallet.wallet_name.as_str())
            .and_modify(|id| *id = None)
            .or_insert(Some(wallet.id));
    }

    let mut stmt = conn.prepare("SELECT wallet_id, wallet_name, kind, amount FROM transactions")?;
    let mut rows = stmt.query([])?;

    let mut totals: HashMap<i64, Totals> = HashMap::new();
    let mut overall = Totals::default();
    while let Some(row) = rows.next()? {
        let wallet_id: Option<i64> = row.get(0)?;
        let wallet_name: String = row.get(1)?;
        let kind: TransactionType = row.get(2)?;
        let amount = get_decimal(row, 3)?;

        overall.add(kind, amount);
        let owner = wallet_id.or_else(|| by_name.get(wallet_name.as_str()).copied().flatten());
        match owner {
            Some(id) => totals.entry(id).or_default().add(kind, amount),
            None => tracing::debug!(wallet_name = %wallet_name, "transaction without a single owning wallet"),
        }
    }
    Ok((totals, overall))
}

/// Running balances for the home screen.
pub fn compute_balance_summary(conn: &Connection) -> Result<BalanceSummary> {
    let wallets = wallet::list_wallets(conn)?;
    let (mut totals, overall) = totals_by_wallet(conn, &wallets)?;

    let mut summary = BalanceSummary {
        wallets: Vec::with_capacity(wallets.len()),
        net_balance: Decimal::ZERO,
        total_in: overall.total_in,
        total_out: overall.total_out,
    };
    for wallet in wallets {
        summary.net_balance += wallet.balance;
        let Totals {
            total_in,
            total_out,
            tx_count,
        } = totals.remove(&wallet.id).unwrap_or_default();
        summary.wallets.push(WalletSummary {
            wallet,
            total_in,
            total_out,
            tx_count,
        });
    }

    Ok(summary)
}
