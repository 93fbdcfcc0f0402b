use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, Row, Transaction as SqlTransaction, TransactionBehavior};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{
    db::{get_date, get_decimal},
    error::{LedgerError, Result},
    model::{EWalletType, Transaction, TransactionType, Wallet},
    wallet,
};

const DATE_INPUT_FORMAT: &str = "%d/%m/%Y";

/// Raw values as typed into the add-transaction form.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionForm {
    pub wallet_name: String,
    /// Carried from `add_transaction/{walletName}/{eWalletType}`; settles
    /// which wallet is meant when several share `wallet_name`.
    #[serde(default)]
    pub e_wallet_type: Option<EWalletType>,
    pub name: String,
    pub kind: TransactionType,
    pub amount: String,
    /// `dd/MM/yyyy`, as produced by the date picker.
    pub date: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub wallet_name: String,
    pub e_wallet_type: Option<EWalletType>,
    pub name: String,
    pub kind: TransactionType,
    pub amount: Decimal,
    pub date: NaiveDate,
}

impl TransactionForm {
    pub fn validate(&self) -> Result<NewTransaction> {
        let name = self.name.trim();
        let amount = self.amount.trim();
        let date = self.date.trim();
        if name.is_empty() || amount.is_empty() || date.is_empty() {
            return Err(LedgerError::validation("Please fill in all fields!"));
        }

        let amount: Decimal = amount
            .parse()
            .map_err(|_| LedgerError::validation(format!("Invalid amount: {}", amount)))?;
        if amount < Decimal::ZERO {
            return Err(LedgerError::validation("Amount must not be negative"));
        }

        let date = NaiveDate::parse_from_str(date, DATE_INPUT_FORMAT)
            .map_err(|_| LedgerError::validation("Invalid date format!"))?;

        Ok(NewTransaction {
            wallet_name: self.wallet_name.clone(),
            e_wallet_type: self.e_wallet_type,
            name: name.to_string(),
            kind: self.kind,
            amount,
            date,
        })
    }
}

/// A committed transaction and the wallet balance it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub transaction: Transaction,
    pub wallet: Wallet,
}

fn row_to_transaction(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        wallet_name: row.get(1)?,
        name: row.get(2)?,
        kind: row.get(3)?,
        amount: get_decimal(row, 4)?,
        date: get_date(row, 5)?,
        created_ts_utc: row.get(6)?,
    })
}

/// Applies the transaction's signed amount to the wallet named
/// `new_tx.wallet_name` and appends the transaction, both or neither.
/// When several wallets share the name, `new_tx.e_wallet_type` picks one.
///
/// Not idempotent: recording the same form twice counts it twice.
pub fn record(conn: &Connection, new_tx: &NewTransaction) -> Result<Recorded> {
    let tx = SqlTransaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    let mut candidates = wallet::find_by_name(&tx, &new_tx.wallet_name)?;
    if let Some(kind) = new_tx.e_wallet_type.filter(|_| candidates.len() > 1) {
        candidates.retain(|wallet| wallet.e_wallet_type == kind);
    }
    let target = match candidates.len() {
        0 => return Err(LedgerError::WalletNotFound(new_tx.wallet_name.clone())),
        1 => candidates.remove(0),
        _ => return Err(LedgerError::AmbiguousWallet(new_tx.wallet_name.clone())),
    };

    let updated = wallet::apply_delta(&tx, &target, new_tx.kind.signed(new_tx.amount))?;

    let created_ts_utc = Utc::now().timestamp_millis();
    tx.execute(
        "INSERT INTO transactions (wallet_id, wallet_name, name, kind, amount, date_local, created_ts_utc)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            updated.id,
            new_tx.wallet_name,
            new_tx.name,
            new_tx.kind,
            new_tx.amount.to_string(),
            new_tx.date.format("%Y-%m-%d").to_string(),
            created_ts_utc
        ],
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;

    tracing::info!(
        transaction_id = id,
        wallet_id = updated.id,
        kind = %new_tx.kind,
        amount = %new_tx.amount,
        balance = %updated.balance,
        "transaction recorded"
    );

    Ok(Recorded {
        transaction: Transaction {
            id,
            wallet_name: new_tx.wallet_name.clone(),
            name: new_tx.name.clone(),
            kind: new_tx.kind,
            amount: new_tx.amount,
            date: new_tx.date,
            created_ts_utc,
        },
        wallet: updated,
    })
}

/// Transactions recorded against `wallet_name`, newest date first.
pub fn list_for_wallet(conn: &Connection, wallet_name: &str) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(
        "SELECT id, wallet_name, name, kind, amount, date_local, created_ts_utc
         FROM transactions WHERE wallet_name = ?1 ORDER BY date_local DESC, id DESC",
    )?;
    let rows = stmt.query_map([wallet_name], row_to_transaction)?;

    let mut transactions = Vec::new();
    for row in rows {
        transactions.push(row?);
    }
    Ok(transactions)
}
