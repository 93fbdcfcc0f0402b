use std::{fs, path::Path, path::PathBuf};

use rusqlite::{params, types::Type, Connection, Row};
use rust_decimal::Decimal;

use crate::{config::OtherWalletPolicy, error::Result};

const DB_FILE: &str = "kane.sqlite";

fn db_path(data_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(data_dir)?;
    Ok(data_dir.join(DB_FILE))
}

pub fn open_connection(data_dir: &Path) -> Result<Connection> {
    let path = db_path(data_dir)?;
    tracing::debug!(path = %path.display(), "opening wallet database");
    Ok(Connection::open(path)?)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS wallets (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          wallet_name TEXT NOT NULL DEFAULT '',
          e_wallet_type TEXT NOT NULL,
          initial_balance TEXT NOT NULL,
          balance TEXT NOT NULL,
          version INTEGER NOT NULL DEFAULT 0,
          created_ts_utc INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS transactions (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          wallet_id INTEGER,
          wallet_name TEXT NOT NULL,
          name TEXT NOT NULL,
          kind TEXT NOT NULL,
          amount TEXT NOT NULL,
          date_local TEXT NOT NULL,
          created_ts_utc INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS users (
          email TEXT PRIMARY KEY,
          name TEXT NOT NULL,
          pin TEXT NOT NULL,
          created_ts_utc INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS config (
          id INTEGER PRIMARY KEY CHECK (id = 1),
          currency_label TEXT NOT NULL,
          other_wallet_policy TEXT NOT NULL,
          max_retries INTEGER NOT NULL,
          op_timeout_ms INTEGER NOT NULL,
          created_ts_utc INTEGER NOT NULL,
          updated_ts_utc INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_transactions_wallet_name
          ON transactions(wallet_name, date_local);",
    )?;

    ensure_config_row(conn)?;
    ensure_wallet_columns(conn)?;
    ensure_transaction_columns(conn)?;
    Ok(())
}

/// Opens the database under `data_dir` and makes sure the schema is current.
pub fn open_and_init(data_dir: &Path) -> Result<Connection> {
    let conn = open_connection(data_dir)?;
    init_db(&conn)?;
    Ok(conn)
}

fn ensure_config_row(conn: &Connection) -> Result<()> {
    let existing: i64 = conn.query_row("SELECT COUNT(*) FROM config", [], |row| row.get(0))?;
    if existing == 0 {
        conn.execute(
            "INSERT INTO config (id, currency_label, other_wallet_policy, max_retries, op_timeout_ms, created_ts_utc, updated_ts_utc)
             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                "IDR",
                OtherWalletPolicy::Refuse.as_str(),
                3_i64,
                10_000_i64,
                chrono::Utc::now().timestamp_millis()
            ],
        )?;
    }
    Ok(())
}

// Wallet files written before balances were versioned lack the column.
fn ensure_wallet_columns(conn: &Connection) -> Result<()> {
    if !table_has_column(conn, "wallets", "version")? {
        conn.execute(
            "ALTER TABLE wallets ADD COLUMN version INTEGER NOT NULL DEFAULT 0",
            [],
        )?;
    }
    Ok(())
}

// Rows written before this column existed keep a NULL wallet_id and are
// matched to their wallet by name.
fn ensure_transaction_columns(conn: &Connection) -> Result<()> {
    if !table_has_column(conn, "transactions", "wallet_id")? {
        conn.execute("ALTER TABLE transactions ADD COLUMN wallet_id INTEGER", [])?;
    }
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Reads a decimal stored as TEXT.
pub(crate) fn get_decimal(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    text.parse::<Decimal>()
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

pub(crate) fn get_date(row: &Row<'_>, idx: usize) -> rusqlite::Result<chrono::NaiveDate> {
    let text: String = row.get(idx)?;
    chrono::NaiveDate::parse_from_str(&text, "%Y-%m-%d")
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

#[cfg(test)]
pub(crate) fn test_conn() -> Connection {
    let conn = Connection::open_in_memory().expect("open in-memory");
    init_db(&conn).expect("create schema");
    conn
}
