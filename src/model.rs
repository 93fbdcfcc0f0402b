use std::{fmt, str::FromStr};

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EWalletType {
    GoPay,
    Ovo,
    ShopeePay,
    Other,
}

impl EWalletType {
    pub const ALL: [EWalletType; 4] = [
        EWalletType::GoPay,
        EWalletType::Ovo,
        EWalletType::ShopeePay,
        EWalletType::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EWalletType::GoPay => "GoPay",
            EWalletType::Ovo => "Ovo",
            EWalletType::ShopeePay => "ShopeePay",
            EWalletType::Other => "Other",
        }
    }

    /// Named types hold at most one wallet each; `Other` is keyed by name too.
    pub fn is_named(self) -> bool {
        !matches!(self, EWalletType::Other)
    }
}

impl fmt::Display for EWalletType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EWalletType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EWalletType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| LedgerError::validation(format!("unknown eWalletType: {}", s)))
    }
}

impl ToSql for EWalletType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for EWalletType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        text.parse()
            .map_err(|err: LedgerError| FromSqlError::Other(Box::new(err)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    /// Credit.
    Pemasukan,
    /// Debit.
    Pengeluaran,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Pemasukan => "Pemasukan",
            TransactionType::Pengeluaran => "Pengeluaran",
        }
    }

    pub fn signed(self, amount: Decimal) -> Decimal {
        match self {
            TransactionType::Pemasukan => amount,
            TransactionType::Pengeluaran => -amount,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pemasukan" => Ok(TransactionType::Pemasukan),
            "Pengeluaran" => Ok(TransactionType::Pengeluaran),
            other => Err(LedgerError::validation(format!(
                "unknown transaction type: {}",
                other
            ))),
        }
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        text.parse()
            .map_err(|err: LedgerError| FromSqlError::Other(Box::new(err)))
    }
}

/// A cash or e-wallet account with its running balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: i64,
    pub wallet_name: String,
    pub e_wallet_type: EWalletType,
    /// Currency label shown next to the balance, never recomputed.
    pub initial_balance: String,
    pub balance: Decimal,
    #[serde(skip)]
    pub version: i64,
}

/// An immutable record of money moving in or out of one wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i64,
    pub wallet_name: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: Decimal,
    pub date: NaiveDate,
    #[serde(rename = "createdAt")]
    pub created_ts_utc: i64,
}

impl Transaction {
    pub fn signed_amount(&self) -> Decimal {
        self.kind.signed(self.amount)
    }

    /// The selected calendar date at midnight.
    pub fn date_time(&self) -> NaiveDateTime {
        self.date.and_time(chrono::NaiveTime::MIN)
    }
}
