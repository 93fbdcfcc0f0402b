use std::{str::FromStr, time::Duration};

use chrono::Utc;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

/// What a deposit into an existing "Other" wallet does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtherWalletPolicy {
    /// Reject the deposit and leave the balance untouched.
    Refuse,
    /// Add the deposit, as named e-wallet types do.
    Augment,
}

impl OtherWalletPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            OtherWalletPolicy::Refuse => "refuse",
            OtherWalletPolicy::Augment => "augment",
        }
    }
}

impl FromStr for OtherWalletPolicy {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "refuse" => Ok(OtherWalletPolicy::Refuse),
            "augment" => Ok(OtherWalletPolicy::Augment),
            other => Err(LedgerError::validation(format!(
                "other_wallet_policy must be refuse or augment, got {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    pub currency_label: String,
    pub other_wallet_policy: OtherWalletPolicy,
    pub max_retries: u32,
    pub op_timeout_ms: u64,
}

impl Config {
    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            currency_label: "IDR".to_string(),
            other_wallet_policy: OtherWalletPolicy::Refuse,
            max_retries: 3,
            op_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfigPayload {
    pub currency_label: String,
    pub other_wallet_policy: OtherWalletPolicy,
    pub max_retries: u32,
    pub op_timeout_ms: u64,
}

pub fn fetch_config(conn: &Connection) -> Result<Config> {
    let (currency_label, policy, max_retries, op_timeout_ms): (String, String, i64, i64) = conn
        .query_row(
            "SELECT currency_label, other_wallet_policy, max_retries, op_timeout_ms FROM config WHERE id = 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;

    Ok(Config {
        currency_label,
        other_wallet_policy: policy.parse()?,
        max_retries: u32::try_from(max_retries).unwrap_or(0),
        op_timeout_ms: u64::try_from(op_timeout_ms).unwrap_or(1),
    })
}

pub fn update_config(conn: &Connection, payload: ConfigPayload) -> Result<Config> {
    if payload.currency_label.trim().is_empty() {
        return Err(LedgerError::validation("currency_label must not be empty"));
    }
    if payload.max_retries > 10 {
        return Err(LedgerError::validation("max_retries must be between 0 and 10"));
    }
    if payload.op_timeout_ms < 1 {
        return Err(LedgerError::validation("op_timeout_ms must be >= 1"));
    }

    conn.execute(
        "UPDATE config SET currency_label = ?1, other_wallet_policy = ?2, max_retries = ?3, op_timeout_ms = ?4, updated_ts_utc = ?5 WHERE id = 1",
        params![
            payload.currency_label.trim(),
            payload.other_wallet_policy.as_str(),
            i64::from(payload.max_retries),
            i64::try_from(payload.op_timeout_ms).unwrap_or(i64::MAX),
            Utc::now().timestamp_millis()
        ],
    )?;
    tracing::info!(
        policy = payload.other_wallet_policy.as_str(),
        max_retries = payload.max_retries,
        op_timeout_ms = payload.op_timeout_ms,
        "config updated"
    );

    fetch_config(conn)
}
