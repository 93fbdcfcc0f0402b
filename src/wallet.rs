use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use rust_decimal::Decimal;

use crate::{
    config::{Config, OtherWalletPolicy},
    db::get_decimal,
    error::{LedgerError, Result},
    model::{EWalletType, Wallet},
};

const WALLET_COLUMNS: &str =
    "id, wallet_name, e_wallet_type, initial_balance, balance, version";

fn row_to_wallet(row: &Row<'_>) -> rusqlite::Result<Wallet> {
    Ok(Wallet {
        id: row.get(0)?,
        wallet_name: row.get(1)?,
        e_wallet_type: row.get(2)?,
        initial_balance: row.get(3)?,
        balance: get_decimal(row, 4)?,
        version: row.get(5)?,
    })
}

pub fn find_by_type(conn: &Connection, kind: EWalletType) -> Result<Option<Wallet>> {
    let wallet = conn
        .query_row(
            &format!(
                "SELECT {} FROM wallets WHERE e_wallet_type = ?1 ORDER BY id LIMIT 1",
                WALLET_COLUMNS
            ),
            params![kind],
            row_to_wallet,
        )
        .optional()?;
    Ok(wallet)
}

pub fn find_by_identity(
    conn: &Connection,
    kind: EWalletType,
    wallet_name: &str,
) -> Result<Option<Wallet>> {
    let wallet = conn
        .query_row(
            &format!(
                "SELECT {} FROM wallets WHERE e_wallet_type = ?1 AND wallet_name = ?2 ORDER BY id LIMIT 1",
                WALLET_COLUMNS
            ),
            params![kind, wallet_name],
            row_to_wallet,
        )
        .optional()?;
    Ok(wallet)
}

/// Every wallet carrying `wallet_name`, whatever its type.
pub fn find_by_name(conn: &Connection, wallet_name: &str) -> Result<Vec<Wallet>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM wallets WHERE wallet_name = ?1 ORDER BY id",
        WALLET_COLUMNS
    ))?;
    let rows = stmt.query_map([wallet_name], row_to_wallet)?;

    let mut wallets = Vec::new();
    for row in rows {
        wallets.push(row?);
    }
    Ok(wallets)
}

pub fn fetch_wallet(conn: &Connection, wallet_id: i64) -> Result<Wallet> {
    conn.query_row(
        &format!("SELECT {} FROM wallets WHERE id = ?1", WALLET_COLUMNS),
        [wallet_id],
        row_to_wallet,
    )
    .optional()?
    .ok_or_else(|| LedgerError::NotFound(format!("wallet {}", wallet_id)))
}

pub fn list_wallets(conn: &Connection) -> Result<Vec<Wallet>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM wallets ORDER BY id",
        WALLET_COLUMNS
    ))?;
    let rows = stmt.query_map([], row_to_wallet)?;

    let mut wallets = Vec::new();
    for row in rows {
        wallets.push(row?);
    }
    Ok(wallets)
}

// An Other wallet named after a named type would share its navigation point.
fn other_wallet_name(wallet_name: Option<&str>) -> Result<&str> {
    match wallet_name.map(str::trim) {
        Some(name) if name.is_empty() => Err(LedgerError::validation(
            "walletName is required for Other wallets",
        )),
        Some(name) => match name.parse::<EWalletType>() {
            Ok(kind) if kind.is_named() => Err(LedgerError::validation(format!(
                "walletName {} is reserved for {} wallets",
                name, kind
            ))),
            _ => Ok(name),
        },
        None => Err(LedgerError::validation(
            "walletName is required for Other wallets",
        )),
    }
}

/// Looks a wallet up by its identity: the type alone for named e-wallets,
/// type and name for `Other`.
pub fn find_wallet(
    conn: &Connection,
    kind: EWalletType,
    wallet_name: Option<&str>,
) -> Result<Wallet> {
    let found = if kind.is_named() {
        find_by_type(conn, kind)?
    } else {
        find_by_identity(conn, kind, other_wallet_name(wallet_name)?)?
    };
    found.ok_or_else(|| match wallet_name {
        Some(name) if !kind.is_named() => LedgerError::NotFound(format!("{} wallet {:?}", kind, name)),
        _ => LedgerError::NotFound(format!("{} wallet", kind)),
    })
}

/// Writes `balance + delta` only if nobody else has written the wallet since
/// it was read.
pub fn apply_delta(conn: &Connection, wallet: &Wallet, delta: Decimal) -> Result<Wallet> {
    let balance = wallet.balance + delta;
    let updated = conn.execute(
        "UPDATE wallets SET balance = ?1, version = version + 1 WHERE id = ?2 AND version = ?3",
        params![balance.to_string(), wallet.id, wallet.version],
    )?;
    if updated == 0 {
        tracing::warn!(wallet_id = wallet.id, version = wallet.version, "stale balance write");
        return Err(LedgerError::Conflict(wallet.id));
    }

    Ok(Wallet {
        balance,
        version: wallet.version + 1,
        ..wallet.clone()
    })
}

fn insert_wallet(
    conn: &Connection,
    kind: EWalletType,
    wallet_name: &str,
    initial_balance: &str,
    balance: Decimal,
) -> Result<Wallet> {
    conn.execute(
        "INSERT INTO wallets (wallet_name, e_wallet_type, initial_balance, balance, version, created_ts_utc)
         VALUES (?1, ?2, ?3, ?4, 0, ?5)",
        params![
            wallet_name,
            kind,
            initial_balance,
            balance.to_string(),
            Utc::now().timestamp_millis()
        ],
    )?;

    Ok(Wallet {
        id: conn.last_insert_rowid(),
        wallet_name: wallet_name.to_string(),
        e_wallet_type: kind,
        initial_balance: initial_balance.to_string(),
        balance,
        version: 0,
    })
}

/// Creates the wallet for this identity with `delta` as its balance, or adds
/// `delta` to the existing one.
///
/// Named e-wallet types are matched by type alone and always augment. `Other`
/// wallets are matched by type and name; whether an existing one is augmented
/// or the deposit refused follows `config.other_wallet_policy`.
pub fn create_or_augment(
    conn: &Connection,
    kind: EWalletType,
    wallet_name: Option<&str>,
    delta: Decimal,
    config: &Config,
) -> Result<Wallet> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    let (wallet_name, existing) = if kind.is_named() {
        let name = wallet_name.map(str::trim).unwrap_or_default();
        (name, find_by_type(&tx, kind)?)
    } else {
        let name = other_wallet_name(wallet_name)?;
        (name, find_by_identity(&tx, kind, name)?)
    };

    let wallet = match existing {
        None => {
            let wallet = insert_wallet(&tx, kind, wallet_name, &config.currency_label, delta)?;
            tracing::info!(wallet_id = wallet.id, e_wallet_type = %kind, wallet_name, "wallet created");
            wallet
        }
        Some(existing)
            if !kind.is_named() && config.other_wallet_policy == OtherWalletPolicy::Refuse =>
        {
            tracing::warn!(
                wallet_id = existing.id,
                wallet_name,
                "wallet already exists, deposit refused"
            );
            return Err(LedgerError::AlreadyExists {
                e_wallet_type: kind.to_string(),
                wallet_name: wallet_name.to_string(),
            });
        }
        Some(existing) => {
            let wallet = apply_delta(&tx, &existing, delta)?;
            tracing::info!(
                wallet_id = wallet.id,
                e_wallet_type = %kind,
                balance = %wallet.balance,
                "wallet balance augmented"
            );
            wallet
        }
    };

    tx.commit()?;
    Ok(wallet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_conn;

    fn dec(value: &str) -> Decimal {
        value.parse().expect("decimal literal")
    }

    #[test]
    fn named_type_deposits_accumulate() {
        let conn = test_conn();
        let config = Config::default();

        let first = create_or_augment(&conn, EWalletType::GoPay, None, dec("100"), &config)
            .expect("create");
        create_or_augment(&conn, EWalletType::GoPay, Some("Dompet"), dec("250.50"), &config)
            .expect("augment");
        let last = create_or_augment(&conn, EWalletType::GoPay, None, dec("-50"), &config)
            .expect("augment");

        assert_eq!(last.id, first.id);
        assert_eq!(last.balance, dec("300.50"));
        assert_eq!(last.version, 2);
        assert_eq!(list_wallets(&conn).expect("list").len(), 1);
    }

    #[test]
    fn other_wallet_refuses_second_deposit() {
        let conn = test_conn();
        let config = Config::default();

        create_or_augment(&conn, EWalletType::Other, Some("MyCash"), dec("500"), &config)
            .expect("create");
        let err = create_or_augment(&conn, EWalletType::Other, Some("MyCash"), dec("100"), &config)
            .unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyExists { .. }));

        let wallet = find_wallet(&conn, EWalletType::Other, Some("MyCash")).expect("find");
        assert_eq!(wallet.balance, dec("500"));
        assert_eq!(wallet.version, 0);
    }

    #[test]
    fn other_wallet_augments_under_augment_policy() {
        let conn = test_conn();
        let config = Config {
            other_wallet_policy: OtherWalletPolicy::Augment,
            ..Config::default()
        };

        create_or_augment(&conn, EWalletType::Other, Some("MyCash"), dec("500"), &config)
            .expect("create");
        let wallet = create_or_augment(&conn, EWalletType::Other, Some("MyCash"), dec("100"), &config)
            .expect("augment");
        assert_eq!(wallet.balance, dec("600"));
    }

    #[test]
    fn other_wallets_are_distinct_by_name() {
        let conn = test_conn();
        let config = Config::default();

        create_or_augment(&conn, EWalletType::Other, Some("MyCash"), dec("1"), &config)
            .expect("create");
        create_or_augment(&conn, EWalletType::Other, Some("Tabungan"), dec("2"), &config)
            .expect("create");

        assert_eq!(list_wallets(&conn).expect("list").len(), 2);
        assert_eq!(find_by_name(&conn, "Tabungan").expect("find")[0].balance, dec("2"));
    }

    #[test]
    fn other_wallet_requires_name() {
        let conn = test_conn();
        let err = create_or_augment(&conn, EWalletType::Other, Some("  "), dec("1"), &Config::default())
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert!(list_wallets(&conn).expect("list").is_empty());
    }

    #[test]
    fn other_wallet_cannot_take_a_named_type() {
        let conn = test_conn();
        let config = Config::default();
        for reserved in ["GoPay", "Ovo", " ShopeePay "] {
            let err = create_or_augment(&conn, EWalletType::Other, Some(reserved), dec("10"), &config)
                .unwrap_err();
            assert!(matches!(err, LedgerError::Validation(_)), "{:?}", err);
        }
        assert!(list_wallets(&conn).expect("list").is_empty());

        // Only exact type names are reserved.
        create_or_augment(&conn, EWalletType::Other, Some("Ovo Lama"), dec("10"), &config)
            .expect("create");
        create_or_augment(&conn, EWalletType::Other, Some("Other"), dec("10"), &config)
            .expect("create");
    }

    #[test]
    fn find_wallet_reports_missing() {
        let conn = test_conn();
        let err = find_wallet(&conn, EWalletType::Ovo, None).unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }

    #[test]
    fn stale_version_write_conflicts() {
        let conn = test_conn();
        let config = Config::default();
        let stale = create_or_augment(&conn, EWalletType::Ovo, None, dec("10"), &config)
            .expect("create");

        apply_delta(&conn, &stale, dec("5")).expect("first write");
        let err = apply_delta(&conn, &stale, dec("7")).unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(id) if id == stale.id));
        assert_eq!(fetch_wallet(&conn, stale.id).expect("fetch").balance, dec("15"));
    }

    #[test]
    fn new_wallet_takes_currency_label_from_config() {
        let conn = test_conn();
        let config = Config {
            currency_label: "USD".to_string(),
            ..Config::default()
        };
        let wallet = create_or_augment(&conn, EWalletType::ShopeePay, None, dec("0"), &config)
            .expect("create");
        assert_eq!(wallet.initial_balance, "USD");
        assert_eq!(wallet.wallet_name, "");
    }
}
