//! Commands the UI shell invokes. Each forwards to [`Ledger`] and hands back
//! the error as the message the screen shows.

use rust_decimal::Decimal;

use crate::{
    config::{Config, ConfigPayload},
    model::{EWalletType, Transaction, Wallet},
    recorder::TransactionForm,
    resolve::LoadState,
    service::Ledger,
    summary::BalanceSummary,
    users::{Registration, UserProfile},
};

fn parse_amount(amount: &str) -> Result<Decimal, String> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err("Please fill in all fields!".to_string());
    }
    amount
        .parse::<Decimal>()
        .map_err(|_| format!("Invalid amount: {}", amount))
}

pub async fn get_wallets(ledger: &Ledger) -> Result<Vec<Wallet>, String> {
    ledger.list_wallets().await.map_err(|err| err.to_string())
}

pub async fn create_wallet(
    ledger: &Ledger,
    e_wallet_type: String,
    wallet_name: Option<String>,
    amount: String,
) -> Result<Wallet, String> {
    let kind = e_wallet_type
        .parse::<EWalletType>()
        .map_err(|err| err.to_string())?;
    let delta = parse_amount(&amount)?;
    ledger
        .create_or_augment(kind, wallet_name, delta)
        .await
        .map_err(|err| err.to_string())
}

/// `Ok(None)` when nothing matches the navigation point.
pub async fn get_wallet(ledger: &Ledger, navigation_point: String) -> Result<Option<Wallet>, String> {
    match ledger.resolve(&navigation_point).await {
        LoadState::Ready(wallet) => Ok(Some(wallet)),
        LoadState::NotFound => Ok(None),
        LoadState::Failed(message) => Err(message),
        LoadState::Pending => Err("wallet lookup did not finish".to_string()),
    }
}

pub async fn add_transaction(ledger: &Ledger, form: TransactionForm) -> Result<Transaction, String> {
    ledger
        .record(form)
        .await
        .map(|recorded| recorded.transaction)
        .map_err(|err| err.to_string())
}

pub async fn list_wallet_transactions(
    ledger: &Ledger,
    wallet_name: String,
) -> Result<Vec<Transaction>, String> {
    ledger
        .wallet_history(&wallet_name)
        .await
        .map_err(|err| err.to_string())
}

pub async fn get_balance_summary(ledger: &Ledger) -> Result<BalanceSummary, String> {
    ledger.balance_summary().await.map_err(|err| err.to_string())
}

pub fn get_config(ledger: &Ledger) -> Result<Config, String> {
    ledger.config().map_err(|err| err.to_string())
}

pub async fn update_config(ledger: &Ledger, payload: ConfigPayload) -> Result<Config, String> {
    ledger.update_config(payload).await.map_err(|err| err.to_string())
}

pub async fn submit_email(ledger: &Ledger, email: String) -> Result<bool, String> {
    ledger.submit_email(&email).await.map_err(|err| err.to_string())
}

pub fn submit_sign_up(
    ledger: &Ledger,
    email: String,
    password: String,
    confirm_password: String,
) -> Result<(), String> {
    ledger
        .submit_sign_up(&email, &password, &confirm_password)
        .map_err(|err| err.to_string())
}

pub fn submit_name(ledger: &Ledger, email: String, name: String) -> Result<(), String> {
    ledger.submit_name(&email, &name).map_err(|err| err.to_string())
}

pub async fn register_profile(ledger: &Ledger, registration: Registration) -> Result<UserProfile, String> {
    ledger
        .register_profile(registration)
        .await
        .map_err(|err| err.to_string())
}

pub async fn unlock_with_pin(ledger: &Ledger, email: String, pin: String) -> Result<UserProfile, String> {
    ledger.unlock(&email, &pin).await.map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::*;
    use crate::{model::TransactionType, nav};

    fn ledger() -> Ledger {
        let (tx, _rx) = nav::channel();
        let conn = Connection::open_in_memory().expect("open in-memory");
        Ledger::with_connection(conn, tx).expect("ledger")
    }

    #[tokio::test]
    async fn create_wallet_parses_form_values() {
        let ledger = ledger();

        let wallet = create_wallet(&ledger, "GoPay".to_string(), None, " 1500.50 ".to_string())
            .await
            .expect("create");
        assert_eq!(wallet.balance, "1500.50".parse::<Decimal>().unwrap());

        let err = create_wallet(&ledger, "Dana".to_string(), None, "1".to_string())
            .await
            .unwrap_err();
        assert_eq!(err, "unknown eWalletType: Dana");

        let err = create_wallet(&ledger, "Ovo".to_string(), None, "sepuluh".to_string())
            .await
            .unwrap_err();
        assert_eq!(err, "Invalid amount: sepuluh");

        let err = create_wallet(&ledger, "Ovo".to_string(), None, "".to_string())
            .await
            .unwrap_err();
        assert_eq!(err, "Please fill in all fields!");
    }

    #[tokio::test]
    async fn errors_come_back_as_messages() {
        let ledger = ledger();

        create_wallet(&ledger, "Other".to_string(), Some("MyCash".to_string()), "500".to_string())
            .await
            .expect("create");
        let err = create_wallet(&ledger, "Other".to_string(), Some("MyCash".to_string()), "5".to_string())
            .await
            .unwrap_err();
        assert!(err.starts_with("wallet already exists for eWalletType Other"));

        let err = add_transaction(
            &ledger,
            TransactionForm {
                wallet_name: "Tabungan".to_string(),
                e_wallet_type: None,
                name: "Gaji".to_string(),
                kind: TransactionType::Pemasukan,
                amount: "10".to_string(),
                date: "01/05/2025".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err, "Wallet tidak ditemukan: Tabungan");

        let err = submit_sign_up(&ledger, "kane@example.com".into(), "".into(), "".into()).unwrap_err();
        assert_eq!(err, "Email or password cannot be empty");
    }

    #[tokio::test]
    async fn wallet_lookup_distinguishes_missing_from_found() {
        let ledger = ledger();
        assert_eq!(get_wallet(&ledger, "MyCash".to_string()).await, Ok(None));

        create_wallet(&ledger, "Other".to_string(), Some("MyCash".to_string()), "5".to_string())
            .await
            .expect("create");
        let tx = add_transaction(
            &ledger,
            TransactionForm {
                wallet_name: "MyCash".to_string(),
                e_wallet_type: Some(EWalletType::Other),
                name: "Kopi".to_string(),
                kind: TransactionType::Pengeluaran,
                amount: "2".to_string(),
                date: "02/05/2025".to_string(),
            },
        )
        .await
        .expect("record");
        assert_eq!(tx.wallet_name, "MyCash");

        let wallet = get_wallet(&ledger, "MyCash".to_string())
            .await
            .expect("lookup")
            .expect("found");
        assert_eq!(wallet.balance, "3".parse::<Decimal>().unwrap());
        assert_eq!(
            list_wallet_transactions(&ledger, "MyCash".to_string())
                .await
                .expect("history")
                .len(),
            1
        );
        assert_eq!(get_config(&ledger).expect("config").currency_label, "IDR");
    }
}
