use std::{
    path::Path,
    sync::{Arc, Mutex, RwLock},
    time::Duration,
};

use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::{
    config::{self, Config, ConfigPayload},
    db,
    error::{LedgerError, Result},
    model::{EWalletType, Transaction, Wallet},
    nav::{NavEvent, NavSender, Route},
    recorder::{self, Recorded, TransactionForm},
    resolve::{self, LoadState},
    summary::{self, BalanceSummary},
    users::{self, Registration, UserProfile},
    wallet,
};

const BASE_BACKOFF_MS: u64 = 20;

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(BASE_BACKOFF_MS << attempt.min(6))
}

/// Async entry point for the screens.
///
/// Every store call runs on the blocking pool under the configured timeout.
/// Calls that fail before committing are retried; outcomes that move the user
/// elsewhere are sent to the navigator as [`NavEvent`]s.
pub struct Ledger {
    conn: Arc<Mutex<Connection>>,
    config: RwLock<Config>,
    events: NavSender,
}

impl Ledger {
    pub fn open(data_dir: &Path, events: NavSender) -> Result<Self> {
        let conn = db::open_and_init(data_dir)?;
        Self::with_connection(conn, events)
    }

    pub fn with_connection(conn: Connection, events: NavSender) -> Result<Self> {
        db::init_db(&conn)?;
        let config = config::fetch_config(&conn)?;
        Ok(Ledger {
            conn: Arc::new(Mutex::new(conn)),
            config: RwLock::new(config),
            events,
        })
    }

    pub fn config(&self) -> Result<Config> {
        self.config
            .read()
            .map(|config| config.clone())
            .map_err(|err| LedgerError::Lock(err.to_string()))
    }

    fn emit(&self, event: NavEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("navigator is gone, dropping event");
        }
    }

    fn notice(&self, err: &LedgerError) {
        self.emit(NavEvent::Notice(err.to_string()));
    }

    async fn call<T, F>(&self, op: &'static str, f: F) -> Result<T>
    where
        F: Fn(&Connection) -> Result<T> + Send + Sync + 'static,
        T: Send + 'static,
    {
        let config = self.config()?;
        let f = Arc::new(f);
        let mut attempt = 0;
        loop {
            let conn = Arc::clone(&self.conn);
            let task = {
                let f = Arc::clone(&f);
                tokio::task::spawn_blocking(move || {
                    let guard = conn
                        .lock()
                        .map_err(|err| LedgerError::Lock(err.to_string()))?;
                    f(&*guard)
                })
            };

            let result = match tokio::time::timeout(config.op_timeout(), task).await {
                Err(_) => Err(LedgerError::Timeout(config.op_timeout_ms)),
                Ok(Err(err)) => Err(LedgerError::Join(err.to_string())),
                Ok(Ok(result)) => result,
            };

            match result {
                Err(err) if err.is_transient() && attempt < config.max_retries => {
                    attempt += 1;
                    tracing::warn!(op, attempt, error = %err, "transient failure, retrying");
                    tokio::time::sleep(backoff(attempt)).await;
                }
                Err(err) if err.is_refusal() => {
                    tracing::warn!(op, error = %err, "ledger call refused");
                    return Err(err);
                }
                Err(err) => {
                    tracing::error!(op, attempt, error = %err, "ledger call failed");
                    return Err(err);
                }
                Ok(value) => return Ok(value),
            }
        }
    }

    pub async fn update_config(&self, payload: ConfigPayload) -> Result<Config> {
        let updated = self
            .call("update_config", move |conn| config::update_config(conn, payload.clone()))
            .await?;
        let mut config = self
            .config
            .write()
            .map_err(|err| LedgerError::Lock(err.to_string()))?;
        *config = updated.clone();
        Ok(updated)
    }

    /// Create-wallet confirm: deposits into the wallet for this identity and
    /// returns home.
    pub async fn create_or_augment(
        &self,
        kind: EWalletType,
        wallet_name: Option<String>,
        delta: Decimal,
    ) -> Result<Wallet> {
        let config = self.config()?;
        let result = self
            .call("create_or_augment", move |conn| {
                wallet::create_or_augment(conn, kind, wallet_name.as_deref(), delta, &config)
            })
            .await;

        match &result {
            Ok(_) => self.emit(NavEvent::Navigate(Route::Home)),
            Err(err) => self.notice(err),
        }
        result
    }

    /// Save-transaction button: validates the form, records it, then opens
    /// the wallet's detail view.
    pub async fn record(&self, form: TransactionForm) -> Result<Recorded> {
        let new_tx = match form.validate() {
            Ok(new_tx) => new_tx,
            Err(err) => {
                self.notice(&err);
                return Err(err);
            }
        };

        let result = self
            .call("record", move |conn| recorder::record(conn, &new_tx))
            .await;

        match &result {
            Ok(recorded) => self.emit(NavEvent::Navigate(Route::wallet_details(&recorded.wallet))),
            Err(err) => self.notice(err),
        }
        result
    }

    /// Wallet-details lookup. Always settles, even when nothing matches.
    pub async fn resolve(&self, navigation_point: &str) -> LoadState<Wallet> {
        let point = navigation_point.to_string();
        LoadState::<Wallet>::settle(
            self.call("resolve", move |conn| resolve::resolve(conn, &point))
                .await,
        )
    }

    pub async fn resolve_exact(&self, wallet_name: &str, e_wallet_type: &str) -> LoadState<Wallet> {
        let wallet_name = wallet_name.to_string();
        let e_wallet_type = e_wallet_type.to_string();
        LoadState::<Wallet>::settle(
            self.call("resolve_exact", move |conn| {
                resolve::resolve_exact(conn, &wallet_name, &e_wallet_type)
            })
            .await,
        )
    }

    pub async fn list_wallets(&self) -> Result<Vec<Wallet>> {
        self.call("list_wallets", wallet::list_wallets).await
    }

    pub async fn wallet_history(&self, wallet_name: &str) -> Result<Vec<Transaction>> {
        let wallet_name = wallet_name.to_string();
        self.call("wallet_history", move |conn| {
            recorder::list_for_wallet(conn, &wallet_name)
        })
        .await
    }

    pub async fn balance_summary(&self) -> Result<BalanceSummary> {
        self.call("balance_summary", summary::compute_balance_summary)
            .await
    }

    /// Email step of onboarding: known emails go to sign-in, new ones to
    /// registration.
    pub async fn submit_email(&self, email: &str) -> Result<bool> {
        let email = email.trim().to_string();
        let lookup = email.clone();
        let result = self
            .call("email_exists", move |conn| users::email_exists(conn, &lookup))
            .await;

        match &result {
            Ok(true) => self.emit(NavEvent::Navigate(Route::LoginWithEmail { email })),
            Ok(false) => self.emit(NavEvent::Navigate(Route::Register { email })),
            Err(err) => self.notice(err),
        }
        result
    }

    /// Sign-up form: checks the password pair before it goes to the auth
    /// provider, then asks for the profile name. The password is not kept.
    pub fn submit_sign_up(&self, email: &str, password: &str, confirm_password: &str) -> Result<()> {
        let result = users::check_passwords(password, confirm_password);
        match &result {
            Ok(()) => self.emit(NavEvent::Navigate(Route::EnterName {
                email: email.trim().to_string(),
            })),
            Err(err) => self.notice(err),
        }
        result
    }

    /// Name step of sign-up: moves on to choosing a PIN.
    pub fn submit_name(&self, email: &str, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            let err = LedgerError::validation("Name cannot be empty");
            self.notice(&err);
            return Err(err);
        }
        self.emit(NavEvent::Navigate(Route::PinRegister {
            email: email.trim().to_string(),
            name: name.to_string(),
        }));
        Ok(())
    }

    pub async fn register_profile(&self, registration: Registration) -> Result<UserProfile> {
        let result = self
            .call("register_profile", move |conn| {
                users::register_profile(conn, &registration)
            })
            .await;

        match &result {
            Ok(_) => self.emit(NavEvent::Navigate(Route::Home)),
            Err(err) => self.notice(err),
        }
        result
    }

    pub async fn unlock(&self, email: &str, pin: &str) -> Result<UserProfile> {
        let email = email.to_string();
        let pin = pin.to_string();
        let result = self
            .call("unlock", move |conn| users::verify_pin(conn, &email, &pin))
            .await;

        match &result {
            Ok(_) => self.emit(NavEvent::Navigate(Route::Home)),
            Err(err) => self.notice(err),
        }
        result
    }
}
