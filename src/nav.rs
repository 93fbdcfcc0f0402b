//! Typed routes and the event channel screens use to ask for navigation.

use std::fmt;

use tokio::sync::mpsc;

use crate::{
    error::{LedgerError, Result},
    model::{EWalletType, Wallet},
    resolve,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Onboarding,
    InputEmail,
    LoginWithEmail { email: String },
    Register { email: String },
    /// Profile name entry after sign-up; the password stays with the auth provider.
    EnterName { email: String },
    PinLogin { email: String },
    PinRegister { email: String, name: String },
    Home,
    CreateWallet,
    WalletDetails { navigation_point: String },
    AddTransaction { wallet_name: String, e_wallet_type: EWalletType },
    Budgeting,
    Add,
    Insights,
    Settings,
}

fn encode_segment(segment: &str) -> String {
    segment.replace('%', "%25").replace('/', "%2F")
}

fn decode_segment(segment: &str) -> String {
    segment.replace("%2F", "/").replace("%2f", "/").replace("%25", "%")
}

impl Route {
    pub fn wallet_details(wallet: &Wallet) -> Self {
        Route::WalletDetails {
            navigation_point: resolve::navigation_point(wallet).to_string(),
        }
    }

    pub fn add_transaction(wallet: &Wallet) -> Self {
        Route::AddTransaction {
            wallet_name: wallet.wallet_name.clone(),
            e_wallet_type: wallet.e_wallet_type,
        }
    }

    pub fn parse(path: &str) -> Result<Route> {
        let segments: Vec<String> = path
            .trim_matches('/')
            .split('/')
            .map(decode_segment)
            .collect();
        let parts: Vec<&str> = segments.iter().map(String::as_str).collect();

        let route = match parts.as_slice() {
            ["onboarding"] => Route::Onboarding,
            ["input_email"] => Route::InputEmail,
            ["login_with_email", email] => Route::LoginWithEmail { email: email.to_string() },
            ["register", email] => Route::Register { email: email.to_string() },
            ["enter_name", email] => Route::EnterName { email: email.to_string() },
            ["pin_login", email] => Route::PinLogin { email: email.to_string() },
            ["pin_register", email, name] => Route::PinRegister {
                email: email.to_string(),
                name: name.to_string(),
            },
            ["home"] => Route::Home,
            ["create_wallet"] => Route::CreateWallet,
            ["walletDetails", point] if !point.is_empty() => Route::WalletDetails {
                navigation_point: point.to_string(),
            },
            ["add_transaction", wallet_name, e_wallet_type] => Route::AddTransaction {
                wallet_name: wallet_name.to_string(),
                e_wallet_type: e_wallet_type.parse()?,
            },
            ["budgeting"] => Route::Budgeting,
            ["add"] => Route::Add,
            ["insights"] => Route::Insights,
            ["settings"] => Route::Settings,
            _ => return Err(LedgerError::NotFound(format!("route {}", path))),
        };
        Ok(route)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Onboarding => f.write_str("onboarding"),
            Route::InputEmail => f.write_str("input_email"),
            Route::LoginWithEmail { email } => write!(f, "login_with_email/{}", encode_segment(email)),
            Route::Register { email } => write!(f, "register/{}", encode_segment(email)),
            Route::EnterName { email } => write!(f, "enter_name/{}", encode_segment(email)),
            Route::PinLogin { email } => write!(f, "pin_login/{}", encode_segment(email)),
            Route::PinRegister { email, name } => write!(
                f,
                "pin_register/{}/{}",
                encode_segment(email),
                encode_segment(name)
            ),
            Route::Home => f.write_str("home"),
            Route::CreateWallet => f.write_str("create_wallet"),
            Route::WalletDetails { navigation_point } => {
                write!(f, "walletDetails/{}", encode_segment(navigation_point))
            }
            Route::AddTransaction { wallet_name, e_wallet_type } => write!(
                f,
                "add_transaction/{}/{}",
                encode_segment(wallet_name),
                e_wallet_type
            ),
            Route::Budgeting => f.write_str("budgeting"),
            Route::Add => f.write_str("add"),
            Route::Insights => f.write_str("insights"),
            Route::Settings => f.write_str("settings"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NavEvent {
    Navigate(Route),
    Back,
    /// A short, non-blocking message for the user.
    Notice(String),
}

pub type NavSender = mpsc::UnboundedSender<NavEvent>;
pub type NavReceiver = mpsc::UnboundedReceiver<NavEvent>;

pub fn channel() -> (NavSender, NavReceiver) {
    mpsc::unbounded_channel()
}

/// Owns the back stack. Screens never touch it directly; they send events.
#[derive(Debug)]
pub struct Navigator {
    stack: Vec<Route>,
    notices: Vec<String>,
}

impl Navigator {
    pub fn new(start: Route) -> Self {
        Navigator {
            stack: vec![start],
            notices: Vec::new(),
        }
    }

    pub fn current(&self) -> Option<&Route> {
        self.stack.last()
    }

    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    pub fn apply(&mut self, event: NavEvent) {
        match event {
            NavEvent::Navigate(Route::Home) => {
                // Home is the root of the signed-in graph.
                self.stack.clear();
                self.stack.push(Route::Home);
            }
            NavEvent::Navigate(route) => {
                if self.current() != Some(&route) {
                    tracing::debug!(route = %route, "navigate");
                    self.stack.push(route);
                }
            }
            NavEvent::Back => {
                if self.stack.len() > 1 {
                    self.stack.pop();
                }
            }
            NavEvent::Notice(message) => self.notices.push(message),
        }
    }

    /// Applies events until every sender is dropped.
    pub async fn run(&mut self, mut events: NavReceiver) {
        while let Some(event) = events.recv().await {
            self.apply(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_formats_wallet_routes() {
        let route = Route::parse("add_transaction/MyCash/Other").expect("parse");
        assert_eq!(
            route,
            Route::AddTransaction {
                wallet_name: "MyCash".to_string(),
                e_wallet_type: EWalletType::Other,
            }
        );
        assert_eq!(route.to_string(), "add_transaction/MyCash/Other");

        let route = Route::WalletDetails {
            navigation_point: "Kas 50/50%".to_string(),
        };
        assert_eq!(route.to_string(), "walletDetails/Kas 50%2F50%25");
        assert_eq!(Route::parse(&route.to_string()).expect("parse"), route);
    }

    #[test]
    fn rejects_unknown_routes() {
        assert!(Route::parse("walletDetails/").is_err());
        assert!(Route::parse("add_transaction/MyCash/Dana").is_err());
        assert!(Route::parse("enter_name/kane@example.com/rahasia").is_err());
    }

    #[test]
    fn home_resets_the_stack() {
        let mut nav = Navigator::new(Route::Onboarding);
        nav.apply(NavEvent::Navigate(Route::InputEmail));
        nav.apply(NavEvent::Navigate(Route::Home));
        nav.apply(NavEvent::Back);
        assert_eq!(nav.current(), Some(&Route::Home));
    }

    #[test]
    fn same_route_is_not_pushed_twice() {
        let mut nav = Navigator::new(Route::Home);
        let route = Route::WalletDetails {
            navigation_point: "GoPay".to_string(),
        };
        nav.apply(NavEvent::Navigate(route.clone()));
        nav.apply(NavEvent::Navigate(route.clone()));
        nav.apply(NavEvent::Back);
        assert_eq!(nav.current(), Some(&Route::Home));
    }

    #[tokio::test]
    async fn run_drains_events_until_senders_close() {
        let (tx, rx) = channel();
        tx.send(NavEvent::Navigate(Route::CreateWallet)).unwrap();
        tx.send(NavEvent::Notice("Wallet tidak ditemukan!".to_string())).unwrap();
        drop(tx);

        let mut nav = Navigator::new(Route::Home);
        nav.run(rx).await;
        assert_eq!(nav.current(), Some(&Route::CreateWallet));
        assert_eq!(nav.notices(), ["Wallet tidak ditemukan!".to_string()]);
    }
}
