//! User profiles kept alongside the ledger.
//!
//! Sign-in and sign-up themselves belong to the auth provider. This module
//! only stores the profile created after sign-up and the PIN that unlocks the
//! app afterwards. Passwords are checked as a pair and never stored.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

const PIN_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub email: String,
    pub name: String,
    #[serde(rename = "createdAt")]
    pub created_ts_utc: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub email: String,
    pub name: String,
    pub pin: String,
    pub confirm_pin: String,
}

/// Checked before the password is handed to the auth provider.
pub fn check_passwords(password: &str, confirm_password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(LedgerError::validation("Email or password cannot be empty"));
    }
    if password != confirm_password {
        return Err(LedgerError::validation("Passwords do not match"));
    }
    Ok(())
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(LedgerError::validation("Please enter a valid email"));
    }
    Ok(email.to_string())
}

fn check_pin(pin: &str) -> Result<()> {
    if pin.len() != PIN_LEN || !pin.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LedgerError::validation("PIN must be 4 digits"));
    }
    Ok(())
}

fn hash_pin(pin: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(pin.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| LedgerError::Credential(err.to_string()))
}

pub fn email_exists(conn: &Connection, email: &str) -> Result<bool> {
    let email = normalize_email(email)?;
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE email = ?1",
        [email.as_str()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Stores the profile for a freshly signed-up account, replacing any
/// previous profile under the same email.
pub fn register_profile(conn: &Connection, registration: &Registration) -> Result<UserProfile> {
    let email = normalize_email(&registration.email)?;
    let name = registration.name.trim();
    if name.is_empty() {
        return Err(LedgerError::validation("Name cannot be empty"));
    }
    check_pin(&registration.pin)?;
    if registration.pin != registration.confirm_pin {
        return Err(LedgerError::validation("PINs do not match"));
    }

    let pin_hash = hash_pin(&registration.pin)?;
    let created_ts_utc = Utc::now().timestamp_millis();
    conn.execute(
        "INSERT INTO users (email, name, pin, created_ts_utc) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(email) DO UPDATE SET name = excluded.name, pin = excluded.pin",
        params![email, name, pin_hash, created_ts_utc],
    )?;
    tracing::info!(email = %email, "user profile saved");

    fetch_profile(conn, &email)?
        .ok_or_else(|| LedgerError::NotFound(format!("user {}", email)))
}

pub fn fetch_profile(conn: &Connection, email: &str) -> Result<Option<UserProfile>> {
    let profile = conn
        .query_row(
            "SELECT email, name, created_ts_utc FROM users WHERE email = ?1",
            [email.trim()],
            |row| {
                Ok(UserProfile {
                    email: row.get(0)?,
                    name: row.get(1)?,
                    created_ts_utc: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(profile)
}

/// Unlocks the app for `email`. Unknown emails and wrong PINs look the same.
pub fn verify_pin(conn: &Connection, email: &str, pin: &str) -> Result<UserProfile> {
    let email = normalize_email(email)?;
    let stored: Option<String> = conn
        .query_row(
            "SELECT pin FROM users WHERE email = ?1",
            [email.as_str()],
            |row| row.get(0),
        )
        .optional()?;

    let verified = stored.is_some_and(|stored| {
        PasswordHash::new(&stored)
            .map(|hash| Argon2::default().verify_password(pin.as_bytes(), &hash).is_ok())
            .unwrap_or(false)
    });
    if !verified {
        tracing::warn!(email = %email, "pin rejected");
        return Err(LedgerError::validation("Wrong PIN!"));
    }

    fetch_profile(conn, &email)?
        .ok_or_else(|| LedgerError::NotFound(format!("user {}", email)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_conn;

    fn registration(pin: &str, confirm_pin: &str) -> Registration {
        Registration {
            email: " kane@example.com ".to_string(),
            name: "Kane".to_string(),
            pin: pin.to_string(),
            confirm_pin: confirm_pin.to_string(),
        }
    }

    #[test]
    fn registers_and_unlocks_with_pin() {
        let conn = test_conn();
        assert!(!email_exists(&conn, "kane@example.com").expect("exists"));

        let profile = register_profile(&conn, &registration("1234", "1234")).expect("register");
        assert_eq!(profile.email, "kane@example.com");
        assert!(email_exists(&conn, "kane@example.com").expect("exists"));

        let unlocked = verify_pin(&conn, "kane@example.com", "1234").expect("unlock");
        assert_eq!(unlocked.name, "Kane");
    }

    #[test]
    fn pin_is_not_stored_in_clear() {
        let conn = test_conn();
        register_profile(&conn, &registration("1234", "1234")).expect("register");
        let stored: String = conn
            .query_row("SELECT pin FROM users", [], |row| row.get(0))
            .expect("pin");
        assert_ne!(stored, "1234");
        assert!(stored.starts_with("$argon2"));
    }

    #[test]
    fn wrong_pin_and_unknown_email_are_rejected() {
        let conn = test_conn();
        register_profile(&conn, &registration("1234", "1234")).expect("register");

        let err = verify_pin(&conn, "kane@example.com", "4321").unwrap_err();
        assert_eq!(err.to_string(), "Wrong PIN!");
        let err = verify_pin(&conn, "nobody@example.com", "1234").unwrap_err();
        assert_eq!(err.to_string(), "Wrong PIN!");
    }

    #[test]
    fn registration_validates_pin() {
        let conn = test_conn();
        let err = register_profile(&conn, &registration("1234", "1243")).unwrap_err();
        assert_eq!(err.to_string(), "PINs do not match");

        assert!(register_profile(&conn, &registration("12a4", "12a4")).is_err());
        assert!(register_profile(&conn, &registration("12345", "12345")).is_err());
        assert!(fetch_profile(&conn, "kane@example.com").expect("fetch").is_none());
    }

    #[test]
    fn passwords_must_match() {
        assert!(check_passwords("rahasia", "rahasia").is_ok());
        let err = check_passwords("rahasia", "rahasia1").unwrap_err();
        assert_eq!(err.to_string(), "Passwords do not match");
        assert!(check_passwords("", "").is_err());
    }

    #[test]
    fn blank_email_is_invalid() {
        let conn = test_conn();
        assert!(matches!(email_exists(&conn, "   "), Err(LedgerError::Validation(_))));
    }
}
