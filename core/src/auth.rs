use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use chrono::Utc;
use rand::Rng;
use tracing::{info, warn};

use crate::error::AuthError;
use crate::models::{Account, NewAccount, is_valid_username};
use crate::store::AccountStore;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Salted Argon2id hash in PHC string form.
pub fn hash_secret(secret: &str) -> Result<String, AuthError> {
    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);
    let salt = SaltString::encode_b64(&bytes).map_err(|e| AuthError::Hash(e.to_string()))?;
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

/// `false` for a mismatch and for a hash that does not parse.
#[must_use]
pub fn verify_secret(secret: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .is_ok()
}

/// Security answers compare case- and whitespace-insensitively.
fn normalize_answer(answer: &str) -> String {
    answer.trim().to_lowercase()
}

fn check_password(password: &str, confirm: &str) -> Result<(), AuthError> {
    let strong = password.chars().count() >= MIN_PASSWORD_LEN
        && password.chars().any(char::is_alphabetic)
        && password.chars().any(|c| c.is_ascii_digit());
    if !strong {
        return Err(AuthError::WeakPassword);
    }
    if password != confirm {
        return Err(AuthError::PasswordMismatch);
    }
    Ok(())
}

pub fn create_account<A: AccountStore + ?Sized>(
    store: &A,
    new: &NewAccount,
) -> Result<Account, AuthError> {
    let username = new.username.trim();
    if !is_valid_username(username) {
        return Err(AuthError::InvalidUsername);
    }
    check_password(&new.password, &new.confirm_password)?;
    let question = new.security_question.trim();
    let answer = normalize_answer(&new.security_answer);
    if question.is_empty() || answer.is_empty() {
        return Err(AuthError::MissingSecurityAnswer);
    }
    if store.get_account(username)?.is_some() {
        return Err(AuthError::UsernameTaken);
    }

    let account = Account {
        username: username.to_string(),
        password_hash: hash_secret(&new.password)?,
        security_question: question.to_string(),
        security_answer_hash: hash_secret(&answer)?,
        created_at: Utc::now().to_rfc3339(),
    };
    store.create_account(&account)?;
    info!(username, "account created");
    Ok(account)
}

pub fn authenticate<A: AccountStore + ?Sized>(
    store: &A,
    username: &str,
    password: &str,
) -> Result<Account, AuthError> {
    match store.get_account(username.trim())? {
        Some(account) if verify_secret(password, &account.password_hash) => Ok(account),
        _ => {
            warn!(username, "authentication failed");
            Err(AuthError::InvalidCredentials)
        }
    }
}

/// Unknown users get `InvalidCredentials`, same as a wrong answer would.
pub fn security_question<A: AccountStore + ?Sized>(
    store: &A,
    username: &str,
) -> Result<String, AuthError> {
    store
        .get_account(username.trim())?
        .map(|a| a.security_question)
        .ok_or(AuthError::InvalidCredentials)
}

pub fn reset_password<A: AccountStore + ?Sized>(
    store: &A,
    username: &str,
    answer: &str,
    new_password: &str,
    confirm: &str,
) -> Result<(), AuthError> {
    let Some(mut account) = store.get_account(username.trim())? else {
        warn!(username, "password reset for unknown account");
        return Err(AuthError::InvalidCredentials);
    };
    if !verify_secret(&normalize_answer(answer), &account.security_answer_hash) {
        warn!(username, "password reset with wrong security answer");
        return Err(AuthError::InvalidCredentials);
    }
    check_password(new_password, confirm)?;

    account.password_hash = hash_secret(new_password)?;
    store.update_account(&account)?;
    info!(username, "password reset");
    Ok(())
}
