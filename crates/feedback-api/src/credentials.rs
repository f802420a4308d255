//! Registration and password authentication.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{
        SaltString,
        rand_core::{OsRng, RngCore},
    },
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use tracing::info;

use feedback_db::unique_violation;
use feedback_types::api::RegisterForm;
use feedback_types::models::User;
use feedback_types::validation::FieldError;

use crate::auth::{AppState, run_blocking};
use crate::error::AppError;

/// A user together with the nonce its session tokens must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub user: User,
    pub session_nonce: String,
}

/// Validate, hash and store a new account.
///
/// Uniqueness is left to the database: a UNIQUE constraint failure on
/// `username` or `email` comes back as a validation error on that field.
pub async fn register(state: &AppState, form: &RegisterForm) -> Result<Account, AppError> {
    let errors = form.validate();
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let user = User {
        username: form.username.clone(),
        email: form.email.clone(),
        first_name: form.first_name.clone(),
        last_name: form.last_name.clone(),
    };
    let password = form.password.clone();
    let session_nonce = new_session_nonce();
    let row = user.clone();
    let nonce = session_nonce.clone();

    let result = run_blocking(state, move |db| {
        let password_hash = hash_password(&password)?;
        db.create_user(
            &row.username,
            &password_hash,
            &row.email,
            &row.first_name,
            &row.last_name,
            &nonce,
        )
    })
    .await;

    if let Err(e) = result {
        return Err(match unique_violation(&e).as_deref() {
            Some("username") => AppError::Validation(vec![FieldError::new(
                "username",
                "Username is already taken",
            )]),
            Some("email") => AppError::Validation(vec![FieldError::new(
                "email",
                "Email is already registered",
            )]),
            _ => AppError::Internal(e),
        });
    }

    info!("Registered user {}", user.username);
    Ok(Account { user, session_nonce })
}

/// `Ok(None)` when the user is unknown or the password does not match; only
/// storage failures are errors.
pub async fn authenticate(
    state: &AppState,
    username: &str,
    password: &str,
) -> Result<Option<Account>, AppError> {
    let username = username.to_string();
    let password = password.to_string();

    let account = run_blocking(state, move |db| {
        let Some(row) = db.get_user_by_username(&username)? else {
            return Ok(None);
        };
        if !verify_password(&password, &row.password)? {
            return Ok(None);
        }
        let session_nonce = row.session_nonce.clone();
        Ok(Some(Account {
            user: User::from(row),
            session_nonce,
        }))
    })
    .await?;

    Ok(account)
}

/// 128 random bits, URL-safe so it can sit in a token claim as is.
fn new_session_nonce() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    B64.encode(bytes)
}

/// Argon2id with a fresh random salt, encoded as a PHC string.
pub(crate) fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

/// A stored hash that cannot be parsed is an error, not a mismatch.
pub(crate) fn verify_password(password: &str, stored: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| anyhow::anyhow!("Corrupt password hash in database: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
