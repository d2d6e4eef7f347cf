// server/src/services/auth_service.rs

//! Password hashing and session tokens.

use crate::errors::AppError;
use crate::models::{Account, Session};
use crate::store::Store;
use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use chrono::{Duration, Utc};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Hashes a plain-text password with Argon2 and a random salt.
#[instrument(name = "auth_service::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String, AppError> {
  if password.is_empty() {
    return Err(AppError::Validation("Password cannot be empty.".to_string()));
  }

  let salt = SaltString::generate(&mut OsRng);
  match Argon2::default().hash_password(password.as_bytes(), &salt) {
    Ok(hash) => {
      debug!("Password hashed.");
      Ok(hash.to_string())
    }
    Err(argon_err) => {
      error!(error = %argon_err, "Argon2 password hashing failed.");
      Err(AppError::Internal(format!("Password hashing failed: {}", argon_err)))
    }
  }
}

/// Checks `provided_password` against a stored Argon2 hash.
///
/// `Ok(false)` is a plain mismatch; an unparsable stored hash is an internal error.
#[instrument(
  name = "auth_service::verify_password",
  skip(stored_hash, provided_password),
  err(Display),
  fields(hash_len = stored_hash.len())
)]
pub fn verify_password(stored_hash: &str, provided_password: &str) -> Result<bool, AppError> {
  if provided_password.is_empty() {
    return Ok(false);
  }

  let parsed_hash = PasswordHash::new(stored_hash).map_err(|parse_err| {
    error!(error = %parse_err, "Stored password hash is not parsable.");
    AppError::Internal(format!("Invalid stored password hash: {}", parse_err))
  })?;

  match Argon2::default().verify_password(provided_password.as_bytes(), &parsed_hash) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => {
      debug!("Password mismatch.");
      Ok(false)
    }
    Err(other) => {
      error!(error = %other, "Argon2 password verification failed.");
      Err(AppError::Internal(format!("Password verification failed: {}", other)))
    }
  }
}

/// Issues a fresh bearer token valid for `ttl_hours`.
#[instrument(name = "auth_service::issue_session", skip(store), err(Display))]
pub async fn issue_session(store: &dyn Store, account_id: i64, ttl_hours: i64) -> Result<Session, AppError> {
  let now = Utc::now();
  let session = Session {
    token: Uuid::new_v4(),
    account_id,
    created_at: now,
    expires_at: now + Duration::hours(ttl_hours),
    revoked: false,
  };
  store.insert_session(session.clone()).await?;
  info!(account_id, expires_at = %session.expires_at, "Session issued.");
  Ok(session)
}

/// Resolves a bearer token to its session and active account.
///
/// Unknown, revoked and expired tokens, and tokens of deactivated accounts,
/// all fail the same way.
#[instrument(name = "auth_service::authenticate", skip_all, err(Display))]
pub async fn authenticate(store: &dyn Store, token: Uuid) -> Result<(Session, Account), AppError> {
  let rejected = || AppError::Auth("Invalid or expired session token.".to_string());

  let session = store.session(token).await?.ok_or_else(rejected)?;
  if !session.is_usable_at(Utc::now()) {
    warn!(account_id = session.account_id, "Unusable session token presented.");
    return Err(rejected());
  }
  let account = store
    .account_by_id(session.account_id)
    .await?
    .filter(|a| a.is_active)
    .ok_or_else(rejected)?;
  Ok((session, account))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hash_then_verify() {
    let hash = hash_password("correct horse").unwrap();
    assert!(verify_password(&hash, "correct horse").unwrap());
    assert!(!verify_password(&hash, "wrong horse").unwrap());
    assert!(!verify_password(&hash, "").unwrap());
  }

  #[test]
  fn empty_password_is_rejected() {
    assert!(matches!(hash_password(""), Err(AppError::Validation(_))));
  }

  #[test]
  fn garbage_hash_is_internal_error() {
    assert!(matches!(verify_password("not-a-hash", "pw"), Err(AppError::Internal(_))));
  }
}
