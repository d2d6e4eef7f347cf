// server/src/models/session.rs

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// A bearer token issued at sign-in.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
  pub token: Uuid,
  pub account_id: i64,
  pub created_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
  pub revoked: bool,
}

impl Session {
  pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
    !self.revoked && now < self.expires_at
  }
}
