// server/src/models/brand.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Brand {
  pub id: i64,
  pub name: String,
  pub description: String,
  pub logo: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBrand {
  pub name: String,
  #[serde(default)]
  pub description: String,
  pub logo: Option<String>,
}
