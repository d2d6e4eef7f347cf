// server/src/models/category.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Category {
  pub id: i64,
  pub name: String,
  pub slug: String,
  pub description: String,
  /// Categories form a tree; roots have no parent.
  pub parent_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
  pub name: String,
  pub slug: String,
  #[serde(default)]
  pub description: String,
  pub parent_id: Option<i64>,
}
