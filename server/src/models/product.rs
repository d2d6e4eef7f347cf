// server/src/models/product.rs

use crate::errors::{AppError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
  pub id: i64,
  pub name: String,
  pub slug: String,
  pub description: String,
  pub price: Decimal,
  /// Never negative; only seller edits and the order workflows change it.
  pub stock_quantity: i32,
  pub category_id: Option<i64>,
  pub brand_id: Option<i64>,
  pub seller_id: i64,
  pub is_active: bool,
  pub is_featured: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Product {
  pub fn is_in_stock(&self) -> bool {
    self.stock_quantity > 0
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProductImage {
  pub id: i64,
  pub product_id: i64,
  pub image_url: String,
  pub is_primary: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
  pub name: String,
  pub slug: String,
  #[serde(default)]
  pub description: String,
  pub price: Decimal,
  #[serde(default)]
  pub stock_quantity: i32,
  pub category_id: Option<i64>,
  pub brand_id: Option<i64>,
  #[serde(default = "default_true")]
  pub is_active: bool,
  #[serde(default)]
  pub is_featured: bool,
  /// Filled from the authenticated caller, never from the body.
  #[serde(skip)]
  pub seller_id: i64,
}

fn default_true() -> bool {
  true
}

/// Largest amount a `NUMERIC(10,2)` column holds.
pub fn max_amount() -> Decimal {
  Decimal::new(9_999_999_999, 2)
}

/// True when `amount` has at most two decimal places and fits a `NUMERIC(10,2)`.
pub fn is_storable_amount(amount: Decimal) -> bool {
  amount.normalize().scale() <= 2 && amount.abs() <= max_amount()
}

fn check_price(price: Decimal) -> Result<()> {
  if price < Decimal::ZERO {
    return Err(AppError::Validation("Price cannot be negative.".to_string()));
  }
  if price.normalize().scale() > 2 {
    return Err(AppError::Validation("Price can have at most two decimal places.".to_string()));
  }
  if price > max_amount() {
    return Err(AppError::Validation(format!("Price cannot exceed {}.", max_amount())));
  }
  Ok(())
}

fn check_stock(stock_quantity: i32) -> Result<()> {
  if stock_quantity < 0 {
    return Err(AppError::Validation("Stock quantity cannot be negative.".to_string()));
  }
  Ok(())
}

fn check_not_blank(field: &str, value: &str) -> Result<()> {
  if value.trim().is_empty() {
    return Err(AppError::Validation(format!("{} cannot be blank.", field)));
  }
  Ok(())
}

impl NewProduct {
  pub fn validate(&self) -> Result<()> {
    check_not_blank("Name", &self.name)?;
    check_not_blank("Slug", &self.slug)?;
    check_price(self.price)?;
    check_stock(self.stock_quantity)
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductUpdate {
  pub name: Option<String>,
  pub slug: Option<String>,
  pub description: Option<String>,
  pub price: Option<Decimal>,
  pub stock_quantity: Option<i32>,
  pub category_id: Option<i64>,
  pub brand_id: Option<i64>,
  pub is_active: Option<bool>,
  pub is_featured: Option<bool>,
}

impl ProductUpdate {
  pub fn validate(&self) -> Result<()> {
    if let Some(name) = &self.name {
      check_not_blank("Name", name)?;
    }
    if let Some(slug) = &self.slug {
      check_not_blank("Slug", slug)?;
    }
    if let Some(price) = self.price {
      check_price(price)?;
    }
    if let Some(stock) = self.stock_quantity {
      check_stock(stock)?;
    }
    Ok(())
  }

  pub fn apply(&self, product: &mut Product) {
    if let Some(v) = &self.name {
      product.name = v.clone();
    }
    if let Some(v) = &self.slug {
      product.slug = v.clone();
    }
    if let Some(v) = &self.description {
      product.description = v.clone();
    }
    if let Some(v) = self.price {
      product.price = v;
    }
    if let Some(v) = self.stock_quantity {
      product.stock_quantity = v;
    }
    if let Some(v) = self.category_id {
      product.category_id = Some(v);
    }
    if let Some(v) = self.brand_id {
      product.brand_id = Some(v);
    }
    if let Some(v) = self.is_active {
      product.is_active = v;
    }
    if let Some(v) = self.is_featured {
      product.is_featured = v;
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProductImage {
  pub image_url: String,
  #[serde(default)]
  pub is_primary: bool,
}
