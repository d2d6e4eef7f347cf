// server/src/store/mod.rs

//! Persistence for accounts, the catalog and orders.
//!
//! Plain reads and single-record writes go straight through the `Store`.
//! Multi-record workflows (placing and cancelling orders) open a `StoreTx`
//! with `Store::begin` and either `commit` it or drop it, which rolls back.
//!
//! Two backends implement the traits: `PgStore` (sqlx / Postgres) and
//! `MemoryStore` (tables behind a single async mutex).

pub mod memory;
pub mod postgres;

use crate::errors::{AppError, Result};
use crate::models::{
  Account, Brand, Category, NewAccount, NewBrand, NewCategory, NewOrder, NewOrderItem, NewProduct, NewProductImage,
  Order, OrderAdminUpdate, OrderItem, OrderStatus, PaymentMethod, Product, ProductImage, ProductUpdate, ProfileUpdate,
  Session,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Most recent orders shown by the "recent orders" listing.
pub const RECENT_ORDERS_LIMIT: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum ProductOrdering {
  #[serde(rename = "price")]
  PriceAsc,
  #[serde(rename = "-price")]
  PriceDesc,
  #[serde(rename = "created_at")]
  CreatedAsc,
  #[default]
  #[serde(rename = "-created_at")]
  CreatedDesc,
}

/// Filters for the product listing. Every field narrows the result.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
  pub category: Option<i64>,
  pub brand: Option<i64>,
  pub is_active: Option<bool>,
  pub is_featured: Option<bool>,
  /// Case-insensitive substring of name or description.
  pub search: Option<String>,
  #[serde(default)]
  pub ordering: ProductOrdering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum OrderOrdering {
  #[serde(rename = "created_at")]
  CreatedAsc,
  #[default]
  #[serde(rename = "-created_at")]
  CreatedDesc,
  #[serde(rename = "total_amount")]
  TotalAsc,
  #[serde(rename = "-total_amount")]
  TotalDesc,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderQuery {
  pub status: Option<OrderStatus>,
  pub is_paid: Option<bool>,
  pub payment_method: Option<PaymentMethod>,
  /// Calendar day (UTC) the order was created on.
  pub created_date: Option<NaiveDate>,
  /// Case-insensitive substring of order number or shipping address.
  pub search: Option<String>,
  #[serde(default)]
  pub ordering: OrderOrdering,
  /// Restricts the listing to one customer. Set from the caller, not the query string.
  #[serde(skip)]
  pub customer_id: Option<i64>,
  #[serde(skip)]
  pub limit: Option<i64>,
}

pub(crate) fn settled_order_error(status: OrderStatus) -> AppError {
  AppError::InvalidStateTransition(format!(
    "{} orders can only be marked as refunded",
    status.display_name()
  ))
}

pub(crate) fn matches_search(term: &str, haystacks: &[&str]) -> bool {
  let needle = term.to_lowercase();
  haystacks.iter().any(|h| h.to_lowercase().contains(&needle))
}

#[async_trait]
pub trait AccountStore: Send + Sync {
  async fn insert_account(&self, new: NewAccount) -> Result<Account>;
  async fn account_by_id(&self, id: i64) -> Result<Option<Account>>;
  async fn account_by_email(&self, email: &str) -> Result<Option<Account>>;
  async fn update_profile(&self, id: i64, update: &ProfileUpdate) -> Result<Account>;

  async fn insert_session(&self, session: Session) -> Result<()>;
  async fn session(&self, token: Uuid) -> Result<Option<Session>>;
  async fn revoke_session(&self, token: Uuid) -> Result<()>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
  async fn insert_category(&self, new: NewCategory) -> Result<Category>;
  async fn list_categories(&self) -> Result<Vec<Category>>;
  async fn insert_brand(&self, new: NewBrand) -> Result<Brand>;
  async fn list_brands(&self) -> Result<Vec<Brand>>;

  async fn insert_product(&self, new: NewProduct) -> Result<Product>;
  async fn product_by_id(&self, id: i64) -> Result<Option<Product>>;
  async fn update_product(&self, id: i64, update: &ProductUpdate) -> Result<Product>;
  /// Fails with `Conflict` while any order item references the product.
  async fn delete_product(&self, id: i64) -> Result<()>;
  async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>>;
  /// Active products whose seller account is active, newest first.
  async fn list_active_vendor_products(&self) -> Result<Vec<Product>>;

  /// A primary image demotes every other image of the product.
  async fn insert_product_image(&self, product_id: i64, new: NewProductImage) -> Result<ProductImage>;
  async fn product_images(&self, product_id: i64) -> Result<Vec<ProductImage>>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
  async fn order_by_id(&self, id: i64) -> Result<Option<Order>>;
  async fn list_orders(&self, query: &OrderQuery) -> Result<Vec<Order>>;
  async fn items_for_orders(&self, order_ids: &[i64]) -> Result<Vec<OrderItem>>;
  async fn update_order(&self, id: i64, update: &OrderAdminUpdate) -> Result<Order>;
}

#[async_trait]
pub trait Store: AccountStore + CatalogStore + OrderStore {
  /// Opens a transaction. Until it is committed or dropped, other
  /// transactions touching the same rows wait.
  async fn begin(&self) -> Result<Box<dyn StoreTx>>;
}

/// A unit of work used by the order workflows.
///
/// Nothing written through it is visible to others before `commit`; dropping
/// it discards every write.
#[async_trait]
pub trait StoreTx: Send {
  /// Loads the product and holds its row lock until the transaction ends.
  async fn lock_product(&mut self, id: i64) -> Result<Option<Product>>;
  /// Atomic conditional decrement. `false` means the stock was lower than `quantity`
  /// and nothing changed.
  async fn take_stock(&mut self, product_id: i64, quantity: i32) -> Result<bool>;
  async fn restore_stock(&mut self, product_id: i64, quantity: i32) -> Result<()>;

  async fn insert_order(&mut self, new: NewOrder) -> Result<Order>;
  async fn insert_order_item(&mut self, new: NewOrderItem) -> Result<OrderItem>;
  /// Persists the computed total and, when given, the order number.
  async fn finalize_order(&mut self, order_id: i64, total_amount: Decimal, order_number: Option<String>)
    -> Result<Order>;

  async fn lock_order(&mut self, id: i64) -> Result<Option<Order>>;
  async fn order_items(&mut self, order_id: i64) -> Result<Vec<OrderItem>>;
  async fn set_order_status(&mut self, order_id: i64, status: OrderStatus) -> Result<Order>;

  async fn commit(self: Box<Self>) -> Result<()>;
}
