// server/src/store/memory.rs

//! In-process store. All tables sit behind one async mutex; a transaction
//! owns that mutex and works on a copy of the tables, so transactions are
//! fully serialized and a dropped transaction leaves no trace.
//!
//! While a `MemoryTx` is alive, calling any non-transactional `Store` method
//! from the same task waits forever. Workflow steps only use the transaction.

use super::{matches_search, settled_order_error, AccountStore, CatalogStore, OrderOrdering, OrderQuery, OrderStore, ProductOrdering};
use super::{ProductQuery, Store, StoreTx};
use crate::errors::{AppError, Result};
use crate::models::{
  Account, Brand, Category, NewAccount, NewBrand, NewCategory, NewOrder, NewOrderItem, NewProduct, NewProductImage,
  Order, OrderAdminUpdate, OrderItem, OrderStatus, Product, ProductImage, ProductUpdate, ProfileUpdate, Session,
};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct Tables {
  next_id: HashMap<&'static str, i64>,
  accounts: BTreeMap<i64, Account>,
  sessions: HashMap<Uuid, Session>,
  categories: BTreeMap<i64, Category>,
  brands: BTreeMap<i64, Brand>,
  products: BTreeMap<i64, Product>,
  product_images: BTreeMap<i64, ProductImage>,
  orders: BTreeMap<i64, Order>,
  order_items: BTreeMap<i64, OrderItem>,
}

impl Tables {
  fn allocate_id(&mut self, table: &'static str) -> i64 {
    let next = self.next_id.entry(table).or_insert(0);
    *next += 1;
    *next
  }

  fn product_mut(&mut self, id: i64) -> Result<&mut Product> {
    self
      .products
      .get_mut(&id)
      .ok_or_else(|| AppError::NotFound(format!("Product {} not found", id)))
  }

  fn order_mut(&mut self, id: i64) -> Result<&mut Order> {
    self
      .orders
      .get_mut(&id)
      .ok_or_else(|| AppError::NotFound(format!("Order {} not found", id)))
  }

  fn ensure_product_slug_free(&self, slug: &str, except: Option<i64>) -> Result<()> {
    if self.products.values().any(|p| p.slug == slug && Some(p.id) != except) {
      return Err(AppError::Validation(format!("A product with slug '{}' already exists.", slug)));
    }
    Ok(())
  }

  fn ensure_catalog_refs(&self, category_id: Option<i64>, brand_id: Option<i64>) -> Result<()> {
    if let Some(id) = category_id {
      if !self.categories.contains_key(&id) {
        return Err(AppError::Validation(format!("Category {} does not exist.", id)));
      }
    }
    if let Some(id) = brand_id {
      if !self.brands.contains_key(&id) {
        return Err(AppError::Validation(format!("Brand {} does not exist.", id)));
      }
    }
    Ok(())
  }

  fn items_of(&self, order_id: i64) -> Vec<OrderItem> {
    self
      .order_items
      .values()
      .filter(|i| i.order_id == order_id)
      .cloned()
      .collect()
  }
}

/// Store backed by process memory. Used for local runs without a database and
/// by the test-suite.
///
/// Transactions run one at a time, and `begin` clones every table into a
/// working copy, so each placement or cancellation costs time proportional to
/// the whole data set. Fine for development and tests, not for production load.
#[derive(Clone, Default)]
pub struct MemoryStore {
  tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl AccountStore for MemoryStore {
  async fn insert_account(&self, new: NewAccount) -> Result<Account> {
    let mut t = self.tables.lock().await;
    if t.accounts.values().any(|a| a.email == new.email) {
      return Err(AppError::Validation("An account with this email already exists.".to_string()));
    }
    let id = t.allocate_id("accounts");
    let account = Account {
      id,
      email: new.email,
      password_hash: new.password_hash,
      first_name: new.first_name,
      last_name: new.last_name,
      phone_number: new.phone_number,
      profile_picture: None,
      shipping_address: new.shipping_address,
      roles: new.roles,
      is_active: true,
      date_joined: Utc::now(),
    };
    t.accounts.insert(id, account.clone());
    Ok(account)
  }

  async fn account_by_id(&self, id: i64) -> Result<Option<Account>> {
    Ok(self.tables.lock().await.accounts.get(&id).cloned())
  }

  async fn account_by_email(&self, email: &str) -> Result<Option<Account>> {
    let t = self.tables.lock().await;
    Ok(t.accounts.values().find(|a| a.email == email).cloned())
  }

  async fn update_profile(&self, id: i64, update: &ProfileUpdate) -> Result<Account> {
    let mut t = self.tables.lock().await;
    let account = t
      .accounts
      .get_mut(&id)
      .ok_or_else(|| AppError::NotFound(format!("Account {} not found", id)))?;
    update.apply(account);
    Ok(account.clone())
  }

  async fn insert_session(&self, session: Session) -> Result<()> {
    self.tables.lock().await.sessions.insert(session.token, session);
    Ok(())
  }

  async fn session(&self, token: Uuid) -> Result<Option<Session>> {
    Ok(self.tables.lock().await.sessions.get(&token).cloned())
  }

  async fn revoke_session(&self, token: Uuid) -> Result<()> {
    if let Some(s) = self.tables.lock().await.sessions.get_mut(&token) {
      s.revoked = true;
    }
    Ok(())
  }
}

#[async_trait]
impl CatalogStore for MemoryStore {
  async fn insert_category(&self, new: NewCategory) -> Result<Category> {
    let mut t = self.tables.lock().await;
    if t.categories.values().any(|c| c.slug == new.slug) {
      return Err(AppError::Validation(format!("A category with slug '{}' already exists.", new.slug)));
    }
    if let Some(parent) = new.parent_id {
      if !t.categories.contains_key(&parent) {
        return Err(AppError::Validation(format!("Parent category {} does not exist.", parent)));
      }
    }
    let id = t.allocate_id("categories");
    let category = Category {
      id,
      name: new.name,
      slug: new.slug,
      description: new.description,
      parent_id: new.parent_id,
    };
    t.categories.insert(id, category.clone());
    Ok(category)
  }

  async fn list_categories(&self) -> Result<Vec<Category>> {
    Ok(self.tables.lock().await.categories.values().cloned().collect())
  }

  async fn insert_brand(&self, new: NewBrand) -> Result<Brand> {
    let mut t = self.tables.lock().await;
    if t.brands.values().any(|b| b.name == new.name) {
      return Err(AppError::Validation(format!("A brand named '{}' already exists.", new.name)));
    }
    let id = t.allocate_id("brands");
    let brand = Brand {
      id,
      name: new.name,
      description: new.description,
      logo: new.logo,
    };
    t.brands.insert(id, brand.clone());
    Ok(brand)
  }

  async fn list_brands(&self) -> Result<Vec<Brand>> {
    Ok(self.tables.lock().await.brands.values().cloned().collect())
  }

  async fn insert_product(&self, new: NewProduct) -> Result<Product> {
    let mut t = self.tables.lock().await;
    t.ensure_product_slug_free(&new.slug, None)?;
    t.ensure_catalog_refs(new.category_id, new.brand_id)?;
    let id = t.allocate_id("products");
    let now = Utc::now();
    let product = Product {
      id,
      name: new.name,
      slug: new.slug,
      description: new.description,
      price: new.price,
      stock_quantity: new.stock_quantity,
      category_id: new.category_id,
      brand_id: new.brand_id,
      seller_id: new.seller_id,
      is_active: new.is_active,
      is_featured: new.is_featured,
      created_at: now,
      updated_at: now,
    };
    t.products.insert(id, product.clone());
    Ok(product)
  }

  async fn product_by_id(&self, id: i64) -> Result<Option<Product>> {
    Ok(self.tables.lock().await.products.get(&id).cloned())
  }

  async fn update_product(&self, id: i64, update: &ProductUpdate) -> Result<Product> {
    let mut t = self.tables.lock().await;
    if let Some(slug) = &update.slug {
      t.ensure_product_slug_free(slug, Some(id))?;
    }
    t.ensure_catalog_refs(update.category_id, update.brand_id)?;
    let product = t.product_mut(id)?;
    update.apply(product);
    product.updated_at = Utc::now();
    Ok(product.clone())
  }

  async fn delete_product(&self, id: i64) -> Result<()> {
    let mut t = self.tables.lock().await;
    if !t.products.contains_key(&id) {
      return Err(AppError::NotFound(format!("Product {} not found", id)));
    }
    if t.order_items.values().any(|i| i.product_id == id) {
      return Err(AppError::Conflict(
        "Product is referenced by existing orders and cannot be deleted.".to_string(),
      ));
    }
    t.products.remove(&id);
    t.product_images.retain(|_, img| img.product_id != id);
    Ok(())
  }

  #[instrument(name = "MemoryStore::list_products", skip(self))]
  async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>> {
    let t = self.tables.lock().await;
    let mut products: Vec<Product> = t
      .products
      .values()
      .filter(|p| query.category.map_or(true, |c| p.category_id == Some(c)))
      .filter(|p| query.brand.map_or(true, |b| p.brand_id == Some(b)))
      .filter(|p| query.is_active.map_or(true, |v| p.is_active == v))
      .filter(|p| query.is_featured.map_or(true, |v| p.is_featured == v))
      .filter(|p| {
        query
          .search
          .as_deref()
          .map_or(true, |s| matches_search(s, &[p.name.as_str(), p.description.as_str()]))
      })
      .cloned()
      .collect();
    match query.ordering {
      ProductOrdering::PriceAsc => products.sort_by(|a, b| a.price.cmp(&b.price).then(a.id.cmp(&b.id))),
      ProductOrdering::PriceDesc => products.sort_by(|a, b| b.price.cmp(&a.price).then(b.id.cmp(&a.id))),
      ProductOrdering::CreatedAsc => products.sort_by_key(|p| (p.created_at, p.id)),
      ProductOrdering::CreatedDesc => products.sort_by_key(|p| std::cmp::Reverse((p.created_at, p.id))),
    }
    debug!(count = products.len(), "Listed products.");
    Ok(products)
  }

  async fn list_active_vendor_products(&self) -> Result<Vec<Product>> {
    let t = self.tables.lock().await;
    let mut products: Vec<Product> = t
      .products
      .values()
      .filter(|p| p.is_active)
      .filter(|p| t.accounts.get(&p.seller_id).is_some_and(|a| a.is_active))
      .cloned()
      .collect();
    products.sort_by_key(|p| std::cmp::Reverse((p.created_at, p.id)));
    Ok(products)
  }

  async fn insert_product_image(&self, product_id: i64, new: NewProductImage) -> Result<ProductImage> {
    let mut t = self.tables.lock().await;
    if !t.products.contains_key(&product_id) {
      return Err(AppError::NotFound(format!("Product {} not found", product_id)));
    }
    if new.is_primary {
      for img in t.product_images.values_mut().filter(|i| i.product_id == product_id) {
        img.is_primary = false;
      }
    }
    let id = t.allocate_id("product_images");
    let image = ProductImage {
      id,
      product_id,
      image_url: new.image_url,
      is_primary: new.is_primary,
    };
    t.product_images.insert(id, image.clone());
    Ok(image)
  }

  async fn product_images(&self, product_id: i64) -> Result<Vec<ProductImage>> {
    let t = self.tables.lock().await;
    Ok(
      t.product_images
        .values()
        .filter(|i| i.product_id == product_id)
        .cloned()
        .collect(),
    )
  }
}

#[async_trait]
impl OrderStore for MemoryStore {
  async fn order_by_id(&self, id: i64) -> Result<Option<Order>> {
    Ok(self.tables.lock().await.orders.get(&id).cloned())
  }

  #[instrument(name = "MemoryStore::list_orders", skip(self))]
  async fn list_orders(&self, query: &OrderQuery) -> Result<Vec<Order>> {
    let t = self.tables.lock().await;
    let mut orders: Vec<Order> = t
      .orders
      .values()
      .filter(|o| query.customer_id.map_or(true, |c| o.customer_id == c))
      .filter(|o| query.status.map_or(true, |s| o.status == s))
      .filter(|o| query.is_paid.map_or(true, |v| o.is_paid == v))
      .filter(|o| query.payment_method.map_or(true, |m| o.payment_method == m))
      .filter(|o| query.created_date.map_or(true, |d| o.created_at.date_naive() == d))
      .filter(|o| {
        query.search.as_deref().map_or(true, |s| {
          matches_search(s, &[o.order_number.as_deref().unwrap_or(""), o.shipping_address.as_str()])
        })
      })
      .cloned()
      .collect();
    match query.ordering {
      OrderOrdering::CreatedAsc => orders.sort_by_key(|o| (o.created_at, o.id)),
      OrderOrdering::CreatedDesc => orders.sort_by_key(|o| std::cmp::Reverse((o.created_at, o.id))),
      OrderOrdering::TotalAsc => orders.sort_by(|a, b| a.total_amount.cmp(&b.total_amount).then(a.id.cmp(&b.id))),
      OrderOrdering::TotalDesc => orders.sort_by(|a, b| b.total_amount.cmp(&a.total_amount).then(b.id.cmp(&a.id))),
    }
    if let Some(limit) = query.limit {
      orders.truncate(usize::try_from(limit).unwrap_or(0));
    }
    Ok(orders)
  }

  async fn items_for_orders(&self, order_ids: &[i64]) -> Result<Vec<OrderItem>> {
    let t = self.tables.lock().await;
    Ok(
      t.order_items
        .values()
        .filter(|i| order_ids.contains(&i.order_id))
        .cloned()
        .collect(),
    )
  }

  async fn update_order(&self, id: i64, update: &OrderAdminUpdate) -> Result<Order> {
    let mut t = self.tables.lock().await;
    let order = t.order_mut(id)?;
    if let Some(next) = update.status {
      if !order.status.admin_can_become(next) {
        return Err(settled_order_error(order.status));
      }
    }
    update.apply(order);
    order.updated_at = Utc::now();
    Ok(order.clone())
  }
}

#[async_trait]
impl Store for MemoryStore {
  /// Holds the table lock until the transaction is committed or dropped.
  /// Clones all tables.
  async fn begin(&self) -> Result<Box<dyn StoreTx>> {
    let guard = Arc::clone(&self.tables).lock_owned().await;
    let working = guard.clone();
    Ok(Box::new(MemoryTx { guard, working }))
  }
}

struct MemoryTx {
  guard: OwnedMutexGuard<Tables>,
  working: Tables,
}

#[async_trait]
impl StoreTx for MemoryTx {
  async fn lock_product(&mut self, id: i64) -> Result<Option<Product>> {
    Ok(self.working.products.get(&id).cloned())
  }

  async fn take_stock(&mut self, product_id: i64, quantity: i32) -> Result<bool> {
    let product = self.working.product_mut(product_id)?;
    if product.stock_quantity < quantity {
      return Ok(false);
    }
    product.stock_quantity -= quantity;
    product.updated_at = Utc::now();
    Ok(true)
  }

  async fn restore_stock(&mut self, product_id: i64, quantity: i32) -> Result<()> {
    let product = self.working.product_mut(product_id)?;
    product.stock_quantity = product
      .stock_quantity
      .checked_add(quantity)
      .ok_or_else(|| AppError::Internal(format!("Stock overflow for product {}", product_id)))?;
    product.updated_at = Utc::now();
    Ok(())
  }

  async fn insert_order(&mut self, new: NewOrder) -> Result<Order> {
    let id = self.working.allocate_id("orders");
    let now = Utc::now();
    let order = Order {
      id,
      order_number: None,
      customer_id: new.customer_id,
      status: OrderStatus::Pending,
      payment_method: new.payment_method,
      total_amount: Decimal::ZERO,
      is_paid: false,
      shipping_address: new.shipping_address,
      shipping_method: new.shipping_method,
      tracking_number: None,
      created_at: now,
      updated_at: now,
    };
    self.working.orders.insert(id, order.clone());
    Ok(order)
  }

  async fn insert_order_item(&mut self, new: NewOrderItem) -> Result<OrderItem> {
    if !self.working.orders.contains_key(&new.order_id) {
      return Err(AppError::NotFound(format!("Order {} not found", new.order_id)));
    }
    if !self.working.products.contains_key(&new.product_id) {
      return Err(AppError::NotFound(format!("Product {} not found", new.product_id)));
    }
    let id = self.working.allocate_id("order_items");
    let item = OrderItem {
      id,
      order_id: new.order_id,
      product_id: new.product_id,
      quantity: new.quantity,
      price_at_time: new.price_at_time,
    };
    self.working.order_items.insert(id, item.clone());
    Ok(item)
  }

  async fn finalize_order(
    &mut self,
    order_id: i64,
    total_amount: Decimal,
    order_number: Option<String>,
  ) -> Result<Order> {
    if let Some(number) = &order_number {
      let taken = self
        .working
        .orders
        .values()
        .any(|o| o.id != order_id && o.order_number.as_deref() == Some(number.as_str()));
      if taken {
        return Err(AppError::Conflict(format!("Order number '{}' is already in use.", number)));
      }
    }
    let order = self.working.order_mut(order_id)?;
    order.total_amount = total_amount;
    if order_number.is_some() {
      order.order_number = order_number;
    }
    order.updated_at = Utc::now();
    Ok(order.clone())
  }

  async fn lock_order(&mut self, id: i64) -> Result<Option<Order>> {
    Ok(self.working.orders.get(&id).cloned())
  }

  async fn order_items(&mut self, order_id: i64) -> Result<Vec<OrderItem>> {
    Ok(self.working.items_of(order_id))
  }

  async fn set_order_status(&mut self, order_id: i64, status: OrderStatus) -> Result<Order> {
    let order = self.working.order_mut(order_id)?;
    order.status = status;
    order.updated_at = Utc::now();
    Ok(order.clone())
  }

  async fn commit(self: Box<Self>) -> Result<()> {
    let MemoryTx { mut guard, working } = *self;
    *guard = working;
    debug!("Memory transaction committed.");
    Ok(())
  }
}
