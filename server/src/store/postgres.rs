// server/src/store/postgres.rs

//! sqlx / Postgres store. Schema lives in `server/migrations/`.

use super::{AccountStore, CatalogStore, OrderOrdering, OrderQuery, OrderStore, ProductOrdering, ProductQuery};
use super::{settled_order_error, Store, StoreTx};
use crate::errors::{AppError, Result};
use crate::models::{
  Account, Brand, Category, NewAccount, NewBrand, NewCategory, NewOrder, NewOrderItem, NewProduct, NewProductImage,
  Order, OrderAdminUpdate, OrderItem, OrderStatus, Product, ProductImage, ProductUpdate, ProfileUpdate, Session,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::{info, instrument};
use uuid::Uuid;

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, first_name, last_name, phone_number, profile_picture, \
                               shipping_address, roles, is_active, date_joined";
const PRODUCT_COLUMNS: &str = "id, name, slug, description, price, stock_quantity, category_id, brand_id, seller_id, \
                               is_active, is_featured, created_at, updated_at";
const ORDER_COLUMNS: &str = "id, order_number, customer_id, status, payment_method, total_amount, is_paid, \
                             shipping_address, shipping_method, tracking_number, created_at, updated_at";
const ORDER_ITEM_COLUMNS: &str = "id, order_id, product_id, quantity, price_at_time";

fn is_unique_violation(err: &sqlx::Error) -> bool {
  err.as_database_error().is_some_and(|d| d.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
  err.as_database_error().is_some_and(|d| d.is_foreign_key_violation())
}

/// Maps constraint violations to caller-facing errors; anything else stays a database error.
fn constraint_error(err: sqlx::Error, unique_msg: &str, foreign_key_msg: &str) -> AppError {
  if is_unique_violation(&err) {
    AppError::Validation(unique_msg.to_string())
  } else if is_foreign_key_violation(&err) {
    AppError::Validation(foreign_key_msg.to_string())
  } else {
    AppError::Sqlx(err)
  }
}

/// `%` and `_` in user input match literally.
fn like_pattern(term: &str) -> String {
  let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
  format!("%{}%", escaped)
}

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  #[instrument(name = "PgStore::connect", skip(database_url))]
  pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
    let pool = PgPoolOptions::new()
      .max_connections(max_connections)
      .connect(database_url)
      .await?;
    info!("Connected to Postgres.");
    Ok(Self::new(pool))
  }

  pub async fn migrate(&self) -> Result<()> {
    sqlx::migrate!("./migrations")
      .run(&self.pool)
      .await
      .map_err(|e| AppError::Internal(format!("Database migration failed: {}", e)))?;
    info!("Database migrations applied.");
    Ok(())
  }
}

#[async_trait]
impl AccountStore for PgStore {
  async fn insert_account(&self, new: NewAccount) -> Result<Account> {
    sqlx::query_as::<_, Account>(&format!(
      "INSERT INTO accounts (email, password_hash, first_name, last_name, phone_number, shipping_address, roles) \
       VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {ACCOUNT_COLUMNS}"
    ))
    .bind(&new.email)
    .bind(&new.password_hash)
    .bind(&new.first_name)
    .bind(&new.last_name)
    .bind(&new.phone_number)
    .bind(&new.shipping_address)
    .bind(new.roles.bits())
    .fetch_one(&self.pool)
    .await
    .map_err(|e| constraint_error(e, "An account with this email already exists.", "Invalid account reference."))
  }

  async fn account_by_id(&self, id: i64) -> Result<Option<Account>> {
    Ok(
      sqlx::query_as::<_, Account>(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn account_by_email(&self, email: &str) -> Result<Option<Account>> {
    Ok(
      sqlx::query_as::<_, Account>(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1"))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn update_profile(&self, id: i64, update: &ProfileUpdate) -> Result<Account> {
    sqlx::query_as::<_, Account>(&format!(
      "UPDATE accounts SET \
         first_name = COALESCE($2, first_name), \
         last_name = COALESCE($3, last_name), \
         phone_number = COALESCE($4, phone_number), \
         profile_picture = COALESCE($5, profile_picture), \
         shipping_address = COALESCE($6, shipping_address) \
       WHERE id = $1 RETURNING {ACCOUNT_COLUMNS}"
    ))
    .bind(id)
    .bind(&update.first_name)
    .bind(&update.last_name)
    .bind(&update.phone_number)
    .bind(&update.profile_picture)
    .bind(&update.shipping_address)
    .fetch_optional(&self.pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Account {} not found", id)))
  }

  async fn insert_session(&self, session: Session) -> Result<()> {
    sqlx::query(
      "INSERT INTO sessions (token, account_id, created_at, expires_at, revoked) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(session.token)
    .bind(session.account_id)
    .bind(session.created_at)
    .bind(session.expires_at)
    .bind(session.revoked)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn session(&self, token: Uuid) -> Result<Option<Session>> {
    Ok(
      sqlx::query_as::<_, Session>(
        "SELECT token, account_id, created_at, expires_at, revoked FROM sessions WHERE token = $1",
      )
      .bind(token)
      .fetch_optional(&self.pool)
      .await?,
    )
  }

  async fn revoke_session(&self, token: Uuid) -> Result<()> {
    sqlx::query("UPDATE sessions SET revoked = TRUE WHERE token = $1")
      .bind(token)
      .execute(&self.pool)
      .await?;
    Ok(())
  }
}

#[async_trait]
impl CatalogStore for PgStore {
  async fn insert_category(&self, new: NewCategory) -> Result<Category> {
    sqlx::query_as::<_, Category>(
      "INSERT INTO categories (name, slug, description, parent_id) VALUES ($1, $2, $3, $4) \
       RETURNING id, name, slug, description, parent_id",
    )
    .bind(&new.name)
    .bind(&new.slug)
    .bind(&new.description)
    .bind(new.parent_id)
    .fetch_one(&self.pool)
    .await
    .map_err(|e| {
      constraint_error(
        e,
        &format!("A category with slug '{}' already exists.", new.slug),
        "Parent category does not exist.",
      )
    })
  }

  async fn list_categories(&self) -> Result<Vec<Category>> {
    Ok(
      sqlx::query_as::<_, Category>("SELECT id, name, slug, description, parent_id FROM categories ORDER BY id")
        .fetch_all(&self.pool)
        .await?,
    )
  }

  async fn insert_brand(&self, new: NewBrand) -> Result<Brand> {
    sqlx::query_as::<_, Brand>(
      "INSERT INTO brands (name, description, logo) VALUES ($1, $2, $3) RETURNING id, name, description, logo",
    )
    .bind(&new.name)
    .bind(&new.description)
    .bind(&new.logo)
    .fetch_one(&self.pool)
    .await
    .map_err(|e| constraint_error(e, &format!("A brand named '{}' already exists.", new.name), "Invalid brand."))
  }

  async fn list_brands(&self) -> Result<Vec<Brand>> {
    Ok(
      sqlx::query_as::<_, Brand>("SELECT id, name, description, logo FROM brands ORDER BY id")
        .fetch_all(&self.pool)
        .await?,
    )
  }

  async fn insert_product(&self, new: NewProduct) -> Result<Product> {
    sqlx::query_as::<_, Product>(&format!(
      "INSERT INTO products (name, slug, description, price, stock_quantity, category_id, brand_id, seller_id, \
                             is_active, is_featured) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(&new.name)
    .bind(&new.slug)
    .bind(&new.description)
    .bind(new.price)
    .bind(new.stock_quantity)
    .bind(new.category_id)
    .bind(new.brand_id)
    .bind(new.seller_id)
    .bind(new.is_active)
    .bind(new.is_featured)
    .fetch_one(&self.pool)
    .await
    .map_err(|e| {
      constraint_error(
        e,
        &format!("A product with slug '{}' already exists.", new.slug),
        "Category or brand does not exist.",
      )
    })
  }

  async fn product_by_id(&self, id: i64) -> Result<Option<Product>> {
    Ok(
      sqlx::query_as::<_, Product>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn update_product(&self, id: i64, update: &ProductUpdate) -> Result<Product> {
    sqlx::query_as::<_, Product>(&format!(
      "UPDATE products SET \
         name = COALESCE($2, name), \
         slug = COALESCE($3, slug), \
         description = COALESCE($4, description), \
         price = COALESCE($5, price), \
         stock_quantity = COALESCE($6, stock_quantity), \
         category_id = COALESCE($7, category_id), \
         brand_id = COALESCE($8, brand_id), \
         is_active = COALESCE($9, is_active), \
         is_featured = COALESCE($10, is_featured), \
         updated_at = now() \
       WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(id)
    .bind(&update.name)
    .bind(&update.slug)
    .bind(&update.description)
    .bind(update.price)
    .bind(update.stock_quantity)
    .bind(update.category_id)
    .bind(update.brand_id)
    .bind(update.is_active)
    .bind(update.is_featured)
    .fetch_optional(&self.pool)
    .await
    .map_err(|e| constraint_error(e, "A product with this slug already exists.", "Category or brand does not exist."))?
    .ok_or_else(|| AppError::NotFound(format!("Product {} not found", id)))
  }

  async fn delete_product(&self, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await
      .map_err(|e| {
        if is_foreign_key_violation(&e) {
          AppError::Conflict("Product is referenced by existing orders and cannot be deleted.".to_string())
        } else {
          AppError::Sqlx(e)
        }
      })?;
    if result.rows_affected() == 0 {
      return Err(AppError::NotFound(format!("Product {} not found", id)));
    }
    Ok(())
  }

  #[instrument(name = "PgStore::list_products", skip(self))]
  async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>> {
    let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE TRUE"));
    if let Some(category) = query.category {
      qb.push(" AND category_id = ").push_bind(category);
    }
    if let Some(brand) = query.brand {
      qb.push(" AND brand_id = ").push_bind(brand);
    }
    if let Some(active) = query.is_active {
      qb.push(" AND is_active = ").push_bind(active);
    }
    if let Some(featured) = query.is_featured {
      qb.push(" AND is_featured = ").push_bind(featured);
    }
    if let Some(search) = query.search.as_deref() {
      let pattern = like_pattern(search);
      qb.push(" AND (name ILIKE ")
        .push_bind(pattern.clone())
        .push(" OR description ILIKE ")
        .push_bind(pattern)
        .push(")");
    }
    qb.push(match query.ordering {
      ProductOrdering::PriceAsc => " ORDER BY price ASC, id ASC",
      ProductOrdering::PriceDesc => " ORDER BY price DESC, id DESC",
      ProductOrdering::CreatedAsc => " ORDER BY created_at ASC, id ASC",
      ProductOrdering::CreatedDesc => " ORDER BY created_at DESC, id DESC",
    });
    Ok(qb.build_query_as::<Product>().fetch_all(&self.pool).await?)
  }

  async fn list_active_vendor_products(&self) -> Result<Vec<Product>> {
    Ok(
      sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products \
         WHERE is_active AND seller_id IN (SELECT id FROM accounts WHERE is_active) \
         ORDER BY created_at DESC, id DESC"
      ))
      .fetch_all(&self.pool)
      .await?,
    )
  }

  async fn insert_product_image(&self, product_id: i64, new: NewProductImage) -> Result<ProductImage> {
    let mut tx = self.pool.begin().await?;
    if new.is_primary {
      sqlx::query("UPDATE product_images SET is_primary = FALSE WHERE product_id = $1")
        .bind(product_id)
        .execute(&mut *tx)
        .await?;
    }
    let image = sqlx::query_as::<_, ProductImage>(
      "INSERT INTO product_images (product_id, image_url, is_primary) VALUES ($1, $2, $3) \
       RETURNING id, product_id, image_url, is_primary",
    )
    .bind(product_id)
    .bind(&new.image_url)
    .bind(new.is_primary)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
      if is_foreign_key_violation(&e) {
        AppError::NotFound(format!("Product {} not found", product_id))
      } else {
        AppError::Sqlx(e)
      }
    })?;
    tx.commit().await?;
    Ok(image)
  }

  async fn product_images(&self, product_id: i64) -> Result<Vec<ProductImage>> {
    Ok(
      sqlx::query_as::<_, ProductImage>(
        "SELECT id, product_id, image_url, is_primary FROM product_images WHERE product_id = $1 ORDER BY id",
      )
      .bind(product_id)
      .fetch_all(&self.pool)
      .await?,
    )
  }
}

#[async_trait]
impl OrderStore for PgStore {
  async fn order_by_id(&self, id: i64) -> Result<Option<Order>> {
    Ok(
      sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  #[instrument(name = "PgStore::list_orders", skip(self))]
  async fn list_orders(&self, query: &OrderQuery) -> Result<Vec<Order>> {
    let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {ORDER_COLUMNS} FROM orders WHERE TRUE"));
    if let Some(customer) = query.customer_id {
      qb.push(" AND customer_id = ").push_bind(customer);
    }
    if let Some(status) = query.status {
      qb.push(" AND status = ").push_bind(status);
    }
    if let Some(paid) = query.is_paid {
      qb.push(" AND is_paid = ").push_bind(paid);
    }
    if let Some(method) = query.payment_method {
      qb.push(" AND payment_method = ").push_bind(method);
    }
    if let Some(day) = query.created_date {
      qb.push(" AND (created_at AT TIME ZONE 'UTC')::date = ").push_bind(day);
    }
    if let Some(search) = query.search.as_deref() {
      let pattern = like_pattern(search);
      qb.push(" AND (COALESCE(order_number, '') ILIKE ")
        .push_bind(pattern.clone())
        .push(" OR shipping_address ILIKE ")
        .push_bind(pattern)
        .push(")");
    }
    qb.push(match query.ordering {
      OrderOrdering::CreatedAsc => " ORDER BY created_at ASC, id ASC",
      OrderOrdering::CreatedDesc => " ORDER BY created_at DESC, id DESC",
      OrderOrdering::TotalAsc => " ORDER BY total_amount ASC, id ASC",
      OrderOrdering::TotalDesc => " ORDER BY total_amount DESC, id DESC",
    });
    if let Some(limit) = query.limit {
      qb.push(" LIMIT ").push_bind(limit);
    }
    Ok(qb.build_query_as::<Order>().fetch_all(&self.pool).await?)
  }

  async fn items_for_orders(&self, order_ids: &[i64]) -> Result<Vec<OrderItem>> {
    Ok(
      sqlx::query_as::<_, OrderItem>(&format!(
        "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = ANY($1) ORDER BY id"
      ))
      .bind(order_ids.to_vec())
      .fetch_all(&self.pool)
      .await?,
    )
  }

  async fn update_order(&self, id: i64, update: &OrderAdminUpdate) -> Result<Order> {
    // Settled orders may only become refunded. The check is part of the UPDATE.
    let updated = sqlx::query_as::<_, Order>(&format!(
      "UPDATE orders SET \
         status = COALESCE($2, status), \
         is_paid = COALESCE($3, is_paid), \
         tracking_number = COALESCE($4, tracking_number), \
         shipping_method = COALESCE($5, shipping_method), \
         updated_at = now() \
       WHERE id = $1 \
         AND ($2::order_status IS NULL \
              OR $2::order_status = status \
              OR $2::order_status = 'RF' \
              OR status NOT IN ('CA', 'DE', 'RF')) \
       RETURNING {ORDER_COLUMNS}"
    ))
    .bind(id)
    .bind(update.status)
    .bind(update.is_paid)
    .bind(&update.tracking_number)
    .bind(&update.shipping_method)
    .fetch_optional(&self.pool)
    .await?;

    match updated {
      Some(order) => Ok(order),
      None => match self.order_by_id(id).await? {
        Some(current) => Err(settled_order_error(current.status)),
        None => Err(AppError::NotFound(format!("Order {} not found", id))),
      },
    }
  }
}

#[async_trait]
impl Store for PgStore {
  async fn begin(&self) -> Result<Box<dyn StoreTx>> {
    let tx = self.pool.begin().await?;
    Ok(Box::new(PgTx { tx }))
  }
}

struct PgTx {
  tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
  async fn lock_product(&mut self, id: i64) -> Result<Option<Product>> {
    Ok(
      sqlx::query_as::<_, Product>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?,
    )
  }

  async fn take_stock(&mut self, product_id: i64, quantity: i32) -> Result<bool> {
    let result = sqlx::query(
      "UPDATE products SET stock_quantity = stock_quantity - $2, updated_at = now() \
       WHERE id = $1 AND stock_quantity >= $2",
    )
    .bind(product_id)
    .bind(quantity)
    .execute(&mut *self.tx)
    .await?;
    Ok(result.rows_affected() == 1)
  }

  async fn restore_stock(&mut self, product_id: i64, quantity: i32) -> Result<()> {
    let result = sqlx::query("UPDATE products SET stock_quantity = stock_quantity + $2, updated_at = now() WHERE id = $1")
      .bind(product_id)
      .bind(quantity)
      .execute(&mut *self.tx)
      .await?;
    if result.rows_affected() == 0 {
      return Err(AppError::NotFound(format!("Product {} not found", product_id)));
    }
    Ok(())
  }

  async fn insert_order(&mut self, new: NewOrder) -> Result<Order> {
    Ok(
      sqlx::query_as::<_, Order>(&format!(
        "INSERT INTO orders (customer_id, status, payment_method, total_amount, is_paid, shipping_address, \
                             shipping_method) \
         VALUES ($1, $2, $3, 0, FALSE, $4, $5) RETURNING {ORDER_COLUMNS}"
      ))
      .bind(new.customer_id)
      .bind(OrderStatus::Pending)
      .bind(new.payment_method)
      .bind(&new.shipping_address)
      .bind(&new.shipping_method)
      .fetch_one(&mut *self.tx)
      .await?,
    )
  }

  async fn insert_order_item(&mut self, new: NewOrderItem) -> Result<OrderItem> {
    Ok(
      sqlx::query_as::<_, OrderItem>(&format!(
        "INSERT INTO order_items (order_id, product_id, quantity, price_at_time) VALUES ($1, $2, $3, $4) \
         RETURNING {ORDER_ITEM_COLUMNS}"
      ))
      .bind(new.order_id)
      .bind(new.product_id)
      .bind(new.quantity)
      .bind(new.price_at_time)
      .fetch_one(&mut *self.tx)
      .await?,
    )
  }

  async fn finalize_order(
    &mut self,
    order_id: i64,
    total_amount: Decimal,
    order_number: Option<String>,
  ) -> Result<Order> {
    sqlx::query_as::<_, Order>(&format!(
      "UPDATE orders SET total_amount = $2, order_number = COALESCE($3, order_number), updated_at = now() \
       WHERE id = $1 RETURNING {ORDER_COLUMNS}"
    ))
    .bind(order_id)
    .bind(total_amount)
    .bind(&order_number)
    .fetch_optional(&mut *self.tx)
    .await
    .map_err(|e| {
      if is_unique_violation(&e) {
        AppError::Conflict(format!(
          "Order number '{}' is already in use.",
          order_number.as_deref().unwrap_or_default()
        ))
      } else {
        AppError::Sqlx(e)
      }
    })?
    .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))
  }

  async fn lock_order(&mut self, id: i64) -> Result<Option<Order>> {
    Ok(
      sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?,
    )
  }

  async fn order_items(&mut self, order_id: i64) -> Result<Vec<OrderItem>> {
    Ok(
      sqlx::query_as::<_, OrderItem>(&format!(
        "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id"
      ))
      .bind(order_id)
      .fetch_all(&mut *self.tx)
      .await?,
    )
  }

  async fn set_order_status(&mut self, order_id: i64, status: OrderStatus) -> Result<Order> {
    sqlx::query_as::<_, Order>(&format!(
      "UPDATE orders SET status = $2, updated_at = now() WHERE id = $1 RETURNING {ORDER_COLUMNS}"
    ))
    .bind(order_id)
    .bind(status)
    .fetch_optional(&mut *self.tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))
  }

  async fn commit(self: Box<Self>) -> Result<()> {
    self.tx.commit().await?;
    Ok(())
  }
}
