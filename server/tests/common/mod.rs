// server/tests/common/mod.rs
#![allow(dead_code)]

use bazaar_server::config::AppConfig;
use bazaar_server::models::{
  Account, NewAccount, NewProduct, OrderLineRequest, PaymentMethod, PlaceOrderRequest, Product, Role, Roles,
};
use bazaar_server::services::auth_service;
use bazaar_server::store::MemoryStore;
use bazaar_server::AppState;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::Level;

pub const PASSWORD: &str = "correct-horse-9";

/// Hashed once; argon2 is slow in unoptimized test builds.
static PASSWORD_HASH: Lazy<String> = Lazy::new(|| auth_service::hash_password(PASSWORD).unwrap());

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

/// Defaults only: in-memory store, 24h sessions.
pub fn test_config() -> AppConfig {
  AppConfig::from_lookup(|_| None).expect("default config is valid")
}

pub fn test_state() -> AppState {
  setup_tracing();
  AppState::new(Arc::new(MemoryStore::new()), test_config())
}

pub async fn create_account(state: &AppState, email: &str, roles: &[Role]) -> Account {
  state
    .store
    .insert_account(NewAccount {
      email: email.to_string(),
      password_hash: PASSWORD_HASH.clone(),
      first_name: "Test".to_string(),
      last_name: "User".to_string(),
      phone_number: None,
      shipping_address: Some("1 Test Street".to_string()),
      roles: Roles::of(roles),
    })
    .await
    .unwrap()
}

pub async fn customer(state: &AppState, email: &str) -> Account {
  create_account(state, email, &[Role::Customer]).await
}

pub async fn seller(state: &AppState, email: &str) -> Account {
  create_account(state, email, &[Role::Customer, Role::Seller]).await
}

pub async fn staff(state: &AppState, email: &str) -> Account {
  create_account(state, email, &[Role::Customer, Role::Staff]).await
}

pub async fn create_product(state: &AppState, seller: &Account, slug: &str, price: Decimal, stock: i32) -> Product {
  state
    .store
    .insert_product(NewProduct {
      name: slug.replace('-', " "),
      slug: slug.to_string(),
      description: format!("{} for tests", slug),
      price,
      stock_quantity: stock,
      category_id: None,
      brand_id: None,
      is_active: true,
      is_featured: false,
      seller_id: seller.id,
    })
    .await
    .unwrap()
}

pub fn order_request(lines: &[(i64, i64)]) -> PlaceOrderRequest {
  PlaceOrderRequest {
    items: lines
      .iter()
      .map(|&(product_id, quantity)| OrderLineRequest { product_id, quantity })
      .collect(),
    payment_method: PaymentMethod::CreditCard,
    shipping_address: "221B Baker Street".to_string(),
    shipping_method: "standard".to_string(),
  }
}

pub async fn stock_of(state: &AppState, product_id: i64) -> i32 {
  state.store.product_by_id(product_id).await.unwrap().unwrap().stock_quantity
}

/// A bearer header value for `account`, skipping the login round trip.
pub async fn bearer_for(state: &AppState, account: &Account) -> String {
  let session = auth_service::issue_session(state.store.as_ref(), account.id, 1).await.unwrap();
  format!("Bearer {}", session.token)
}
