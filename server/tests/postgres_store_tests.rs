// server/tests/postgres_store_tests.rs

//! Order workflows against a real Postgres database.
//!
//! Set `TEST_DATABASE_URL` to a scratch database to run these. Every test
//! truncates all tables first, so never point it at data you want to keep.
//! Without the variable each test returns early.

mod common;

use bazaar_server::errors::AppError;
use bazaar_server::models::{OrderAdminUpdate, OrderStatus, PaymentMethod};
use bazaar_server::services::order_service;
use bazaar_server::store::{OrderOrdering, OrderQuery, PgStore, ProductOrdering, ProductQuery};
use bazaar_server::AppState;
use common::*;
use rust_decimal_macros::dec;
use serial_test::serial;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

async fn pg_state() -> Option<AppState> {
  let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
    eprintln!("TEST_DATABASE_URL not set, skipping Postgres test");
    return None;
  };
  setup_tracing();
  let pool = PgPoolOptions::new().max_connections(8).connect(&url).await.unwrap();
  let store = PgStore::new(pool.clone());
  store.migrate().await.unwrap();
  sqlx::query(
    "TRUNCATE order_items, orders, product_images, products, brands, categories, sessions, accounts \
     RESTART IDENTITY CASCADE",
  )
  .execute(&pool)
  .await
  .unwrap();
  Some(AppState::new(Arc::new(store), test_config()))
}

#[tokio::test]
#[serial]
async fn pg_placement_takes_stock_and_stores_enums() {
  let Some(state) = pg_state().await else { return };
  let vendor = seller(&state, "vendor@example.com").await;
  let buyer = customer(&state, "buyer@example.com").await;
  let lamp = create_product(&state, &vendor, "desk-lamp", dec!(19.99), 5).await;

  let mut request = order_request(&[(lamp.id, 3)]);
  request.payment_method = PaymentMethod::PayPal;
  let placed = order_service::place_order(&state, &buyer, request).await.unwrap();

  assert_eq!(placed.order.total_amount, dec!(59.97));
  assert_eq!(placed.items[0].price_at_time, dec!(19.99));
  assert!(placed.order.order_number.is_some());
  assert_eq!(stock_of(&state, lamp.id).await, 2);

  let stored = state.store.order_by_id(placed.order.id).await.unwrap().unwrap();
  assert_eq!(stored.status, OrderStatus::Pending);
  assert_eq!(stored.payment_method, PaymentMethod::PayPal);
  assert_eq!(stored.order_number, placed.order.order_number);
}

#[tokio::test]
#[serial]
async fn pg_insufficient_stock_rolls_everything_back() {
  let Some(state) = pg_state().await else { return };
  let vendor = seller(&state, "vendor@example.com").await;
  let buyer = customer(&state, "buyer@example.com").await;
  let chair = create_product(&state, &vendor, "chair", dec!(80.00), 5).await;
  let table = create_product(&state, &vendor, "table", dec!(250.00), 1).await;

  let err = order_service::place_order(&state, &buyer, order_request(&[(chair.id, 2), (table.id, 2)]))
    .await
    .unwrap_err();

  match err {
    AppError::InsufficientStock {
      product_id,
      available,
      requested,
      ..
    } => {
      assert_eq!(product_id, table.id);
      assert_eq!(available, 1);
      assert_eq!(requested, 2);
    }
    other => panic!("expected insufficient stock, got {:?}", other),
  }
  assert_eq!(stock_of(&state, chair.id).await, 5);
  assert_eq!(stock_of(&state, table.id).await, 1);
  assert!(state.store.list_orders(&OrderQuery::default()).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn pg_concurrent_orders_for_the_last_unit_have_one_winner() {
  let Some(state) = pg_state().await else { return };
  let vendor = seller(&state, "vendor@example.com").await;
  let last_one = create_product(&state, &vendor, "last-one", dec!(99.00), 1).await;
  let mut buyers = Vec::new();
  for n in 0..4 {
    buyers.push(customer(&state, &format!("buyer{}@example.com", n)).await);
  }

  let mut handles = Vec::new();
  for buyer in buyers {
    let state = state.clone();
    let request = order_request(&[(last_one.id, 1)]);
    handles.push(tokio::spawn(async move {
      order_service::place_order(&state, &buyer, request).await
    }));
  }

  let mut successes = 0;
  let mut stock_failures = 0;
  for handle in handles {
    match handle.await.unwrap() {
      Ok(_) => successes += 1,
      Err(AppError::InsufficientStock { .. }) => stock_failures += 1,
      Err(other) => panic!("unexpected error: {:?}", other),
    }
  }

  assert_eq!(successes, 1);
  assert_eq!(stock_failures, 3);
  assert_eq!(stock_of(&state, last_one.id).await, 0);
  assert_eq!(state.store.list_orders(&OrderQuery::default()).await.unwrap().len(), 1);
}

#[tokio::test]
#[serial]
async fn pg_cancel_restores_stock_once() {
  let Some(state) = pg_state().await else { return };
  let vendor = seller(&state, "vendor@example.com").await;
  let buyer = customer(&state, "buyer@example.com").await;
  let admin = staff(&state, "staff@example.com").await;
  let cup = create_product(&state, &vendor, "cup", dec!(3.00), 3).await;
  let saucer = create_product(&state, &vendor, "saucer", dec!(2.00), 4).await;

  let placed = order_service::place_order(&state, &buyer, order_request(&[(cup.id, 2), (saucer.id, 1)]))
    .await
    .unwrap();
  assert_eq!(stock_of(&state, cup.id).await, 1);
  assert_eq!(stock_of(&state, saucer.id).await, 3);

  let cancelled = order_service::cancel_order(&state, &buyer, placed.order.id).await.unwrap();
  assert_eq!(cancelled.order.status, OrderStatus::Cancelled);
  assert_eq!(stock_of(&state, cup.id).await, 3);
  assert_eq!(stock_of(&state, saucer.id).await, 4);

  let reopen = OrderAdminUpdate {
    status: Some(OrderStatus::Pending),
    ..Default::default()
  };
  let err = order_service::admin_update(&state, &admin, placed.order.id, reopen).await.unwrap_err();
  assert!(matches!(err, AppError::InvalidStateTransition(_)));

  let err = order_service::cancel_order(&state, &buyer, placed.order.id).await.unwrap_err();
  assert!(matches!(err, AppError::InvalidStateTransition(_)));
  assert_eq!(stock_of(&state, cup.id).await, 3);
  assert_eq!(stock_of(&state, saucer.id).await, 4);
}

#[tokio::test]
#[serial]
async fn pg_shipped_orders_cannot_be_cancelled() {
  let Some(state) = pg_state().await else { return };
  let vendor = seller(&state, "vendor@example.com").await;
  let buyer = customer(&state, "buyer@example.com").await;
  let admin = staff(&state, "staff@example.com").await;
  let vase = create_product(&state, &vendor, "vase", dec!(30.00), 2).await;
  let placed = order_service::place_order(&state, &buyer, order_request(&[(vase.id, 1)])).await.unwrap();

  let ship = OrderAdminUpdate {
    status: Some(OrderStatus::Shipped),
    tracking_number: Some("TRK-7".to_string()),
    ..Default::default()
  };
  let shipped = order_service::admin_update(&state, &admin, placed.order.id, ship).await.unwrap();
  assert_eq!(shipped.order.status, OrderStatus::Shipped);
  assert_eq!(shipped.order.tracking_number.as_deref(), Some("TRK-7"));

  let err = order_service::cancel_order(&state, &buyer, placed.order.id).await.unwrap_err();
  assert!(matches!(err, AppError::InvalidStateTransition(_)));
  assert_eq!(stock_of(&state, vase.id).await, 1);
}

#[tokio::test]
#[serial]
async fn pg_listing_filters_and_ordering() {
  let Some(state) = pg_state().await else { return };
  let vendor = seller(&state, "vendor@example.com").await;
  let buyer = customer(&state, "buyer@example.com").await;
  let other = customer(&state, "other@example.com").await;
  let oak = create_product(&state, &vendor, "oak-table", dec!(250.00), 10).await;
  let chair = create_product(&state, &vendor, "oak-chair", dec!(80.00), 10).await;
  create_product(&state, &vendor, "steel-lamp", dec!(40.00), 10).await;

  let found = state
    .store
    .list_products(&ProductQuery {
      search: Some("OAK".to_string()),
      ordering: ProductOrdering::PriceAsc,
      ..Default::default()
    })
    .await
    .unwrap();
  let ids: Vec<i64> = found.iter().map(|p| p.id).collect();
  assert_eq!(ids, vec![chair.id, oak.id]);

  let small = order_service::place_order(&state, &buyer, order_request(&[(chair.id, 1)])).await.unwrap();
  let big = order_service::place_order(&state, &buyer, order_request(&[(oak.id, 1)])).await.unwrap();
  order_service::place_order(&state, &other, order_request(&[(chair.id, 2)])).await.unwrap();

  let mine = order_service::list_orders(
    &state,
    &buyer,
    OrderQuery {
      ordering: OrderOrdering::TotalDesc,
      ..Default::default()
    },
  )
  .await
  .unwrap();
  let ids: Vec<i64> = mine.iter().map(|d| d.order.id).collect();
  assert_eq!(ids, vec![big.order.id, small.order.id]);
}

#[tokio::test]
#[serial]
async fn pg_referenced_products_cannot_be_deleted() {
  let Some(state) = pg_state().await else { return };
  let vendor = seller(&state, "vendor@example.com").await;
  let buyer = customer(&state, "buyer@example.com").await;
  let lamp = create_product(&state, &vendor, "desk-lamp", dec!(19.99), 5).await;
  let spare = create_product(&state, &vendor, "spare-bulb", dec!(2.00), 5).await;
  order_service::place_order(&state, &buyer, order_request(&[(lamp.id, 1)])).await.unwrap();

  let err = state.store.delete_product(lamp.id).await.unwrap_err();
  assert!(matches!(err, AppError::Conflict(_)));
  state.store.delete_product(spare.id).await.unwrap();
  assert!(state.store.product_by_id(spare.id).await.unwrap().is_none());
}
