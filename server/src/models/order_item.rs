// server/src/models/order_item.rs

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

/// One line of an order. Written once, together with its order.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItem {
  pub id: i64,
  pub order_id: i64,
  pub product_id: i64,
  pub quantity: i32,
  /// Product price when the order was placed; later price edits do not reach it.
  pub price_at_time: Decimal,
}

impl OrderItem {
  pub fn total_price(&self) -> Decimal {
    Decimal::from(self.quantity) * self.price_at_time
  }
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
  pub order_id: i64,
  pub product_id: i64,
  pub quantity: i32,
  pub price_at_time: Decimal,
}
