// server/src/models/order.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};

/// ```text
/// PENDING -> PROCESSING -> SHIPPED -> DELIVERED
///    \___________\______-> CANCELLED
/// REFUNDED is set administratively.
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, SqlxType)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "order_status")]
pub enum OrderStatus {
  #[serde(alias = "PE")]
  #[sqlx(rename = "PE")]
  Pending,
  #[serde(alias = "PR")]
  #[sqlx(rename = "PR")]
  Processing,
  #[serde(alias = "SH")]
  #[sqlx(rename = "SH")]
  Shipped,
  #[serde(alias = "DE")]
  #[sqlx(rename = "DE")]
  Delivered,
  #[serde(alias = "CA")]
  #[sqlx(rename = "CA")]
  Cancelled,
  #[serde(alias = "RF")]
  #[sqlx(rename = "RF")]
  Refunded,
}

impl OrderStatus {
  pub fn code(self) -> &'static str {
    match self {
      OrderStatus::Pending => "PE",
      OrderStatus::Processing => "PR",
      OrderStatus::Shipped => "SH",
      OrderStatus::Delivered => "DE",
      OrderStatus::Cancelled => "CA",
      OrderStatus::Refunded => "RF",
    }
  }

  pub fn display_name(self) -> &'static str {
    match self {
      OrderStatus::Pending => "Pending",
      OrderStatus::Processing => "Processing",
      OrderStatus::Shipped => "Shipped",
      OrderStatus::Delivered => "Delivered",
      OrderStatus::Cancelled => "Cancelled",
      OrderStatus::Refunded => "Refunded",
    }
  }

  /// Only orders that have not left the warehouse can be cancelled.
  pub fn can_cancel(self) -> bool {
    matches!(self, OrderStatus::Pending | OrderStatus::Processing)
  }

  /// Cancelled, delivered and refunded orders are settled. Their stock
  /// effects are final, so the only way out is a refund.
  pub fn is_settled(self) -> bool {
    matches!(self, OrderStatus::Cancelled | OrderStatus::Delivered | OrderStatus::Refunded)
  }

  /// Whether a staff update may move an order from `self` to `next`.
  pub fn admin_can_become(self, next: OrderStatus) -> bool {
    next == self || next == OrderStatus::Refunded || !self.is_settled()
  }
}

/// Recorded for information only; no payment is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, SqlxType)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "payment_method")]
pub enum PaymentMethod {
  #[serde(alias = "CC")]
  #[sqlx(rename = "CC")]
  CreditCard,
  #[serde(alias = "DC")]
  #[sqlx(rename = "DC")]
  DebitCard,
  #[serde(rename = "PAYPAL", alias = "PP")]
  #[sqlx(rename = "PP")]
  PayPal,
  #[serde(alias = "ST")]
  #[sqlx(rename = "ST")]
  Stripe,
  #[serde(alias = "CD")]
  #[sqlx(rename = "CD")]
  CashOnDelivery,
}

impl PaymentMethod {
  pub fn display_name(self) -> &'static str {
    match self {
      PaymentMethod::CreditCard => "Credit Card",
      PaymentMethod::DebitCard => "Debit Card",
      PaymentMethod::PayPal => "PayPal",
      PaymentMethod::Stripe => "Stripe",
      PaymentMethod::CashOnDelivery => "Cash on Delivery",
    }
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
  pub id: i64,
  /// Assigned when the order is finalized; unique across all orders.
  pub order_number: Option<String>,
  pub customer_id: i64,
  pub status: OrderStatus,
  pub payment_method: PaymentMethod,
  pub total_amount: Decimal,
  pub is_paid: bool,
  pub shipping_address: String,
  pub shipping_method: String,
  pub tracking_number: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Order {
  /// `ORDER-{YYYYMMDD}-{customer}-{order}`.
  ///
  /// Date and customer keep it readable; the order id keeps two orders of the
  /// same customer on the same day apart. The store's unique constraint is
  /// what actually guarantees uniqueness.
  pub fn derive_number(created_on: NaiveDate, customer_id: i64, order_id: i64) -> String {
    format!("ORDER-{}-{}-{}", created_on.format("%Y%m%d"), customer_id, order_id)
  }
}

#[derive(Debug, Clone)]
pub struct NewOrder {
  pub customer_id: i64,
  pub payment_method: PaymentMethod,
  pub shipping_address: String,
  pub shipping_method: String,
}

/// One requested line of a new order. The quantity is wide so that
/// out-of-range values reach validation instead of failing deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderLineRequest {
  #[serde(rename = "product", alias = "product_id")]
  pub product_id: i64,
  pub quantity: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderRequest {
  pub items: Vec<OrderLineRequest>,
  pub payment_method: PaymentMethod,
  pub shipping_address: String,
  pub shipping_method: String,
}

/// Staff-only edit of an order's fulfilment fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderAdminUpdate {
  pub status: Option<OrderStatus>,
  pub is_paid: Option<bool>,
  pub tracking_number: Option<String>,
  pub shipping_method: Option<String>,
}

impl OrderAdminUpdate {
  pub fn apply(&self, order: &mut Order) {
    if let Some(v) = self.status {
      order.status = v;
    }
    if let Some(v) = self.is_paid {
      order.is_paid = v;
    }
    if let Some(v) = &self.tracking_number {
      order.tracking_number = Some(v.clone());
    }
    if let Some(v) = &self.shipping_method {
      order.shipping_method = v.clone();
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn settled_orders_only_move_to_refunded() {
    for settled in [OrderStatus::Cancelled, OrderStatus::Delivered, OrderStatus::Refunded] {
      assert!(settled.is_settled());
      assert!(settled.admin_can_become(OrderStatus::Refunded));
      assert!(settled.admin_can_become(settled));
      assert!(!settled.admin_can_become(OrderStatus::Pending));
      assert!(!settled.admin_can_become(OrderStatus::Processing));
    }
    assert!(!OrderStatus::Delivered.admin_can_become(OrderStatus::Shipped));
    assert!(OrderStatus::Pending.admin_can_become(OrderStatus::Shipped));
    assert!(OrderStatus::Shipped.admin_can_become(OrderStatus::Delivered));
  }

  #[test]
  fn only_pending_and_processing_can_cancel() {
    let cancellable: Vec<_> = [
      OrderStatus::Pending,
      OrderStatus::Processing,
      OrderStatus::Shipped,
      OrderStatus::Delivered,
      OrderStatus::Cancelled,
      OrderStatus::Refunded,
    ]
    .into_iter()
    .filter(|s| s.can_cancel())
    .collect();
    assert_eq!(cancellable, vec![OrderStatus::Pending, OrderStatus::Processing]);
  }

  #[test]
  fn status_accepts_names_and_codes() {
    let by_name: OrderStatus = serde_json::from_str("\"SHIPPED\"").unwrap();
    let by_code: OrderStatus = serde_json::from_str("\"SH\"").unwrap();
    assert_eq!(by_name, OrderStatus::Shipped);
    assert_eq!(by_code, OrderStatus::Shipped);
    assert_eq!(serde_json::to_string(&OrderStatus::Cancelled).unwrap(), "\"CANCELLED\"");
  }

  #[test]
  fn payment_method_accepts_codes() {
    let pm: PaymentMethod = serde_json::from_str("\"CD\"").unwrap();
    assert_eq!(pm, PaymentMethod::CashOnDelivery);
    assert_eq!(pm.display_name(), "Cash on Delivery");
    let pp: PaymentMethod = serde_json::from_str("\"PAYPAL\"").unwrap();
    assert_eq!(pp, PaymentMethod::PayPal);
  }

  #[test]
  fn derived_number_uses_date_customer_and_order() {
    let day = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
    assert_eq!(Order::derive_number(day, 42, 7), "ORDER-20240309-42-7");
  }
}
