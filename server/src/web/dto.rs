// server/src/web/dto.rs

//! Response bodies that add derived fields to stored records.

use crate::models::{Account, Order, OrderItem, Product, ProductImage, Session};
use crate::services::order_service::OrderDetails;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct OrderItemResponse {
  #[serde(flatten)]
  pub item: OrderItem,
  pub total_price: Decimal,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
  #[serde(flatten)]
  pub order: Order,
  pub status_display: &'static str,
  pub payment_method_display: &'static str,
  pub items: Vec<OrderItemResponse>,
}

impl From<OrderDetails> for OrderResponse {
  fn from(details: OrderDetails) -> Self {
    let OrderDetails { order, items } = details;
    Self {
      status_display: order.status.display_name(),
      payment_method_display: order.payment_method.display_name(),
      items: items
        .into_iter()
        .map(|item| OrderItemResponse {
          total_price: item.total_price(),
          item,
        })
        .collect(),
      order,
    }
  }
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
  #[serde(flatten)]
  pub product: Product,
  pub is_in_stock: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub images: Option<Vec<ProductImage>>,
}

impl ProductResponse {
  pub fn summary(product: Product) -> Self {
    Self {
      is_in_stock: product.is_in_stock(),
      product,
      images: None,
    }
  }

  pub fn detailed(product: Product, images: Vec<ProductImage>) -> Self {
    Self {
      is_in_stock: product.is_in_stock(),
      product,
      images: Some(images),
    }
  }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
  pub token: Uuid,
  pub expires_at: DateTime<Utc>,
  pub account: Account,
}

impl SessionResponse {
  pub fn new(session: Session, account: Account) -> Self {
    Self {
      token: session.token,
      expires_at: session.expires_at,
      account,
    }
  }
}
