// server/src/services/order_service.rs

//! Order use cases. Placement and cancellation run as pipelines; reads and
//! the staff update go straight to the store.

use crate::errors::{AppError, Result};
use crate::models::{Account, Order, OrderAdminUpdate, OrderItem, OrderStatus, PlaceOrderRequest};
use crate::pipelines::contexts::{CancelOrderCtxData, PlaceOrderCtxData};
use crate::state::AppState;
use crate::store::{OrderOrdering, OrderQuery, Store, RECENT_ORDERS_LIMIT};
use bazaar_flow::{ContextData, PipelineResult};
use std::collections::HashMap;
use tracing::{error, info, instrument, warn};

/// An order with its items.
#[derive(Debug, Clone)]
pub struct OrderDetails {
  pub order: Order,
  pub items: Vec<OrderItem>,
}

#[instrument(name = "order_service::place_order", skip_all, fields(customer_id = customer.id))]
pub async fn place_order(state: &AppState, customer: &Account, request: PlaceOrderRequest) -> Result<OrderDetails> {
  let ctx_data = ContextData::new(PlaceOrderCtxData::new(state.store.clone(), customer.id, request));
  let outcome = state.flows.run(ctx_data.clone()).await;
  ctx_data.read().tx.rollback();

  match outcome {
    Ok(PipelineResult::Completed) => {
      let guard = ctx_data.read();
      let order = guard
        .order
        .clone()
        .ok_or_else(|| AppError::Internal("Order missing after placement.".to_string()))?;
      info!(order_id = order.id, items = guard.items.len(), "Order placed.");
      Ok(OrderDetails {
        order,
        items: guard.items.clone(),
      })
    }
    Ok(PipelineResult::Stopped) => {
      error!("Place-order pipeline stopped unexpectedly.");
      Err(AppError::PipelineHaltedByHandler)
    }
    Err(e) => {
      warn!(error = %e, "Order placement failed.");
      Err(e)
    }
  }
}

#[instrument(name = "order_service::cancel_order", skip(state, requester), fields(requester_id = requester.id))]
pub async fn cancel_order(state: &AppState, requester: &Account, order_id: i64) -> Result<OrderDetails> {
  let ctx_data = ContextData::new(CancelOrderCtxData::new(state.store.clone(), order_id, requester));
  let outcome = state.flows.run(ctx_data.clone()).await;
  ctx_data.read().tx.rollback();

  match outcome {
    Ok(PipelineResult::Completed) => {
      let guard = ctx_data.read();
      let order = guard
        .order
        .clone()
        .ok_or_else(|| AppError::Internal("Order missing after cancellation.".to_string()))?;
      info!(order_id, "Order cancelled.");
      Ok(OrderDetails {
        order,
        items: guard.items.clone(),
      })
    }
    Ok(PipelineResult::Stopped) => {
      error!("Cancel-order pipeline stopped unexpectedly.");
      Err(AppError::PipelineHaltedByHandler)
    }
    Err(e) => {
      warn!(error = %e, "Order cancellation failed.");
      Err(e)
    }
  }
}

/// The order if the requester owns it or is staff; `NotFound` otherwise.
pub async fn order_for(state: &AppState, requester: &Account, order_id: i64) -> Result<OrderDetails> {
  let order = state
    .store
    .order_by_id(order_id)
    .await?
    .filter(|o| requester.is_staff() || o.customer_id == requester.id)
    .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;
  let mut details = with_items(state.store.as_ref(), vec![order]).await?;
  details
    .pop()
    .ok_or_else(|| AppError::Internal("Order lost while loading its items.".to_string()))
}

/// Staff see every order; everyone else only their own.
pub async fn list_orders(state: &AppState, requester: &Account, mut query: OrderQuery) -> Result<Vec<OrderDetails>> {
  query.customer_id = if requester.is_staff() { None } else { Some(requester.id) };
  query.limit = None;
  let orders = state.store.list_orders(&query).await?;
  with_items(state.store.as_ref(), orders).await
}

/// The requester's own newest orders, whatever their roles.
pub async fn recent_orders(state: &AppState, requester: &Account) -> Result<Vec<OrderDetails>> {
  let query = OrderQuery {
    customer_id: Some(requester.id),
    ordering: OrderOrdering::CreatedDesc,
    limit: Some(RECENT_ORDERS_LIMIT),
    ..OrderQuery::default()
  };
  let orders = state.store.list_orders(&query).await?;
  with_items(state.store.as_ref(), orders).await
}

/// Staff edit of fulfilment fields. Cancelling is refused here so that it
/// always goes through the workflow that restores stock.
#[instrument(name = "order_service::admin_update", skip(state, requester, update), fields(requester_id = requester.id))]
pub async fn admin_update(
  state: &AppState,
  requester: &Account,
  order_id: i64,
  update: OrderAdminUpdate,
) -> Result<OrderDetails> {
  if !requester.is_staff() {
    return Err(AppError::Authorization("Only staff can update orders.".to_string()));
  }
  if update.status == Some(OrderStatus::Cancelled) {
    return Err(AppError::Validation(
      "Use the cancel endpoint to cancel an order.".to_string(),
    ));
  }
  let order = state.store.update_order(order_id, &update).await?;
  info!(order_id, status = order.status.code(), "Order updated by staff.");
  let mut details = with_items(state.store.as_ref(), vec![order]).await?;
  details
    .pop()
    .ok_or_else(|| AppError::Internal("Order lost while loading its items.".to_string()))
}

async fn with_items(store: &dyn Store, orders: Vec<Order>) -> Result<Vec<OrderDetails>> {
  let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
  let mut grouped: HashMap<i64, Vec<OrderItem>> = HashMap::new();
  for item in store.items_for_orders(&ids).await? {
    grouped.entry(item.order_id).or_default().push(item);
  }
  Ok(
    orders
      .into_iter()
      .map(|order| {
        let items = grouped.remove(&order.id).unwrap_or_default();
        OrderDetails { order, items }
      })
      .collect(),
  )
}
