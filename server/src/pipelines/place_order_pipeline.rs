// server/src/pipelines/place_order_pipeline.rs

use crate::errors::AppError;
use crate::models::product::{is_storable_amount, max_amount};
use crate::models::{NewOrder, NewOrderItem, Order};
use crate::pipelines::common_steps;
use crate::pipelines::contexts::{OrderLine, PlaceOrderCtxData};
use bazaar_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{event, info, warn, Level};

/// Registers the order placement pipeline.
///
/// Stock is checked and taken inside one transaction: either the order, all
/// of its items and every stock decrement are committed together, or nothing is.
pub fn register_place_order_pipeline(registry: &Arc<FlowRegistry<AppError>>) {
  let mut place_p = Pipeline::<PlaceOrderCtxData, AppError>::new(&[
    ("validate_order_request", false, None),
    ("open_transaction", false, None),
    ("reserve_stock", false, None),
    ("create_order_shell", false, None),
    ("create_order_items", false, None),
    ("finalize_order", false, None),
    ("commit_transaction", false, None),
  ]);

  // Step 1: shape checks, before anything touches the store.
  place_p.on_root("validate_order_request", |ctx_data: ContextData<PlaceOrderCtxData>| {
    Box::pin(async move {
      let (requested, address, method) = {
        let guard = ctx_data.read();
        (
          guard.request.items.clone(),
          guard.request.shipping_address.clone(),
          guard.request.shipping_method.clone(),
        )
      };

      event!(Level::DEBUG, lines = requested.len(), "Validating order request.");
      if requested.is_empty() {
        warn!("Order request without items.");
        return Err(AppError::Validation("An order must contain at least one item.".to_string()));
      }

      let mut lines = Vec::with_capacity(requested.len());
      for line in &requested {
        let quantity = i32::try_from(line.quantity).ok().filter(|q| *q >= 1).ok_or_else(|| {
          AppError::Validation(format!(
            "Quantity for product {} must be between 1 and {}.",
            line.product_id,
            i32::MAX
          ))
        })?;
        lines.push(OrderLine {
          product_id: line.product_id,
          quantity,
        });
      }

      if address.trim().is_empty() {
        return Err(AppError::Validation("Shipping address is required.".to_string()));
      }
      if method.trim().is_empty() {
        return Err(AppError::Validation("Shipping method is required.".to_string()));
      }

      ctx_data.write().lines = lines;
      Ok(PipelineControl::Continue)
    })
  });

  place_p.on_root("open_transaction", common_steps::open_transaction::<PlaceOrderCtxData>);

  // Step 3: lock every distinct product in id order and check the summed demand.
  place_p.on_root("reserve_stock", |ctx_data: ContextData<PlaceOrderCtxData>| {
    Box::pin(async move {
      let lines = ctx_data.read().lines.clone();
      let mut demand: BTreeMap<i64, i64> = BTreeMap::new();
      for line in &lines {
        *demand.entry(line.product_id).or_default() += i64::from(line.quantity);
      }

      let mut tx = ctx_data.read().tx.take()?;
      let mut locked = BTreeMap::new();
      for (&product_id, &requested) in &demand {
        let product = tx
          .lock_product(product_id)
          .await?
          .ok_or_else(|| AppError::NotFound(format!("Product {} not found", product_id)))?;

        if !product.is_active {
          warn!(product_id, "Order references an inactive product.");
          return Err(AppError::Validation(format!(
            "Product '{}' is not available for purchase.",
            product.name
          )));
        }
        if i64::from(product.stock_quantity) < requested {
          warn!(
            product_id,
            available = product.stock_quantity,
            requested,
            "Insufficient stock."
          );
          return Err(AppError::InsufficientStock {
            product_id,
            product_name: product.name,
            available: product.stock_quantity,
            requested,
          });
        }
        locked.insert(product_id, product);
      }

      {
        let mut guard = ctx_data.write();
        guard.tx.put(tx);
        guard.locked_products = locked;
      }
      Ok(PipelineControl::Continue)
    })
  });

  place_p.on_root("create_order_shell", |ctx_data: ContextData<PlaceOrderCtxData>| {
    Box::pin(async move {
      let new_order = {
        let guard = ctx_data.read();
        NewOrder {
          customer_id: guard.customer_id,
          payment_method: guard.request.payment_method,
          shipping_address: guard.request.shipping_address.trim().to_string(),
          shipping_method: guard.request.shipping_method.trim().to_string(),
        }
      };

      let mut tx = ctx_data.read().tx.take()?;
      let order = tx.insert_order(new_order).await?;
      event!(Level::DEBUG, order_id = order.id, "Order shell created.");

      {
        let mut guard = ctx_data.write();
        guard.tx.put(tx);
        guard.order = Some(order);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Step 5: one item per requested line, priced from the locked row.
  place_p.on_root("create_order_items", |ctx_data: ContextData<PlaceOrderCtxData>| {
    Box::pin(async move {
      let (order_id, lines, mut products) = {
        let guard = ctx_data.read();
        let order_id = guard
          .order
          .as_ref()
          .map(|o| o.id)
          .ok_or_else(|| AppError::Internal("Order shell missing before item creation.".to_string()))?;
        (order_id, guard.lines.clone(), guard.locked_products.clone())
      };

      let mut tx = ctx_data.read().tx.take()?;
      let mut items = Vec::with_capacity(lines.len());
      for line in &lines {
        let product = products
          .get_mut(&line.product_id)
          .ok_or_else(|| AppError::Internal(format!("Product {} was not locked.", line.product_id)))?;

        if !tx.take_stock(line.product_id, line.quantity).await? {
          return Err(AppError::InsufficientStock {
            product_id: line.product_id,
            product_name: product.name.clone(),
            available: product.stock_quantity,
            requested: i64::from(line.quantity),
          });
        }
        product.stock_quantity -= line.quantity;

        let item = tx
          .insert_order_item(NewOrderItem {
            order_id,
            product_id: line.product_id,
            quantity: line.quantity,
            price_at_time: product.price,
          })
          .await?;
        items.push(item);
      }

      {
        let mut guard = ctx_data.write();
        guard.tx.put(tx);
        guard.items = items;
      }
      Ok(PipelineControl::Continue)
    })
  });

  place_p.on_root("finalize_order", |ctx_data: ContextData<PlaceOrderCtxData>| {
    Box::pin(async move {
      let (order, total) = {
        let guard = ctx_data.read();
        let order = guard
          .order
          .clone()
          .ok_or_else(|| AppError::Internal("Order shell missing before finalization.".to_string()))?;
        let total: Decimal = guard.items.iter().map(|i| i.total_price()).sum();
        (order, total)
      };
      if !is_storable_amount(total) {
        warn!(order_id = order.id, total = %total, "Order total out of range.");
        return Err(AppError::Validation(format!(
          "Order total {} exceeds the maximum of {}.",
          total,
          max_amount()
        )));
      }

      let order_number = match &order.order_number {
        Some(_) => None,
        None => Some(Order::derive_number(
          order.created_at.date_naive(),
          order.customer_id,
          order.id,
        )),
      };

      let mut tx = ctx_data.read().tx.take()?;
      let finalized = tx.finalize_order(order.id, total, order_number).await?;
      info!(
        order_id = finalized.id,
        order_number = ?finalized.order_number,
        total = %finalized.total_amount,
        "Order finalized."
      );

      {
        let mut guard = ctx_data.write();
        guard.tx.put(tx);
        guard.order = Some(finalized);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  place_p.on_root("commit_transaction", common_steps::commit_transaction::<PlaceOrderCtxData>);

  registry.register_pipeline(place_p);
  tracing::info!("Place-order pipeline registered.");
}
