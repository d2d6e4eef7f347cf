// server/src/pipelines/cancel_order_pipeline.rs

use crate::errors::AppError;
use crate::models::OrderStatus;
use crate::pipelines::common_steps;
use crate::pipelines::contexts::CancelOrderCtxData;
use bazaar_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{event, info, warn, Level};

/// Registers the order cancellation pipeline. The status change and the
/// stock restoration commit together.
pub fn register_cancel_order_pipeline(registry: &Arc<FlowRegistry<AppError>>) {
  let mut cancel_p = Pipeline::<CancelOrderCtxData, AppError>::new(&[
    ("open_transaction", false, None),
    ("load_order", false, None),
    ("check_cancellable", false, None),
    ("mark_cancelled", false, None),
    ("restore_inventory", false, None),
    ("commit_transaction", false, None),
  ]);

  cancel_p.on_root("open_transaction", common_steps::open_transaction::<CancelOrderCtxData>);

  // Orders of other customers are reported as missing, not forbidden.
  cancel_p.on_root("load_order", |ctx_data: ContextData<CancelOrderCtxData>| {
    Box::pin(async move {
      let (order_id, requester_id, requester_is_staff) = {
        let guard = ctx_data.read();
        (guard.order_id, guard.requester_id, guard.requester_is_staff)
      };

      let mut tx = ctx_data.read().tx.take()?;
      let order = tx
        .lock_order(order_id)
        .await?
        .filter(|o| requester_is_staff || o.customer_id == requester_id)
        .ok_or_else(|| {
          warn!(order_id, requester_id, "Order not visible to requester.");
          AppError::NotFound(format!("Order {} not found", order_id))
        })?;

      {
        let mut guard = ctx_data.write();
        guard.tx.put(tx);
        guard.order = Some(order);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  cancel_p.on_root("check_cancellable", |ctx_data: ContextData<CancelOrderCtxData>| {
    Box::pin(async move {
      let status = ctx_data
        .read()
        .order
        .as_ref()
        .map(|o| o.status)
        .ok_or_else(|| AppError::Internal("Order missing before cancellability check.".to_string()))?;

      if !status.can_cancel() {
        event!(Level::INFO, status = status.code(), "Cancellation refused.");
        return Err(AppError::InvalidStateTransition(
          "Order cannot be cancelled at this stage".to_string(),
        ));
      }
      Ok(PipelineControl::Continue)
    })
  });

  cancel_p.on_root("mark_cancelled", |ctx_data: ContextData<CancelOrderCtxData>| {
    Box::pin(async move {
      let order_id = ctx_data.read().order_id;
      let mut tx = ctx_data.read().tx.take()?;
      let order = tx.set_order_status(order_id, OrderStatus::Cancelled).await?;

      {
        let mut guard = ctx_data.write();
        guard.tx.put(tx);
        guard.order = Some(order);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Product rows are touched in id order, same as placement.
  cancel_p.on_root("restore_inventory", |ctx_data: ContextData<CancelOrderCtxData>| {
    Box::pin(async move {
      let order_id = ctx_data.read().order_id;
      let mut tx = ctx_data.read().tx.take()?;

      let items = tx.order_items(order_id).await?;
      let mut returned: BTreeMap<i64, i32> = BTreeMap::new();
      for item in &items {
        let entry = returned.entry(item.product_id).or_default();
        *entry = entry.checked_add(item.quantity).ok_or_else(|| {
          AppError::Internal(format!("Restored quantity overflows for product {}", item.product_id))
        })?;
      }
      for (&product_id, &quantity) in &returned {
        tx.restore_stock(product_id, quantity).await?;
      }
      info!(order_id, products = returned.len(), "Inventory restored for cancelled order.");

      {
        let mut guard = ctx_data.write();
        guard.tx.put(tx);
        guard.items = items;
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  cancel_p.on_root("commit_transaction", common_steps::commit_transaction::<CancelOrderCtxData>);

  registry.register_pipeline(cancel_p);
  tracing::info!("Cancel-order pipeline registered.");
}
