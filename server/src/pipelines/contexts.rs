// server/src/pipelines/contexts.rs

//! Context data for every workflow pipeline.
//! Handlers receive these wrapped in `bazaar_flow::ContextData`.

use crate::errors::{AppError, Result};
use crate::models::{Account, Order, OrderItem, PlaceOrderRequest, Product, Registration, Session};
use crate::store::{Store, StoreTx};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The open transaction of a pipeline run.
///
/// A step takes the transaction out, awaits on it, and puts it back. The
/// context lock is never held while awaiting. A transaction that is not put
/// back (a step failed) is dropped, which rolls it back.
#[derive(Default)]
pub struct TxSlot(Mutex<Option<Box<dyn StoreTx>>>);

impl TxSlot {
  pub fn put(&self, tx: Box<dyn StoreTx>) {
    *self.0.lock() = Some(tx);
  }

  pub fn take(&self) -> Result<Box<dyn StoreTx>> {
    self
      .0
      .lock()
      .take()
      .ok_or_else(|| AppError::Internal("No open transaction in pipeline context.".to_string()))
  }

  pub fn is_open(&self) -> bool {
    self.0.lock().is_some()
  }

  /// Drops a transaction left behind by a failed run.
  pub fn rollback(&self) {
    self.0.lock().take();
  }
}

/// Implemented by contexts of pipelines that use the shared transaction steps.
pub trait HoldsTransaction: Send + Sync + 'static {
  fn store(&self) -> Arc<dyn Store>;
  fn tx_slot(&self) -> &TxSlot;
}

/// A validated order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLine {
  pub product_id: i64,
  pub quantity: i32,
}

pub struct PlaceOrderCtxData {
  pub store: Arc<dyn Store>,
  pub customer_id: i64,
  pub request: PlaceOrderRequest,
  pub tx: TxSlot,
  pub lines: Vec<OrderLine>,
  /// Locked rows, keyed (and therefore locked) in product id order.
  pub locked_products: BTreeMap<i64, Product>,
  pub order: Option<Order>,
  pub items: Vec<OrderItem>,
}

impl PlaceOrderCtxData {
  pub fn new(store: Arc<dyn Store>, customer_id: i64, request: PlaceOrderRequest) -> Self {
    Self {
      store,
      customer_id,
      request,
      tx: TxSlot::default(),
      lines: Vec::new(),
      locked_products: BTreeMap::new(),
      order: None,
      items: Vec::new(),
    }
  }
}

impl HoldsTransaction for PlaceOrderCtxData {
  fn store(&self) -> Arc<dyn Store> {
    self.store.clone()
  }

  fn tx_slot(&self) -> &TxSlot {
    &self.tx
  }
}

pub struct CancelOrderCtxData {
  pub store: Arc<dyn Store>,
  pub order_id: i64,
  pub requester_id: i64,
  pub requester_is_staff: bool,
  pub tx: TxSlot,
  pub order: Option<Order>,
  pub items: Vec<OrderItem>,
}

impl CancelOrderCtxData {
  pub fn new(store: Arc<dyn Store>, order_id: i64, requester: &Account) -> Self {
    Self {
      store,
      order_id,
      requester_id: requester.id,
      requester_is_staff: requester.is_staff(),
      tx: TxSlot::default(),
      order: None,
      items: Vec::new(),
    }
  }
}

impl HoldsTransaction for CancelOrderCtxData {
  fn store(&self) -> Arc<dyn Store> {
    self.store.clone()
  }

  fn tx_slot(&self) -> &TxSlot {
    &self.tx
  }
}

pub struct SignupCtxData {
  pub store: Arc<dyn Store>,
  pub registration: Registration,
  pub created_account: Option<Account>,
}

pub struct SigninCtxData {
  pub store: Arc<dyn Store>,
  pub email: String,
  pub password: String,
  pub session_ttl_hours: i64,
  pub account: Option<Account>,
  pub session: Option<Session>,
}
