// server/src/pipelines/common_steps.rs

//! Steps shared by the transactional workflows.

use crate::errors::Result;
use crate::pipelines::contexts::HoldsTransaction;
use bazaar_flow::{ContextData, PipelineControl};
use tracing::{event, instrument, Level};

/// Opens a store transaction and parks it in the context's `TxSlot`.
#[instrument(name = "common_step::open_transaction", skip_all, err(Display))]
pub async fn open_transaction<T: HoldsTransaction>(ctx_data: ContextData<T>) -> Result<PipelineControl> {
  let store = ctx_data.read().store();
  let tx = store.begin().await?;
  ctx_data.read().tx_slot().put(tx);
  event!(Level::DEBUG, "Transaction opened.");
  Ok(PipelineControl::Continue)
}

#[instrument(name = "common_step::commit_transaction", skip_all, err(Display))]
pub async fn commit_transaction<T: HoldsTransaction>(ctx_data: ContextData<T>) -> Result<PipelineControl> {
  let tx = ctx_data.read().tx_slot().take()?;
  tx.commit().await?;
  event!(Level::DEBUG, "Transaction committed.");
  Ok(PipelineControl::Continue)
}
