// server/src/pipelines/mod.rs

//! Workflow pipelines and their registration.

use crate::errors::AppError;
use bazaar_flow::FlowRegistry;
use std::sync::Arc;

pub mod common_steps;
pub mod contexts;

pub mod cancel_order_pipeline;
pub mod place_order_pipeline;
pub mod signin_pipeline;
pub mod signup_pipeline;

/// Registers every workflow pipeline. Called once at startup.
pub fn register_all_pipelines(registry: &Arc<FlowRegistry<AppError>>) {
  tracing::info!("Registering pipelines...");

  signup_pipeline::register_signup_pipeline(registry);
  signin_pipeline::register_signin_pipeline(registry);
  place_order_pipeline::register_place_order_pipeline(registry);
  cancel_order_pipeline::register_cancel_order_pipeline(registry);

  tracing::info!("All application pipelines registered.");
}
