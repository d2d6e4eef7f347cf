// core/tests/registry_tests.rs
mod common;

use bazaar_flow::{ContextData, FlowError, FlowRegistry, Pipeline, PipelineControl, PipelineResult};
use common::*;

#[derive(Debug, Default)]
struct PlacementCtx {
  label: String,
}

#[derive(Debug, Default)]
struct CancellationCtx {
  restored: i32,
}

#[tokio::test]
async fn dispatches_by_context_type() {
  setup_tracing();
  let registry = FlowRegistry::<TestError>::new();

  let mut placement = Pipeline::<PlacementCtx, TestError>::new(&[("place", false, None)]);
  placement.on_root("place", |ctx: ContextData<PlacementCtx>| {
    Box::pin(async move {
      ctx.write().label = "placed".to_string();
      Ok::<_, FlowError>(PipelineControl::Continue)
    })
  });
  registry.register_pipeline(placement);

  let mut cancellation = Pipeline::<CancellationCtx, TestError>::new(&[("cancel", false, None)]);
  cancellation.on_root("cancel", |ctx: ContextData<CancellationCtx>| {
    Box::pin(async move {
      ctx.write().restored = 2;
      Ok::<_, FlowError>(PipelineControl::Continue)
    })
  });
  registry.register_pipeline(cancellation);

  assert!(registry.is_registered::<PlacementCtx>());
  assert!(registry.is_registered::<CancellationCtx>());

  let place_ctx = ContextData::new(PlacementCtx::default());
  assert_eq!(registry.run(place_ctx.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(place_ctx.read().label, "placed");

  let cancel_ctx = ContextData::new(CancellationCtx::default());
  assert_eq!(registry.run(cancel_ctx.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(cancel_ctx.read().restored, 2);
}

#[tokio::test]
async fn unregistered_context_type_is_a_configuration_error() {
  setup_tracing();
  let registry = FlowRegistry::<TestError>::new();

  #[derive(Debug, Default)]
  struct Unwired;

  let result = registry.run(ContextData::new(Unwired)).await;
  match result {
    Err(TestError::Flow(s)) => {
      assert!(s.contains("ConfigurationError"));
      assert!(s.contains("Unwired"));
    }
    other => panic!("expected ConfigurationError, got {:?}", other),
  }
}

#[tokio::test]
async fn handler_errors_pass_through_the_registry() {
  setup_tracing();
  let registry = FlowRegistry::<TestError>::new();

  let mut placement = Pipeline::<PlacementCtx, TestError>::new(&[("place", false, None)]);
  placement.on_root("place", |_ctx: ContextData<PlacementCtx>| {
    Box::pin(async move { Err(TestError::Handler("out of stock".to_string())) })
  });
  registry.register_pipeline(placement);

  let result = registry.run(ContextData::new(PlacementCtx::default())).await;
  assert_eq!(result.unwrap_err(), TestError::Handler("out of stock".to_string()));
}

#[tokio::test]
async fn registering_again_replaces_the_pipeline() {
  setup_tracing();
  let registry = FlowRegistry::new_default();

  let mut first = Pipeline::<CancellationCtx, FlowError>::new(&[("cancel", false, None)]);
  first.on_root("cancel", |ctx: ContextData<CancellationCtx>| {
    Box::pin(async move {
      ctx.write().restored = 1;
      Ok::<_, FlowError>(PipelineControl::Continue)
    })
  });
  registry.register_pipeline(first);

  let mut second = Pipeline::<CancellationCtx, FlowError>::new(&[("cancel", false, None)]);
  second.on_root("cancel", |ctx: ContextData<CancellationCtx>| {
    Box::pin(async move {
      ctx.write().restored = 9;
      Ok::<_, FlowError>(PipelineControl::Continue)
    })
  });
  registry.register_pipeline(second);

  let ctx = ContextData::new(CancellationCtx::default());
  registry.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().restored, 9);
}
