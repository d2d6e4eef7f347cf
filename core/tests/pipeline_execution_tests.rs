// core/tests/pipeline_execution_tests.rs
mod common;

use bazaar_flow::{ContextData, FlowError, Pipeline, PipelineControl, PipelineResult};
use common::*;
use serial_test::serial;
use std::sync::Arc;

#[tokio::test]
#[serial]
async fn steps_run_in_declared_order() {
  setup_tracing();
  let mut pipeline =
    Pipeline::<TestContext, TestError>::new(&[("validate", false, None), ("reserve", false, None), ("commit", false, None)]);

  pipeline.on_root("validate", recording_handler("validate", "V"));
  pipeline.on_root("reserve", recording_handler("reserve", "R"));
  pipeline.on_root("commit", recording_handler("commit", "C"));

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap(), PipelineResult::Completed);
  let guard = ctx.read();
  assert_eq!(guard.tally, 3);
  assert_eq!(guard.trail, "VRC");
  assert_eq!(guard.visited, vec!["validate", "reserve", "commit"]);
}

#[tokio::test]
#[serial]
async fn stop_signal_halts_the_run() {
  setup_tracing();
  let mut pipeline =
    Pipeline::<TestContext, TestError>::new(&[("first", false, None), ("gate", false, None), ("last", false, None)]);

  pipeline.on_root("first", recording_handler("first", "1"));
  pipeline.on_root("gate", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().visited.push("gate".to_string());
      Ok::<_, FlowError>(PipelineControl::Stop)
    })
  });
  pipeline.on_root("last", recording_handler("last", "3"));

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap(), PipelineResult::Stopped);
  let guard = ctx.read();
  assert_eq!(guard.trail, "1");
  assert_eq!(guard.visited, vec!["first", "gate"]);
}

#[tokio::test]
#[serial]
async fn stop_from_before_hook_skips_on_and_after() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("only", false, None)]);
  pipeline.before_root("only", recording_handler("before", "b"));
  pipeline.on_root("only", recording_handler("on", "o"));
  pipeline.after_root("only", recording_handler("after", "a"));

  let ctx = ContextData::new(TestContext {
    halt_at: Some("before".to_string()),
    ..Default::default()
  });
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap(), PipelineResult::Stopped);
  assert_eq!(ctx.read().visited, vec!["before"]);
}

#[tokio::test]
#[serial]
async fn first_handler_error_is_returned_and_later_steps_do_not_run() {
  setup_tracing();
  let mut pipeline =
    Pipeline::<TestContext, TestError>::new(&[("ok", false, None), ("broken", false, None), ("never", false, None)]);

  pipeline.on_root("ok", recording_handler("ok", "+"));
  pipeline.on_root("broken", failing_handler("broken", "stock check failed"));
  pipeline.on_root("never", recording_handler("never", "!"));

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap_err(), TestError::Handler("stock check failed".to_string()));
  let guard = ctx.read();
  assert_eq!(guard.trail, "+");
  assert_eq!(guard.visited, vec!["ok", "broken"]);
}

#[tokio::test]
#[serial]
async fn skip_condition_is_evaluated_against_current_context() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("assign", false, None),
    (
      "assign_default",
      false,
      Some(Arc::new(|ctx: ContextData<TestContext>| !ctx.read().trail.is_empty())),
    ),
    ("finish", false, None),
  ]);

  pipeline.on_root("assign", recording_handler("assign", "X"));
  pipeline.on_root("assign_default", recording_handler("assign_default", "default"));
  pipeline.on_root("finish", recording_handler("finish", "."));

  let ctx = ContextData::new(TestContext::default());
  assert_eq!(pipeline.run(ctx.clone()).await.unwrap(), PipelineResult::Completed);

  let guard = ctx.read();
  assert_eq!(guard.trail, "X.");
  assert_eq!(guard.visited, vec!["assign", "finish"]);
}

#[tokio::test]
#[serial]
async fn non_optional_step_without_handlers_fails() {
  setup_tracing();
  let pipeline = Pipeline::<TestContext, TestError>::new(&[("unwired", false, None)]);

  let result = pipeline.run(ContextData::new(TestContext::default())).await;

  match result {
    Err(TestError::Flow(s)) => {
      assert!(s.contains("HandlerMissing"));
      assert!(s.contains("unwired"));
    }
    other => panic!("expected HandlerMissing, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn optional_step_without_handlers_is_skipped() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("notify", true, None), ("done", false, None)]);
  pipeline.on_root("done", recording_handler("done", "D"));

  let ctx = ContextData::new(TestContext::default());
  assert_eq!(pipeline.run(ctx.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(ctx.read().visited, vec!["done"]);
}

#[tokio::test]
#[serial]
async fn hooks_run_before_on_after() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("main", false, None)]);

  pipeline.after_root("main", recording_handler("after", "After;"));
  pipeline.on_root("main", recording_handler("on", "On;"));
  pipeline.before_root("main", recording_handler("before", "Before;"));
  pipeline.on_root("main", recording_handler("on_again", "OnAgain;"));

  let ctx = ContextData::new(TestContext::default());
  pipeline.run(ctx.clone()).await.unwrap();

  let guard = ctx.read();
  assert_eq!(guard.tally, 4);
  assert_eq!(guard.trail, "Before;On;OnAgain;After;");
}

#[tokio::test]
#[serial]
async fn handler_may_return_flow_error_directly() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, FlowError>::new(&[("task", false, None)]);
  pipeline.on_root("task", |_ctx: ContextData<TestContext>| {
    Box::pin(async move { Err(FlowError::Internal("slot was empty".to_string())) })
  });

  let result = pipeline.run(ContextData::new(TestContext::default())).await;

  match result {
    Err(FlowError::Internal(msg)) => assert_eq!(msg, "slot was empty"),
    other => panic!("expected FlowError::Internal, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn anyhow_errors_convert_into_handler_error() {
  setup_tracing();
  let err: FlowError = anyhow::anyhow!("socket closed").into();
  match err {
    FlowError::HandlerError { source } => assert_eq!(source.to_string(), "socket closed"),
    other => panic!("expected HandlerError, got {:?}", other),
  }
}
