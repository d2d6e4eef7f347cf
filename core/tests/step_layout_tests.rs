// core/tests/step_layout_tests.rs
mod common;

use bazaar_flow::{ContextData, FlowError, Pipeline, PipelineResult};
use common::*;
use std::sync::Arc;

fn three_steps() -> Pipeline<TestContext, TestError> {
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("a", false, None), ("b", false, None), ("c", false, None)]);
  pipeline.on_root("a", recording_handler("a", "a"));
  pipeline.on_root("b", recording_handler("b", "b"));
  pipeline.on_root("c", recording_handler("c", "c"));
  pipeline
}

#[tokio::test]
async fn inserted_steps_land_next_to_their_anchor() {
  setup_tracing();
  let mut pipeline = three_steps();
  pipeline.insert_before_step("b", "a2", false, None).unwrap();
  pipeline.insert_after_step("c", "d", false, None).unwrap();
  pipeline.on_root("a2", recording_handler("a2", "+"));
  pipeline.on_root("d", recording_handler("d", "d"));

  assert_eq!(pipeline.step_names(), vec!["a", "a2", "b", "c", "d"]);

  let ctx = ContextData::new(TestContext::default());
  pipeline.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().trail, "a+bcd");
}

#[tokio::test]
async fn removed_step_takes_its_hooks_with_it() {
  setup_tracing();
  let mut pipeline = three_steps();
  pipeline.remove_step("b").unwrap();

  let ctx = ContextData::new(TestContext::default());
  assert_eq!(pipeline.run(ctx.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(ctx.read().trail, "ac");
}

#[test]
fn edits_against_unknown_or_duplicate_steps_are_rejected() {
  let mut pipeline = three_steps();

  assert!(matches!(
    pipeline.insert_before_step("missing", "x", false, None),
    Err(FlowError::StepNotFound { step_name }) if step_name == "missing"
  ));
  assert!(matches!(
    pipeline.insert_after_step("a", "b", false, None),
    Err(FlowError::DuplicateStep { step_name }) if step_name == "b"
  ));
  assert!(matches!(pipeline.remove_step("zzz"), Err(FlowError::StepNotFound { .. })));
  assert!(matches!(pipeline.set_optional("zzz", true), Err(FlowError::StepNotFound { .. })));
  assert_eq!(pipeline.step_names(), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn set_optional_and_set_skip_condition_change_behavior() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("hookless", false, None), ("b", false, None)]);
  pipeline.on_root("b", recording_handler("b", "b"));

  assert!(pipeline.run(ContextData::new(TestContext::default())).await.is_err());

  pipeline.set_optional("hookless", true).unwrap();
  pipeline
    .set_skip_condition("b", Some(Arc::new(|ctx: ContextData<TestContext>| ctx.read().tally == 0)))
    .unwrap();

  let ctx = ContextData::new(TestContext::default());
  assert_eq!(pipeline.run(ctx.clone()).await.unwrap(), PipelineResult::Completed);
  assert!(ctx.read().visited.is_empty());
}

#[test]
#[should_panic(expected = "Step not found")]
fn registering_a_hook_for_an_undeclared_step_panics() {
  let mut pipeline = three_steps();
  pipeline.on_root("typo", recording_handler("typo", "?"));
}
