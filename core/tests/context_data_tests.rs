// core/tests/context_data_tests.rs
mod common;

use bazaar_flow::{ContextData, FlowError, Pipeline, PipelineControl};
use common::*;
use serial_test::serial;

#[tokio::test]
#[serial]
async fn later_steps_see_earlier_writes() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("write", false, None), ("extend", false, None)]);

  pipeline.on_root("write", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.tally = 10;
      guard.trail = "written".to_string();
      Ok::<_, FlowError>(PipelineControl::Continue)
    })
  });
  pipeline.on_root("extend", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      assert_eq!(guard.tally, 10);
      guard.tally += 5;
      guard.trail.push_str("+extended");
      Ok::<_, FlowError>(PipelineControl::Continue)
    })
  });

  let ctx = ContextData::new(TestContext::default());
  pipeline.run(ctx.clone()).await.unwrap();

  let guard = ctx.read();
  assert_eq!(guard.tally, 15);
  assert_eq!(guard.trail, "written+extended");
}

#[test]
fn clones_share_the_same_data() {
  let original = ContextData::new(TestContext::default());
  let clone = original.clone();

  original.write().tally = 5;
  assert_eq!(clone.read().tally, 5);

  clone.write().tally = 7;
  assert_eq!(original.read().tally, 7);
}

#[test]
fn try_locks_respect_outstanding_guards() {
  let ctx = ContextData::new(TestContext::default());
  {
    let _reader = ctx.read();
    assert!(ctx.try_read().is_some());
    assert!(ctx.try_write().is_none());
  }
  assert!(ctx.try_write().is_some());
}

#[test]
fn mapped_guards_expose_one_field() {
  let ctx = ContextData::new(TestContext::default());
  ctx.map_write(|c| &mut c.visited).push("mapped".to_string());
  assert_eq!(&*ctx.map_read(|c| &c.visited), &["mapped".to_string()]);
}

#[tokio::test]
#[serial]
async fn guards_released_before_await_keep_handlers_sound() {
  setup_tracing();
  let ctx = ContextData::new(TestContext::default());

  let handler_logic = async {
    let start = { ctx.read().tally };
    tokio::time::sleep(std::time::Duration::from_millis(1)).await;
    ctx.write().tally = start + 1;
  };
  handler_logic.await;

  assert_eq!(ctx.read().tally, 1);
}
