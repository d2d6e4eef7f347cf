use bazaar_flow::{ContextData, FlowError, FlowRegistry, Handler, Pipeline, PipelineControl, SkipCondition};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use tokio::runtime::Runtime;

#[derive(Debug, Default)]
struct BenchContext {
  counter: u64,
}

fn increment_handler() -> Handler<BenchContext, FlowError> {
  Box::new(|ctx: ContextData<BenchContext>| {
    Box::pin(async move {
      ctx.write().counter += 1;
      Ok(PipelineControl::Continue)
    })
  })
}

fn linear_pipeline(steps: usize) -> Pipeline<BenchContext, FlowError> {
  let names: Vec<String> = (0..steps).map(|i| format!("step_{i}")).collect();
  let defs: Vec<(&str, bool, Option<SkipCondition<BenchContext>>)> = names.iter().map(|n| (n.as_str(), false, None)).collect();
  let mut pipeline = Pipeline::new(&defs);
  for name in &names {
    pipeline.on_root(name, increment_handler());
  }
  pipeline
}

fn bench_pipeline_run(c: &mut Criterion) {
  let rt = Runtime::new().unwrap();
  let mut group = c.benchmark_group("pipeline_run");
  for steps in [1usize, 7, 25] {
    let pipeline = linear_pipeline(steps);
    group.bench_with_input(BenchmarkId::from_parameter(steps), &steps, |b, _| {
      b.to_async(&rt).iter(|| async {
        let ctx = ContextData::new(BenchContext::default());
        pipeline.run(ctx).await.unwrap()
      });
    });
  }
  group.finish();
}

fn bench_registry_dispatch(c: &mut Criterion) {
  let rt = Runtime::new().unwrap();
  let registry = FlowRegistry::new_default();
  registry.register_pipeline(linear_pipeline(7));

  c.bench_function("registry_dispatch_7_steps", |b| {
    b.to_async(&rt).iter(|| async {
      let ctx = ContextData::new(BenchContext::default());
      registry.run(ctx).await.unwrap()
    });
  });
}

criterion_group!(benches, bench_pipeline_run, bench_registry_dispatch);
criterion_main!(benches);
