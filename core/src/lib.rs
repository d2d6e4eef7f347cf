// core/src/lib.rs

//! bazaar-flow: small asynchronous step pipelines.
//!
//! A workflow is declared as an ordered list of named steps over a shared
//! context (`ContextData<T>`). Each step may carry `before`, `on` and `after`
//! hooks; any hook can stop the run early or fail it. Pipelines are stored in
//! a `FlowRegistry` keyed by their context type, so callers only need to build
//! a context and hand it to the registry.
//!
//! ```text
//!   let mut p = Pipeline::<MyCtx, MyError>::new(&[("validate", false, None), ("persist", false, None)]);
//!   p.on_root("validate", |ctx| Box::pin(async move { ...; Ok::<_, MyError>(PipelineControl::Continue) }));
//!   registry.register_pipeline(p);
//!   registry.run(ContextData::new(MyCtx { .. })).await?;
//! ```

pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::core::context::Handler;
pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::step::{SkipCondition, StepDef};

pub use crate::pipeline::definition::Pipeline;

pub use crate::error::{FlowError, FlowResult};

pub use crate::registry::FlowRegistry;
