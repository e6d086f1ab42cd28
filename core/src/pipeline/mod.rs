// shopfront/src/pipeline/mod.rs

//! A small step pipeline: ordered, named steps with `before`/`on`/`after`
//! handlers that share one `ContextData<T>`.
//!
//! Order placement is expressed as one of these pipelines so that each stage
//! (quote, assemble, commit, carrier registration) is logged in its own span
//! and can be stopped, skipped or marked optional independently.

pub mod context_data;
pub mod control;
pub mod definition;
pub mod execution;
pub mod hooks;
pub mod step;

pub use context_data::ContextData;
pub use control::{PipelineControl, PipelineResult};
pub use definition::{Handler, Pipeline};
pub use step::{SkipCondition, StepDef};
