// shopfront/src/pipeline/execution.rs

//! `Pipeline::run()`: executes steps in order against one shared context.

use crate::error::PipelineError;
use crate::pipeline::context_data::ContextData;
use crate::pipeline::control::{PipelineControl, PipelineResult};
use crate::pipeline::definition::{Handler, Pipeline};
use tracing::{event, info_span, instrument, Instrument, Level};

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<PipelineError> + Send + Sync + 'static,
{
  /// Runs every step against `ctx_data`.
  ///
  /// A required step without handlers fails with `PipelineError::HandlerMissing`.
  /// An error from a required step aborts the run; an error from an optional
  /// step is logged and the run moves on to the next step.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(
      pipeline_context_data_type = %std::any::type_name::<TData>(),
      num_steps = self.steps.len(),
    ),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    event!(Level::DEBUG, "Pipeline execution starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();
      let step_span = info_span!(
        "pipeline_step",
        step_name,
        step_index = step_idx,
        optional = step_def.optional
      );

      if let Some(skip_cond_fn) = &step_def.skip_if {
        if skip_cond_fn(ctx_data.clone()) {
          step_span.in_scope(|| event!(Level::INFO, "Step skipped due to 'skip_if' condition."));
          continue;
        }
      }

      let phases = [
        ("before", self.before_handlers.get(step_name)),
        ("on", self.on_handlers.get(step_name)),
        ("after", self.after_handlers.get(step_name)),
      ];

      if phases.iter().all(|(_, handlers)| handlers.map_or(true, Vec::is_empty)) {
        if step_def.optional {
          step_span.in_scope(|| event!(Level::DEBUG, "Optional step has no handlers, skipping."));
          continue;
        }
        step_span.in_scope(|| event!(Level::ERROR, "Non-optional step has no handlers."));
        return Err(Err::from(PipelineError::HandlerMissing {
          step_name: step_def.name.clone(),
        }));
      }

      let outcome = run_step_phases(&phases, &ctx_data).instrument(step_span.clone()).await;

      match outcome {
        Ok(PipelineControl::Continue) => {
          step_span.in_scope(|| event!(Level::DEBUG, "Step finished."));
        }
        Ok(PipelineControl::Stop) => {
          step_span.in_scope(|| event!(Level::INFO, "Pipeline stopped by a handler."));
          return Ok(PipelineResult::Stopped);
        }
        Err(e) if step_def.optional => {
          step_span.in_scope(|| event!(Level::WARN, error = %e, "Optional step failed; continuing."));
        }
        Err(e) => return Err(e),
      }
    }

    event!(Level::DEBUG, "Pipeline execution completed.");
    Ok(PipelineResult::Completed)
  }
}

async fn run_step_phases<TData, Err>(
  phases: &[(&'static str, Option<&Vec<Handler<TData, Err>>>)],
  ctx_data: &ContextData<TData>,
) -> Result<PipelineControl, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + Send + Sync + 'static,
{
  for (phase, handlers) in phases {
    let Some(handlers) = handlers else { continue };
    for (handler_index, handler_fn) in handlers.iter().enumerate() {
      match handler_fn(ctx_data.clone()).await {
        Ok(PipelineControl::Continue) => {}
        Ok(PipelineControl::Stop) => {
          event!(Level::DEBUG, phase, handler_index, "Handler requested stop.");
          return Ok(PipelineControl::Stop);
        }
        Err(e) => {
          event!(Level::ERROR, phase, handler_index, error = %e, "Handler failed.");
          return Err(e);
        }
      }
    }
  }
  Ok(PipelineControl::Continue)
}
