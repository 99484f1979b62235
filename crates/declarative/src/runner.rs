//! Operation runner - drives an operation and its chain to completion
//!
//! Each operation goes through the same steps:
//!
//! 1. collect parameters and configs
//! 2. decide whether to run (skipping leaves the target untouched)
//! 3. run; failures abort the whole chain
//! 4. validate the result against its declared schema (warnings only)
//! 5. merge the result into the target state
//! 6. chain follow-up operations, run depth-first in the order returned
//!
//! The root operation sees the caller's current state. Chained operations
//! see the target state as merged so far, so a read chained after a create
//! finds the identifier the create produced.

use crate::context::{NoProgress, ProgressCallback, RunContext};
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::operation::{BoxedOperation, Operation};
use crate::state::State;
use crate::types::RunSummary;

/// Runs operation chains for one lifecycle call
pub struct OperationRunner<'a, P: ProgressCallback> {
    ctx: &'a RunContext,
    progress: &'a mut P,
}

/// What the runner should do after one step
enum StepOutcome {
    Continue(Vec<BoxedOperation>),
    Abort,
}

impl<'a, P: ProgressCallback> OperationRunner<'a, P> {
    pub fn new(ctx: &'a RunContext, progress: &'a mut P) -> Self {
        Self { ctx, progress }
    }

    /// Run `operation` and everything it chains, merging into `target`
    pub async fn run(
        &mut self,
        operation: BoxedOperation,
        current: &State,
        planned: &State,
        target: &mut State,
    ) -> RunSummary {
        let mut summary = RunSummary::default();
        let mut pending: Vec<(BoxedOperation, bool)> = vec![(operation, true)];

        while let Some((op, is_root)) = pending.pop() {
            if self.ctx.is_cancelled() {
                summary.diagnostics.push(Diagnostic::error(
                    DiagnosticKind::Cancelled,
                    "operation cancelled",
                    format!("{}: {} was not started", self.ctx.resource(), op.name()),
                ));
                break;
            }

            let op_current = if is_root { current.clone() } else { target.clone() };
            match self
                .step(op.as_ref(), &op_current, planned, target, &mut summary)
                .await
            {
                StepOutcome::Continue(chained) => {
                    pending.extend(chained.into_iter().rev().map(|next| (next, false)));
                }
                StepOutcome::Abort => {
                    log::debug!(
                        "{}: chain aborted at {}",
                        self.ctx.resource(),
                        op.name()
                    );
                    break;
                }
            }
        }

        summary
    }

    async fn step(
        &mut self,
        op: &dyn Operation,
        current: &State,
        planned: &State,
        target: &mut State,
        summary: &mut RunSummary,
    ) -> StepOutcome {
        let ctx = self.ctx;
        let name = op.name().to_string();
        let resource = ctx.resource();
        self.progress.on_operation_start(&name);
        let mut diagnostics = Diagnostics::new();

        let (parameters, d) = op.collect_parameters(current, planned);
        if diagnostics.append_check_error(d) {
            return self.abort(&name, diagnostics, summary);
        }
        let configs = op.collect_configs(current, planned);

        let result = if op.should_run(&parameters, &configs) {
            log::info!("{resource}: running {name}");
            let (result, d) = op.run(ctx, parameters, configs).await;
            if diagnostics.append_check_error(d) {
                return self.abort(&name, diagnostics, summary);
            }
            summary.completed += 1;
            result
        } else {
            log::info!("{resource}: skipping {name}, nothing to do");
            self.progress.on_operation_skipped(&name);
            summary.skipped += 1;
            None
        };

        if let Some(result) = &result {
            if let Some(schema) = op.result_schema() {
                if !result.value.is_null() {
                    if let Err(e) = schemakit::validate(schema, &result.value) {
                        log::warn!("{resource}: {name} result does not match its schema: {e}");
                        diagnostics.push(Diagnostic::warning(
                            DiagnosticKind::ResultMismatch,
                            "result does not match its declared schema",
                            format!("{resource}: {name}: {e}"),
                        ));
                    }
                }
            }

            let (keep_going, d) = op.post_run(result, current, planned, target);
            if diagnostics.append_check_error(d) {
                return self.abort(&name, diagnostics, summary);
            }
            if !keep_going {
                return self.finish(&name, diagnostics, summary, Vec::new());
            }
        }

        let chain = op.chain_operations(result.as_ref(), current, planned);
        if diagnostics.append_check_error(chain.diagnostics) {
            return self.abort(&name, diagnostics, summary);
        }
        let produced = result.as_ref().is_some_and(|r| !r.is_empty());
        let chained = if produced || chain.run_if_empty {
            chain.operations
        } else {
            Vec::new()
        };
        self.finish(&name, diagnostics, summary, chained)
    }

    fn finish(
        &mut self,
        name: &str,
        diagnostics: Diagnostics,
        summary: &mut RunSummary,
        chained: Vec<BoxedOperation>,
    ) -> StepOutcome {
        self.progress.on_operation_complete(name, &diagnostics);
        summary.diagnostics.extend(diagnostics);
        StepOutcome::Continue(chained)
    }

    fn abort(
        &mut self,
        name: &str,
        diagnostics: Diagnostics,
        summary: &mut RunSummary,
    ) -> StepOutcome {
        self.progress.on_operation_complete(name, &diagnostics);
        summary.diagnostics.extend(diagnostics);
        StepOutcome::Abort
    }
}

/// Run an operation chain without progress reporting
pub async fn run_operation(
    ctx: &RunContext,
    operation: BoxedOperation,
    current: &State,
    planned: &State,
    target: &mut State,
) -> RunSummary {
    let mut progress = NoProgress;
    OperationRunner::new(ctx, &mut progress)
        .run(operation, current, planned, target)
        .await
}
