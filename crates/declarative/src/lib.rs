//! # Declarative
//!
//! A generic engine for driving schema-described service calls against a
//! declarative state model.
//!
//! This crate provides the contracts and the state machine; it knows nothing
//! about any particular resource. Callers implement [`Operation`] for each
//! lifecycle step and hand it to the [`OperationRunner`].
//!
//! ## Core Concepts
//!
//! - **Executor**: one service call with parameter, config and result schemas
//! - **Linker**: a secondary call bound to the result of a primary one
//! - **Operation**: one lifecycle step (collect, run, merge, chain)
//! - **State**: typed attribute values with explicit unknown and null
//! - **Diagnostics**: errors and warnings accumulated instead of thrown
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{RunContext, State, run_operation};
//!
//! let ctx = RunContext::new("vm_instance").with_timeout(Some(Duration::from_secs(600)));
//! let mut target = planned.clone();
//! let summary = run_operation(&ctx, Box::new(create_op), &planned, &planned, &mut target).await;
//!
//! for diagnostic in summary.diagnostics.iter() {
//!     eprintln!("{diagnostic}");
//! }
//! ```

pub mod context;
pub mod diagnostics;
pub mod error;
pub mod executor;
pub mod operation;
pub mod runner;
pub mod state;
pub mod termination;
pub mod types;

pub use context::{NoProgress, ProgressCallback, RunContext};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use error::{Error, Result};
pub use executor::{
    BoxedExecutor, Executor, Links, Linker, NoOpExecutor, TerminatorExecutor, run_executor,
};
pub use operation::{BoxedOperation, Chain, Operation};
pub use runner::{OperationRunner, run_operation};
pub use state::{AttributePath, PathStep, State, StateValue, ValueType};
pub use termination::{PollConfig, PollingExecutor, TerminationCheck};
pub use types::{Configs, ExecutionResult, Parameters, ResultSource, RunSummary};
