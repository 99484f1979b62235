//! Run context and progress hooks
//!
//! These let callers observe and bound a run without the engine depending
//! on any particular host.

use crate::diagnostics::Diagnostics;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Progress callback for operation runs
///
/// Implement this trait to receive updates as the runner walks a chain.
pub trait ProgressCallback: Send {
    /// Called before an operation collects its inputs
    fn on_operation_start(&mut self, name: &str);

    /// Called when an operation decides it has nothing to do
    fn on_operation_skipped(&mut self, name: &str);

    /// Called after an operation finished, with the diagnostics it produced
    fn on_operation_complete(&mut self, name: &str, diagnostics: &Diagnostics);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_operation_start(&mut self, _name: &str) {}
    fn on_operation_skipped(&mut self, _name: &str) {}
    fn on_operation_complete(&mut self, _name: &str, _diagnostics: &Diagnostics) {}
}

/// Context passed to every run step of one lifecycle call
#[derive(Debug, Clone)]
pub struct RunContext {
    resource: String,
    cancellation: CancellationToken,
    timeout: Option<Duration>,
}

impl RunContext {
    /// Create a context for the named resource type
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            cancellation: CancellationToken::new(),
            timeout: None,
        }
    }

    /// Bound every executor call to `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use an externally owned cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Request cancellation of the run
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }
}
