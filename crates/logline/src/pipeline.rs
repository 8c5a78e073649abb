//! Start/stop/send entry point.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::runner::Runner;
use crate::types::LogEvent;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// The application-facing pipeline handle.
///
/// Starts `Stopped`. [`start`](Self::start) moves it to `Running`,
/// [`stop`](Self::stop) back to `Stopped`. Share it behind an `Arc`;
/// `send` can be called concurrently from any thread.
///
/// Observer hooks run while `send` holds a read lock on the pipeline state,
/// so hooks must not call `start` or `stop`.
#[derive(Default)]
pub struct Pipeline {
    runner: RwLock<Option<Runner>>,
}

impl Pipeline {
    /// Creates a stopped pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the runner with `config`.
    ///
    /// Fails with [`PipelineError::AlreadyStarted`] if already running and
    /// with [`PipelineError::NoRuntime`] outside a Tokio runtime.
    pub fn start(&self, config: PipelineConfig) -> PipelineResult<()> {
        let mut slot = self.runner.write();
        if slot.is_some() {
            return Err(PipelineError::AlreadyStarted);
        }
        *slot = Some(Runner::start(Arc::new(config))?);
        Ok(())
    }

    /// Stops the runner. A no-op when already stopped.
    pub fn stop(&self) {
        match self.runner.write().take() {
            Some(runner) => runner.stop(),
            None => debug!("Pipeline already stopped"),
        }
    }

    /// Fire-and-forget: fans the event out to its destinations and returns.
    ///
    /// Fails synchronously with [`PipelineError::NotStarted`],
    /// [`PipelineError::UnmappedLogType`] or
    /// [`PipelineError::Serialization`]; delivery failures are never
    /// reported here.
    pub fn send(&self, event: &dyn LogEvent) -> PipelineResult<()> {
        let slot = self.runner.read();
        let runner = slot.as_ref().ok_or(PipelineError::NotStarted)?;
        runner.send(event)
    }

    /// Runs a delivery cycle now instead of waiting for the timer.
    pub fn flush(&self) -> PipelineResult<()> {
        let slot = self.runner.read();
        let runner = slot.as_ref().ok_or(PipelineError::NotStarted)?;
        runner.flush()
    }

    /// Whether the pipeline is running.
    pub fn is_running(&self) -> bool {
        self.runner.read().is_some()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("running", &self.is_running())
            .finish()
    }
}
