//! Diagnostics sinks for non-fatal engine conditions

use parking_lot::Mutex;
use tracing::warn;

use crate::error::EngineError;

/// Receives malformed messages and dangling targets. Reporting must not block.
pub trait DiagnosticsSink: Send + Sync {
    fn report(&self, error: &EngineError);
}

/// Logs through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticsSink for TracingDiagnostics {
    fn report(&self, error: &EngineError) {
        warn!("{}", error);
    }
}

/// Keeps every report in memory
#[derive(Debug, Default)]
pub struct CollectingDiagnostics {
    errors: Mutex<Vec<EngineError>>,
}

impl CollectingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<EngineError> {
        std::mem::take(&mut *self.errors.lock())
    }

    pub fn len(&self) -> usize {
        self.errors.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.lock().is_empty()
    }
}

impl DiagnosticsSink for CollectingDiagnostics {
    fn report(&self, error: &EngineError) {
        self.errors.lock().push(error.clone());
    }
}
