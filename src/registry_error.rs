//! Failure capture for the shutdown sweep.
//!
//! `teardown_all` never aborts early and never returns an error directly.
//! Everything that went wrong is collected into a [`TeardownReport`], which a
//! host can inspect or turn into a [`TeardownError`] after the sweep.

use std::any::Any;

use thiserror::Error;

use crate::TrackedHandle;

/// A destroyer that panicked during `teardown_all`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestroyFailure {
    pub handle: TrackedHandle,
    pub type_name: &'static str,
    /// Panic message, when the payload was a string.
    pub message: String,
}

impl DestroyFailure {
    pub(crate) fn from_panic(
        handle: TrackedHandle,
        type_name: &'static str,
        payload: Box<dyn Any + Send>,
    ) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };

        DestroyFailure {
            handle,
            type_name,
            message,
        }
    }
}

impl std::fmt::Display for DestroyFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}) panicked: {}",
            self.handle, self.type_name, self.message
        )
    }
}

/// Outcome of one `teardown_all` sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    /// Handles whose destroyer ran to completion, in destruction order.
    pub destroyed: Vec<TrackedHandle>,
    /// Snapshot handles that were already gone when the sweep reached them.
    pub skipped: Vec<TrackedHandle>,
    /// Destroyers that panicked.
    pub failures: Vec<DestroyFailure>,
    /// Handles still registered after the sweep; cleared afterwards.
    pub residual: Vec<TrackedHandle>,
}

impl TeardownReport {
    /// No failures and nothing left behind.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.residual.is_empty()
    }

    /// Converts a report with problems into an error.
    ///
    /// Destroyer failures take precedence over residual entries.
    pub fn into_result(self) -> Result<TeardownReport, TeardownError> {
        if let Some(first) = self.failures.first() {
            return Err(TeardownError::DestroyFailed {
                count: self.failures.len(),
                first: first.clone(),
            });
        }

        if !self.residual.is_empty() {
            return Err(TeardownError::ResidualEntries {
                count: self.residual.len(),
            });
        }

        Ok(self)
    }
}

/// Problems surfaced after a shutdown sweep.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TeardownError {
    /// One or more destroyers panicked.
    #[error("{count} object(s) failed to destroy, first: {first}")]
    DestroyFailed { count: usize, first: DestroyFailure },

    /// Objects were registered during the sweep and never destroyed by it.
    #[error("{count} object(s) still registered after teardown")]
    ResidualEntries { count: usize },
}
