//! Error types for the kernels and the counter harness.

use crate::counters::{CacheEvent, SessionState};
use thiserror::Error;

/// Errors raised before a kernel starts computing.
#[derive(Error, Debug)]
pub enum MatmulError {
    #[error("invalid dimensions {m_ar}x{m_br}: matrices must be square, non-empty and addressable")]
    InvalidDimension { m_ar: usize, m_br: usize },

    #[error("invalid block size {0}: must be at least 1")]
    InvalidBlockSize(usize),

    #[error("result matrix must start zeroed before line accumulation")]
    DirtyAccumulator,

    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// How a counter failure affects the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// No meaningful measurement is possible; the driver exits.
    Fatal,
    /// Reported and ignored; counter readings for the cycle may be wrong.
    Advisory,
}

/// Failures of the hardware counter backend or of session misuse.
#[derive(Error, Debug)]
pub enum CounterError {
    #[error("counter backend unavailable: {reason}")]
    BackendUnavailable { reason: String },

    #[error("counter backend version mismatch: {reason}")]
    VersionMismatch { reason: String },

    #[error("ERROR: create eventset: {0}")]
    CreateEventSet(#[source] std::io::Error),

    #[error("ERROR: {event}: {source}")]
    AddEvent {
        event: CacheEvent,
        #[source]
        source: std::io::Error,
    },

    #[error("FAIL remove event {event}: {source}")]
    RemoveEvent {
        event: CacheEvent,
        #[source]
        source: std::io::Error,
    },

    #[error("ERROR: Start counters: {0}")]
    Start(#[source] std::io::Error),

    #[error("ERROR: Stop counters: {0}")]
    Stop(#[source] std::io::Error),

    #[error("FAIL reset: {0}")]
    Reset(#[source] std::io::Error),

    #[error("FAIL destroy: {0}")]
    Destroy(#[source] std::io::Error),

    #[error("cannot {operation} a session in state {state:?}")]
    InvalidTransition {
        state: SessionState,
        operation: &'static str,
    },
}

/// Failures that stop a sweep.
#[derive(Error, Debug)]
pub enum SweepError {
    #[error(transparent)]
    Counter(#[from] CounterError),

    #[error("failed to write sweep report: {0}")]
    Io(#[from] std::io::Error),
}

impl CounterError {
    pub fn severity(&self) -> Severity {
        match self {
            CounterError::BackendUnavailable { .. } | CounterError::VersionMismatch { .. } => {
                Severity::Fatal
            }
            _ => Severity::Advisory,
        }
    }
}
