//! Error types used by entity runners, the swarm runtime and the cluster coordinator.
//!
//! - [`SelectionError`] malformed weighted choice lists.
//! - [`ApiError`] profile-fetch collaborator failures.
//! - [`StreamError`] streaming collaborator failures.
//! - [`EntityError`] failures of a single simulated user.
//! - [`RemoteError`] failures of one remote command or copy.
//! - [`ClusterError`] failures of a coordination run.
//! - [`RuntimeError`] failures of the swarm runtime itself.
//!
//! All enums provide `as_label` for logs/metrics.

use std::time::Duration;
use thiserror::Error;

/// Errors produced when drawing from a weighted choice list.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionError {
    /// The choice list has no items.
    #[error("weighted choice list is empty")]
    Empty,
    /// The weights sum to zero.
    #[error("weighted choice list has no positive weight")]
    NonPositiveWeight,
}

impl SelectionError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SelectionError::Empty => "selection_empty",
            SelectionError::NonPositiveWeight => "selection_non_positive_weight",
        }
    }
}

/// # Errors returned by the remote API client.
///
/// The core treats both variants identically (initialization aborts), the split
/// only exists so callers and logs can tell them apart.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The requested resource does not exist.
    #[error("{what} not found")]
    NotFound {
        /// What was being fetched.
        what: String,
    },
    /// The request never produced a usable response.
    #[error("transport failure: {message}")]
    Transport {
        /// The underlying error message.
        message: String,
    },
}

impl ApiError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ApiError::NotFound { .. } => "api_not_found",
            ApiError::Transport { .. } => "api_transport",
        }
    }
}

/// Errors returned by the streaming collaborator.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// Connecting (or reconnecting) failed.
    #[error("connect failed: {message}")]
    Connect {
        /// The underlying error message.
        message: String,
    },
    /// The peer closed the stream without reporting an error.
    #[error("closed by peer")]
    Closed,
}

/// # Errors produced by a simulated user.
///
/// Only [`EntityError::RuntimeFault`] is recovered by restarting the entity;
/// every other variant ends the entity permanently.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum EntityError {
    /// Fetching the user profile failed; reported as `FailedLaunch`.
    #[error("initialization failed: {0}")]
    Initialization(#[source] ApiError),

    /// The action list cannot be drawn from.
    #[error("action selection failed: {0}")]
    Selection(#[from] SelectionError),

    /// The event stream was declared dead after exhausting reconnects.
    #[error("stream connection dead after {attempts} attempts: {error}")]
    Connection {
        /// Reconnect attempts performed.
        attempts: u32,
        /// Last observed stream error.
        error: StreamError,
    },

    /// An action failed (returned an error or panicked).
    #[error("action `{action}` faulted: {error}")]
    RuntimeFault {
        /// Name of the action that faulted.
        action: String,
        /// The underlying error message.
        error: String,
    },
}

impl EntityError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            EntityError::Initialization(_) => "entity_initialization",
            EntityError::Selection(_) => "entity_selection",
            EntityError::Connection { .. } => "entity_connection",
            EntityError::RuntimeFault { .. } => "entity_runtime_fault",
        }
    }

    /// Indicates whether the supervisor should restart the entity.
    ///
    /// # Example
    /// ```
    /// use loadvisor::{EntityError, SelectionError};
    ///
    /// let fault = EntityError::RuntimeFault { action: "post".into(), error: "boom".into() };
    /// assert!(fault.is_restartable());
    ///
    /// let fatal = EntityError::Selection(SelectionError::Empty);
    /// assert!(!fatal.is_restartable());
    /// ```
    pub fn is_restartable(&self) -> bool {
        matches!(self, EntityError::RuntimeFault { .. })
    }
}

/// Errors produced by a single remote command or file copy.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RemoteError {
    /// The local helper process could not be started.
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The command ran but exited unsuccessfully.
    #[error("`{command}` exited with {status}")]
    Exit {
        /// Rendered command line.
        command: String,
        /// Rendered exit status.
        status: String,
    },

    /// Reading output or writing it to a sink failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// # Errors produced by a cluster coordination run.
///
/// Discovery, staging and transfer failures abort the whole run.
/// [`ClusterError::WorkerTask`] is only ever logged by the coordinator.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ClusterError {
    /// No usable worker or target identities were found.
    #[error("unable to discover {role} pods: {reason}")]
    Discovery {
        /// Which fleet was being discovered (`loadtest` / `app`).
        role: &'static str,
        /// Why discovery failed.
        reason: String,
    },

    /// Generating or importing the bulk dataset failed.
    #[error("bulk staging failed at `{step}`: {source}{}", render_output(.output))]
    Staging {
        /// Staging step that failed.
        step: &'static str,
        #[source]
        source: RemoteError,
        /// Captured combined output (import step only).
        output: Option<String>,
    },

    /// Copying the bulk dataset between hops failed.
    #[error("bulk transfer {from} -> {to} failed: {source}")]
    Transfer {
        /// Copy source.
        from: String,
        /// Copy destination.
        to: String,
        #[source]
        source: RemoteError,
    },

    /// One worker's load test run failed.
    #[error("loadtest on worker {worker} failed: {source}")]
    WorkerTask {
        /// Worker identity.
        worker: String,
        #[source]
        source: RemoteError,
    },

    /// Preparing local result files failed.
    #[error("results i/o failed for {path}: {source}")]
    Io {
        /// File or directory being prepared.
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ClusterError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ClusterError::Discovery { .. } => "cluster_discovery",
            ClusterError::Staging { .. } => "cluster_staging",
            ClusterError::Transfer { .. } => "cluster_transfer",
            ClusterError::WorkerTask { .. } => "cluster_worker_task",
            ClusterError::Io { .. } => "cluster_io",
        }
    }
}

fn render_output(output: &Option<String>) -> String {
    match output.as_deref().map(str::trim) {
        Some(out) if !out.is_empty() => format!(": {out}"),
        _ => String::new(),
    }
}

/// Errors produced by the swarm runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some entity tasks never reported completion.
    #[error("shutdown timeout {grace:?} exceeded; {outstanding} tasks still running")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Number of tasks the completion counter still holds.
        outstanding: usize,
    },

    /// Installing OS signal handlers failed.
    #[error("signal handler registration failed: {0}")]
    Signal(#[from] std::io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use loadvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), outstanding: 2 };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Signal(_) => "runtime_signal",
        }
    }
}
