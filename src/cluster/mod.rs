//! # Cluster coordination: the load test across a fleet of worker pods.
//!
//! - [`Coordinator`] discovers pods, stages the bulk dataset once and fans out.
//! - [`BulkStager`] the four-step bulk staging sequence.
//! - [`RemoteExecutor`] / [`Fleet`] the remote process interface; [`Kubectl`]
//!   implements both.
//! - [`ResultFile`] / [`SharedWriter`] / [`OutputSink`] where command output goes.
//!
//! ## Example
//! ```no_run
//! use loadvisor::ClusterConfig;
//! use loadvisor::cluster::{Coordinator, SharedWriter};
//!
//! # async fn run() -> Result<(), loadvisor::ClusterError> {
//! let coordinator = Coordinator::kubectl(ClusterConfig {
//!     working_directory: "/var/lib/loadtest".into(),
//!     ..ClusterConfig::default()
//! });
//! coordinator.loadtest(Some(SharedWriter::stdout())).await?;
//! # Ok(())
//! # }
//! ```

mod coordinator;
mod kubectl;
mod remote;
mod stage;

pub use coordinator::Coordinator;
pub use kubectl::Kubectl;
pub use remote::{Fleet, OutputSink, OutputStream, RemoteExecutor, ResultFile, SharedWriter};
pub use stage::BulkStager;
