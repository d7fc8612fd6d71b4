//! # Runtime configuration.
//!
//! - [`EntitiesConfig`] settings shared by every simulated user of a swarm.
//! - [`ClusterConfig`] settings for one cluster coordination run.
//!
//! Loading these from files or flags is the embedding application's job; both
//! types are plain structs with sensible [`Default`]s.
//!
//! ## Sentinel values
//! - `status_poll_interval = None` → no status-polling loop
//! - `action_rate_max_variance = 0s` → no jitter on re-arm

use std::path::PathBuf;
use std::time::Duration;

use crate::policies::{Pacing, ReconnectPolicy};

/// Settings applied to every entity launched by a swarm.
///
/// ## Field semantics
/// - `action_rate`: mean interval between one entity's actions
/// - `action_rate_max_variance`: jitter window on re-arm (`rate ± variance/2`)
/// - `status_poll_interval`: period of the optional status-polling loop
/// - `status_channel_capacity`: bound of the shared status channel (min 1)
/// - `reconnect`: event stream reconnect policy
/// - `grace`: how long shutdown waits for outstanding tasks
#[derive(Clone, Debug)]
pub struct EntitiesConfig {
    /// Mean interval between consecutive actions of one entity.
    pub action_rate: Duration,
    /// Maximum jitter window applied after each action.
    pub action_rate_max_variance: Duration,
    /// Period of the status-polling loop (`None` disables it).
    pub status_poll_interval: Option<Duration>,
    /// Capacity of the shared status channel.
    pub status_channel_capacity: usize,
    /// Event stream reconnect policy.
    pub reconnect: ReconnectPolicy,
    /// Maximum time to wait for tasks to stop after the stop signal.
    pub grace: Duration,
}

impl EntitiesConfig {
    /// Returns the action pacing policy.
    #[inline]
    pub fn pacing(&self) -> Pacing {
        Pacing::new(self.action_rate, self.action_rate_max_variance)
    }

    /// Returns the polling period, treating a zero interval as disabled.
    #[inline]
    pub fn poll_interval(&self) -> Option<Duration> {
        self.status_poll_interval.filter(|d| !d.is_zero())
    }

    /// Returns the status channel capacity clamped to a minimum of 1.
    #[inline]
    pub fn status_channel_capacity_clamped(&self) -> usize {
        self.status_channel_capacity.max(1)
    }
}

impl Default for EntitiesConfig {
    /// Default configuration:
    ///
    /// - `action_rate = 60s`
    /// - `action_rate_max_variance = 15s`
    /// - `status_poll_interval = Some(60s)`
    /// - `status_channel_capacity = 1024`
    /// - `reconnect = ReconnectPolicy::default()` (5 retries, 1s step)
    /// - `grace = 30s`
    fn default() -> Self {
        Self {
            action_rate: Duration::from_secs(60),
            action_rate_max_variance: Duration::from_secs(15),
            status_poll_interval: Some(Duration::from_secs(60)),
            status_channel_capacity: 1024,
            reconnect: ReconnectPolicy::default(),
            grace: Duration::from_secs(30),
        }
    }
}

/// Settings for one cluster coordination run.
#[derive(Clone, Debug)]
pub struct ClusterConfig {
    /// Local directory holding the staged bulk file and the `results/` directory.
    pub working_directory: PathBuf,
    /// Delay inserted between successive worker launches.
    pub stagger: Duration,
    /// Parallelism passed to the target's bulk import.
    pub bulk_import_workers: u32,
    /// Bulk dataset file name (same on every hop).
    pub bulk_file_name: String,
    /// Directory on the worker where the bulk file is generated.
    pub worker_bulk_dir: String,
    /// Directory on the target the bulk file is copied into.
    pub target_bulk_dir: String,
    /// Load test binary on the workers.
    pub loadtest_binary: String,
    /// Server binary on the targets (runs the bulk import).
    pub platform_binary: String,
    /// Label selector matching worker pods.
    pub worker_selector: String,
    /// Label selector matching target pods.
    pub target_selector: String,
}

impl ClusterConfig {
    /// Directory receiving one result file per worker.
    pub fn results_dir(&self) -> PathBuf {
        self.working_directory.join("results")
    }

    /// Result file of one worker.
    pub fn result_file(&self, worker: &str) -> PathBuf {
        self.results_dir().join(format!("loadtest-out-{worker}.txt"))
    }

    /// Local copy of the bulk dataset.
    pub fn local_bulk_file(&self) -> PathBuf {
        self.working_directory.join(&self.bulk_file_name)
    }

    /// Bulk dataset path on the worker.
    pub fn worker_bulk_file(&self) -> String {
        join_remote(&self.worker_bulk_dir, &self.bulk_file_name)
    }

    /// Bulk dataset path on the target.
    pub fn target_bulk_file(&self) -> String {
        join_remote(&self.target_bulk_dir, &self.bulk_file_name)
    }
}

fn join_remote(dir: &str, file: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), file)
}

impl Default for ClusterConfig {
    /// Default configuration:
    ///
    /// - `working_directory = "."`
    /// - `stagger = 10s`
    /// - `bulk_import_workers = 64`
    /// - `bulk_file_name = "loadtestbulkload.json"`
    fn default() -> Self {
        Self {
            working_directory: PathBuf::from("."),
            stagger: Duration::from_secs(10),
            bulk_import_workers: 64,
            bulk_file_name: "loadtestbulkload.json".to_string(),
            worker_bulk_dir: "/mattermost-load-test".to_string(),
            target_bulk_dir: "/mattermost".to_string(),
            loadtest_binary: "./bin/loadtest".to_string(),
            platform_binary: "./bin/platform".to_string(),
            worker_selector: "app=loadtest".to_string(),
            target_selector: "app=mattermost-app".to_string(),
        }
    }
}
