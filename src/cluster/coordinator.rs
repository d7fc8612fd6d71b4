//! # Cluster coordinator: stage once, then fan out over every worker.
//!
//! ## Flow
//! ```text
//! loadtest(mirror)
//!   ├─► fleet.workers() / fleet.targets()        (empty or failing → Discovery)
//!   ├─► BulkStager::stage(workers[0], targets[0]) (any failure aborts the run)
//!   ├─► for each worker i:
//!   │     ├─► sleep(stagger)                      (between launches only)
//!   │     ├─► guard = wait_group.enter()
//!   │     └─► spawn: exec(worker, [loadtest, "all"]) → results/loadtest-out-<worker>.txt
//!   │                (worker 0's stdout also → mirror)
//!   └─► wait_group.wait() → Ok(())
//! ```
//!
//! ## Rules
//! - A worker failure is logged and isolated; siblings keep running and the run
//!   still returns `Ok(())` once every worker has finished.
//! - Identities are looked up fresh on every run.

use std::sync::Arc;

use tokio::time;

use super::kubectl::Kubectl;
use super::remote::{Fleet, RemoteExecutor, ResultFile, SharedWriter};
use super::stage::BulkStager;
use crate::config::ClusterConfig;
use crate::core::WaitGroup;
use crate::error::ClusterError;

/// Runs the full load test across a fleet of workers.
pub struct Coordinator {
    exec: Arc<dyn RemoteExecutor>,
    fleet: Arc<dyn Fleet>,
    cfg: ClusterConfig,
}

impl Coordinator {
    /// Creates a coordinator over the given collaborators.
    pub fn new(exec: Arc<dyn RemoteExecutor>, fleet: Arc<dyn Fleet>, cfg: ClusterConfig) -> Self {
        Self { exec, fleet, cfg }
    }

    /// Creates a coordinator driving pods through `kubectl`.
    pub fn kubectl(cfg: ClusterConfig) -> Self {
        let kubectl = Arc::new(Kubectl::new(&cfg));
        Self::new(kubectl.clone(), kubectl, cfg)
    }

    /// Coordination settings.
    pub fn config(&self) -> &ClusterConfig {
        &self.cfg
    }

    /// Stages the bulk dataset, then runs the load test on every worker.
    ///
    /// `mirror` receives the first worker's stdout as it is produced.
    ///
    /// ### Errors
    /// - [`ClusterError::Discovery`] if no workers or no targets are running;
    /// - [`ClusterError::Staging`] / [`ClusterError::Transfer`] if bulk staging fails.
    ///
    /// Worker failures are only logged.
    pub async fn loadtest(&self, mirror: Option<SharedWriter>) -> Result<(), ClusterError> {
        let workers = discover("loadtest", self.fleet.workers().await)?;
        let targets = discover("app", self.fleet.targets().await)?;

        BulkStager::new(self.exec.as_ref(), &self.cfg)
            .stage(&workers[0], &targets[0])
            .await?;

        let wg = WaitGroup::new();
        for (i, worker) in workers.into_iter().enumerate() {
            if i > 0 {
                time::sleep(self.cfg.stagger).await;
            }

            let guard = wg.enter();
            let exec = Arc::clone(&self.exec);
            let path = self.cfg.result_file(&worker);
            let command = [self.cfg.loadtest_binary.clone(), "all".to_string()];
            let mirror = if i == 0 { mirror.clone() } else { None };

            tokio::spawn(async move {
                let _guard = guard;
                if let Err(e) = run_worker(exec.as_ref(), &worker, &command, path, mirror).await {
                    tracing::error!(%worker, error = %e, label = e.as_label(), "worker loadtest failed");
                }
            });
        }

        tracing::info!(
            results = %self.cfg.results_dir().display(),
            "waiting for loadtests to complete"
        );
        wg.wait().await;
        Ok(())
    }
}

fn discover(
    role: &'static str,
    found: Result<Vec<String>, crate::error::RemoteError>,
) -> Result<Vec<String>, ClusterError> {
    match found {
        Ok(pods) if !pods.is_empty() => Ok(pods),
        Ok(_) => Err(ClusterError::Discovery {
            role,
            reason: "no running pods".to_string(),
        }),
        Err(e) => Err(ClusterError::Discovery {
            role,
            reason: e.to_string(),
        }),
    }
}

async fn run_worker(
    exec: &dyn RemoteExecutor,
    worker: &str,
    command: &[String],
    path: std::path::PathBuf,
    mirror: Option<SharedWriter>,
) -> Result<(), ClusterError> {
    let mut out = ResultFile::create(path, mirror).await?;
    tracing::info!(%worker, "running loadtest");

    let res = exec.exec(worker, command, &mut out).await;
    out.finish().await?;
    res.map_err(|source| ClusterError::WorkerTask {
        worker: worker.to_string(),
        source,
    })
}
