//! # One-time bulk dataset staging.
//!
//! ```text
//! worker ── exec genbulkload ──► worker:<worker_bulk_dir>/<file>
//!        ── cp worker → local ──► <working_directory>/<file>
//!        ── cp local → target ──► target:<target_bulk_dir>/<file>
//! target ── exec import bulk --workers N --apply ./<file>
//! ```
//!
//! Steps run strictly in order; the first failure aborts staging. Nothing is retried.

use super::remote::RemoteExecutor;
use crate::config::ClusterConfig;
use crate::error::ClusterError;

/// Stages the bulk dataset from one worker onto one target.
pub struct BulkStager<'a> {
    exec: &'a dyn RemoteExecutor,
    cfg: &'a ClusterConfig,
}

impl<'a> BulkStager<'a> {
    /// Creates a stager using `exec` and the paths of `cfg`.
    pub fn new(exec: &'a dyn RemoteExecutor, cfg: &'a ClusterConfig) -> Self {
        Self { exec, cfg }
    }

    /// Generates the dataset on `worker`, moves it to `target` and imports it there.
    pub async fn stage(&self, worker: &str, target: &str) -> Result<(), ClusterError> {
        tracing::info!(%worker, %target, "bulk importing data, this may take some time");
        self.generate(worker).await?;

        let local = self.cfg.local_bulk_file();
        let worker_file = self.cfg.worker_bulk_file();
        self.exec
            .copy_from(worker, &worker_file, &local)
            .await
            .map_err(|source| ClusterError::Transfer {
                from: format!("{worker}:{worker_file}"),
                to: local.display().to_string(),
                source,
            })?;

        let target_file = self.cfg.target_bulk_file();
        self.exec
            .copy_to(&local, target, &target_file)
            .await
            .map_err(|source| ClusterError::Transfer {
                from: local.display().to_string(),
                to: format!("{target}:{target_file}"),
                source,
            })?;

        self.import(target).await?;
        tracing::info!(%target, "bulk import complete");
        Ok(())
    }

    async fn generate(&self, worker: &str) -> Result<(), ClusterError> {
        let command = [self.cfg.loadtest_binary.clone(), "genbulkload".to_string()];
        let mut out = Vec::<u8>::new();
        self.exec
            .exec(worker, &command, &mut out)
            .await
            .map_err(|source| ClusterError::Staging {
                step: "generate",
                source,
                output: None,
            })
    }

    async fn import(&self, target: &str) -> Result<(), ClusterError> {
        let command = [
            self.cfg.platform_binary.clone(),
            "import".to_string(),
            "bulk".to_string(),
            "--workers".to_string(),
            self.cfg.bulk_import_workers.to_string(),
            "--apply".to_string(),
            format!("./{}", self.cfg.bulk_file_name),
        ];
        let mut out = Vec::<u8>::new();
        let res = self.exec.exec(target, &command, &mut out).await;
        res.map_err(|source| ClusterError::Staging {
            step: "import",
            source,
            output: Some(String::from_utf8_lossy(&out).into_owned()),
        })
    }
}
