//! # Swarm: owner of many simulated users.
//!
//! The [`Swarm`] owns what every entity shares: the stop token, the completion
//! counter and the status channel. It wires new entities to them, launches their
//! loops and drives graceful shutdown.
//!
//! ## Architecture
//! ```text
//! Swarm::new(cfg) ──► (Swarm, StatusReceiver) ──► sinks::aggregate(rx, sinks)
//!
//! swarm.entity(n, name, client) ─► EntityBuilder (status, child stop token, wait group, settings)
//!        └─► .action(..).build() ─► swarm.launch(&entity)
//!                                        ├─► ActionLoop   (supervised)
//!                                        ├─► StatusPoll   (supervised, optional)
//!                                        └─► listen()     (optional)
//!
//! Shutdown path:
//!   run_until_signal(): wait_for_shutdown_signal() ─► shutdown()
//!   shutdown(): stop.cancel() ─► timeout(grace, wait_group.wait())
//!                                   ├─ Ok      → Ok(())
//!                                   └─ Elapsed → Err(GraceExceeded { outstanding })
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use loadvisor::{ActionFn, ApiClient, ApiError, Channel, EntitiesConfig, Swarm, Team, User};
//!
//! struct Api;
//!
//! #[async_trait::async_trait]
//! impl ApiClient for Api {
//!     async fn current_user(&self) -> Result<User, ApiError> { Ok(User::default()) }
//!     async fn teams_for_user(&self, _: &str) -> Result<Vec<Team>, ApiError> { Ok(vec![]) }
//!     async fn channels_for_team(&self, _: &str, _: &str) -> Result<Vec<Channel>, ApiError> { Ok(vec![]) }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = EntitiesConfig {
//!         action_rate: Duration::from_millis(50),
//!         action_rate_max_variance: Duration::from_millis(10),
//!         grace: Duration::from_secs(1),
//!         ..EntitiesConfig::default()
//!     };
//!     let (swarm, _reports) = Swarm::new(cfg);
//!
//!     let entity = swarm
//!         .entity(1, "user-1", Arc::new(Api))
//!         .action(ActionFn::arc("noop", |_e| async { anyhow::Ok(()) }), 1)
//!         .build();
//!     swarm.launch(&entity);
//!
//!     tokio::time::sleep(Duration::from_millis(200)).await;
//!     swarm.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::runner::ActionLoop;
use super::shutdown;
use super::supervisor::launch_with;
use super::wait_group::WaitGroup;
use crate::config::EntitiesConfig;
use crate::entity::{ApiClient, EntityBuilder, EntityConfig};
use crate::error::RuntimeError;
use crate::status::{StatusReceiver, StatusSender, status_channel};

/// Owns the shared handles of a set of entities.
pub struct Swarm {
    cfg: EntitiesConfig,
    status: StatusSender,
    stop: CancellationToken,
    wait_group: WaitGroup,
    actions: ActionLoop,
}

impl Swarm {
    /// Creates a swarm and the receiving half of its status channel.
    pub fn new(cfg: EntitiesConfig) -> (Self, StatusReceiver) {
        let (status, rx) = status_channel(cfg.status_channel_capacity_clamped());
        let swarm = Self {
            cfg,
            status,
            stop: CancellationToken::new(),
            wait_group: WaitGroup::new(),
            actions: ActionLoop::default(),
        };
        (swarm, rx)
    }

    /// Replaces the action loop used for every entity launched afterwards.
    pub fn with_action_loop(mut self, actions: ActionLoop) -> Self {
        self.actions = actions;
        self
    }

    /// Starts an entity already wired to this swarm.
    pub fn entity(
        &self,
        number: usize,
        name: impl Into<String>,
        client: Arc<dyn ApiClient>,
    ) -> EntityBuilder {
        EntityConfig::builder(number, name, client)
            .settings(&self.cfg)
            .status(self.status.clone())
            .stop(self.stop.child_token())
            .wait_group(self.wait_group.clone())
    }

    /// Launches every loop of `entity`.
    pub fn launch(&self, entity: &Arc<EntityConfig>) {
        tracing::debug!(entity = %entity.name(), number = entity.number(), "launching entity");
        launch_with(entity, self.actions.clone());
    }

    /// Swarm-wide stop signal.
    pub fn stop_token(&self) -> &CancellationToken {
        &self.stop
    }

    /// Completion counter of every launched task.
    pub fn wait_group(&self) -> &WaitGroup {
        &self.wait_group
    }

    /// Settings applied to new entities.
    pub fn config(&self) -> &EntitiesConfig {
        &self.cfg
    }

    /// Signals stop and waits for every task within the grace period.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.stop.cancel();

        let grace = self.cfg.grace;
        match tokio::time::timeout(grace, self.wait_group.wait()).await {
            Ok(()) => {
                tracing::info!("all entities stopped within grace");
                Ok(())
            }
            Err(_) => {
                let outstanding = self.wait_group.count();
                tracing::warn!(?grace, outstanding, "shutdown grace exceeded");
                Err(RuntimeError::GraceExceeded { grace, outstanding })
            }
        }
    }

    /// Waits for a termination signal, then shuts down.
    pub async fn run_until_signal(&self) -> Result<(), RuntimeError> {
        shutdown::wait_for_shutdown_signal().await?;
        tracing::info!("termination signal received, stopping entities");
        self.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{ActionFn, Channel, Team, User};
    use crate::error::ApiError;
    use crate::status::StatusKind;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;

    struct Api;

    #[async_trait]
    impl ApiClient for Api {
        async fn current_user(&self) -> Result<User, ApiError> {
            Ok(User::default())
        }
        async fn teams_for_user(&self, _: &str) -> Result<Vec<Team>, ApiError> {
            Ok(Vec::new())
        }
        async fn channels_for_team(&self, _: &str, _: &str) -> Result<Vec<Channel>, ApiError> {
            Ok(Vec::new())
        }
    }

    fn cfg() -> EntitiesConfig {
        EntitiesConfig {
            action_rate: Duration::from_secs(1),
            action_rate_max_variance: Duration::from_millis(200),
            status_poll_interval: None,
            grace: Duration::from_secs(2),
            ..EntitiesConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_every_entity() {
        let (swarm, mut rx) = Swarm::new(cfg());
        let entities: Vec<_> = (0..4)
            .map(|n| {
                swarm
                    .entity(n, format!("user-{n}"), Arc::new(Api))
                    .action(ActionFn::arc("noop", |_e| async { anyhow::Ok(()) }), 1)
                    .build()
            })
            .collect();
        for e in &entities {
            swarm.launch(e);
        }

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(swarm.wait_group().count(), 4);

        swarm.shutdown().await.unwrap();
        assert_eq!(swarm.wait_group().count(), 0);
        assert!(entities.iter().all(|e| e.stop_token().is_cancelled()));

        let mut per_kind: HashMap<StatusKind, usize> = HashMap::new();
        while let Ok(report) = rx.try_recv() {
            *per_kind.entry(report.kind).or_default() += 1;
        }
        assert_eq!(per_kind.get(&StatusKind::Active), Some(&4));
        assert_eq!(per_kind.get(&StatusKind::Stopped), Some(&4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_reports_stuck_tasks() {
        let (swarm, _rx) = Swarm::new(cfg());
        let entity = swarm
            .entity(0, "stuck", Arc::new(Api))
            .action(
                ActionFn::arc("hang", |_e| async {
                    std::future::pending::<()>().await;
                    anyhow::Ok(())
                }),
                1,
            )
            .build();
        swarm.launch(&entity);
        tokio::time::sleep(Duration::from_secs(3)).await;

        match swarm.shutdown().await {
            Err(RuntimeError::GraceExceeded { grace, outstanding }) => {
                assert_eq!(grace, Duration::from_secs(2));
                assert_eq!(outstanding, 1);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
