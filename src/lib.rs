//! # loadvisor
//!
//! **Loadvisor** generates synthetic concurrent user load against a remote service
//! and coordinates that load generation across a fleet of worker pods.
//!
//! It has two levels:
//! - the **swarm**: many simulated users (entities), each scheduling weighted-random
//!   actions at jittered, epoch-aligned times, reporting status over a bounded channel,
//!   restarted on crash and keeping an event stream alive with bounded reconnect;
//! - the **cluster coordinator**: stages a shared bulk dataset once, then fans the
//!   load test out across every worker pod with a fixed stagger.
//!
//! ## Architecture
//! ### Swarm
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ EntityConfig │   │ EntityConfig │   │ EntityConfig │
//!     │  (user #1)   │   │  (user #2)   │   │  (user #N)   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Swarm                                                            │
//! │  - CancellationToken (stop signal, child token per entity)        │
//! │  - WaitGroup (completion counter)                                 │
//! │  - StatusSender (bounded status channel)                          │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!   spawn_supervised   spawn_supervised     listen()
//!   (ActionLoop)       (StatusPoll)         (event stream, bounded reconnect)
//!        │                  │
//!        │  crash ─► FailedActive ─► enter new guard ─► respawn ─► drop old guard
//!        ▼
//!   Initializing ─► Scheduled ⇄ Acting ─► Stopped
//!        │
//!        └─► send_* ─► mpsc(cap) ─► sinks::aggregate ─► StatusLog / StatusTally / ...
//! ```
//!
//! ### Cluster
//! ```text
//! Coordinator::loadtest()
//!   ├─► Fleet: workers, targets            (empty → Discovery)
//!   ├─► BulkStager: generate → cp → cp → import   (once, not retried)
//!   └─► per worker, 10s apart: exec "loadtest all" → results/loadtest-out-<pod>.txt
//!        └─► join all; worker failures are logged only
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                          |
//! |-------------------|--------------------------------------------------------------|---------------------------------------------|
//! | **Entities**      | Simulated users, weighted actions, derived profile.          | [`EntityConfig`], [`Action`], [`ActionFn`]  |
//! | **Scheduling**    | Epoch-aligned phase, jittered re-arm, weighted selection.    | [`ActionScheduler`], [`Pacing`], [`pick`]   |
//! | **Supervision**   | Crash restart that never lets the counter reach zero.        | [`spawn_supervised`], [`WaitGroup`]         |
//! | **Streaming**     | Event stream listener with bounded linear reconnect.         | [`EventStream`], [`ReconnectPolicy`]        |
//! | **Status**        | Bounded, backpressured status channel and sinks.             | [`StatusReport`], [`sinks::StatusSink`]     |
//! | **Cluster**       | Bulk staging and staggered fan-out over worker pods.         | [`cluster::Coordinator`]                    |
//! | **Errors**        | Typed errors per layer.                                      | [`EntityError`], [`ClusterError`]           |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use loadvisor::{ActionFn, ApiClient, ApiError, Channel, EntitiesConfig, Swarm, Team, User};
//! use loadvisor::sinks::{StatusLog, StatusSink, StatusTally, aggregate};
//!
//! struct Api;
//!
//! #[async_trait::async_trait]
//! impl ApiClient for Api {
//!     async fn current_user(&self) -> Result<User, ApiError> {
//!         Ok(User { id: "u1".into(), username: "user1".into(), ..User::default() })
//!     }
//!     async fn teams_for_user(&self, _: &str) -> Result<Vec<Team>, ApiError> { Ok(vec![]) }
//!     async fn channels_for_team(&self, _: &str, _: &str) -> Result<Vec<Channel>, ApiError> { Ok(vec![]) }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = EntitiesConfig {
//!         action_rate: Duration::from_millis(20),
//!         action_rate_max_variance: Duration::from_millis(10),
//!         ..EntitiesConfig::default()
//!     };
//!     let (swarm, reports) = Swarm::new(cfg);
//!
//!     let tally = StatusTally::new();
//!     let sinks: Vec<Arc<dyn StatusSink>> = vec![Arc::new(StatusLog), Arc::new(tally.clone())];
//!     let aggregator = tokio::spawn(aggregate(reports, sinks));
//!
//!     let entity = swarm
//!         .entity(1, "user1", Arc::new(Api))
//!         .action(ActionFn::arc("post", |e| async move {
//!             e.send_action_send("post").await;
//!             anyhow::Ok(())
//!         }), 3)
//!         .action(ActionFn::arc("read", |_e| async { anyhow::Ok(()) }), 1)
//!         .build();
//!     swarm.launch(&entity);
//!
//!     tokio::time::sleep(Duration::from_millis(100)).await;
//!     swarm.shutdown().await?;
//!     drop(swarm);
//!     drop(entity);
//!     aggregator.await?;
//!
//!     assert!(tally.snapshot().await.count(loadvisor::StatusKind::Stopped) == 1);
//!     Ok(())
//! }
//! ```

mod choice;
mod config;
mod core;
mod entity;
mod error;
mod policies;
mod status;

pub mod cluster;
pub mod sinks;

// ---- Public re-exports ----

pub use crate::choice::{Choice, pick};
pub use crate::config::{ClusterConfig, EntitiesConfig};
pub use crate::core::{
    ActionLoop, ActionScheduler, ConnectionState, EntityLoop, EventStream, ListenExit, RngFactory,
    StatusPoll, StreamEvent, Swarm, WaitGroup, WaitGuard, launch, launch_with, listen,
    spawn_supervised,
};
pub use crate::entity::{
    Action, ActionFn, ActionRef, ApiClient, Channel, ChannelMembership, EntityBuilder,
    EntityConfig, EntityState, Team, TeamMembership, User, UserProfile,
};
pub use crate::error::{
    ApiError, ClusterError, EntityError, RemoteError, RuntimeError, SelectionError, StreamError,
};
pub use crate::policies::{Pacing, ReconnectPolicy};
pub use crate::status::{StatusKind, StatusReceiver, StatusReport, StatusSender, status_channel};
