//! Runtime core: scheduling, supervision and lifecycle of simulated users.
//!
//! - [`scheduler`]: weighted, jittered action scheduling for one entity;
//! - [`runner`]: the restartable entity loops (actions, status polling);
//! - [`supervisor`]: crash supervision with pre-increment-before-restart;
//! - [`stream`]: event stream listener with bounded reconnect;
//! - [`wait_group`]: completion counter of outstanding tasks;
//! - [`swarm`]: owner of many entities, graceful shutdown;
//! - [`shutdown`]: OS termination signals.

mod runner;
mod scheduler;
mod shutdown;
mod stream;
mod supervisor;
mod swarm;
mod wait_group;

pub use runner::{ActionLoop, EntityLoop, RngFactory, StatusPoll};
pub use scheduler::ActionScheduler;
pub use stream::{ConnectionState, EventStream, ListenExit, StreamEvent, listen};
pub use supervisor::{launch, launch_with, spawn_supervised};
pub use swarm::Swarm;
pub use wait_group::{WaitGroup, WaitGuard};
