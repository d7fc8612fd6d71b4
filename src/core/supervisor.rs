//! # Crash supervision for entity loops.
//!
//! Runs an [`EntityLoop`] on its own task and respawns it when it faults.
//!
//! ## Architecture
//! ```text
//! spawn_supervised(entity, job)
//!   ├─► guard = wait_group.enter()
//!   └─► tokio::spawn ─► catch_unwind(job.run(entity))
//!                         ├─ Ok                        ─► drop(guard)
//!                         ├─ Err(non-restartable)      ─► drop(guard)
//!                         └─ Err(RuntimeFault) / panic
//!                              ├─ stop fired  ─► state Stopped + Stopped report ─► drop(guard)
//!                              └─ otherwise   ─► log + state Crashed + FailedActive
//!                                                next = wait_group.enter()
//!                                                spawn(job) with next
//!                                                drop(guard)
//! ```
//!
//! State changes and the `Crashed`/`Stopped` reports above apply only to loops that
//! drive the lifecycle. A faulting status poll reports `Error` and restarts without
//! touching the entity state.
//!
//! ## Rules
//! - **Pre-increment before restart**: the replacement's guard is entered while the
//!   faulted task still holds its own, so the counter never touches zero mid-restart.
//! - Restarts are unbounded; a stopped entity is never restarted.
//! - The event stream listener is not supervised: once dead it stays dead.

use std::backtrace::Backtrace;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinHandle;

use super::runner::{ActionLoop, EntityLoop, StatusPoll};
use super::scheduler::panic_message;
use super::stream::{ListenExit, listen};
use super::wait_group::WaitGuard;
use crate::entity::{EntityConfig, EntityState};

/// Spawns `job` under crash supervision, counted in the entity's wait group.
pub fn spawn_supervised(entity: Arc<EntityConfig>, job: Arc<dyn EntityLoop>) -> JoinHandle<()> {
    let guard = entity.wait_group().enter();
    spawn_with_guard(entity, job, guard)
}

fn spawn_with_guard(
    entity: Arc<EntityConfig>,
    job: Arc<dyn EntityLoop>,
    guard: WaitGuard,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let outcome = AssertUnwindSafe(job.run(Arc::clone(&entity)))
            .catch_unwind()
            .await;

        let fault = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) if e.is_restartable() => Some(e.to_string()),
            Ok(Err(e)) => {
                tracing::debug!(
                    entity = %entity.name(),
                    job = job.name(),
                    error = %e,
                    label = e.as_label(),
                    "entity loop ended"
                );
                None
            }
            Err(panic) => Some(format!("panicked: {}", panic_message(panic.as_ref()))),
        };

        if let Some(fault) = fault {
            let lifecycle = job.drives_lifecycle();
            if entity.stop_token().is_cancelled() {
                if lifecycle {
                    entity.set_state(EntityState::Stopped);
                    entity.send_stopped("stop signal received during crash");
                }
            } else {
                tracing::error!(
                    entity = %entity.name(),
                    job = job.name(),
                    error = %fault,
                    backtrace = %Backtrace::capture(),
                    "entity loop crashed, restarting"
                );
                if lifecycle {
                    entity.set_state(EntityState::Crashed);
                    entity.send_failed_active(&fault, job.name()).await;
                } else {
                    entity.send_error(&fault, job.name()).await;
                }

                let next = entity.wait_group().enter();
                spawn_with_guard(Arc::clone(&entity), job, next);
            }
        }
        drop(guard);
    })
}

/// Starts every loop of `entity` with OS-seeded randomness.
pub fn launch(entity: &Arc<EntityConfig>) -> Vec<JoinHandle<()>> {
    launch_with(entity, ActionLoop::default())
}

/// Starts every loop of `entity`, using `actions` as its action loop.
///
/// - the action loop, supervised;
/// - the status-polling loop, supervised, if the entity has a poll action and interval;
/// - the event stream listener, unsupervised, if the entity has a stream.
pub fn launch_with(entity: &Arc<EntityConfig>, actions: ActionLoop) -> Vec<JoinHandle<()>> {
    let mut handles = vec![spawn_supervised(Arc::clone(entity), Arc::new(actions))];

    if entity.poll_action().is_some() && entity.poll_interval().is_some() {
        handles.push(spawn_supervised(Arc::clone(entity), Arc::new(StatusPoll)));
    }

    if entity.stream().is_some() {
        let guard = entity.wait_group().enter();
        let entity = Arc::clone(entity);
        handles.push(tokio::spawn(async move {
            let _guard = guard;
            if let ListenExit::Dead(e) = listen(Arc::clone(&entity)).await {
                tracing::warn!(entity = %entity.name(), error = %e, "event stream listener ended");
            }
        }));
    }
    handles
}
