//! # Entity loops: the units the crash supervisor restarts.
//!
//! An [`EntityLoop`] is one long-running activity of an entity. Two are provided:
//! - [`ActionLoop`] initializes the profile, then drives the [`ActionScheduler`];
//! - [`StatusPoll`] runs the entity's poll action on a fixed period.
//!
//! ## Event flow (ActionLoop)
//! ```text
//! Initializing ── send Launching ── UserProfile::fetch()
//!        ├─ Err ─► send FailedLaunch ─► state Failed ─► Err(Initialization)
//!        └─ Ok  ─► send Active ─► ActionScheduler::run()
//!                                    ├─ Ok (stop)      ─► state Stopped, send Stopped
//!                                    ├─ Err(Selection) ─► state Failed
//!                                    └─ Err(RuntimeFault) ─► returned to the supervisor
//! ```
//!
//! ## Rules
//! - Every loop returns `Ok(())` as soon as it observes the stop signal.
//! - Only `Err(RuntimeFault)` (or a panic) leads to a restart.
//! - Only a loop that drives the lifecycle ([`EntityLoop::drives_lifecycle`]) moves the
//!   entity to `Crashed`/`Stopped` or reports `FailedActive`/`Stopped`; faults of the
//!   others are reported as `Error`.

use std::sync::Arc;

use async_trait::async_trait;
use rand::{RngCore, SeedableRng, rngs::StdRng};
use tokio::{select, time};

use super::scheduler::{ActionScheduler, execute};
use crate::entity::{EntityConfig, EntityState, UserProfile};
use crate::error::EntityError;

/// Produces a fresh random source for each (re)start of an action loop.
pub type RngFactory = Arc<dyn Fn() -> Box<dyn RngCore + Send> + Send + Sync>;

/// # A restartable activity of one entity.
#[async_trait]
pub trait EntityLoop: Send + Sync + 'static {
    /// Stable loop name used in logs.
    fn name(&self) -> &'static str;

    /// True if this loop owns the entity's lifecycle state and reports.
    fn drives_lifecycle(&self) -> bool {
        true
    }

    /// Runs until the entity's stop signal fires or an error ends the loop.
    async fn run(&self, entity: Arc<EntityConfig>) -> Result<(), EntityError>;
}

/// Initialization followed by the weighted action schedule.
#[derive(Clone)]
pub struct ActionLoop {
    rng: RngFactory,
}

impl Default for ActionLoop {
    /// Seeds every (re)start from the operating system.
    fn default() -> Self {
        Self::with_rng(Arc::new(|| {
            Box::new(StdRng::from_os_rng()) as Box<dyn RngCore + Send>
        }))
    }
}

impl ActionLoop {
    /// Uses `rng` to create the scheduler's random source on every (re)start.
    pub fn with_rng(rng: RngFactory) -> Self {
        Self { rng }
    }

    async fn initialize(&self, entity: &Arc<EntityConfig>) -> Result<bool, EntityError> {
        entity.set_state(EntityState::Initializing);
        entity.send_launching().await;

        let stop = entity.stop_token();
        let fetched = select! {
            biased;
            _ = stop.cancelled() => return Ok(false),
            res = UserProfile::fetch(entity.client().as_ref()) => res,
        };

        match fetched {
            Ok(profile) => {
                entity.set_profile(Some(Arc::new(profile))).await;
                Ok(true)
            }
            Err(e) => {
                tracing::error!(entity = %entity.name(), error = %e, "entity failed to launch");
                entity.send_failed_launch(&e, "failed to fetch profile").await;
                Err(EntityError::Initialization(e))
            }
        }
    }

    async fn run_inner(&self, entity: &Arc<EntityConfig>) -> Result<(), EntityError> {
        if !self.initialize(entity).await? {
            return Ok(());
        }
        entity.send_active("initialized").await;

        let mut scheduler = ActionScheduler::new(entity.pacing(), (self.rng)());
        scheduler.run(entity).await
    }
}

#[async_trait]
impl EntityLoop for ActionLoop {
    fn name(&self) -> &'static str {
        "actions"
    }

    async fn run(&self, entity: Arc<EntityConfig>) -> Result<(), EntityError> {
        let res = self.run_inner(&entity).await;
        match &res {
            Ok(()) => {
                entity.set_state(EntityState::Stopped);
                entity.send_stopped("stop signal received");
            }
            Err(e) if !e.is_restartable() => entity.set_state(EntityState::Failed),
            Err(_) => {}
        }
        res
    }
}

/// Periodic poll action; the first poll happens one full period after start.
#[derive(Clone, Copy, Debug, Default)]
pub struct StatusPoll;

#[async_trait]
impl EntityLoop for StatusPoll {
    fn name(&self) -> &'static str {
        "status-poll"
    }

    fn drives_lifecycle(&self) -> bool {
        false
    }

    async fn run(&self, entity: Arc<EntityConfig>) -> Result<(), EntityError> {
        let (Some(action), Some(period)) = (entity.poll_action().cloned(), entity.poll_interval())
        else {
            return Ok(());
        };

        let stop = entity.stop_token().clone();
        let mut ticker = time::interval_at(time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            select! {
                biased;
                _ = stop.cancelled() => return Ok(()),
                _ = ticker.tick() => {}
            }
            execute(&action, &entity).await?;
        }
    }
}
