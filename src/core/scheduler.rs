//! # Action scheduler: which action, and when.
//!
//! Drives one entity's `Scheduled ⇄ Acting` alternation.
//!
//! ## Loop
//! ```text
//! delay = pacing.first_delay(now)              (epoch-aligned random phase)
//! loop {
//!   ├─► state = Scheduled
//!   ├─► select! { stop → return Ok, sleep(delay) }
//!   ├─► action = pick(entity.actions)          (SelectionError → fatal)
//!   ├─► state = Acting
//!   ├─► action.execute(entity).await           (Err/panic → RuntimeFault)
//!   └─► delay = pacing.next_delay()            (rate ± variance/2)
//! }
//! ```
//!
//! ## Rules
//! - Actions run **sequentially** on the scheduler's own task (never overlapping).
//! - The stop signal wins over a timer that fires at the same moment.
//! - The random source is injected, so draws are reproducible in tests.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::SystemTime;

use futures::FutureExt;
use rand::Rng;
use tokio::{select, time};

use crate::choice::{Choice, pick};
use crate::entity::{ActionRef, EntityConfig, EntityState};
use crate::error::{EntityError, SelectionError};
use crate::policies::Pacing;

/// Weighted, jittered action scheduler for one entity.
pub struct ActionScheduler<R> {
    pacing: Pacing,
    rng: R,
}

impl<R: Rng + Send> ActionScheduler<R> {
    /// Creates a scheduler drawing timing and selection from `rng`.
    pub fn new(pacing: Pacing, rng: R) -> Self {
        Self { pacing, rng }
    }

    /// Draws the next action.
    pub fn select<'a>(
        &mut self,
        actions: &'a [Choice<ActionRef>],
    ) -> Result<&'a ActionRef, SelectionError> {
        pick(actions, &mut self.rng)
    }

    /// Runs actions until the entity's stop signal fires.
    ///
    /// ### Errors
    /// - [`EntityError::Selection`] if the action list cannot be drawn from;
    /// - [`EntityError::RuntimeFault`] if an action fails or panics.
    pub async fn run(&mut self, entity: &Arc<EntityConfig>) -> Result<(), EntityError> {
        let stop = entity.stop_token().clone();
        let mut delay = self.pacing.first_delay(SystemTime::now(), &mut self.rng);

        loop {
            entity.set_state(EntityState::Scheduled);
            let sleep = time::sleep(delay);
            tokio::pin!(sleep);
            select! {
                biased;
                _ = stop.cancelled() => return Ok(()),
                _ = &mut sleep => {}
            }

            let action = match self.select(entity.actions()) {
                Ok(action) => Arc::clone(action),
                Err(e) => {
                    tracing::error!(entity = %entity.name(), error = %e, "failed to pick weighted choice");
                    return Err(e.into());
                }
            };

            entity.set_state(EntityState::Acting);
            execute(&action, entity).await?;
            delay = self.pacing.next_delay(&mut self.rng);
        }
    }
}

/// Invokes one action, converting an error or a panic into [`EntityError::RuntimeFault`].
pub(crate) async fn execute(action: &ActionRef, entity: &Arc<EntityConfig>) -> Result<(), EntityError> {
    let outcome = AssertUnwindSafe(action.execute(Arc::clone(entity)))
        .catch_unwind()
        .await;

    let error = match outcome {
        Ok(Ok(())) => return Ok(()),
        Ok(Err(e)) => format!("{e:#}"),
        Err(panic) => format!("panicked: {}", panic_message(panic.as_ref())),
    };
    Err(EntityError::RuntimeFault {
        action: action.name().to_string(),
        error,
    })
}

/// Best-effort rendering of a panic payload.
pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{ActionFn, ApiClient, Channel, Team, User};
    use crate::error::ApiError;
    use async_trait::async_trait;
    use rand::RngCore;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    struct NoApi;

    #[async_trait]
    impl ApiClient for NoApi {
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

    /// Replays a fixed cycle of `next_u64` values.
    struct SequenceRng {
        values: Vec<u64>,
        pos: usize,
    }

    impl SequenceRng {
        fn new(values: Vec<u64>) -> Self {
            Self { values, pos: 0 }
        }
    }

    impl RngCore for SequenceRng {
        fn next_u32(&mut self) -> u32 {
            (self.next_u64() >> 32) as u32
        }

        fn next_u64(&mut self) -> u64 {
            let v = self.values[self.pos % self.values.len()];
            self.pos += 1;
            v
        }

        fn fill_bytes(&mut self, dst: &mut [u8]) {
            for chunk in dst.chunks_mut(8) {
                let bytes = self.next_u64().to_le_bytes();
                chunk.copy_from_slice(&bytes[..chunk.len()]);
            }
        }
    }

    /// `next_u64` value that maps to roughly `frac` in `[0, 1)`.
    fn unit(frac: f64) -> u64 {
        (frac * (1u64 << 53) as f64) as u64 * (1 << 11)
    }

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str, stop_after: usize) -> ActionRef {
        let log = Arc::clone(log);
        ActionFn::arc(name, move |entity: Arc<EntityConfig>| {
            let log = Arc::clone(&log);
            async move {
                let mut log = log.lock().unwrap();
                log.push(name);
                if log.len() >= stop_after {
                    entity.stop_token().cancel();
                }
                anyhow::Ok(())
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_sequence_for_deterministic_source() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let entity = EntityConfig::builder(0, "e2e", Arc::new(NoApi))
            .action(recorder(&log, "A", 4), 3)
            .action(recorder(&log, "B", 4), 1)
            .build();

        // Draw order: phase, then one selection per action (no jitter draws).
        // Total weight 4: A owns [0, 3), B owns [3, 4).
        let rng = SequenceRng::new(vec![
            unit(0.5),
            unit(0.10),
            unit(0.80),
            unit(0.40),
            unit(0.95),
        ]);
        let pacing = Pacing::new(Duration::from_millis(100), Duration::ZERO);
        let mut scheduler = ActionScheduler::new(pacing, rng);

        scheduler.run(&entity).await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["A", "B", "A", "B"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gaps_stay_within_variance_window() {
        let stamps = Arc::new(Mutex::new(Vec::new()));
        let action = {
            let stamps = Arc::clone(&stamps);
            ActionFn::arc("stamp", move |entity: Arc<EntityConfig>| {
                let stamps = Arc::clone(&stamps);
                async move {
                    let mut stamps = stamps.lock().unwrap();
                    stamps.push(Instant::now());
                    if stamps.len() == 50 {
                        entity.stop_token().cancel();
                    }
                    anyhow::Ok(())
                }
            })
        };
        let entity = EntityConfig::builder(0, "gaps", Arc::new(NoApi))
            .action(action, 1)
            .build();

        let rate = Duration::from_secs(10);
        let variance = Duration::from_secs(4);
        let mut scheduler = ActionScheduler::new(
            Pacing::new(rate, variance),
            <rand::rngs::StdRng as rand::SeedableRng>::seed_from_u64(17),
        );
        scheduler.run(&entity).await.unwrap();

        let stamps = stamps.lock().unwrap();
        let tolerance = Duration::from_millis(5);
        for pair in stamps.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap + tolerance >= rate - variance / 2, "gap {gap:?} too short");
            assert!(gap <= rate + variance / 2 + tolerance, "gap {gap:?} too long");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_first_fire_runs_nothing() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let entity = EntityConfig::builder(0, "idle", Arc::new(NoApi))
            .action(recorder(&log, "A", usize::MAX), 1)
            .build();
        entity.stop_token().cancel();

        let mut scheduler = ActionScheduler::new(
            Pacing::new(Duration::from_secs(1), Duration::ZERO),
            SequenceRng::new(vec![0]),
        );
        scheduler.run(&entity).await.unwrap();
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(entity.state(), EntityState::Scheduled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_action_list_is_selection_error() {
        let entity = EntityConfig::builder(0, "empty", Arc::new(NoApi)).build();
        let mut scheduler = ActionScheduler::new(
            Pacing::new(Duration::from_millis(10), Duration::ZERO),
            SequenceRng::new(vec![0]),
        );
        let err = scheduler.run(&entity).await.unwrap_err();
        assert!(matches!(err, EntityError::Selection(SelectionError::Empty)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_action_panic_becomes_runtime_fault() {
        let entity = EntityConfig::builder(0, "panicky", Arc::new(NoApi))
            .action(
                ActionFn::arc("explode", |_e| async {
                    if true {
                        panic!("kaboom");
                    }
                    anyhow::Ok(())
                }),
                1,
            )
            .build();
        let mut scheduler = ActionScheduler::new(
            Pacing::new(Duration::from_millis(10), Duration::ZERO),
            SequenceRng::new(vec![0]),
        );

        match scheduler.run(&entity).await.unwrap_err() {
            EntityError::RuntimeFault { action, error } => {
                assert_eq!(action, "explode");
                assert!(error.contains("kaboom"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
