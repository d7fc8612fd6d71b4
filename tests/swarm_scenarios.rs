//! End-to-end scenarios through the public API: swarm, supervision, status sinks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rand::RngCore;

use loadvisor::sinks::{StatusSink, StatusTally, aggregate};
use loadvisor::{
    ActionFn, ActionLoop, ActionRef, ApiClient, ApiError, Channel, EntitiesConfig, EntityConfig,
    EntityState, StatusKind, Swarm, Team, User,
};

struct Directory;

#[async_trait]
impl ApiClient for Directory {
    async fn current_user(&self) -> Result<User, ApiError> {
        Ok(User {
            id: "uid".into(),
            username: "scenario".into(),
            ..User::default()
        })
    }
    async fn teams_for_user(&self, _: &str) -> Result<Vec<Team>, ApiError> {
        Ok(vec![Team {
            id: "t1".into(),
            name: "core".into(),
        }])
    }
    async fn channels_for_team(&self, team_id: &str, _: &str) -> Result<Vec<Channel>, ApiError> {
        Ok(vec![Channel {
            id: format!("{team_id}-c1"),
            name: "town-square".into(),
        }])
    }
}

/// Replays a fixed cycle of `next_u64` values.
struct SequenceRng {
    values: Vec<u64>,
    pos: usize,
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

fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> ActionRef {
    let log = Arc::clone(log);
    ActionFn::arc(name, move |entity: Arc<EntityConfig>| {
        let log = Arc::clone(&log);
        async move {
            let done = {
                let mut log = log.lock().unwrap();
                log.push(name);
                log.len() == 4
            };
            entity.send_action_send(name).await;
            if done {
                entity.stop_token().cancel();
            }
            anyhow::Ok(())
        }
    })
}

fn fast() -> EntitiesConfig {
    EntitiesConfig {
        action_rate: Duration::from_millis(100),
        action_rate_max_variance: Duration::ZERO,
        status_poll_interval: None,
        grace: Duration::from_secs(1),
        ..EntitiesConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn weighted_sequence_is_reproducible_for_fixed_source() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let source = ActionLoop::with_rng(Arc::new(|| {
        Box::new(SequenceRng {
            values: vec![unit(0.5), unit(0.10), unit(0.80), unit(0.40), unit(0.95)],
            pos: 0,
        }) as Box<dyn RngCore + Send>
    }));
    let (swarm, reports) = Swarm::new(fast());
    let swarm = swarm.with_action_loop(source);

    let tally = StatusTally::new();
    let sinks: Vec<Arc<dyn StatusSink>> = vec![Arc::new(tally.clone())];
    let aggregator = tokio::spawn(aggregate(reports, sinks));

    let entity = swarm
        .entity(0, "e2e", Arc::new(Directory))
        .action(recorder(&log, "A"), 3)
        .action(recorder(&log, "B"), 1)
        .build();
    swarm.launch(&entity);
    swarm.wait_group().wait().await;

    assert_eq!(*log.lock().unwrap(), vec!["A", "B", "A", "B"]);
    assert_eq!(entity.state(), EntityState::Stopped);
    let profile = entity.profile().await.unwrap();
    assert_eq!(profile.username, "scenario");
    assert_eq!(profile.teams[0].channels[0].name, "town-square");

    drop(entity);
    drop(swarm);
    aggregator.await.unwrap();
    let snap = tally.snapshot().await;
    assert_eq!(snap.count(StatusKind::ActionSend), 4);
    assert_eq!(snap.count(StatusKind::Stopped), 1);
    assert!(snap.active.is_empty());
}

#[tokio::test(start_paused = true)]
async fn crashing_entity_keeps_swarm_busy_until_stop() {
    let calls = Arc::new(AtomicUsize::new(0));
    let always_fails = {
        let calls = Arc::clone(&calls);
        ActionFn::arc("always_fails", move |_e| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(anyhow::anyhow!("backend unavailable"))
            }
        })
    };

    let (swarm, reports) = Swarm::new(fast());
    let tally = StatusTally::new();
    let sinks: Vec<Arc<dyn StatusSink>> = vec![Arc::new(tally.clone())];
    let aggregator = tokio::spawn(aggregate(reports, sinks));

    let entity = swarm
        .entity(0, "doomed", Arc::new(Directory))
        .action(always_fails, 1)
        .build();
    swarm.launch(&entity);

    let early = tokio::time::timeout(Duration::from_secs(3), swarm.wait_group().wait()).await;
    assert!(early.is_err(), "restarts must keep the counter above zero");
    assert!(calls.load(Ordering::SeqCst) >= 10);

    swarm.shutdown().await.unwrap();
    drop(entity);
    drop(swarm);
    aggregator.await.unwrap();

    // Every crash is followed by a relaunch; only the final run ends without one.
    let snap = tally.snapshot().await;
    let crashes = snap.count(StatusKind::FailedActive);
    assert!(crashes >= 10);
    let launches = snap.count(StatusKind::Launching);
    assert!(launches == crashes || launches == crashes + 1);
}
