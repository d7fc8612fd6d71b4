//! # Demo: local_swarm
//!
//! Runs a small swarm of simulated users against an in-memory API for a few
//! seconds (or until Ctrl-C), then shuts down and prints the status tally.
//!
//! Demonstrates how to:
//! - Wire entities to a [`Swarm`] and give them weighted actions.
//! - Use the profile fetched at initialization inside an action.
//! - Observe crash supervision: the `flaky` action fails now and then.
//! - Aggregate status reports into [`StatusLog`] and [`StatusTally`].
//!
//! ## Run
//! ```bash
//! RUST_LOG=info cargo run --example local_swarm
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing_subscriber::EnvFilter;

use loadvisor::sinks::{StatusLog, StatusSink, StatusTally, aggregate};
use loadvisor::{
    ActionFn, ApiClient, ApiError, Channel, EntitiesConfig, StatusKind, Swarm, Team, User,
};

/// Fixed directory of teams and channels shared by every simulated user.
struct InMemoryApi {
    user: User,
}

impl InMemoryApi {
    fn new(n: usize) -> Self {
        Self {
            user: User {
                id: format!("uid-{n}"),
                username: format!("loadtest-user-{n}"),
                email: format!("loadtest-user-{n}@example.com"),
                locale: "en".to_string(),
                ..User::default()
            },
        }
    }
}

#[async_trait]
impl ApiClient for InMemoryApi {
    async fn current_user(&self) -> Result<User, ApiError> {
        Ok(self.user.clone())
    }

    async fn teams_for_user(&self, _user_id: &str) -> Result<Vec<Team>, ApiError> {
        Ok((0..2)
            .map(|t| Team {
                id: format!("team-{t}"),
                name: format!("Team {t}"),
            })
            .collect())
    }

    async fn channels_for_team(
        &self,
        team_id: &str,
        _user_id: &str,
    ) -> Result<Vec<Channel>, ApiError> {
        Ok((0..3)
            .map(|c| Channel {
                id: format!("{team_id}-channel-{c}"),
                name: format!("town-square-{c}"),
            })
            .collect())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cfg = EntitiesConfig {
        action_rate: Duration::from_millis(500),
        action_rate_max_variance: Duration::from_millis(200),
        status_poll_interval: Some(Duration::from_secs(2)),
        grace: Duration::from_secs(5),
        ..EntitiesConfig::default()
    };
    let (swarm, reports) = Swarm::new(cfg);

    let tally = StatusTally::new();
    let sinks: Vec<Arc<dyn StatusSink>> = vec![Arc::new(StatusLog), Arc::new(tally.clone())];
    let aggregator = tokio::spawn(aggregate(reports, sinks));

    let posts = Arc::new(AtomicU64::new(0));
    let post = {
        let posts = Arc::clone(&posts);
        ActionFn::arc("post_message", move |entity| {
            let posts = Arc::clone(&posts);
            async move {
                let profile = entity
                    .profile()
                    .await
                    .ok_or_else(|| anyhow::anyhow!("profile not initialized"))?;
                let channel = {
                    let mut rng = rand::rng();
                    let (_, channel) = profile.random_channel(&mut rng)?;
                    channel.name.clone()
                };
                posts.fetch_add(1, Ordering::Relaxed);
                entity.send_action_send(&format!("post to {channel}")).await;
                anyhow::Ok(())
            }
        })
    };
    let read = ActionFn::arc("read_channel", |entity| async move {
        entity.send_action_receive("read").await;
        anyhow::Ok(())
    });
    let flaky = ActionFn::arc("flaky", |_entity| async move {
        if rand::rng().random_bool(0.2) {
            anyhow::bail!("simulated server error");
        }
        Ok(())
    });
    let poll = ActionFn::arc("poll_statuses", |entity| async move {
        let mut info = entity.info().lock().await;
        let polls = info
            .get("polls")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        info.insert("polls".to_string(), (polls + 1).to_string());
        anyhow::Ok(())
    });

    let mut entities = Vec::new();
    for n in 0..8 {
        let entity = swarm
            .entity(n, format!("user-{n}"), Arc::new(InMemoryApi::new(n)))
            .action(post.clone(), 4)
            .action(read.clone(), 2)
            .action(flaky.clone(), 1)
            .poll_action(poll.clone())
            .build();
        swarm.launch(&entity);
        entities.push(entity);
    }

    tokio::select! {
        res = swarm.run_until_signal() => res?,
        _ = tokio::time::sleep(Duration::from_secs(10)) => swarm.shutdown().await?,
    }
    drop(entities);
    drop(swarm);
    let processed = aggregator.await?;

    let snap = tally.snapshot().await;
    println!("reports processed: {processed}");
    println!("messages posted:   {}", posts.load(Ordering::Relaxed));
    for kind in [
        StatusKind::Launching,
        StatusKind::Active,
        StatusKind::FailedActive,
        StatusKind::ActionSend,
        StatusKind::ActionReceive,
        StatusKind::Stopped,
    ] {
        println!("{:>16}: {}", kind.as_label(), snap.count(kind));
    }
    Ok(())
}
