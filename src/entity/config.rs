//! # Entity configuration: identity, behavior and communication handles.
//!
//! An [`EntityConfig`] describes one simulated user. It is built once with
//! [`EntityBuilder`] and shared as `Arc<EntityConfig>` between the entity's own
//! tasks (action loop, status poll, stream listener). Nothing outside those tasks
//! mutates it; the runner alone writes the derived profile and the lifecycle state.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use loadvisor::{ActionFn, ApiClient, ApiError, Channel, EntityConfig, Team, User};
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
//! let entity = EntityConfig::builder(1, "user-1", Arc::new(Api))
//!     .action(ActionFn::arc("noop", |_e| async { anyhow::Ok(()) }), 1)
//!     .build();
//! assert_eq!(entity.name(), "user-1");
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock, watch};
use tokio_util::sync::CancellationToken;

use super::action::ActionRef;
use super::profile::{ApiClient, UserProfile};
use crate::choice::Choice;
use crate::config::EntitiesConfig;
use crate::core::{EventStream, WaitGroup};
use crate::policies::{Pacing, ReconnectPolicy};
use crate::status::{StatusKind, StatusReport, StatusSender, status_channel};

/// Lifecycle state of one entity.
///
/// ```text
/// Initializing ──► Scheduled ⇄ Acting ──► Stopped
///      ▲                          │
///      └──────── Crashed ◄────────┘     (supervised restart)
/// Initializing ──► Failed               (failed launch / bad action weights)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    /// Fetching the profile.
    Initializing,
    /// Waiting for the next action to fire.
    Scheduled,
    /// Executing an action.
    Acting,
    /// An action faulted; a restart is being spawned.
    Crashed,
    /// Ended permanently by a non-restartable error.
    Failed,
    /// Ended by the stop signal.
    Stopped,
}

/// One simulated user.
pub struct EntityConfig {
    number: usize,
    name: String,
    actions: Vec<Choice<ActionRef>>,
    poll_action: Option<ActionRef>,
    pacing: Pacing,
    poll_interval: Option<Duration>,
    reconnect: ReconnectPolicy,
    client: Arc<dyn ApiClient>,
    stream: Option<Arc<dyn EventStream>>,
    status: StatusSender,
    stop: CancellationToken,
    wait_group: WaitGroup,
    profile: RwLock<Option<Arc<UserProfile>>>,
    info: Mutex<HashMap<String, String>>,
    state: watch::Sender<EntityState>,
}

impl EntityConfig {
    /// Starts building an entity.
    pub fn builder(
        number: usize,
        name: impl Into<String>,
        client: Arc<dyn ApiClient>,
    ) -> EntityBuilder {
        EntityBuilder::new(number, name.into(), client)
    }

    /// Ordinal number of the entity within its swarm.
    pub fn number(&self) -> usize {
        self.number
    }

    /// Human-readable entity name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Weighted action list.
    pub fn actions(&self) -> &[Choice<ActionRef>] {
        &self.actions
    }

    /// Action run by the status-polling loop, if any.
    pub fn poll_action(&self) -> Option<&ActionRef> {
        self.poll_action.as_ref()
    }

    /// Action pacing policy.
    pub fn pacing(&self) -> Pacing {
        self.pacing
    }

    /// Status-polling period (`None` when polling is disabled).
    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval
    }

    /// Event stream reconnect policy.
    pub fn reconnect(&self) -> ReconnectPolicy {
        self.reconnect
    }

    /// API client handle.
    pub fn client(&self) -> &Arc<dyn ApiClient> {
        &self.client
    }

    /// Event stream handle, if the entity listens to one.
    pub fn stream(&self) -> Option<&Arc<dyn EventStream>> {
        self.stream.as_ref()
    }

    /// Stop signal observed by every task of this entity.
    pub fn stop_token(&self) -> &CancellationToken {
        &self.stop
    }

    /// Completion counter shared with the owning swarm.
    pub fn wait_group(&self) -> &WaitGroup {
        &self.wait_group
    }

    /// Profile fetched by the last successful initialization.
    pub async fn profile(&self) -> Option<Arc<UserProfile>> {
        self.profile.read().await.clone()
    }

    pub(crate) async fn set_profile(&self, profile: Option<Arc<UserProfile>>) {
        *self.profile.write().await = profile;
    }

    /// Free-form scratch space for actions.
    pub fn info(&self) -> &Mutex<HashMap<String, String>> {
        &self.info
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EntityState {
        *self.state.borrow()
    }

    /// Subscribes to lifecycle state changes.
    pub fn watch_state(&self) -> watch::Receiver<EntityState> {
        self.state.subscribe()
    }

    pub(crate) fn set_state(&self, state: EntityState) {
        self.state.send_replace(state);
    }

    /// Sends a status report attributed to this entity.
    ///
    /// Waits while the status channel is full; gives up on the stop signal.
    pub async fn send_status(
        self: &Arc<Self>,
        kind: StatusKind,
        error: Option<String>,
        details: impl Into<Arc<str>>,
    ) {
        let mut report = StatusReport::new(kind)
            .with_entity(self)
            .with_details(details);
        if let Some(error) = error {
            report = report.with_error(error);
        }
        if !self.status.send(report, &self.stop).await && !self.stop.is_cancelled() {
            tracing::debug!(entity = %self.name, kind = kind.as_label(), "status report dropped");
        }
    }

    /// Reports [`StatusKind::Launching`].
    pub async fn send_launching(self: &Arc<Self>) {
        self.send_status(StatusKind::Launching, None, "").await;
    }

    /// Reports [`StatusKind::Active`].
    pub async fn send_active(self: &Arc<Self>, details: &str) {
        self.send_status(StatusKind::Active, None, details).await;
    }

    /// Reports [`StatusKind::Error`].
    pub async fn send_error(self: &Arc<Self>, error: impl fmt::Display, details: &str) {
        self.send_status(StatusKind::Error, Some(error.to_string()), details)
            .await;
    }

    /// Reports [`StatusKind::FailedLaunch`].
    pub async fn send_failed_launch(self: &Arc<Self>, error: impl fmt::Display, details: &str) {
        self.send_status(StatusKind::FailedLaunch, Some(error.to_string()), details)
            .await;
    }

    /// Reports [`StatusKind::FailedActive`].
    pub async fn send_failed_active(self: &Arc<Self>, error: impl fmt::Display, details: &str) {
        self.send_status(StatusKind::FailedActive, Some(error.to_string()), details)
            .await;
    }

    /// Reports [`StatusKind::ActionSend`].
    pub async fn send_action_send(self: &Arc<Self>, details: &str) {
        self.send_status(StatusKind::ActionSend, None, details).await;
    }

    /// Reports [`StatusKind::ActionReceive`].
    pub async fn send_action_receive(self: &Arc<Self>, details: &str) {
        self.send_status(StatusKind::ActionReceive, None, details)
            .await;
    }

    /// Reports [`StatusKind::Stopped`].
    ///
    /// Emitted after the stop signal, so it never waits: a full channel drops it.
    pub fn send_stopped(self: &Arc<Self>, details: &str) {
        let report = StatusReport::new(StatusKind::Stopped)
            .with_entity(self)
            .with_details(details);
        if !self.status.try_send(report) {
            tracing::debug!(entity = %self.name, "stopped report dropped");
        }
    }
}

impl fmt::Debug for EntityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityConfig")
            .field("number", &self.number)
            .field("name", &self.name)
            .field("actions", &self.actions.len())
            .field("pacing", &self.pacing)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Builder for [`EntityConfig`].
///
/// Unset communication handles default to private ones: a fresh stop token, a
/// fresh completion counter and a status channel nobody reads.
pub struct EntityBuilder {
    number: usize,
    name: String,
    client: Arc<dyn ApiClient>,
    actions: Vec<Choice<ActionRef>>,
    poll_action: Option<ActionRef>,
    settings: EntitiesConfig,
    stream: Option<Arc<dyn EventStream>>,
    status: Option<StatusSender>,
    stop: Option<CancellationToken>,
    wait_group: Option<WaitGroup>,
}

impl EntityBuilder {
    fn new(number: usize, name: String, client: Arc<dyn ApiClient>) -> Self {
        Self {
            number,
            name,
            client,
            actions: Vec::new(),
            poll_action: None,
            settings: EntitiesConfig::default(),
            stream: None,
            status: None,
            stop: None,
            wait_group: None,
        }
    }

    /// Adds a weighted action.
    pub fn action(mut self, action: ActionRef, weight: u32) -> Self {
        self.actions.push(Choice::new(action, weight));
        self
    }

    /// Replaces the weighted action list.
    pub fn actions(mut self, actions: Vec<Choice<ActionRef>>) -> Self {
        self.actions = actions;
        self
    }

    /// Sets the action run by the status-polling loop.
    pub fn poll_action(mut self, action: ActionRef) -> Self {
        self.poll_action = Some(action);
        self
    }

    /// Applies swarm-wide settings (pacing, polling, reconnect).
    pub fn settings(mut self, settings: &EntitiesConfig) -> Self {
        self.settings = settings.clone();
        self
    }

    /// Attaches an event stream.
    pub fn stream(mut self, stream: Arc<dyn EventStream>) -> Self {
        self.stream = Some(stream);
        self
    }

    /// Sets the status channel.
    pub fn status(mut self, status: StatusSender) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the stop signal.
    pub fn stop(mut self, stop: CancellationToken) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Sets the completion counter.
    pub fn wait_group(mut self, wait_group: WaitGroup) -> Self {
        self.wait_group = Some(wait_group);
        self
    }

    /// Builds the shared entity.
    pub fn build(self) -> Arc<EntityConfig> {
        let status = self.status.unwrap_or_else(|| status_channel(1).0);
        let (state, _) = watch::channel(EntityState::Initializing);

        Arc::new(EntityConfig {
            number: self.number,
            name: self.name,
            actions: self.actions,
            poll_action: self.poll_action,
            pacing: self.settings.pacing(),
            poll_interval: self.settings.poll_interval(),
            reconnect: self.settings.reconnect,
            client: self.client,
            stream: self.stream,
            status,
            stop: self.stop.unwrap_or_default(),
            wait_group: self.wait_group.unwrap_or_default(),
            profile: RwLock::new(None),
            info: Mutex::new(HashMap::new()),
            state,
        })
    }
}
