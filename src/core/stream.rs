//! # Event stream listener with bounded reconnect.
//!
//! Keeps one entity's long-lived [`EventStream`] alive for as long as the
//! entity runs, reconnecting per [`ReconnectPolicy`].
//!
//! ## State machine
//! ```text
//!             events channel closed
//! Connected ─────────────────────────► Retrying(n)
//!     ▲                                    │ sleep(n × step), connect()
//!     └──────────── Ok ────────────────────┤
//!                                          │ Err → n += 1
//!                        n > max_retries   ▼
//!                                        Dead   (last error logged, task ends)
//! ```
//!
//! ## Rules
//! - The retry counter is cumulative over the listener's whole life; a
//!   successful reconnect does not reset it.
//! - The stop signal is observed while idle, while sleeping and while connecting.
//! - A dead listener is never restarted; the entity's other loops keep running.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::{select, sync::mpsc, time};

use crate::entity::EntityConfig;
use crate::error::{EntityError, StreamError};

/// One inbound event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamEvent {
    /// Event type as named by the peer.
    pub kind: String,
    /// Raw event payload.
    pub payload: String,
}

/// Streaming collaborator: a connection that feeds an inbound event channel.
#[async_trait]
pub trait EventStream: Send + Sync + 'static {
    /// (Re)establishes the connection.
    async fn connect(&self) -> Result<(), StreamError>;

    /// Starts listening; the returned channel closes when the peer drops the connection.
    async fn listen(&self) -> mpsc::Receiver<StreamEvent>;

    /// Error that closed the last listening session, if one was observed.
    fn last_error(&self) -> Option<StreamError>;
}

/// Connection state as seen by the listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// Consuming events.
    Connected,
    /// Disconnected; `n` failed reconnects so far.
    Retrying(u32),
    /// Retries exhausted.
    Dead,
}

/// How a listener ended.
#[derive(Debug)]
pub enum ListenExit {
    /// The entity has no event stream.
    Detached,
    /// The stop signal was observed.
    Stopped,
    /// Reconnect retries were exhausted.
    Dead(EntityError),
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connected => f.write_str("connected"),
            ConnectionState::Retrying(n) => write!(f, "retrying({n})"),
            ConnectionState::Dead => f.write_str("dead"),
        }
    }
}

/// Listens to the entity's event stream until stop or retry exhaustion.
///
/// The caller is expected to have connected the stream already; this function
/// starts with `listen()`.
pub async fn listen(entity: Arc<EntityConfig>) -> ListenExit {
    let Some(stream) = entity.stream().cloned() else {
        return ListenExit::Detached;
    };
    let policy = entity.reconnect();
    let stop = entity.stop_token().clone();

    let mut retries: u32 = 0;
    let mut connect_error: Option<StreamError> = None;
    let mut events = stream.listen().await;

    loop {
        tracing::debug!(entity = %entity.name(), state = %ConnectionState::Connected, "event stream");
        loop {
            select! {
                biased;
                _ = stop.cancelled() => return ListenExit::Stopped,
                ev = events.recv() => match ev {
                    Some(ev) => tracing::trace!(entity = %entity.name(), kind = %ev.kind, "stream event"),
                    None => break,
                },
            }
        }

        loop {
            if policy.is_exhausted(retries) {
                let error = connect_error
                    .take()
                    .or_else(|| stream.last_error())
                    .unwrap_or(StreamError::Closed);
                tracing::error!(
                    entity = %entity.name(),
                    attempts = retries,
                    error = %error,
                    "event stream disconnected, max retries reached"
                );
                let error = EntityError::Connection {
                    attempts: retries,
                    error,
                };
                entity.send_error(&error, "event stream dead").await;
                return ListenExit::Dead(error);
            }

            tracing::debug!(entity = %entity.name(), state = %ConnectionState::Retrying(retries), "event stream");
            select! {
                biased;
                _ = stop.cancelled() => return ListenExit::Stopped,
                _ = time::sleep(policy.delay(retries)) => {}
            }

            let connected = select! {
                biased;
                _ = stop.cancelled() => return ListenExit::Stopped,
                res = stream.connect() => res,
            };
            match connected {
                Ok(()) => {
                    events = stream.listen().await;
                    break;
                }
                Err(e) => {
                    tracing::warn!(entity = %entity.name(), error = %e, "event stream reconnect failed");
                    connect_error = Some(e);
                    retries += 1;
                }
            }
        }
    }
}
