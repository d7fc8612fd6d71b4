//! # Bounded status channel.
//!
//! [`StatusSender`] is a thin wrapper around a bounded [`tokio::sync::mpsc`] channel
//! shared by every entity of a swarm; the receiving half belongs to the aggregator.
//!
//! ## Architecture
//! ```text
//! Producers (many):                  Consumer (one):
//!   Entity 1 ──┐
//!   Entity 2 ──┼──────► mpsc(cap) ───────► aggregator (sinks::aggregate)
//!   Entity N ──┘
//! ```
//!
//! ## Rules
//! - **Backpressure**: `send()` waits while the channel is full, so a slow
//!   aggregator throttles every producer instead of growing memory.
//! - **Fire-and-forget**: no acknowledgement; reports are lost once the receiver is dropped.
//! - **Cancellable**: a pending `send()` gives up as soon as the stop token fires.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::report::StatusReport;

/// Receiving half of a status channel.
pub type StatusReceiver = mpsc::Receiver<StatusReport>;

/// Creates a bounded status channel (capacity clamped to at least 1).
pub fn status_channel(capacity: usize) -> (StatusSender, StatusReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (StatusSender { tx }, rx)
}

/// Sending half of a status channel. Cheap to clone.
#[derive(Clone, Debug)]
pub struct StatusSender {
    tx: mpsc::Sender<StatusReport>,
}

impl StatusSender {
    /// Sends a report, waiting for capacity unless `stop` fires first.
    ///
    /// Returns `true` if the aggregator accepted the report.
    pub async fn send(&self, report: StatusReport, stop: &CancellationToken) -> bool {
        tokio::select! {
            res = self.tx.send(report) => res.is_ok(),
            _ = stop.cancelled() => false,
        }
    }

    /// Sends a report only if there is room right now.
    ///
    /// Used for reports emitted after the stop signal, when waiting is no longer allowed.
    pub fn try_send(&self, report: StatusReport) -> bool {
        self.tx.try_send(report).is_ok()
    }

    /// True once the receiving half has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::StatusKind;
    use std::time::Duration;

    #[tokio::test]
    async fn test_send_delivers_in_order() {
        let (tx, mut rx) = status_channel(4);
        let stop = CancellationToken::new();

        assert!(tx.send(StatusReport::new(StatusKind::Launching), &stop).await);
        assert!(tx.send(StatusReport::new(StatusKind::Active), &stop).await);

        assert_eq!(rx.recv().await.map(|r| r.kind), Some(StatusKind::Launching));
        assert_eq!(rx.recv().await.map(|r| r.kind), Some(StatusKind::Active));
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_channel_blocks_until_drained() {
        let (tx, mut rx) = status_channel(1);
        let stop = CancellationToken::new();
        assert!(tx.send(StatusReport::new(StatusKind::ActionSend), &stop).await);

        let blocked = tokio::time::timeout(
            Duration::from_millis(50),
            tx.send(StatusReport::new(StatusKind::ActionSend), &stop),
        )
        .await;
        assert!(blocked.is_err(), "send must wait while the channel is full");

        let _ = rx.recv().await;
        assert!(tx.send(StatusReport::new(StatusKind::Stopped), &stop).await);
    }

    #[tokio::test]
    async fn test_stop_releases_blocked_sender() {
        let (tx, _rx) = status_channel(1);
        let stop = CancellationToken::new();
        assert!(tx.send(StatusReport::new(StatusKind::ActionSend), &stop).await);

        let waiter = {
            let tx = tx.clone();
            let stop = stop.clone();
            tokio::spawn(async move { tx.send(StatusReport::new(StatusKind::ActionSend), &stop).await })
        };
        stop.cancel();
        assert!(!waiter.await.unwrap());
    }

    #[tokio::test]
    async fn test_try_send_drops_when_full() {
        let (tx, mut rx) = status_channel(1);
        assert!(tx.try_send(StatusReport::new(StatusKind::Stopped)));
        assert!(!tx.try_send(StatusReport::new(StatusKind::Stopped)));
        assert_eq!(rx.recv().await.map(|r| r.kind), Some(StatusKind::Stopped));
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_not_an_error() {
        let (tx, rx) = status_channel(1);
        drop(rx);
        assert!(tx.is_closed());
        assert!(!tx.send(StatusReport::new(StatusKind::Error), &CancellationToken::new()).await);
    }
}
