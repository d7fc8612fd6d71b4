//! # Status sinks: consumers of the shared status channel.
//!
//! A [`StatusSink`] observes every [`StatusReport`] drained from a swarm's status
//! channel by [`aggregate`].
//!
//! ## Architecture
//! ```text
//! Entity 1 ──┐
//! Entity N ──┴─► mpsc(cap) ─► aggregate(rx, sinks)
//!                                   ├──► StatusLog::on_status()    (tracing)
//!                                   ├──► StatusTally::on_status()  (counters)
//!                                   └──► Custom::on_status()
//! ```
//!
//! ## Rules
//! - Sinks are called in order, one report at a time; a slow sink throttles every
//!   producer through channel backpressure, so sinks must not block indefinitely.
//! - A panicking sink is logged and skipped for that report; the others still run.
//! - `aggregate` returns once every sender is gone.
//!
//! ## Implementing a sink
//! ```rust
//! use async_trait::async_trait;
//! use loadvisor::{StatusKind, StatusReport};
//! use loadvisor::sinks::StatusSink;
//!
//! struct FailureAlarm;
//!
//! #[async_trait]
//! impl StatusSink for FailureAlarm {
//!     async fn on_status(&self, report: &StatusReport) {
//!         if report.kind == StatusKind::FailedLaunch {
//!             // page someone
//!         }
//!     }
//!     fn name(&self) -> &'static str { "failure-alarm" }
//! }
//! ```

mod log;
mod tally;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;

use crate::status::{StatusReceiver, StatusReport};

pub use log::StatusLog;
pub use tally::{StatusTally, TallySnapshot};

/// Consumer of status reports.
#[async_trait]
pub trait StatusSink: Send + Sync + 'static {
    /// Handles one report.
    async fn on_status(&self, report: &StatusReport);

    /// Sink name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Drains `rx` into `sinks` until every sender has been dropped.
///
/// Returns the number of reports processed.
pub async fn aggregate(mut rx: StatusReceiver, sinks: Vec<Arc<dyn StatusSink>>) -> u64 {
    let mut processed = 0;
    while let Some(report) = rx.recv().await {
        for sink in &sinks {
            let delivered = AssertUnwindSafe(sink.on_status(&report))
                .catch_unwind()
                .await;
            if delivered.is_err() {
                tracing::error!(sink = sink.name(), seq = report.seq, "status sink panicked");
            }
        }
        processed += 1;
    }
    processed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{StatusKind, status_channel};
    use std::sync::Mutex;
    use tokio_util::sync::CancellationToken;

    struct Recorder(Mutex<Vec<StatusKind>>);

    #[async_trait]
    impl StatusSink for Recorder {
        async fn on_status(&self, report: &StatusReport) {
            self.0.lock().unwrap().push(report.kind);
        }
    }

    struct Exploder;

    #[async_trait]
    impl StatusSink for Exploder {
        async fn on_status(&self, report: &StatusReport) {
            if report.kind == StatusKind::Error {
                panic!("sink failure");
            }
        }
        fn name(&self) -> &'static str {
            "exploder"
        }
    }

    #[tokio::test]
    async fn test_panicking_sink_does_not_starve_others() {
        let (tx, rx) = status_channel(8);
        let stop = CancellationToken::new();
        for kind in [StatusKind::Launching, StatusKind::Error, StatusKind::Stopped] {
            assert!(tx.send(StatusReport::new(kind), &stop).await);
        }
        drop(tx);

        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let processed = aggregate(rx, vec![Arc::new(Exploder), recorder.clone()]).await;

        assert_eq!(processed, 3);
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec![StatusKind::Launching, StatusKind::Error, StatusKind::Stopped]
        );
    }
}
