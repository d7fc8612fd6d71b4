//! # Status sink that renders reports through `tracing`.
//!
//! Failures are logged at `warn`/`error`, traffic at `trace`, lifecycle at `info`:
//! ```text
//! INFO  status=launching entity=user-3
//! ERROR status=failed_launch entity=user-3 error="transport failure: ..." details="failed to fetch profile"
//! TRACE status=action_send entity=user-7 details="post_message"
//! ```

use async_trait::async_trait;

use super::StatusSink;
use crate::status::{StatusKind, StatusReport};

/// Logs every status report.
#[derive(Clone, Copy, Debug, Default)]
pub struct StatusLog;

#[async_trait]
impl StatusSink for StatusLog {
    async fn on_status(&self, r: &StatusReport) {
        let entity = r.entity_name();
        let status = r.kind.as_label();
        let error = r.error.as_deref().unwrap_or_default();
        let details = &*r.details;

        match r.kind {
            StatusKind::FailedLaunch | StatusKind::FailedActive => {
                tracing::error!(status, %entity, error, details, seq = r.seq, "entity failure");
            }
            StatusKind::Error => {
                tracing::warn!(status, %entity, error, details, seq = r.seq, "entity error");
            }
            StatusKind::ActionSend | StatusKind::ActionReceive => {
                tracing::trace!(status, %entity, details, seq = r.seq, "entity traffic");
            }
            StatusKind::Launching | StatusKind::Active | StatusKind::Stopped => {
                tracing::info!(status, %entity, details, seq = r.seq, "entity lifecycle");
            }
        }
    }

    fn name(&self) -> &'static str {
        "status-log"
    }
}
