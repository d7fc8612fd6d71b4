//! # Status reports emitted by entity runners.
//!
//! The [`StatusKind`] enum classifies what happened to one simulated user:
//! - **Lifecycle**: launching, active, stopped
//! - **Failures**: generic error, failed launch, failed while active
//! - **Traffic**: an action sent something / received something
//!
//! The [`StatusReport`] struct carries the kind plus an optional error, a free-text
//! detail string, the originating entity's number and name (copied at creation) and a
//! weak back-reference to the entity itself.
//!
//! ## Ordering guarantees
//! Each report has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use loadvisor::{StatusKind, StatusReport};
//!
//! let report = StatusReport::new(StatusKind::FailedActive)
//!     .with_error("connection reset")
//!     .with_details("post_message");
//!
//! assert_eq!(report.kind, StatusKind::FailedActive);
//! assert_eq!(report.error.as_deref(), Some("connection reset"));
//! assert!(report.entity().is_none());
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Weak};
use std::time::SystemTime;

use crate::entity::EntityConfig;

/// Global sequence counter for report ordering.
static REPORT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of status reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    /// Entity is about to initialize.
    Launching,
    /// Entity initialized and is scheduling actions.
    Active,
    /// Non-fatal error worth surfacing.
    Error,
    /// Initialization failed; the entity never became active.
    FailedLaunch,
    /// An action faulted while active; the entity is being restarted.
    FailedActive,
    /// An action sent traffic to the target.
    ActionSend,
    /// An action observed traffic from the target.
    ActionReceive,
    /// Entity observed the stop signal and ended.
    Stopped,
}

impl StatusKind {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            StatusKind::Launching => "launching",
            StatusKind::Active => "active",
            StatusKind::Error => "error",
            StatusKind::FailedLaunch => "failed_launch",
            StatusKind::FailedActive => "failed_active",
            StatusKind::ActionSend => "action_send",
            StatusKind::ActionReceive => "action_receive",
            StatusKind::Stopped => "stopped",
        }
    }

    /// True for the failure kinds.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            StatusKind::Error | StatusKind::FailedLaunch | StatusKind::FailedActive
        )
    }
}

/// One status observation.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - `entity_number` / `entity_label`: identity captured when the report is built
/// - `entity`: weak reference; reports never keep an entity alive
#[derive(Clone)]
pub struct StatusReport {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Report classification.
    pub kind: StatusKind,
    /// Error message, if the report describes a failure.
    pub error: Option<Arc<str>>,
    /// Free-text details.
    pub details: Arc<str>,
    /// Number of the originating entity, if any.
    pub entity_number: Option<usize>,
    /// Name of the originating entity, if any.
    pub entity_label: Option<Arc<str>>,
    /// Originating entity (attribution only).
    pub entity: Weak<EntityConfig>,
}

impl StatusReport {
    /// Creates a new report of the given kind with current timestamp and next sequence number.
    pub fn new(kind: StatusKind) -> Self {
        Self {
            seq: REPORT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            error: None,
            details: Arc::from(""),
            entity_number: None,
            entity_label: None,
            entity: Weak::new(),
        }
    }

    /// Attaches an error message.
    #[inline]
    pub fn with_error(mut self, error: impl Into<Arc<str>>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Attaches free-text details.
    #[inline]
    pub fn with_details(mut self, details: impl Into<Arc<str>>) -> Self {
        self.details = details.into();
        self
    }

    /// Attaches the originating entity and copies its identity.
    #[inline]
    pub fn with_entity(mut self, entity: &Arc<EntityConfig>) -> Self {
        self.entity_number = Some(entity.number());
        self.entity_label = Some(Arc::from(entity.name()));
        self.entity = Arc::downgrade(entity);
        self
    }

    /// Upgrades the weak entity reference, if the entity is still alive.
    pub fn entity(&self) -> Option<Arc<EntityConfig>> {
        self.entity.upgrade()
    }

    /// Entity name, or `"unknown"` for reports without an entity.
    ///
    /// Stays valid after the entity is dropped.
    pub fn entity_name(&self) -> String {
        self.entity_label
            .as_deref()
            .unwrap_or("unknown")
            .to_string()
    }
}

impl fmt::Debug for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusReport")
            .field("seq", &self.seq)
            .field("kind", &self.kind)
            .field("error", &self.error)
            .field("details", &self.details)
            .field("entity_number", &self.entity_number)
            .field("entity", &self.entity_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{ApiClient, Channel, Team, User};
    use crate::error::ApiError;
    use async_trait::async_trait;

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

    #[test]
    fn test_identity_outlives_entity() {
        let entity = EntityConfig::builder(7, "gone", Arc::new(NoApi)).build();
        let report = StatusReport::new(StatusKind::Stopped).with_entity(&entity);
        drop(entity);

        assert!(report.entity().is_none());
        assert_eq!(report.entity_number, Some(7));
        assert_eq!(report.entity_name(), "gone");
    }

    #[test]
    fn test_report_without_entity_is_unknown() {
        let report = StatusReport::new(StatusKind::Error);
        assert_eq!(report.entity_number, None);
        assert_eq!(report.entity_name(), "unknown");
    }
}
