//! # Stateful sink that counts reports and tracks active entities.
//!
//! ```text
//! Active                       ─► insert(entity number)
//! FailedActive | Stopped       ─► remove(entity number)
//! FailedLaunch                 ─► remove(entity number)
//! every report                 ─► counts[kind] += 1
//! ```
//!
//! An entity that crashes and restarts leaves the active set on `FailedActive`
//! and re-enters it on its next `Active`. Entities are keyed by number, so two
//! entities sharing a name are tracked separately.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::StatusSink;
use crate::status::{StatusKind, StatusReport};

#[derive(Default)]
struct Inner {
    counts: HashMap<StatusKind, u64>,
    active: BTreeMap<usize, String>,
}

/// Point-in-time view of a [`StatusTally`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TallySnapshot {
    /// Reports seen per kind.
    pub counts: HashMap<StatusKind, u64>,
    /// Names of entities currently active, ordered by entity number.
    pub active: Vec<String>,
}

impl TallySnapshot {
    /// Reports seen of `kind`.
    pub fn count(&self, kind: StatusKind) -> u64 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    /// Reports seen of any failure kind.
    pub fn failures(&self) -> u64 {
        self.counts
            .iter()
            .filter(|(k, _)| k.is_failure())
            .map(|(_, n)| n)
            .sum()
    }
}

/// Counts status reports and tracks which entities are active. Cheap to clone.
#[derive(Clone, Default)]
pub struct StatusTally {
    inner: Arc<Mutex<Inner>>,
}

impl StatusTally {
    /// Creates an empty tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current counters.
    pub async fn snapshot(&self) -> TallySnapshot {
        let g = self.inner.lock().await;
        TallySnapshot {
            counts: g.counts.clone(),
            active: g.active.values().cloned().collect(),
        }
    }
}

#[async_trait]
impl StatusSink for StatusTally {
    async fn on_status(&self, report: &StatusReport) {
        let mut g = self.inner.lock().await;
        *g.counts.entry(report.kind).or_default() += 1;

        let Some(number) = report.entity_number else {
            return;
        };
        match report.kind {
            StatusKind::Active => {
                g.active.insert(number, report.entity_name());
            }
            StatusKind::FailedActive | StatusKind::FailedLaunch | StatusKind::Stopped => {
                g.active.remove(&number);
            }
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "status-tally"
    }
}
