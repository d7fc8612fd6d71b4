//! Timing and retry policies.
//!
//! This module groups the knobs that control **when** an entity acts and
//! **how** its event stream is re-established.
//!
//! ## Contents
//! - [`Pacing`] phase-aligned first action and jittered re-arm (rate ± variance/2)
//! - [`ReconnectPolicy`] linear, bounded stream reconnect (n × step, dead after max)
//!
//! ## Quick wiring
//! ```text
//! EntitiesConfig { action_rate, action_rate_max_variance, reconnect }
//!      ├─► core::scheduler::ActionScheduler uses Pacing
//!      └─► core::stream::listen uses ReconnectPolicy
//! ```

mod pacing;
mod reconnect;

pub use pacing::Pacing;
pub use reconnect::ReconnectPolicy;
