//! Status reporting: report types and the bounded channel carrying them.
//!
//! ## Contents
//! - [`StatusKind`], [`StatusReport`] report classification and payload
//! - [`StatusSender`], [`status_channel`] bounded, backpressured transport
//!
//! ## Quick reference
//! - **Producers**: entity runners (`core::runner`, `core::supervisor`) and actions
//!   via the `EntityConfig::send_*` helpers.
//! - **Consumer**: one aggregator reading the [`StatusReceiver`], usually
//!   [`aggregate`](crate::sinks::aggregate).

mod channel;
mod report;

pub use channel::{StatusReceiver, StatusSender, status_channel};
pub use report::{StatusKind, StatusReport};
