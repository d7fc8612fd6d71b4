//! # Simulated users.
//!
//! - [`EntityConfig`] / [`EntityBuilder`] identity, behavior and channels of one user
//! - [`EntityState`] lifecycle observed through a watch channel
//! - [`Action`] / [`ActionFn`] / [`ActionRef`] behaviors selected by weight
//! - [`UserProfile`] / [`ApiClient`] profile derived at initialization

mod action;
mod config;
mod profile;

pub use action::{Action, ActionFn, ActionRef};
pub use config::{EntityBuilder, EntityConfig, EntityState};
pub use profile::{
    ApiClient, Channel, ChannelMembership, Team, TeamMembership, User, UserProfile,
};
