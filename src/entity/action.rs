//! # Action capabilities.
//!
//! An [`Action`] is one thing a simulated user can do (post a message, fetch
//! statuses, ...). Actions are supplied by the embedding application; the runtime
//! only selects and invokes them.
//!
//! [`ActionFn`] wraps a closure `F: Fn(Arc<EntityConfig>) -> Fut`, producing a fresh
//! future per invocation, so an action is safe to re-invoke after a restart.
//!
//! ## Example
//! ```rust
//! use loadvisor::{ActionFn, ActionRef};
//!
//! let noop: ActionRef = ActionFn::arc("noop", |_entity| async { anyhow::Ok(()) });
//! assert_eq!(noop.name(), "noop");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use super::EntityConfig;

/// Shared handle to an action.
pub type ActionRef = Arc<dyn Action>;

/// # A unit of simulated-user behavior.
///
/// Invoked sequentially by the entity's scheduler: two actions of the same entity
/// never overlap. Returning an error (or panicking) is a runtime fault: the entity
/// is restarted from initialization.
#[async_trait]
pub trait Action: Send + Sync + 'static {
    /// Returns a stable, human-readable action name.
    fn name(&self) -> &str;

    /// Performs the action on behalf of `entity`.
    async fn execute(&self, entity: Arc<EntityConfig>) -> anyhow::Result<()>;
}

/// Function-backed action implementation.
pub struct ActionFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> ActionFn<F> {
    /// Creates a new function-backed action.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the action and returns it as a shared handle.
    pub fn arc<Fut>(name: impl Into<Cow<'static, str>>, f: F) -> ActionRef
    where
        F: Fn(Arc<EntityConfig>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Action for ActionFn<F>
where
    F: Fn(Arc<EntityConfig>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, entity: Arc<EntityConfig>) -> anyhow::Result<()> {
        (self.f)(entity).await
    }
}
