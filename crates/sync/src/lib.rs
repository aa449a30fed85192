//! Client synchronization layer for the on-air studio backend.
//!
//! - [`QueryCache`]: keyed store of the latest value per resource
//!   collection, with observers, invalidation and direct patching.
//! - [`MutationExecutor`]: writes that notify the user and invalidate
//!   the affected cache keys on success.
//! - [`listener`]: the push-channel task that patches playback state.
//! - [`poller`]: periodic playback refresh alongside the push channel.
//! - [`AutomationContext`]: the per-session facade wiring it together,
//!   configured through [`SessionConfig`].

pub mod cache;
pub mod config;
pub mod context;
pub mod keys;
pub mod listener;
pub mod mutations;
pub mod poller;

pub use cache::{query_fn, QueryCache, QueryObserver, QuerySnapshot};
pub use config::{ConfigError, SessionConfig};
pub use context::AutomationContext;
pub use keys::QueryKey;
pub use listener::{ListenerHandle, ListenerOptions};
pub use mutations::{ActionError, MutationExecutor};
