//! User-facing notification infrastructure.
//!
//! Mutations report success or failure as [`Notification`]s published on
//! a [`NotificationBus`]. Consumers (a UI shell, the monitor binary)
//! subscribe and render them as toasts or log lines.

pub mod bus;

pub use bus::{Notification, NotificationBus, NotificationKind};
