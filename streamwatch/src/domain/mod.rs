//! Domain layer for streamwatch.
//!
//! Value objects shared by the registry, the monitor and the notifier.

pub mod subscriber;
pub mod target;

pub use subscriber::{Subscriber, SubscriberId};
pub use target::Target;
