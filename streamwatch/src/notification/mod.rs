//! Notification system module.
//!
//! Builds go-live notifications and fans them out to every subscriber of a
//! target through a [`channels::DeliveryChannel`].

pub mod channels;
pub mod dispatcher;
pub mod events;

pub use channels::{DeliveryChannel, DeliveryError, DiscordConfig, DiscordDmChannel};
pub use dispatcher::{DispatchReport, DispatcherConfig, NotificationDispatcher};
pub use events::NotificationEvent;
