//! Typed clients for streaming platform APIs.
//!
//! Currently ships a Twitch Helix client that answers two questions for a
//! channel login: "is it live right now?" and "what does its profile look like?".

pub mod client;
pub mod error;
pub mod twitch;

pub use client::{create_client_builder, install_rustls_provider};
pub use error::PlatformError;
