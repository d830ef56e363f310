//! streamwatch library crate.
//!
//! Watches Twitch channels on behalf of many subscribers and sends each of
//! them a direct message when a watched channel goes live.

pub mod config;
pub mod database;
pub mod domain;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod notification;
pub mod panic_hook;
pub mod registry;
pub mod scheduler;
pub mod snapshot;
pub mod utils;

pub use error::{Error, Result};
