//! Database models for streamwatch.
//!
//! These models map directly to the database schema.

pub mod watchlist;

pub use watchlist::*;
