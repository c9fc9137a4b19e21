//! # PSI Common Library
//!
//! Shared code for the post-storm imagery tools:
//! - Error type and result alias
//! - TOML configuration and root folder resolution
//! - Event types and the broadcast event bus
//! - Time helpers

pub mod config;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
