//! # `taskchain`
//!
//! The core of a personal task tracker: a recurring-task sequence engine
//! and a filtering query engine over a `SQLite` task store. Transport,
//! rendering, and authentication are a caller's concern.

pub mod config;
pub mod error;
pub mod tasks;

pub use error::{Error, Result};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
