//! Shared error plumbing used across the telegpick crates.

pub mod error;

pub use error::{Error, FromMessage, Result};
