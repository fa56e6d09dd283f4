//! Minute-granular evaluation of picture schedules.
//!
//! Each tick shifts the current UTC instant into every pic's own fixed
//! offset, matches the local wall-clock minute against the pic's rules, and
//! pushes the picture for every hit. A malformed pic or rule is skipped and
//! logged; it never takes the tick down with it.

pub mod dispatch;
pub mod error;
pub mod matcher;
pub mod offset;
pub mod rule;
pub mod service;

pub use {
    dispatch::{AvatarPushFn, DispatchOutcome, PushRequest},
    error::{Error, Result},
    matcher::{TickMatch, find_matches},
    service::{TickReport, TickService},
};
