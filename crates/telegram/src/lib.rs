//! Telegram delivery: link codes at registration, avatar pushes on ticks.

pub mod connector;
pub mod error;

pub use {
    connector::Connector,
    error::{Error, Result},
};
