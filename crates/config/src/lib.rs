//! Configuration schema and loading for telegpick.
//!
//! Config file: `telegpick.toml`, searched in `./` then `~/.config/telegpick/`.
//! String values support `${ENV_VAR}` substitution, and a handful of
//! `TELEGPICK_*` environment variables override individual fields.
//!
//! The loaded [`TelegpickConfig`] is passed into components at construction
//! time; nothing reads configuration through a global.

pub mod error;
pub mod loader;
pub mod schema;

pub use {
    error::{Error, Result},
    loader::{apply_env_overrides, config_dir, discover_and_load, load_config},
    schema::{
        AuthConfig, DatabaseConfig, PicsConfig, SchedulerConfig, ServerConfig, TelegpickConfig,
        TelegramConfig,
    },
};
