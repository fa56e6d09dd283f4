//! Config discovery, `${ENV_VAR}` substitution, and env overrides.

use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

use {regex::Regex, secrecy::SecretString, tracing::debug};

use crate::{
    error::{Context, Result},
    schema::TelegpickConfig,
};

const CONFIG_FILENAME: &str = "telegpick.toml";

#[allow(clippy::expect_used)]
static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static pattern"));

/// Load config from an explicit path.
pub fn load_config(path: &Path) -> Result<TelegpickConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw = substitute_env(&raw);
    Ok(toml::from_str(&raw)?)
}

/// Discover and load config from standard locations.
///
/// Search order: `./telegpick.toml`, then `~/.config/telegpick/telegpick.toml`.
/// Falls back to defaults when no file is found; env overrides apply last.
pub fn discover_and_load() -> TelegpickConfig {
    let mut config = match find_config_file() {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            match load_config(&path) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "bad config file, using defaults");
                    TelegpickConfig::default()
                },
            }
        },
        None => {
            debug!("no config file found, using defaults");
            TelegpickConfig::default()
        },
    };
    apply_env_overrides(&mut config);
    config
}

/// Returns the user-global config directory (`~/.config/telegpick/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "telegpick").map(|d| d.config_dir().to_path_buf())
}

fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILENAME);
    if local.exists() {
        return Some(local);
    }
    config_dir()
        .map(|d| d.join(CONFIG_FILENAME))
        .filter(|p| p.exists())
}

/// Replace `${VAR}` with the value of `VAR`; unset vars are left untouched.
fn substitute_env(raw: &str) -> String {
    ENV_VAR_RE
        .replace_all(raw, |caps: &regex::Captures<'_>| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Apply `TELEGPICK_*` environment overrides onto an already-loaded config.
pub fn apply_env_overrides(config: &mut TelegpickConfig) {
    if let Ok(host) = std::env::var("TELEGPICK_HOST") {
        config.server.host = host;
    }
    if let Ok(port) = std::env::var("TELEGPICK_PORT")
        && let Ok(port) = port.parse()
    {
        config.server.port = port;
    }
    if let Ok(url) = std::env::var("TELEGPICK_DATABASE_URL") {
        config.database.url = url;
    }
    if let Ok(token) = std::env::var("TELEGPICK_BOT_TOKEN") {
        config.telegram.bot_token = SecretString::new(token);
    }
    if let Ok(dir) = std::env::var("TELEGPICK_PICS_DIR") {
        config.pics.directory = dir.into();
    }
    if let Ok(secs) = std::env::var("TELEGPICK_TICK_SECS")
        && let Ok(secs) = secs.parse()
    {
        config.scheduler.tick_secs = secs;
    }
}
