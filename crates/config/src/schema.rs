//! Typed configuration schema with serde defaults.

use {
    secrecy::SecretString,
    serde::{Deserialize, Serialize},
};

/// Root configuration for both the API server and the tick worker.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelegpickConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub telegram: TelegramConfig,
    pub pics: PicsConfig,
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// sqlx connection URL. `mode=rwc` creates the file on first run.
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:telegpick.db?mode=rwc".into(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Session cookie lifetime in days.
    pub session_ttl_days: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_days: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelegramConfig {
    /// Bot token used to deliver link codes and push pictures.
    pub bot_token: SecretString,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: SecretString::new(String::new()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PicsConfig {
    /// Directory uploaded pictures are stored in.
    pub directory: std::path::PathBuf,
    /// Upload size cap in bytes.
    pub max_upload_bytes: usize,
}

impl Default for PicsConfig {
    fn default() -> Self {
        Self {
            directory: "pics".into(),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Tick cadence in seconds. Matching is minute-granular, so values other
    /// than 60 only change how promptly a minute boundary is observed.
    pub tick_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { tick_secs: 60 }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = TelegpickConfig::default();
        assert_eq!(cfg.server.port, 8000);
        assert_eq!(cfg.scheduler.tick_secs, 60);
        assert_eq!(cfg.auth.session_ttl_days, 30);
        assert!(cfg.database.url.starts_with("sqlite:"));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: TelegpickConfig = toml::from_str("[server]\nport = 9001\n").unwrap();
        assert_eq!(cfg.server.port, 9001);
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.pics.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn unknown_fields_rejected() {
        let res: std::result::Result<TelegpickConfig, _> = toml::from_str("[server]\nprot = 1\n");
        assert!(res.is_err());
    }
}
