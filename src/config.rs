use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP API port
    #[serde(default = "default_port")]
    pub port: u16,

    /// WebSocket port
    #[serde(default = "default_ws_port")]
    pub ws_port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// CORS allowed origins, comma separated
    pub cors_origins: Option<String>,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Database URL. Without one, scene state is kept in memory.
    pub db_url: Option<String>,

    /// Root directory of uploaded object content
    #[serde(default = "default_files_dir")]
    pub files_dir: String,

    /// How long a broadcast waits on one slow client before dropping it
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,

    /// Outbound frames buffered per client
    #[serde(default = "default_client_queue_capacity")]
    pub client_queue_capacity: usize,

    /// Put a link and a text object into the default session at start-up
    #[serde(default)]
    pub seed_demo_objects: bool,
}

impl Config {
    /// Load configuration from environment variables or app.env file.
    /// Runs before logging is set up, so the caller reports the outcome.
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        envy::from_env::<Config>().map_err(ConfigError::EnvError)
    }

    /// Default tracing directives when `RUST_LOG` is not set
    pub fn log_filter(&self) -> String {
        format!(
            "scene_sync={level},tower_http={level},axum::rejection=trace,info",
            level = self.log_level
        )
    }

    /// Get the full HTTP server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the full WebSocket server address
    pub fn websocket_address(&self) -> String {
        format!("{}:{}", self.host, self.ws_port)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment.to_lowercase() == "dev" || self.environment.to_lowercase() == "development"
    }

    /// Allowed CORS origins, empty when not configured
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            ws_port: default_ws_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            cors_origins: None,
            db_url: None,
            files_dir: default_files_dir(),
            send_timeout_ms: default_send_timeout_ms(),
            client_queue_capacity: default_client_queue_capacity(),
            seed_demo_objects: false,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    EnvError(envy::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EnvError(e) => write!(f, "Environment variable error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_ws_port() -> u16 {
    8089
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_files_dir() -> String {
    "files".to_string()
}

fn default_send_timeout_ms() -> u64 {
    5_000
}

fn default_client_queue_capacity() -> usize {
    256
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_ports() {
        let config = Config::default();
        assert_eq!(config.server_address(), "0.0.0.0:8080");
        assert_eq!(config.websocket_address(), "0.0.0.0:8089");
        assert_eq!(config.send_timeout(), Duration::from_secs(5));
        assert!(config.is_development());
        assert_eq!(config.log_filter(), "scene_sync=info,tower_http=info,axum::rejection=trace,info");
    }

    #[test]
    fn only_dev_environments_count_as_development() {
        for environment in ["dev", "Development"] {
            let config = Config {
                environment: environment.into(),
                ..Config::default()
            };
            assert!(config.is_development());
        }
        let config = Config {
            environment: "prod".into(),
            log_level: "warn".into(),
            ..Config::default()
        };
        assert!(!config.is_development());
        assert!(config.log_filter().starts_with("scene_sync=warn,"));
    }

    #[test]
    fn cors_origins_are_split_and_trimmed() {
        let config = Config {
            cors_origins: Some("http://a.test, http://b.test,,".into()),
            ..Config::default()
        };
        assert_eq!(config.cors_origin_list(), vec!["http://a.test", "http://b.test"]);
    }
}
