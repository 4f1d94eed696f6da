use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::AppError;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const CONFIG_PATH_ENV: &str = "TRADE_VISION_CONFIG";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub feed: FeedConfig,
    pub strategy: StrategyConfig,
    pub sentiment: SentimentConfig,
    pub persistence: PersistenceConfig,
    pub alerts: AlertConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedTransport {
    /// ZeroMQ SUB socket receiving `(topic, payload)` multipart messages.
    Zmq,
    /// WebSocket trade stream; every text frame is a payload.
    Ws,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub transport: FeedTransport,
    pub endpoint: String,
    pub topic: String,
    pub poll_interval_ms: u64,
    /// A link that yields no frames for this long is treated as broken; 0 disables.
    pub idle_timeout_ms: u64,
    pub reconnect_initial_ms: u64,
    pub reconnect_max_ms: u64,
    pub heartbeat_every: u64,
    pub channel_capacity: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            transport: FeedTransport::Zmq,
            endpoint: "tcp://127.0.0.1:5555".to_string(),
            topic: "trade".to_string(),
            poll_interval_ms: 100,
            idle_timeout_ms: 30_000,
            reconnect_initial_ms: 1_000,
            reconnect_max_ms: 30_000,
            heartbeat_every: 20,
            channel_capacity: 1_024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub cooldown_secs: u64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self { cooldown_secs: 300 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    pub base_url: String,
    pub post_limit: usize,
    pub timeout_secs: u64,
    pub max_in_flight: usize,
    #[serde(skip)]
    pub token: Option<String>,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            base_url: "https://cryptopanic.com".to_string(),
            post_limit: 10,
            timeout_secs: 10,
            max_in_flight: 1,
            token: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceBackend {
    Supabase,
    Sqlite,
    None,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub backend: PersistenceBackend,
    pub table: String,
    pub sqlite_path: PathBuf,
    pub timeout_secs: u64,
    #[serde(skip)]
    pub supabase_url: Option<String>,
    #[serde(skip)]
    pub supabase_key: Option<String>,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: PersistenceBackend::Supabase,
            table: "trade_logs".to_string(),
            sqlite_path: PathBuf::from("data/trade_logs.sqlite"),
            timeout_secs: 10,
            supabase_url: None,
            supabase_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub telegram_api_url: String,
    pub timeout_secs: u64,
    #[serde(skip)]
    pub telegram_token: Option<String>,
    #[serde(skip)]
    pub telegram_chat_id: Option<String>,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            telegram_api_url: "https://api.telegram.org".to_string(),
            timeout_secs: 10,
            telegram_token: None,
            telegram_chat_id: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl FeedConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_ms > 0).then(|| Duration::from_millis(self.idle_timeout_ms))
    }

    pub fn reconnect_initial(&self) -> Duration {
        Duration::from_millis(self.reconnect_initial_ms)
    }

    pub fn reconnect_max(&self) -> Duration {
        Duration::from_millis(self.reconnect_max_ms)
    }

    /// Checks the endpoint scheme against the selected transport.
    pub fn validate_endpoint(&self) -> Result<url::Url, AppError> {
        let invalid = |reason: String| AppError::Endpoint {
            endpoint: self.endpoint.clone(),
            reason,
        };
        let parsed = url::Url::parse(self.endpoint.trim()).map_err(|e| invalid(e.to_string()))?;
        let allowed: &[&str] = match self.transport {
            FeedTransport::Zmq => &["tcp", "ipc"],
            FeedTransport::Ws => &["ws", "wss"],
        };
        if !allowed.contains(&parsed.scheme()) {
            return Err(invalid(format!(
                "scheme '{}' not supported, expected one of {}",
                parsed.scheme(),
                allowed.join("/")
            )));
        }
        if parsed.scheme() != "ipc" && parsed.host_str().map_or(true, str::is_empty) {
            return Err(invalid("missing host".to_string()));
        }
        Ok(parsed)
    }
}

impl StrategyConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

fn env_secret(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Load `.env`, the TOML file and environment secrets. Missing secrets only
    /// disable the dependency that needs them; a bad feed endpoint is fatal.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config_path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut config = Self::from_path(&config_path)?;

        config.sentiment.token = env_secret("CRYPTOPANIC_TOKEN");
        config.alerts.telegram_token = env_secret("TELEGRAM_TOKEN");
        config.alerts.telegram_chat_id = env_secret("TELEGRAM_CHAT_ID");
        config.persistence.supabase_url = env_secret("SUPABASE_URL");
        config.persistence.supabase_key = env_secret("SUPABASE_KEY");

        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&config_str)
            .with_context(|| format!("failed to load {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).context("failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.feed
            .validate_endpoint()
            .context("feed.endpoint is invalid")?;
        if self.feed.topic.is_empty() {
            bail!("feed.topic must not be empty");
        }
        if self.feed.poll_interval_ms == 0 {
            bail!("feed.poll_interval_ms must be > 0");
        }
        if self.feed.idle_timeout_ms > 0 && self.feed.idle_timeout_ms < self.feed.poll_interval_ms {
            bail!("feed.idle_timeout_ms must be 0 or >= feed.poll_interval_ms");
        }
        if self.feed.reconnect_initial_ms == 0 {
            bail!("feed.reconnect_initial_ms must be > 0");
        }
        if self.feed.reconnect_max_ms < self.feed.reconnect_initial_ms {
            bail!("feed.reconnect_max_ms must be >= feed.reconnect_initial_ms");
        }
        if self.feed.channel_capacity == 0 {
            bail!("feed.channel_capacity must be > 0");
        }
        if self.sentiment.post_limit == 0 {
            bail!("sentiment.post_limit must be > 0");
        }
        if self.sentiment.max_in_flight == 0 {
            bail!("sentiment.max_in_flight must be > 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_reference_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.feed.transport, FeedTransport::Zmq);
        assert_eq!(config.feed.endpoint, "tcp://127.0.0.1:5555");
        assert_eq!(config.feed.topic, "trade");
        assert_eq!(config.feed.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.feed.idle_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.feed.reconnect_initial(), Duration::from_secs(1));
        assert_eq!(config.strategy.cooldown(), Duration::from_secs(300));
        assert_eq!(config.sentiment.post_limit, 10);
        assert_eq!(config.sentiment.timeout_secs, 10);
        assert_eq!(config.persistence.backend, PersistenceBackend::Supabase);
        assert!(config.sentiment.token.is_none());
    }

    #[test]
    fn ws_transport_rejects_tcp_endpoint() {
        let toml_str = r#"
[feed]
transport = "ws"
endpoint = "tcp://127.0.0.1:5555"
"#;
        let err = Config::from_toml_str(toml_str).unwrap_err();
        assert!(format!("{:#}", err).contains("feed.endpoint is invalid"));
    }
}
