use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use trade_vision::config::{Config, FeedTransport, PersistenceBackend};

#[test]
fn parses_full_file() {
    let toml_str = r#"
[feed]
transport = "ws"
endpoint = "wss://stream.binance.com:9443/ws/btcusdt@trade"
topic = "trade"
poll_interval_ms = 250
reconnect_initial_ms = 500
reconnect_max_ms = 8000
heartbeat_every = 50
channel_capacity = 64

[strategy]
cooldown_secs = 60

[sentiment]
base_url = "http://localhost:8080"
post_limit = 5
timeout_secs = 3
max_in_flight = 2

[persistence]
backend = "sqlite"
table = "decisions"
sqlite_path = "var/decisions.sqlite"

[alerts]
telegram_api_url = "http://localhost:8081"

[logging]
level = "debug"
json = true
file = "trade-vision.log"
"#;
    let config = Config::from_toml_str(toml_str).unwrap();
    assert_eq!(config.feed.transport, FeedTransport::Ws);
    assert_eq!(config.feed.poll_interval(), Duration::from_millis(250));
    assert_eq!(config.feed.reconnect_max(), Duration::from_secs(8));
    assert_eq!(config.feed.heartbeat_every, 50);
    assert_eq!(config.strategy.cooldown(), Duration::from_secs(60));
    assert_eq!(config.sentiment.post_limit, 5);
    assert_eq!(config.sentiment.max_in_flight, 2);
    assert_eq!(config.persistence.backend, PersistenceBackend::Sqlite);
    assert_eq!(config.persistence.sqlite_path, PathBuf::from("var/decisions.sqlite"));
    assert_eq!(config.alerts.telegram_api_url, "http://localhost:8081");
    assert!(config.logging.json);
    assert_eq!(config.logging.file, Some(PathBuf::from("trade-vision.log")));
}

#[test]
fn ipc_endpoint_is_accepted_for_zmq() {
    let config = Config::from_toml_str(
        r#"
[feed]
endpoint = "ipc:///tmp/ticks.ipc"
"#,
    )
    .unwrap();
    assert_eq!(config.feed.validate_endpoint().unwrap().scheme(), "ipc");
}

#[test]
fn unparseable_endpoint_is_rejected() {
    let err = Config::from_toml_str(
        r#"
[feed]
endpoint = "127.0.0.1:5555"
"#,
    )
    .unwrap_err();
    assert!(format!("{:#}", err).contains("feed.endpoint is invalid"));
}

#[test]
fn zero_poll_interval_is_rejected() {
    let err = Config::from_toml_str("[feed]\npoll_interval_ms = 0\n").unwrap_err();
    assert!(err.to_string().contains("poll_interval_ms"));
}

#[test]
fn backoff_cap_below_initial_is_rejected() {
    let err = Config::from_toml_str("[feed]\nreconnect_initial_ms = 5000\nreconnect_max_ms = 100\n")
        .unwrap_err();
    assert!(err.to_string().contains("reconnect_max_ms"));
}

#[test]
fn unknown_backend_fails_to_parse() {
    assert!(Config::from_toml_str("[persistence]\nbackend = \"mongo\"\n").is_err());
}

#[test]
fn loads_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[strategy]\ncooldown_secs = 5").unwrap();
    let config = Config::from_path(file.path()).unwrap();
    assert_eq!(config.strategy.cooldown_secs, 5);
    assert_eq!(config.feed.topic, "trade");
}

#[test]
fn missing_file_reports_its_path() {
    let err = Config::from_path(std::path::Path::new("/nonexistent/trade-vision.toml")).unwrap_err();
    assert!(format!("{:#}", err).contains("/nonexistent/trade-vision.toml"));
}

#[test]
fn shipped_default_config_is_valid() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/default.toml");
    let config = Config::from_path(&path).unwrap();
    assert_eq!(config.feed.endpoint, "tcp://127.0.0.1:5555");
}

#[test]
fn idle_timeout_shorter_than_poll_is_rejected() {
    let err = Config::from_toml_str("[feed]\npoll_interval_ms = 500\nidle_timeout_ms = 100\n").unwrap_err();
    assert!(err.to_string().contains("idle_timeout_ms"));
    let config = Config::from_toml_str("[feed]\nidle_timeout_ms = 0\n").unwrap();
    assert_eq!(config.feed.idle_timeout(), None);
}
