use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};

use trade_vision::config::{Config, LoggingConfig};
use trade_vision::feed::{connector_from_config, StreamIngestor};
use trade_vision::pipeline::PipelineContext;
use trade_vision::router::Router;
use trade_vision::{sentiment, shutdown, sink};

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::try_new(&logging.level)
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    });
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match (&logging.file, logging.json) {
        (Some(path), json) => {
            let log_file = std::fs::File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            let builder = builder.with_writer(log_file).with_ansi(false);
            if json {
                builder.json().init();
            } else {
                builder.init();
            }
        }
        (None, true) => builder.json().init(),
        (None, false) => builder.init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            eprintln!("Check config/default.toml (or TRADE_VISION_CONFIG) and the feed endpoint");
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging)?;

    // Install rustls crypto provider (required by rustls 0.23+)
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("rustls crypto provider already installed");
    }

    tracing::info!(
        transport = ?config.feed.transport,
        endpoint = %config.feed.endpoint,
        topic = %config.feed.topic,
        cooldown_secs = config.strategy.cooldown_secs,
        "Starting trade-vision"
    );

    let ctx = PipelineContext {
        cooldown: config.strategy.cooldown(),
        sentiment: sentiment::from_config(&config.sentiment),
        store: sink::store_from_config(&config.persistence),
        alerts: sink::alert_from_config(&config.alerts),
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (feed_tx, feed_rx) = mpsc::channel::<serde_json::Value>(config.feed.channel_capacity);

    let router = Router::new(ctx, config.feed.channel_capacity, config.feed.heartbeat_every);
    let router_task = tokio::spawn(router.run(feed_rx));

    tokio::spawn(shutdown::forward_signal(tokio::signal::ctrl_c(), shutdown_tx));

    let ingestor = StreamIngestor::new(connector_from_config(&config.feed), &config.feed);
    let ingest_report = ingestor.run(feed_tx, shutdown_rx).await;

    // The ingestor dropped its sender, so the router drains and exits.
    let router_report = router_task.await.context("router task failed")?;
    tracing::info!(
        delivered = ingest_report.delivered,
        malformed = ingest_report.malformed,
        reconnects = ingest_report.reconnects,
        routed = router_report.routed,
        dropped = router_report.dropped,
        decisions = router_report.decisions,
        "Shutdown complete"
    );
    Ok(())
}
