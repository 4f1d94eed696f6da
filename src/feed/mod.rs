pub mod backoff;
pub mod ws;
pub mod zmq;

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use self::backoff::ExponentialBackoff;
use crate::config::{FeedConfig, FeedTransport};
use crate::error::{AppError, AppResult};

pub use self::ws::WsConnector;
pub use self::zmq::ZmqConnector;

/// Raw message frames as received: `[topic, payload, ..]`.
pub type Frames = Vec<Vec<u8>>;

/// One live subscription. Dropping it releases the underlying socket; `close`
/// does so explicitly.
#[async_trait]
pub trait FeedConnection: Send {
    async fn recv(&mut self) -> AppResult<Frames>;

    async fn close(&mut self) {}
}

/// Opens and subscribes fresh connections to the tick publisher.
#[async_trait]
pub trait FeedConnector: Send + Sync {
    async fn connect(&self) -> AppResult<Box<dyn FeedConnection>>;

    fn describe(&self) -> String;
}

pub fn connector_from_config(config: &FeedConfig) -> Box<dyn FeedConnector> {
    match config.transport {
        FeedTransport::Zmq => Box::new(ZmqConnector::new(&config.endpoint, &config.topic)),
        FeedTransport::Ws => Box::new(WsConnector::new(&config.endpoint, &config.topic)),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub connect_attempts: u64,
    pub connects: u64,
    /// Attempts made after a transport failure.
    pub reconnects: u64,
    pub delivered: u64,
    pub malformed: u64,
    /// Messages whose topic frame did not equal the subscribed topic.
    pub foreign_topic: u64,
}

enum PumpExit {
    Shutdown,
    DownstreamClosed,
    Transport(AppError),
}

/// Keeps a subscription alive and forwards decoded JSON payloads in arrival order.
pub struct StreamIngestor {
    connector: Box<dyn FeedConnector>,
    topic: String,
    poll_interval: Duration,
    idle_timeout: Option<Duration>,
    reconnect_initial: Duration,
    reconnect_max: Duration,
}

impl StreamIngestor {
    pub fn new(connector: Box<dyn FeedConnector>, config: &FeedConfig) -> Self {
        Self {
            connector,
            topic: config.topic.clone(),
            poll_interval: config.poll_interval(),
            idle_timeout: config.idle_timeout(),
            reconnect_initial: config.reconnect_initial(),
            reconnect_max: config.reconnect_max(),
        }
    }

    /// Run until shutdown is requested or the receiver side is dropped.
    /// Transport faults never end the loop; they trigger a paused reconnect.
    pub async fn run(
        &self,
        out: mpsc::Sender<serde_json::Value>,
        mut shutdown: watch::Receiver<bool>,
    ) -> IngestReport {
        let mut backoff = ExponentialBackoff::new(self.reconnect_initial, self.reconnect_max, 2.0);
        let mut report = IngestReport::default();
        let mut failed = false;

        loop {
            if *shutdown.borrow() {
                break;
            }
            report.connect_attempts += 1;
            if failed {
                report.reconnects += 1;
            }
            tracing::info!(target_feed = %self.connector.describe(), "Connecting to tick publisher");

            let connected = tokio::select! {
                res = self.connector.connect() => res,
                _ = shutdown.changed() => break,
            };

            match connected {
                Ok(mut conn) => {
                    report.connects += 1;
                    backoff.reset();
                    tracing::info!(topic = %self.topic, "Link established");

                    let exit = self.pump(conn.as_mut(), &out, &mut shutdown, &mut report).await;
                    conn.close().await;
                    match exit {
                        PumpExit::Shutdown => break,
                        PumpExit::DownstreamClosed => {
                            tracing::info!("Downstream closed, ingestor exiting");
                            break;
                        }
                        PumpExit::Transport(e) => {
                            tracing::warn!(error = %e, "Feed transport error, reconnecting");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Feed connect failed");
                }
            }

            failed = true;
            let delay = backoff.next_delay();
            tracing::info!(delay_ms = delay.as_millis() as u64, "Waiting before resubscribe");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => break,
            }
        }

        tracing::info!(
            delivered = report.delivered,
            malformed = report.malformed,
            reconnects = report.reconnects,
            "Feed disconnected"
        );
        report
    }

    async fn pump(
        &self,
        conn: &mut dyn FeedConnection,
        out: &mpsc::Sender<serde_json::Value>,
        shutdown: &mut watch::Receiver<bool>,
        report: &mut IngestReport,
    ) -> PumpExit {
        let mut last_frame = Instant::now();
        loop {
            if *shutdown.borrow() {
                return PumpExit::Shutdown;
            }
            let polled = tokio::select! {
                biased;
                _ = shutdown.changed() => return PumpExit::Shutdown,
                res = tokio::time::timeout(self.poll_interval, conn.recv()) => res,
            };
            let frames = match polled {
                // Poll window elapsed with nothing to read.
                Err(_) => match self.idle_timeout {
                    Some(limit) if last_frame.elapsed() >= limit => {
                        return PumpExit::Transport(AppError::Transport(format!(
                            "no data for {} ms",
                            limit.as_millis()
                        )));
                    }
                    _ => continue,
                },
                Ok(Err(e)) => return PumpExit::Transport(e),
                Ok(Ok(frames)) => frames,
            };
            last_frame = Instant::now();

            let Some(value) = self.decode(frames, report) else {
                continue;
            };
            if out.send(value).await.is_err() {
                return PumpExit::DownstreamClosed;
            }
            report.delivered += 1;
        }
    }

    fn decode(&self, frames: Frames, report: &mut IngestReport) -> Option<serde_json::Value> {
        let mut frames = frames.into_iter();
        let (Some(topic), Some(payload)) = (frames.next(), frames.next()) else {
            tracing::warn!("Expected (topic, payload) message, dropping");
            report.malformed += 1;
            return None;
        };

        let (Ok(topic), Ok(payload)) = (std::str::from_utf8(&topic), std::str::from_utf8(&payload))
        else {
            tracing::warn!("Non UTF-8 frame received, dropping");
            report.malformed += 1;
            return None;
        };
        if topic != self.topic {
            report.foreign_topic += 1;
            return None;
        }

        match serde_json::from_str(payload) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(error = %e, "Malformed JSON received on feed");
                report.malformed += 1;
                None
            }
        }
    }
}
