use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use zeromq::{Socket, SocketEvent, SocketRecv, SubSocket};

use super::{FeedConnection, FeedConnector, Frames};
use crate::error::{AppError, AppResult};

fn transport_err(e: zeromq::ZmqError) -> AppError {
    AppError::Transport(e.to_string())
}

/// ZeroMQ SUB subscriber for a `(topic, payload)` publisher.
pub struct ZmqConnector {
    endpoint: String,
    topic: String,
}

impl ZmqConnector {
    pub fn new(endpoint: &str, topic: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            topic: topic.to_string(),
        }
    }
}

#[async_trait]
impl FeedConnector for ZmqConnector {
    async fn connect(&self) -> AppResult<Box<dyn FeedConnection>> {
        let mut socket = SubSocket::new();
        // Taken before connect so the peer's disconnect is never missed.
        let monitor = socket.monitor().boxed();
        socket.connect(&self.endpoint).await.map_err(transport_err)?;
        socket.subscribe(&self.topic).await.map_err(transport_err)?;
        Ok(Box::new(ZmqConnection {
            socket: Some(socket),
            monitor: Some(monitor),
        }))
    }

    fn describe(&self) -> String {
        format!("zmq {} (topic '{}')", self.endpoint, self.topic)
    }
}

/// The SUB socket does not surface a vanished publisher through `recv`, so
/// the socket monitor is watched alongside it.
struct ZmqConnection {
    socket: Option<SubSocket>,
    monitor: Option<BoxStream<'static, SocketEvent>>,
}

#[async_trait]
impl FeedConnection for ZmqConnection {
    async fn recv(&mut self) -> AppResult<Frames> {
        let Self { socket, monitor } = self;
        let socket = socket
            .as_mut()
            .ok_or_else(|| AppError::Transport("socket already closed".to_string()))?;

        loop {
            let Some(events) = monitor.as_mut() else {
                let msg = socket.recv().await.map_err(transport_err)?;
                return Ok(msg.into_vec().into_iter().map(|frame| frame.to_vec()).collect());
            };
            let mut monitor_closed = false;
            tokio::select! {
                msg = socket.recv() => {
                    let msg = msg.map_err(transport_err)?;
                    return Ok(msg.into_vec().into_iter().map(|frame| frame.to_vec()).collect());
                }
                event = events.next() => match event {
                    Some(SocketEvent::Disconnected(_)) => {
                        return Err(AppError::Transport("publisher disconnected".to_string()));
                    }
                    Some(other) => tracing::debug!(event = ?other, "ZMQ socket event"),
                    None => monitor_closed = true,
                },
            }
            if monitor_closed {
                *monitor = None;
            }
        }
    }

    async fn close(&mut self) {
        self.monitor = None;
        if let Some(socket) = self.socket.take() {
            for e in socket.close().await {
                tracing::debug!(error = %e, "Error while closing ZMQ socket");
            }
        }
    }
}
