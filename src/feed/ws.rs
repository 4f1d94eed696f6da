use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::{tungstenite, MaybeTlsStream, WebSocketStream};

use super::{FeedConnection, FeedConnector, Frames};
use crate::error::{AppError, AppResult};

/// Direct WebSocket trade stream (e.g. `wss://stream.binance.com:9443/ws/btcusdt@trade`).
/// Each text frame is delivered under the configured topic.
pub struct WsConnector {
    url: String,
    topic: String,
}

impl WsConnector {
    pub fn new(url: &str, topic: &str) -> Self {
        Self {
            url: url.to_string(),
            topic: topic.to_string(),
        }
    }
}

#[async_trait]
impl FeedConnector for WsConnector {
    async fn connect(&self) -> AppResult<Box<dyn FeedConnection>> {
        let (stream, _resp) = tokio_tungstenite::connect_async(&self.url)
            .await
            .map_err(|e| AppError::Transport(format!("WebSocket connect failed: {}", e)))?;
        Ok(Box::new(WsConnection {
            stream,
            topic: self.topic.clone().into_bytes(),
        }))
    }

    fn describe(&self) -> String {
        format!("ws {}", self.url)
    }
}

struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    topic: Vec<u8>,
}

#[async_trait]
impl FeedConnection for WsConnection {
    async fn recv(&mut self) -> AppResult<Frames> {
        loop {
            match self.stream.next().await {
                Some(Ok(tungstenite::Message::Text(text))) => {
                    return Ok(vec![self.topic.clone(), text.into_bytes()]);
                }
                Some(Ok(tungstenite::Message::Binary(bytes))) => {
                    return Ok(vec![self.topic.clone(), bytes]);
                }
                Some(Ok(tungstenite::Message::Close(_))) => {
                    return Err(AppError::Transport("server closed the stream".to_string()));
                }
                // tokio-tungstenite answers pings itself
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    return Err(AppError::Transport(format!("WebSocket read error: {}", e)));
                }
                None => return Err(AppError::Transport("WebSocket stream ended".to_string())),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!(error = %e, "Error while closing WebSocket");
        }
    }
}
