//! WebSocket transport to a ledger node
//!
//! Requests are numbered; responses are matched by id and any stream
//! messages in between (ledger closes, stale responses of abandoned
//! requests) are skipped.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use crate::error::{GatewayError, GatewayResult};
use crate::transport::{build_request, parse_response, response_id, LedgerTransport};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// JSON-over-WebSocket connection to a `ws://` or `wss://` node
pub struct WebSocketTransport {
    url: String,
    stream: Option<WsStream>,
    next_id: u64,
}

impl WebSocketTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            stream: None,
            next_id: 1,
        }
    }
}

#[async_trait]
impl LedgerTransport for WebSocketTransport {
    fn endpoint(&self) -> &str {
        &self.url
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    async fn open(&mut self) -> GatewayResult<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let (stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| GatewayError::Transport(format!("{}: {}", self.url, e)))?;

        debug!(url = %self.url, "WebSocket connection established");
        self.stream = Some(stream);
        Ok(())
    }

    async fn close(&mut self) -> GatewayResult<()> {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.close(None).await {
                debug!(url = %self.url, error = %e, "WebSocket close handshake failed");
            }
        }
        Ok(())
    }

    async fn request(&mut self, command: &str, params: Value) -> GatewayResult<Value> {
        let id = self.next_id;
        self.next_id += 1;
        let body = build_request(id, command, params)?;

        let result = match self.stream.as_mut() {
            Some(stream) => exchange(stream, id, body).await,
            None => return Err(GatewayError::NotConnected),
        };

        // A broken socket is not reusable; the next call reconnects.
        if matches!(result, Err(GatewayError::Transport(_))) {
            self.stream = None;
        }
        result
    }
}

async fn exchange(stream: &mut WsStream, id: u64, body: Value) -> GatewayResult<Value> {
    stream
        .send(Message::Text(body.to_string()))
        .await
        .map_err(|e| GatewayError::Transport(e.to_string()))?;

    while let Some(frame) = stream.next().await {
        let frame = frame.map_err(|e| GatewayError::Transport(e.to_string()))?;
        let text = match frame {
            Message::Text(text) => text,
            Message::Binary(bytes) => {
                String::from_utf8(bytes).map_err(|e| GatewayError::protocol(e.to_string()))?
            }
            Message::Close(_) => {
                return Err(GatewayError::Transport(
                    "connection closed by ledger node".to_string(),
                ))
            }
            _ => continue,
        };

        let message: Value =
            serde_json::from_str(&text).map_err(|e| GatewayError::protocol(e.to_string()))?;

        match response_id(&message) {
            Some(received) if received == id => return parse_response(message),
            _ => trace!(expected = id, "Skipping unrelated ledger message"),
        }
    }

    Err(GatewayError::Transport("connection closed".to_string()))
}
