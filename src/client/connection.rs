use crate::types::{RealtimeError, Result, StompFrame};
use futures::SinkExt;
use futures::stream::SplitSink;
use std::sync::Mutex;
use tokio::net::TcpStream;
use tokio::sync::{RwLock, watch};
use tokio::time::Instant;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message};

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub(crate) type WsWriter = SplitSink<WsStream, Message>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Write half of one broker connection plus its liveness.
///
/// The reader and heart-beat tasks flip the state to `Closed` when the socket
/// breaks; the channel driver watches that transition to schedule a retry.
pub struct ConnectionManager {
    ws_write: RwLock<Option<WsWriter>>,
    state: watch::Sender<ConnectionState>,
    last_inbound: Mutex<Instant>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ConnectionState::Connecting);
        Self {
            ws_write: RwLock::new(None),
            state,
            last_inbound: Mutex::new(Instant::now()),
        }
    }

    /// Sets the WebSocket write sink (called after the STOMP handshake)
    pub async fn set_writer(&self, writer: WsWriter) {
        *self.ws_write.write().await = Some(writer);
    }

    /// Gets the current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Sets the connection state, notifying watchers only on change
    pub fn set_state(&self, new_state: ConnectionState) {
        let previous = self.state.send_replace(new_state);
        if previous != new_state {
            tracing::debug!("Connection state {:?} -> {:?}", previous, new_state);
        }
    }

    /// Checks if currently connected
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    pub fn watch(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn mark_inbound(&self) {
        if let Ok(mut last) = self.last_inbound.lock() {
            *last = Instant::now();
        }
    }

    pub fn last_inbound(&self) -> Instant {
        self.last_inbound
            .lock()
            .map(|last| *last)
            .unwrap_or_else(|poisoned| *poisoned.into_inner())
    }

    /// Sends one frame. A failed write marks the connection closed.
    pub async fn send_frame(&self, frame: &StompFrame) -> Result<()> {
        self.send_text(frame.encode()).await
    }

    /// Sends a bare EOL heart-beat
    pub async fn send_heartbeat(&self) -> Result<()> {
        self.send_text("\n".to_string()).await
    }

    async fn send_text(&self, text: String) -> Result<()> {
        if !self.is_connected() {
            return Err(RealtimeError::NotConnected);
        }

        let mut ws_guard = self.ws_write.write().await;
        let Some(ws) = ws_guard.as_mut() else {
            return Err(RealtimeError::NotConnected);
        };

        if let Err(e) = ws.send(Message::Text(text.into())).await {
            drop(ws_guard);
            self.set_state(ConnectionState::Closed);
            return Err(e.into());
        }
        Ok(())
    }

    /// Sends DISCONNECT when possible and closes the socket
    pub async fn close(&self) -> Result<()> {
        if self.state() == ConnectionState::Closed {
            self.ws_write.write().await.take();
            return Ok(());
        }

        if self.is_connected()
            && let Err(e) = self.send_frame(&StompFrame::disconnect()).await
        {
            tracing::debug!("DISCONNECT not delivered: {}", e);
        }

        self.set_state(ConnectionState::Closing);
        let writer = self.ws_write.write().await.take();
        let result = match writer {
            Some(mut ws) => ws.close().await.map_err(RealtimeError::from),
            None => Ok(()),
        };
        self.set_state(ConnectionState::Closed);

        result
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_without_writer_is_not_connected() {
        let connection = ConnectionManager::new();
        assert!(!connection.is_connected());
        let result = connection.send_frame(&StompFrame::disconnect()).await;
        assert!(matches!(result, Err(RealtimeError::NotConnected)));

        // open but writer missing
        connection.set_state(ConnectionState::Open);
        let result = connection.send_heartbeat().await;
        assert!(matches!(result, Err(RealtimeError::NotConnected)));
    }

    #[tokio::test]
    async fn test_watchers_see_close() {
        let connection = ConnectionManager::new();
        connection.set_state(ConnectionState::Open);
        let mut rx = connection.watch();
        assert_eq!(*rx.borrow_and_update(), ConnectionState::Open);

        connection.close().await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), ConnectionState::Closed);
        assert_eq!(connection.state(), ConnectionState::Closed);
    }
}
