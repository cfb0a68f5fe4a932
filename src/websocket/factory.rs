use crate::client::connection::WsStream;
use crate::types::Result;
use tokio_tungstenite::connect_async;

/// WebSocket factory for creating broker connections
pub struct WebSocketFactory;

impl WebSocketFactory {
    /// Performs the WebSocket handshake against `url`
    pub async fn create(url: &str) -> Result<WsStream> {
        tracing::debug!("Creating WebSocket connection to: {}", url);
        let (ws_stream, response) = connect_async(url).await?;
        tracing::debug!("WebSocket handshake completed with status {}", response.status());
        Ok(ws_stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RealtimeError;
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::error::{Error as WsError, UrlError};

    #[tokio::test]
    async fn test_secure_endpoint_attempts_tls() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // accept and hang up before any TLS handshake completes
            while let Ok((stream, _)) = listener.accept().await {
                drop(stream);
            }
        });

        let result = WebSocketFactory::create(&format!("wss://{}/ws", addr)).await;
        assert!(result.is_err());
        assert!(!matches!(
            result,
            Err(RealtimeError::WebSocket(WsError::Url(
                UrlError::TlsFeatureNotEnabled
            )))
        ));
    }
}
