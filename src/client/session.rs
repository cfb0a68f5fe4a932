use super::connection::{ConnectionManager, ConnectionState, WsStream, WsWriter};
use crate::channel::{ChannelEndpoints, ChannelOptions};
use crate::infrastructure::{HeartbeatManager, TaskManager, heartbeat};
use crate::messaging::router::{FrameRouter, RouteOutcome, describe_error};
use crate::types::constants::{stomp_commands, stomp_headers};
use crate::types::{RealtimeError, Result, StompFrame};
use crate::websocket::WebSocketFactory;
use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::time;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

/// Result of a successful WebSocket + STOMP CONNECT exchange
struct Handshake {
    writer: WsWriter,
    reader: SplitStream<WsStream>,
    heartbeat: (u64, u64),
    version: Option<String>,
}

/// One live STOMP connection with its reader and heart-beat tasks.
///
/// Dropping the session aborts its tasks; [`close`](Self::close) additionally
/// says DISCONNECT and closes the socket.
pub struct StompSession {
    endpoint: String,
    connection: Arc<ConnectionManager>,
    tasks: TaskManager,
}

impl StompSession {
    /// Tries each candidate endpoint in order and returns the first session
    /// whose broker answered CONNECTED.
    pub async fn establish(
        endpoints: &ChannelEndpoints,
        options: &ChannelOptions,
        router: FrameRouter,
    ) -> Result<Self> {
        let candidates = endpoints.candidates();
        if candidates.is_empty() {
            return Err(RealtimeError::Connection("no usable endpoint".to_string()));
        }

        let mut last_error = None;
        for url in candidates {
            match time::timeout(options.connect_timeout, handshake(&url, options)).await {
                Ok(Ok(handshake)) => return Ok(Self::start(url, handshake, router).await),
                Ok(Err(e)) => {
                    tracing::debug!("Endpoint {} failed: {}", url, e);
                    last_error = Some(e);
                }
                Err(_) => {
                    tracing::debug!(
                        "Endpoint {} did not answer within {:?}",
                        url,
                        options.connect_timeout
                    );
                    last_error = Some(RealtimeError::Timeout);
                }
            }
        }

        Err(last_error.unwrap_or(RealtimeError::NotConnected))
    }

    async fn start(endpoint: String, handshake: Handshake, router: FrameRouter) -> Self {
        let connection = Arc::new(ConnectionManager::new());
        connection.set_writer(handshake.writer).await;
        connection.mark_inbound();
        connection.set_state(ConnectionState::Open);

        tracing::info!(
            "Connected to {} (STOMP {}, heart-beat {:?})",
            endpoint,
            handshake.version.as_deref().unwrap_or("1.0"),
            handshake.heartbeat
        );

        let mut tasks = TaskManager::new(endpoint.clone());
        tasks.spawn(read_loop(
            handshake.reader,
            Arc::clone(&connection),
            router,
        ));

        let heartbeat = HeartbeatManager::new(Arc::downgrade(&connection), handshake.heartbeat);
        if heartbeat.is_enabled() {
            tasks.spawn(heartbeat.run());
        }

        Self {
            endpoint,
            connection,
            tasks,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn connection(&self) -> Arc<ConnectionManager> {
        Arc::clone(&self.connection)
    }

    /// DISCONNECT, close the socket and stop the background tasks
    pub async fn close(mut self) {
        if let Err(e) = self.connection.close().await {
            tracing::debug!("Closing {} failed: {}", self.endpoint, e);
        }
        self.tasks.abort_all();
    }
}

async fn handshake(url: &str, options: &ChannelOptions) -> Result<Handshake> {
    let ws_stream = WebSocketFactory::create(url).await?;
    let (mut writer, mut reader) = ws_stream.split();

    let host = options
        .host
        .clone()
        .or_else(|| {
            Url::parse(url)
                .ok()
                .and_then(|parsed| parsed.host_str().map(str::to_string))
        })
        .unwrap_or_else(|| "localhost".to_string());
    let requested = options.heartbeat_millis();

    let connect = StompFrame::connect(&host, requested);
    writer.send(Message::Text(connect.encode().into())).await?;

    while let Some(message) = reader.next().await {
        match message? {
            Message::Text(text) => match StompFrame::decode(text.as_str())? {
                None => continue,
                Some(frame) if frame.is(stomp_commands::CONNECTED) => {
                    let offered = heartbeat::parse_header(frame.header(stomp_headers::HEART_BEAT));
                    return Ok(Handshake {
                        writer,
                        reader,
                        heartbeat: heartbeat::negotiate(requested, offered),
                        version: frame.header("version").map(str::to_string),
                    });
                }
                Some(frame) if frame.is(stomp_commands::ERROR) => {
                    return Err(RealtimeError::Broker(describe_error(&frame)));
                }
                Some(frame) => {
                    return Err(RealtimeError::Protocol(format!(
                        "expected CONNECTED, got {}",
                        frame.command
                    )));
                }
            },
            Message::Close(frame) => {
                return Err(RealtimeError::Connection(format!(
                    "closed during handshake: {:?}",
                    frame
                )));
            }
            _ => continue,
        }
    }

    Err(RealtimeError::Connection(
        "stream ended during handshake".to_string(),
    ))
}

/// Reads frames until the socket breaks or the broker reports an error,
/// then marks the connection closed.
async fn read_loop(
    mut reader: SplitStream<WsStream>,
    connection: Arc<ConnectionManager>,
    router: FrameRouter,
) {
    tracing::debug!("Starting read task");
    while let Some(msg_result) = reader.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                connection.mark_inbound();
                match StompFrame::decode(text.as_str()) {
                    Ok(None) => tracing::trace!("Received heart-beat"),
                    Ok(Some(frame)) => {
                        if let RouteOutcome::BrokerError(message) = router.route(frame).await {
                            tracing::warn!("Dropping connection after broker error: {}", message);
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Skipping malformed frame: {} - Raw: {:?}", e, text.as_str());
                    }
                }
            }
            Ok(Message::Close(frame)) => {
                if let Some(close_frame) = frame {
                    tracing::warn!(
                        "Server closed connection: code={:?}, reason='{}'",
                        close_frame.code,
                        close_frame.reason
                    );
                } else {
                    tracing::warn!("Server closed connection without close frame");
                }
                break;
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => connection.mark_inbound(),
            Ok(Message::Binary(data)) => {
                tracing::warn!("Received unexpected binary message ({} bytes)", data.len());
            }
            Ok(Message::Frame(_)) => {}
            Err(e) => {
                tracing::warn!("WebSocket read error: {}", e);
                break;
            }
        }
    }
    connection.set_state(ConnectionState::Closed);
    tracing::debug!("Read task finished");
}
