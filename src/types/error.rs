use thiserror::Error;

/// Errors raised inside the realtime layer.
///
/// None of these reach a page through [`RealtimeChannel`](crate::RealtimeChannel):
/// the channel logs them and feeds them into its retry loop. They surface
/// directly only from the lower-level pieces (frame codec, [`RoomApi`](crate::RoomApi)).
#[derive(Error, Debug)]
pub enum RealtimeError {
    /// WebSocket protocol error (connection failed, invalid frame, etc.)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// General connection error with descriptive message
    #[error("Connection error: {0}")]
    Connection(String),

    /// Malformed STOMP frame
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// ERROR frame sent by the broker
    #[error("Broker error: {0}")]
    Broker(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request error (room polling collaborator)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing error (malformed endpoint URL)
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Handshake or CONNECTED frame not received in time
    #[error("Timeout error")]
    Timeout,

    /// Attempted operation while not connected to the broker
    #[error("Not connected")]
    NotConnected,

    /// The channel was torn down while the operation was in flight
    #[error("Channel closed")]
    Closed,
}

/// Convenience type alias for `Result<T, RealtimeError>`.
pub type Result<T> = std::result::Result<T, RealtimeError>;
