/// STOMP command strings (magic strings layer)
pub mod stomp_commands {
    pub const CONNECT: &str = "CONNECT";
    pub const CONNECTED: &str = "CONNECTED";
    pub const SUBSCRIBE: &str = "SUBSCRIBE";
    pub const UNSUBSCRIBE: &str = "UNSUBSCRIBE";
    pub const SEND: &str = "SEND";
    pub const MESSAGE: &str = "MESSAGE";
    pub const ERROR: &str = "ERROR";
    pub const RECEIPT: &str = "RECEIPT";
    pub const DISCONNECT: &str = "DISCONNECT";
}

/// STOMP header names
pub mod stomp_headers {
    pub const ACCEPT_VERSION: &str = "accept-version";
    pub const HOST: &str = "host";
    pub const HEART_BEAT: &str = "heart-beat";
    pub const DESTINATION: &str = "destination";
    pub const ID: &str = "id";
    pub const SUBSCRIPTION: &str = "subscription";
    pub const CONTENT_TYPE: &str = "content-type";
    pub const CONTENT_LENGTH: &str = "content-length";
    pub const MESSAGE: &str = "message";
    pub const RECEIPT_ID: &str = "receipt-id";
}

/// Supported protocol versions, sent in `accept-version`
pub const STOMP_VERSIONS: &str = "1.2,1.1";

/// Content type of every SEND body
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Topic prefix for room broadcasts
pub const TOPIC_PREFIX: &str = "/topic/room";

/// Destination prefix for actions handled by the game server
pub const APP_PREFIX: &str = "/app/room";

/// Path segment appended to the fallback transport endpoint
pub const FALLBACK_WEBSOCKET_SUFFIX: &str = "/websocket";

/// Pause between a successful connect and the liveness check (milliseconds)
pub const DEFAULT_SETTLE_DELAY: u64 = 100;

/// Fixed delay between establish attempts (milliseconds)
pub const DEFAULT_RETRY_DELAY: u64 = 500;

/// Opt-in backoff table (milliseconds)
pub const BACKOFF_INTERVALS: [u64; 5] = [500, 1000, 2000, 5000, 10000];

/// Time allowed for the WebSocket handshake plus CONNECTED (milliseconds)
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 5000;

/// Default heart-beat, both directions (milliseconds)
pub const DEFAULT_HEARTBEAT: u64 = 10000;

/// Default HTTP polling interval (milliseconds)
pub const DEFAULT_POLL_INTERVAL: u64 = 2000;

