use crate::infrastructure::{RetryPolicy, http_to_ws_endpoint};
use crate::types::constants::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_HEARTBEAT, DEFAULT_RETRY_DELAY, DEFAULT_SETTLE_DELAY,
};
use std::time::Duration;
use url::Url;

/// The two endpoints a channel may connect through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelEndpoints {
    /// Fallback transport endpoint (`http(s)://.../ws`, SockJS style)
    pub transport: String,
    /// Native WebSocket endpoint (`ws(s)://...`)
    pub broker: String,
}

impl ChannelEndpoints {
    pub fn new(transport: impl Into<String>, broker: impl Into<String>) -> Self {
        Self {
            transport: transport.into(),
            broker: broker.into(),
        }
    }

    /// Connection URLs in preference order: native first, fallback second.
    ///
    /// Unusable endpoints are logged and skipped.
    pub fn candidates(&self) -> Vec<String> {
        let mut urls = Vec::with_capacity(2);

        match Url::parse(&self.broker) {
            Ok(url) if matches!(url.scheme(), "ws" | "wss") => urls.push(url.to_string()),
            Ok(url) => tracing::warn!(
                "Ignoring broker endpoint with unsupported scheme '{}': {}",
                url.scheme(),
                self.broker
            ),
            Err(e) => tracing::warn!("Ignoring invalid broker endpoint '{}': {}", self.broker, e),
        }

        match http_to_ws_endpoint(&self.transport) {
            Ok(url) => {
                if !urls.contains(&url) {
                    urls.push(url);
                }
            }
            Err(e) => tracing::warn!(
                "Ignoring invalid transport endpoint '{}': {}",
                self.transport,
                e
            ),
        }

        urls
    }
}

/// Tuning for the connect / settle / retry loop.
#[derive(Debug, Clone)]
pub struct ChannelOptions {
    /// Pause between CONNECTED and the liveness check. Default: 100ms.
    pub settle_delay: Duration,
    /// Delay policy between establish attempts. Default: fixed 500ms.
    pub retry: RetryPolicy,
    /// Give up once this many establish attempts in a row have failed
    /// (`1` means no retry). Default: never.
    pub max_attempts: Option<u32>,
    /// Budget for WebSocket handshake plus CONNECTED, per endpoint. Default: 5s.
    pub connect_timeout: Duration,
    /// Requested heart-beat `(outgoing, incoming)`; zero disables a direction.
    pub heartbeat: (Duration, Duration),
    /// `host` header for CONNECT. Defaults to the endpoint host.
    pub host: Option<String>,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY),
            retry: RetryPolicy::default(),
            max_attempts: None,
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT),
            heartbeat: (
                Duration::from_millis(DEFAULT_HEARTBEAT),
                Duration::from_millis(DEFAULT_HEARTBEAT),
            ),
            host: None,
        }
    }
}

impl ChannelOptions {
    /// Defaults overridden by `ICEBREAKER_SETTLE_DELAY_MS`, `ICEBREAKER_RETRY_DELAY_MS`,
    /// `ICEBREAKER_CONNECT_TIMEOUT_MS` and `ICEBREAKER_HEARTBEAT_MS`.
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Some(ms) = env_millis("ICEBREAKER_SETTLE_DELAY_MS") {
            options.settle_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = env_millis("ICEBREAKER_RETRY_DELAY_MS") {
            options.retry = RetryPolicy::fixed_millis(ms);
        }
        if let Some(ms) = env_millis("ICEBREAKER_CONNECT_TIMEOUT_MS") {
            options.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = env_millis("ICEBREAKER_HEARTBEAT_MS") {
            options.heartbeat = (Duration::from_millis(ms), Duration::from_millis(ms));
        }
        options
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_heartbeat(mut self, outgoing: Duration, incoming: Duration) -> Self {
        self.heartbeat = (outgoing, incoming);
        self
    }

    pub fn without_heartbeat(self) -> Self {
        self.with_heartbeat(Duration::ZERO, Duration::ZERO)
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub(crate) fn heartbeat_millis(&self) -> (u64, u64) {
        (
            self.heartbeat.0.as_millis() as u64,
            self.heartbeat.1.as_millis() as u64,
        )
    }
}

fn env_millis(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(ms) => Some(ms),
        Err(_) => {
            tracing::warn!("Ignoring {}={:?}: not a number of milliseconds", name, raw);
            None
        }
    }
}
