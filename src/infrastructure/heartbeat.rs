use crate::client::connection::{ConnectionManager, ConnectionState};
use std::sync::Weak;
use std::time::Duration;
use tokio::time::{self, Instant};

/// Negotiates STOMP heart-beats from what we asked and what the broker offered.
///
/// Both tuples are `(outgoing, incoming)` from their sender's point of view,
/// in milliseconds. The result is ours: `(send every, expect every)`.
pub fn negotiate(client: (u64, u64), server: (u64, u64)) -> (u64, u64) {
    let outgoing = if client.0 == 0 || server.1 == 0 {
        0
    } else {
        client.0.max(server.1)
    };
    let incoming = if client.1 == 0 || server.0 == 0 {
        0
    } else {
        client.1.max(server.0)
    };
    (outgoing, incoming)
}

/// Parses a `heart-beat` header value, treating anything malformed as `0,0`.
pub fn parse_header(value: Option<&str>) -> (u64, u64) {
    let Some((sx, sy)) = value.and_then(|raw| raw.split_once(',')) else {
        return (0, 0);
    };
    (
        sx.trim().parse().unwrap_or(0),
        sy.trim().parse().unwrap_or(0),
    )
}

/// Sends EOL heart-beats and watches for broker silence.
pub struct HeartbeatManager {
    connection: Weak<ConnectionManager>,
    outgoing: Duration,
    incoming: Duration,
}

impl HeartbeatManager {
    pub fn new(connection: Weak<ConnectionManager>, negotiated: (u64, u64)) -> Self {
        Self {
            connection,
            outgoing: Duration::from_millis(negotiated.0),
            incoming: Duration::from_millis(negotiated.1),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.outgoing.is_zero() || !self.incoming.is_zero()
    }

    /// Incoming silence tolerated before the connection is declared dead
    fn stale_after(&self) -> Duration {
        self.incoming * 2
    }

    fn tick_period(&self) -> Duration {
        match (self.outgoing.is_zero(), self.incoming.is_zero()) {
            (false, false) => self.outgoing.min(self.incoming),
            (false, true) => self.outgoing,
            _ => self.incoming,
        }
    }

    /// Runs until the connection closes or is dropped
    pub async fn run(self) {
        if !self.is_enabled() {
            return;
        }

        let mut ticker = time::interval(self.tick_period());
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
        let mut last_sent = Instant::now();

        loop {
            ticker.tick().await;

            // Connection dropped, exit heartbeat task
            let Some(connection) = self.connection.upgrade() else {
                break;
            };
            if !connection.is_connected() {
                break;
            }

            if !self.incoming.is_zero() && connection.last_inbound().elapsed() > self.stale_after()
            {
                tracing::warn!(
                    "[Heartbeat] No data from broker for {:?}, closing connection",
                    self.stale_after()
                );
                connection.set_state(ConnectionState::Closed);
                break;
            }

            if !self.outgoing.is_zero() && last_sent.elapsed() >= self.outgoing {
                match connection.send_heartbeat().await {
                    Ok(()) => {
                        last_sent = Instant::now();
                        tracing::trace!("[Heartbeat] Sent");
                    }
                    Err(e) => {
                        tracing::error!("[Heartbeat] Failed to send: {}", e);
                        break;
                    }
                }
            }
        }
    }
}
