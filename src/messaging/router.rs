use crate::channel::{ChannelState, ChannelStatus};
use crate::types::constants::{stomp_commands, stomp_headers};
use crate::types::StompFrame;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// Page callback receiving each decoded message body
pub type MessageCallback = Arc<dyn Fn(Value) + Send + Sync + 'static>;

/// What happened to one inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    Delivered,
    Dropped,
    /// ERROR frame; the connection must be treated as broken
    BrokerError(String),
    Ignored,
}

/// Routes inbound frames of one connection to its channel's callback
pub struct FrameRouter {
    session_id: String,
    state: Arc<RwLock<ChannelState>>,
    /// Set once the owning channel is torn down or dropped
    closed: Arc<AtomicBool>,
    on_message: MessageCallback,
}

impl FrameRouter {
    pub fn new(
        session_id: impl Into<String>,
        state: Arc<RwLock<ChannelState>>,
        closed: Arc<AtomicBool>,
        on_message: MessageCallback,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            state,
            closed,
            on_message,
        }
    }

    pub async fn route(&self, frame: StompFrame) -> RouteOutcome {
        match frame.command.as_str() {
            stomp_commands::MESSAGE => self.deliver(&frame).await,
            stomp_commands::ERROR => {
                let message = describe_error(&frame);
                tracing::error!(session_id = %self.session_id, "Broker error: {}", message);
                RouteOutcome::BrokerError(message)
            }
            stomp_commands::RECEIPT => {
                tracing::debug!(
                    session_id = %self.session_id,
                    "Receipt {}",
                    frame.header(stomp_headers::RECEIPT_ID).unwrap_or("-")
                );
                RouteOutcome::Ignored
            }
            other => {
                tracing::warn!(session_id = %self.session_id, "Unexpected {} frame", other);
                RouteOutcome::Ignored
            }
        }
    }

    /// Delivers a MESSAGE while holding the state lock, so a concurrent
    /// teardown either runs before (and the message is dropped) or waits
    /// for the callback to return.
    async fn deliver(&self, frame: &StompFrame) -> RouteOutcome {
        let state = self.state.read().await;
        if self.closed.load(Ordering::SeqCst) || state.status == ChannelStatus::Closed {
            tracing::debug!(session_id = %self.session_id, "Channel closed, dropping message");
            return RouteOutcome::Dropped;
        }

        let Some(subscription) = state.subscription.as_ref() else {
            tracing::debug!(session_id = %self.session_id, "No active subscription, dropping message");
            return RouteOutcome::Dropped;
        };

        if frame.header(stomp_headers::SUBSCRIPTION) != Some(subscription.id.as_str()) {
            tracing::debug!(
                session_id = %self.session_id,
                "Message for stale subscription {:?}, dropping",
                frame.header(stomp_headers::SUBSCRIPTION)
            );
            return RouteOutcome::Dropped;
        }

        match serde_json::from_str::<Value>(&frame.body) {
            Ok(payload) => {
                tracing::debug!(
                    session_id = %self.session_id,
                    "Delivering message on {}",
                    subscription.topic
                );
                (self.on_message)(payload);
                RouteOutcome::Delivered
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %self.session_id,
                    "Dropping undecodable message on {}: {} - Raw: {}",
                    subscription.topic,
                    e,
                    frame.body
                );
                RouteOutcome::Dropped
            }
        }
    }
}

/// Human-readable summary of an ERROR frame
pub fn describe_error(frame: &StompFrame) -> String {
    let message = frame.header(stomp_headers::MESSAGE).unwrap_or("unspecified");
    if frame.body.trim().is_empty() {
        message.to_string()
    } else {
        format!("{} ({})", message, frame.body.trim())
    }
}
