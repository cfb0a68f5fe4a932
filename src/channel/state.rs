use crate::client::StompSession;

/// Channel lifecycle.
///
/// ```text
/// Idle -> Connecting -> SettlingCheck -> Subscribing -> Ready
///            ^               |                           |
///            +---- retry ----+------- broker error ------+
/// any -> Closed (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Idle,
    Connecting,
    SettlingCheck,
    Subscribing,
    Ready,
    Closed,
}

/// Binding of a subscription id to the topic it listens on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub id: String,
    pub topic: String,
}

/// Mutable state for a RealtimeChannel
pub struct ChannelState {
    pub status: ChannelStatus,
    pub subscription: Option<Subscription>,
    pub session: Option<StompSession>,
    /// Consecutive failures since the last successful subscribe
    pub attempts: u32,
    subscription_counter: u64,
}

impl ChannelState {
    pub fn new() -> Self {
        Self {
            status: ChannelStatus::Idle,
            subscription: None,
            session: None,
            attempts: 0,
            subscription_counter: 0,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.status == ChannelStatus::Closed
    }

    /// Moves to `next` unless the channel is already closed.
    pub fn transition(&mut self, next: ChannelStatus) -> bool {
        if self.is_closed() {
            return false;
        }
        if self.status != next {
            tracing::trace!("Channel {:?} -> {:?}", self.status, next);
            self.status = next;
        }
        true
    }

    /// Fresh id per subscribe so frames for an older subscription never match
    pub fn next_subscription_id(&mut self) -> String {
        let id = format!("sub-{}", self.subscription_counter);
        self.subscription_counter += 1;
        id
    }

    /// Enters the terminal state, handing back whatever still needs cleanup.
    pub fn close(&mut self) -> (Option<StompSession>, Option<Subscription>) {
        self.status = ChannelStatus::Closed;
        (self.session.take(), self.subscription.take())
    }
}

impl Default for ChannelState {
    fn default() -> Self {
        Self::new()
    }
}
