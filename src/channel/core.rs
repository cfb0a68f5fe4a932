use super::config::{ChannelEndpoints, ChannelOptions};
use super::state::{ChannelState, ChannelStatus, Subscription};
use crate::client::{ConnectionState, StompSession};
use crate::infrastructure::RetryTimer;
use crate::messaging::{Destination, FrameRouter, MessageCallback, RoomEvent, Topic};
use crate::types::{RealtimeError, Result, StompFrame};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;

/// Page callback told when the channel becomes ready
pub type ReadyCallback = Arc<dyn Fn(bool) + Send + Sync + 'static>;

/// One persistent broker connection bound to one topic.
///
/// `open` returns immediately; a background driver connects, waits out the
/// settle delay, subscribes and then calls `on_ready(true)`. Broken
/// connections are re-established in the background until
/// [`teardown`](Self::teardown) is called. Nothing in here ever returns an
/// error to the page: failures are logged and retried.
///
/// # Example
///
/// ```no_run
/// use icebreaker_realtime::{ChannelEndpoints, Game, RealtimeChannel, Topic};
///
/// # async fn example() {
/// let channel = RealtimeChannel::open(
///     ChannelEndpoints::new("http://localhost:8080/ws", "ws://localhost:8080/ws/websocket"),
///     Topic::game("ABCD", Game::Wordle).path(),
///     |message| println!("wordle update: {}", message),
///     |ready| println!("ready: {}", ready),
/// );
///
/// // ... later, when the page goes away
/// channel.teardown().await;
/// # }
/// ```
pub struct RealtimeChannel {
    inner: Arc<ChannelInner>,
    driver: JoinHandle<()>,
}

struct ChannelInner {
    session_id: String,
    topic: String,
    endpoints: ChannelEndpoints,
    options: ChannelOptions,
    state: Arc<RwLock<ChannelState>>,
    /// Flipped by teardown or drop before any lock is taken
    closed: Arc<AtomicBool>,
    on_message: MessageCallback,
    on_ready: ReadyCallback,
}

impl RealtimeChannel {
    /// Opens a channel with default [`ChannelOptions`].
    pub fn open<M, R>(
        endpoints: ChannelEndpoints,
        topic: impl Into<String>,
        on_message: M,
        on_ready: R,
    ) -> Self
    where
        M: Fn(Value) + Send + Sync + 'static,
        R: Fn(bool) + Send + Sync + 'static,
    {
        Self::open_with_options(
            endpoints,
            topic,
            on_message,
            on_ready,
            ChannelOptions::default(),
        )
    }

    /// Opens a channel and starts connecting in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open_with_options<M, R>(
        endpoints: ChannelEndpoints,
        topic: impl Into<String>,
        on_message: M,
        on_ready: R,
        options: ChannelOptions,
    ) -> Self
    where
        M: Fn(Value) + Send + Sync + 'static,
        R: Fn(bool) + Send + Sync + 'static,
    {
        let inner = Arc::new(ChannelInner {
            session_id: uuid::Uuid::new_v4().to_string(),
            topic: topic.into(),
            endpoints,
            options,
            state: Arc::new(RwLock::new(ChannelState::new())),
            closed: Arc::new(AtomicBool::new(false)),
            on_message: Arc::new(on_message),
            on_ready: Arc::new(on_ready),
        });

        tracing::info!(
            session_id = %inner.session_id,
            "Opening channel for {}",
            inner.topic
        );

        let driver = tokio::spawn(Arc::clone(&inner).run());
        Self { inner, driver }
    }

    /// Opens a channel on a room topic and hands the page typed events.
    ///
    /// Payloads are decoded with [`RoomEvent::decode`] for the topic's kind.
    pub fn open_typed<E, R>(
        endpoints: ChannelEndpoints,
        topic: Topic,
        on_event: E,
        on_ready: R,
        options: ChannelOptions,
    ) -> Self
    where
        E: Fn(RoomEvent) + Send + Sync + 'static,
        R: Fn(bool) + Send + Sync + 'static,
    {
        let kind = topic.kind();
        Self::open_with_options(
            endpoints,
            topic.path(),
            move |payload| on_event(RoomEvent::decode(kind, payload)),
            on_ready,
            options,
        )
    }

    /// Publishes `message` as JSON to `destination`.
    ///
    /// Fire-and-forget: without a live connection the message is dropped.
    /// Returns whether the frame was handed to the socket.
    pub async fn publish<T: Serialize + ?Sized>(&self, destination: &str, message: &T) -> bool {
        let connection = {
            let state = self.inner.state.read().await;
            if state.is_closed() || self.inner.closed.load(Ordering::SeqCst) {
                None
            } else {
                state.session.as_ref().map(StompSession::connection)
            }
        };

        let Some(connection) = connection.filter(|connection| connection.is_connected()) else {
            tracing::debug!(
                session_id = %self.inner.session_id,
                "Not connected, dropping publish to {}",
                destination
            );
            return false;
        };

        let body = match serde_json::to_string(message) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(
                    session_id = %self.inner.session_id,
                    "Cannot serialize message for {}: {}",
                    destination,
                    e
                );
                return false;
            }
        };

        match connection.send_frame(&StompFrame::send(destination, body)).await {
            Ok(()) => {
                tracing::debug!(session_id = %self.inner.session_id, "Published to {}", destination);
                true
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %self.inner.session_id,
                    "Publish to {} failed: {}",
                    destination,
                    e
                );
                false
            }
        }
    }

    /// [`publish`](Self::publish) to a room action
    pub async fn publish_to<T: Serialize + ?Sized>(
        &self,
        destination: &Destination,
        message: &T,
    ) -> bool {
        self.publish(&destination.path(), message).await
    }

    /// Unsubscribes, disconnects and stops the retry loop.
    ///
    /// Safe to call before the channel was ever ready, and more than once.
    /// After this returns no callback of this channel runs again.
    pub async fn teardown(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!(session_id = %self.inner.session_id, "Channel already torn down");
            return;
        }
        let leftovers = self.inner.close_state().await;
        self.driver.abort();
        self.inner.release(leftovers).await;
    }

    /// Current lifecycle state
    pub async fn status(&self) -> ChannelStatus {
        self.inner.state.read().await.status
    }

    /// Whether the subscription is live
    pub async fn is_ready(&self) -> bool {
        self.status().await == ChannelStatus::Ready
    }

    /// Consecutive failed establish attempts since the last successful subscribe
    pub async fn attempts(&self) -> u32 {
        self.inner.state.read().await.attempts
    }

    /// Active subscription, if the channel is ready
    pub async fn subscription(&self) -> Option<Subscription> {
        self.inner.state.read().await.subscription.clone()
    }

    /// URL of the live connection, if any
    pub async fn endpoint(&self) -> Option<String> {
        let state = self.inner.state.read().await;
        state
            .session
            .as_ref()
            .map(|session| session.endpoint().to_string())
    }

    /// Random id used to correlate this channel's log lines
    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    /// Topic this channel subscribes to
    pub fn topic(&self) -> &str {
        &self.inner.topic
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        self.driver.abort();
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::warn!(
            session_id = %self.inner.session_id,
            "Channel for {} dropped without teardown",
            self.inner.topic
        );

        // The session's reader keeps the state alive, so cleanup cannot be
        // left to reference counting.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let inner = Arc::clone(&self.inner);
                handle.spawn(async move {
                    let leftovers = inner.close_state().await;
                    inner.release(leftovers).await;
                });
            }
            Err(_) => {
                if let Ok(mut state) = self.inner.state.try_write() {
                    let _ = state.close();
                }
            }
        }
    }
}

impl ChannelInner {
    /// Enters `Closed`, waiting out any callback still running.
    async fn close_state(&self) -> (Option<StompSession>, Option<Subscription>) {
        let mut state = self.state.write().await;
        if state.is_closed() {
            return (None, None);
        }
        state.close()
    }

    /// Unsubscribes and disconnects whatever `close_state` handed back.
    async fn release(&self, leftovers: (Option<StompSession>, Option<Subscription>)) {
        let (session, subscription) = leftovers;
        if let Some(session) = session {
            if let Some(subscription) = subscription {
                let unsubscribe = StompFrame::unsubscribe(&subscription.id);
                if let Err(e) = session.connection().send_frame(&unsubscribe).await {
                    tracing::debug!(
                        session_id = %self.session_id,
                        "UNSUBSCRIBE not delivered: {}",
                        e
                    );
                }
            }
            session.close().await;
        }

        tracing::info!(
            session_id = %self.session_id,
            "Channel for {} torn down",
            self.topic
        );
    }

    /// Connect / settle / subscribe loop. Every step re-checks for teardown.
    async fn run(self: Arc<Self>) {
        let mut timer = RetryTimer::new(self.options.retry.clone());

        loop {
            if !self.state.write().await.transition(ChannelStatus::Connecting) {
                break;
            }

            match self.establish_and_subscribe().await {
                Ok(mut connection_state) => {
                    timer.reset();
                    wait_until_closed(&mut connection_state).await;
                    if self.is_closed().await {
                        break;
                    }
                    tracing::warn!(
                        session_id = %self.session_id,
                        "Connection for {} lost",
                        self.topic
                    );
                }
                Err(RealtimeError::Closed) => break,
                Err(e) => {
                    tracing::warn!(
                        session_id = %self.session_id,
                        "Establishing channel for {} failed (attempt {}): {}",
                        self.topic,
                        timer.attempts() + 1,
                        e
                    );
                }
            }

            if !self.discard_session().await {
                break;
            }

            if let Some(max) = self.options.max_attempts
                && timer.attempts() + 1 >= max
            {
                tracing::error!(
                    session_id = %self.session_id,
                    "Giving up on {} after {} attempts",
                    self.topic,
                    max
                );
                let (session, _) = self.state.write().await.close();
                if let Some(session) = session {
                    session.close().await;
                }
                break;
            }

            let delay = timer.next_delay();
            self.state.write().await.attempts = timer.attempts();
            tracing::info!(
                session_id = %self.session_id,
                "Reconnecting in {:?} (attempt {})",
                delay,
                timer.attempts()
            );
            tokio::time::sleep(delay).await;
        }

        tracing::debug!(session_id = %self.session_id, "Channel driver finished");
    }

    /// Connects, lets the connection settle, subscribes and reports ready.
    ///
    /// Returns a watcher on the connection state so the driver can wait for
    /// it to break.
    async fn establish_and_subscribe(&self) -> Result<watch::Receiver<ConnectionState>> {
        let router = FrameRouter::new(
            self.session_id.clone(),
            Arc::clone(&self.state),
            Arc::clone(&self.closed),
            Arc::clone(&self.on_message),
        );
        let session = StompSession::establish(&self.endpoints, &self.options, router).await?;
        let connection = session.connection();

        {
            let mut state = self.state.write().await;
            if !state.transition(ChannelStatus::SettlingCheck) {
                drop(state);
                session.close().await;
                return Err(RealtimeError::Closed);
            }
            state.session = Some(session);
        }

        tokio::time::sleep(self.options.settle_delay).await;

        if self.is_closed().await {
            return Err(RealtimeError::Closed);
        }
        if !connection.is_connected() {
            return Err(RealtimeError::Connection(
                "connection dropped during settle delay".to_string(),
            ));
        }

        // Held across SUBSCRIBE so no MESSAGE is routed before on_ready and
        // teardown cannot interleave with the ready transition.
        let mut state = self.state.write().await;
        if !state.transition(ChannelStatus::Subscribing) {
            return Err(RealtimeError::Closed);
        }

        let subscription = Subscription {
            id: state.next_subscription_id(),
            topic: self.topic.clone(),
        };
        connection
            .send_frame(&StompFrame::subscribe(&subscription.id, &subscription.topic))
            .await?;

        tracing::info!(
            session_id = %self.session_id,
            "Subscribed to {} as {}",
            subscription.topic,
            subscription.id
        );
        state.subscription = Some(subscription);
        state.attempts = 0;
        state.transition(ChannelStatus::Ready);
        (self.on_ready)(true);

        Ok(connection.watch())
    }

    /// Drops the broken session. Returns false once the channel is closed.
    async fn discard_session(&self) -> bool {
        let session = {
            let mut state = self.state.write().await;
            if state.is_closed() {
                return false;
            }
            state.subscription = None;
            state.session.take()
        };
        if let Some(session) = session {
            session.close().await;
        }
        true
    }

    async fn is_closed(&self) -> bool {
        self.state.read().await.is_closed()
    }
}

async fn wait_until_closed(connection_state: &mut watch::Receiver<ConnectionState>) {
    loop {
        if *connection_state.borrow_and_update() != ConnectionState::Open {
            return;
        }
        if connection_state.changed().await.is_err() {
            return;
        }
    }
}
