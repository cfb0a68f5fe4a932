use crate::infrastructure::http::RoomApi;
use crate::messaging::event::{RoomEvent, RoomStatusUpdate};
use crate::types::constants::DEFAULT_POLL_INTERVAL;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;

/// Which side reported the latest room change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateSource {
    Push,
    Poll,
}

/// The one observable view of a room, fed by both push and poll.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomState {
    pub status: Option<String>,
    pub game: Option<String>,
    pub players: Vec<String>,
    pub source: Option<UpdateSource>,
    /// Bumped on every effective change
    pub revision: u64,
}

/// What one HTTP poll returns
#[derive(Debug, Clone, PartialEq)]
pub struct RoomSnapshot {
    pub status: RoomStatusUpdate,
    pub players: Vec<String>,
}

/// Reconciles push events and poll snapshots into one [`RoomState`].
///
/// Pages react to `watch` transitions instead of re-deriving the room phase
/// from each source. Updates that change nothing are swallowed and do not
/// wake watchers.
pub struct RoomStatusTracker {
    tx: watch::Sender<RoomState>,
}

impl RoomStatusTracker {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(RoomState::default());
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<RoomState> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> RoomState {
        self.tx.borrow().clone()
    }

    /// Applies a pushed event. Returns whether the state changed.
    pub fn apply_push(&self, event: &RoomEvent) -> bool {
        match event {
            RoomEvent::Status(update) => self.apply(UpdateSource::Push, Some(update), None),
            RoomEvent::Roster(players) => self.apply(UpdateSource::Push, None, Some(players)),
            _ => false,
        }
    }

    /// Applies a polled snapshot. Returns whether the state changed.
    pub fn apply_poll(&self, snapshot: &RoomSnapshot) -> bool {
        self.apply(
            UpdateSource::Poll,
            Some(&snapshot.status),
            Some(&snapshot.players),
        )
    }

    fn apply(
        &self,
        source: UpdateSource,
        status: Option<&RoomStatusUpdate>,
        players: Option<&Vec<String>>,
    ) -> bool {
        let changed = self.tx.send_if_modified(|state| {
            let mut changed = false;
            if let Some(update) = status {
                if state.status.as_deref() != Some(update.status.as_str()) {
                    state.status = Some(update.status.clone());
                    changed = true;
                }
                if update.game.is_some() && state.game != update.game {
                    state.game = update.game.clone();
                    changed = true;
                }
            }
            if let Some(players) = players
                && &state.players != players
            {
                state.players = players.clone();
                changed = true;
            }
            if changed {
                state.source = Some(source);
                state.revision += 1;
            }
            changed
        });

        if changed {
            let state = self.tx.borrow();
            tracing::debug!(
                "Room state r{} from {:?}: status={:?} players={}",
                state.revision,
                source,
                state.status,
                state.players.len()
            );
        }
        changed
    }
}

impl Default for RoomStatusTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-interval HTTP poll feeding a [`RoomStatusTracker`].
///
/// Dropping the poller stops it.
pub struct RoomPoller {
    handle: JoinHandle<()>,
}

impl RoomPoller {
    pub fn default_interval() -> Duration {
        Duration::from_millis(DEFAULT_POLL_INTERVAL)
    }

    pub fn spawn(
        api: RoomApi,
        room_code: impl Into<String>,
        interval: Duration,
        tracker: Arc<RoomStatusTracker>,
    ) -> Self {
        let room_code = room_code.into();
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                match api.snapshot(&room_code).await {
                    Ok(snapshot) => {
                        tracker.apply_poll(&snapshot);
                    }
                    Err(e) => {
                        tracing::warn!("Polling room {} failed: {}", room_code, e);
                    }
                }
            }
        });
        Self { handle }
    }

    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for RoomPoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
