//! # Icebreaker Realtime
//!
//! Realtime room channel for the icebreaker party games (Wordle, Hangman,
//! Geoguesser, Pictionary, timers and chat): STOMP publish/subscribe over a
//! WebSocket, with a self-healing connect / settle / subscribe loop and
//! teardown that never lets a callback fire into a discarded page.
//!
//! ## Example
//!
//! ```no_run
//! use icebreaker_realtime::{
//!     Action, ChannelEndpoints, ChannelOptions, Destination, Game, RealtimeChannel, Topic,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let channel = RealtimeChannel::open_typed(
//!         ChannelEndpoints::new("http://localhost:8080/ws", "ws://localhost:8080/ws/websocket"),
//!         Topic::game("ABCD", Game::Hangman),
//!         |event| println!("hangman: {:?}", event),
//!         |ready| println!("ready: {}", ready),
//!         ChannelOptions::default(),
//!     );
//!
//!     channel
//!         .publish_to(
//!             &Destination::new("ABCD", Action::Hangman),
//!             &serde_json::json!({ "letter": "e" }),
//!         )
//!         .await;
//!
//!     channel.teardown().await;
//! }
//! ```

pub mod channel;
pub mod client;
pub mod infrastructure;
pub mod messaging;
pub mod types;
pub mod websocket;

pub use channel::{ChannelEndpoints, ChannelOptions, ChannelStatus, RealtimeChannel};
pub use infrastructure::{
    RetryPolicy, RoomApi, RoomPoller, RoomSnapshot, RoomState, RoomStatusTracker, UpdateSource,
};
pub use messaging::{
    Action, ChatMessage, Destination, DrawingGuess, Game, LetterGuess, MapGuess, RoomEvent,
    RoomStatusUpdate, TimerCommand, Topic, TopicKind,
};
pub use types::{RealtimeError, Result, StompFrame};
