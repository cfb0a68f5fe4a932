// Messaging module - Topics, typed room events and frame routing
pub mod event;
pub mod router;
pub mod topic;

pub use event::{
    ChatMessage, DrawingGuess, LetterGuess, MapGuess, RoomEvent, RoomStatusUpdate, TimerCommand,
};
pub use router::{FrameRouter, MessageCallback, RouteOutcome};
pub use topic::{Action, Destination, Game, Topic, TopicKind};
