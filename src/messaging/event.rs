use super::topic::{Game, TopicKind};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Chat line on the legacy room topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: String,
    pub content: String,
}

/// Room or game phase announced by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomStatusUpdate {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game: Option<String>,
}

/// Wordle / Hangman guess update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LetterGuess {
    #[serde(alias = "guess")]
    pub letter: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct: Option<bool>,
}

/// Pictionary guess typed by a player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingGuess {
    pub guess: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<String>,
}

/// Geoguesser pin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapGuess {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<String>,
}

/// Commands and ticks on the timer topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerCommand {
    Start { seconds: u64 },
    Modify { seconds: u64 },
    Stop,
    Tick { remaining: u64 },
}

impl TimerCommand {
    /// Body sent to `startTimer` / `modifyTimer` / `stopTimer`.
    pub fn to_payload(&self) -> Value {
        match self {
            Self::Start { seconds } => serde_json::json!({ "action": "start", "seconds": seconds }),
            Self::Modify { seconds } => {
                serde_json::json!({ "action": "modify", "seconds": seconds })
            }
            Self::Stop => serde_json::json!({ "action": "stop" }),
            Self::Tick { remaining } => serde_json::json!({ "remaining": remaining }),
        }
    }

    fn from_payload(payload: &Value) -> Option<Self> {
        if let Some(action) = payload.get("action").and_then(Value::as_str) {
            let seconds = payload
                .get("seconds")
                .or_else(|| payload.get("duration"))
                .and_then(Value::as_u64);
            return match action.to_ascii_lowercase().as_str() {
                "start" => Some(Self::Start {
                    seconds: seconds?,
                }),
                "modify" => Some(Self::Modify {
                    seconds: seconds?,
                }),
                "stop" => Some(Self::Stop),
                _ => None,
            };
        }
        payload
            .get("remaining")
            .and_then(Value::as_u64)
            .map(|remaining| Self::Tick { remaining })
    }
}

/// Typed view of an inbound room payload.
///
/// The backend sends untagged JSON; each topic kind has exactly one decoder
/// below that probes for distinguishing fields. Anything unrecognised ends
/// up in [`RoomEvent::Unknown`].
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    Chat(ChatMessage),
    Status(RoomStatusUpdate),
    Roster(Vec<String>),
    Stroke(Value),
    DrawingGuess(DrawingGuess),
    ClearCanvas,
    LetterGuess(LetterGuess),
    MapGuess(MapGuess),
    Timer(TimerCommand),
    Unknown(Value),
}

impl RoomEvent {
    pub fn decode(kind: TopicKind, payload: Value) -> Self {
        let decoded = match kind {
            TopicKind::Room => decode_room(&payload),
            TopicKind::Wait => decode_wait(&payload),
            TopicKind::Game(Game::Drawing) => decode_drawing(&payload),
            TopicKind::Game(Game::Wordle | Game::Hangman) => decode_letter_game(&payload),
            TopicKind::Game(Game::Geoguesser) => decode_geoguesser(&payload),
            TopicKind::Game(Game::Timer) => TimerCommand::from_payload(&payload).map(Self::Timer),
        };

        decoded.unwrap_or_else(|| {
            tracing::warn!(
                "Unrecognised payload for {:?} topic, dropping: {}",
                kind,
                payload
            );
            Self::Unknown(payload)
        })
    }

    pub fn status(&self) -> Option<&RoomStatusUpdate> {
        match self {
            Self::Status(update) => Some(update),
            _ => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }
}

fn has(payload: &Value, field: &str) -> bool {
    payload.get(field).is_some_and(|value| !value.is_null())
}

fn parse<T: DeserializeOwned>(payload: &Value) -> Option<T> {
    serde_json::from_value(payload.clone()).ok()
}

fn decode_room(payload: &Value) -> Option<RoomEvent> {
    if has(payload, "sender") && has(payload, "content") {
        return parse(payload).map(RoomEvent::Chat);
    }
    None
}

fn decode_wait(payload: &Value) -> Option<RoomEvent> {
    if let Some(players) = payload.get("players").and_then(Value::as_array) {
        return Some(RoomEvent::Roster(roster_names(players)));
    }
    decode_status(payload)
}

/// Player names from either plain strings or `{name|username}` objects.
pub(crate) fn roster_names(players: &[Value]) -> Vec<String> {
    players
        .iter()
        .filter_map(|player| match player {
            Value::String(name) => Some(name.clone()),
            Value::Object(fields) => fields
                .get("name")
                .or_else(|| fields.get("username"))
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        })
        .collect()
}

fn decode_drawing(payload: &Value) -> Option<RoomEvent> {
    if payload.get("clear").and_then(Value::as_bool) == Some(true) {
        return Some(RoomEvent::ClearCanvas);
    }
    if has(payload, "lines") || has(payload, "stroke") {
        return Some(RoomEvent::Stroke(payload.clone()));
    }
    if has(payload, "guess") {
        return parse(payload).map(RoomEvent::DrawingGuess);
    }
    decode_status(payload)
}

fn decode_letter_game(payload: &Value) -> Option<RoomEvent> {
    if has(payload, "letter") || has(payload, "guess") {
        return parse(payload).map(RoomEvent::LetterGuess);
    }
    decode_status(payload)
}

fn decode_geoguesser(payload: &Value) -> Option<RoomEvent> {
    if has(payload, "lat") && has(payload, "lng") {
        return parse(payload).map(RoomEvent::MapGuess);
    }
    decode_status(payload)
}

fn decode_status(payload: &Value) -> Option<RoomEvent> {
    if has(payload, "status") {
        return parse(payload).map(RoomEvent::Status);
    }
    None
}
