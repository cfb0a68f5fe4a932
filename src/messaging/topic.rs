use crate::types::constants::{APP_PREFIX, TOPIC_PREFIX};

/// Mini-games that broadcast on their own topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Game {
    Wordle,
    Hangman,
    Geoguesser,
    Drawing,
    Timer,
}

impl Game {
    pub const ALL: [Game; 5] = [
        Self::Wordle,
        Self::Hangman,
        Self::Geoguesser,
        Self::Drawing,
        Self::Timer,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "wordle" => Some(Self::Wordle),
            "hangman" => Some(Self::Hangman),
            "geoguesser" => Some(Self::Geoguesser),
            "drawing" => Some(Self::Drawing),
            "timer" => Some(Self::Timer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wordle => "wordle",
            Self::Hangman => "hangman",
            Self::Geoguesser => "geoguesser",
            Self::Drawing => "drawing",
            Self::Timer => "timer",
        }
    }
}

impl std::fmt::Display for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which broadcast group of a room a topic addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicKind {
    /// `/topic/room/{code}`, the legacy chat path
    Room,
    /// `/topic/room/{code}/wait`
    Wait,
    /// `/topic/room/{code}/{game}`
    Game(Game),
}

/// A subscribable room topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic {
    room_code: String,
    kind: TopicKind,
}

impl Topic {
    pub fn room(room_code: impl Into<String>) -> Self {
        Self {
            room_code: room_code.into(),
            kind: TopicKind::Room,
        }
    }

    pub fn wait(room_code: impl Into<String>) -> Self {
        Self {
            room_code: room_code.into(),
            kind: TopicKind::Wait,
        }
    }

    pub fn game(room_code: impl Into<String>, game: Game) -> Self {
        Self {
            room_code: room_code.into(),
            kind: TopicKind::Game(game),
        }
    }

    /// Recovers a topic from its path. Paths outside `/topic/room/...` give `None`.
    pub fn parse(path: &str) -> Option<Self> {
        let rest = path.strip_prefix(TOPIC_PREFIX)?.strip_prefix('/')?;
        let mut segments = rest.split('/');
        let room_code = segments.next().filter(|code| !code.is_empty())?;
        let kind = match segments.next() {
            None => TopicKind::Room,
            Some("wait") => TopicKind::Wait,
            Some(game) => TopicKind::Game(Game::parse(game)?),
        };
        if segments.next().is_some() {
            return None;
        }
        Some(Self {
            room_code: room_code.to_string(),
            kind,
        })
    }

    pub fn room_code(&self) -> &str {
        &self.room_code
    }

    pub fn kind(&self) -> TopicKind {
        self.kind
    }

    pub fn path(&self) -> String {
        match self.kind {
            TopicKind::Room => format!("{}/{}", TOPIC_PREFIX, self.room_code),
            TopicKind::Wait => format!("{}/{}/wait", TOPIC_PREFIX, self.room_code),
            TopicKind::Game(game) => format!("{}/{}/{}", TOPIC_PREFIX, self.room_code, game),
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// Server-side handlers reachable by SEND
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    SendMessage,
    SendDrawing,
    SendGuessing,
    StartTimer,
    ModifyTimer,
    StopTimer,
    Hangman,
    Wordle,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SendMessage => "sendMessage",
            Self::SendDrawing => "sendDrawing",
            Self::SendGuessing => "sendGuessing",
            Self::StartTimer => "startTimer",
            Self::ModifyTimer => "modifyTimer",
            Self::StopTimer => "stopTimer",
            Self::Hangman => "hangman",
            Self::Wordle => "wordle",
        }
    }
}

/// Publish address: `/app/room/{code}/{action}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination {
    room_code: String,
    action: Action,
}

impl Destination {
    pub fn new(room_code: impl Into<String>, action: Action) -> Self {
        Self {
            room_code: room_code.into(),
            action,
        }
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn path(&self) -> String {
        format!("{}/{}/{}", APP_PREFIX, self.room_code, self.action.as_str())
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}
