use super::constants::{
    JSON_CONTENT_TYPE, STOMP_VERSIONS, stomp_commands, stomp_headers,
};
use super::error::{RealtimeError, Result};

/// One STOMP 1.2 frame as carried in a WebSocket text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StompFrame {
    pub command: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl StompFrame {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// `heart_beat` is `(outgoing, incoming)` in milliseconds, 0 meaning "none".
    pub fn connect(host: &str, heart_beat: (u64, u64)) -> Self {
        Self::new(stomp_commands::CONNECT)
            .with_header(stomp_headers::ACCEPT_VERSION, STOMP_VERSIONS)
            .with_header(stomp_headers::HOST, host)
            .with_header(
                stomp_headers::HEART_BEAT,
                format!("{},{}", heart_beat.0, heart_beat.1),
            )
    }

    pub fn subscribe(id: &str, destination: &str) -> Self {
        Self::new(stomp_commands::SUBSCRIBE)
            .with_header(stomp_headers::ID, id)
            .with_header(stomp_headers::DESTINATION, destination)
    }

    pub fn unsubscribe(id: &str) -> Self {
        Self::new(stomp_commands::UNSUBSCRIBE).with_header(stomp_headers::ID, id)
    }

    pub fn send(destination: &str, json_body: String) -> Self {
        Self::new(stomp_commands::SEND)
            .with_header(stomp_headers::DESTINATION, destination)
            .with_header(stomp_headers::CONTENT_TYPE, JSON_CONTENT_TYPE)
            .with_header(stomp_headers::CONTENT_LENGTH, json_body.len().to_string())
            .with_body(json_body)
    }

    pub fn disconnect() -> Self {
        Self::new(stomp_commands::DISCONNECT)
    }

    /// Looks up a header. Repeated headers resolve to the first occurrence.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is(&self, command: &str) -> bool {
        self.command == command
    }

    /// Serializes the frame, NUL terminator included.
    pub fn encode(&self) -> String {
        let escape = escapes_headers(&self.command);
        let mut out = String::with_capacity(self.command.len() + self.body.len() + 64);
        out.push_str(&self.command);
        out.push('\n');
        for (name, value) in &self.headers {
            if escape {
                push_escaped(&mut out, name);
                out.push(':');
                push_escaped(&mut out, value);
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Parses one WebSocket text message.
    ///
    /// Returns `Ok(None)` for heart-beats (messages made only of EOLs).
    pub fn decode(text: &str) -> Result<Option<Self>> {
        let text = text.trim_start_matches(['\r', '\n']);
        if text.is_empty() {
            return Ok(None);
        }

        let (head, rest) = split_head(text)
            .ok_or_else(|| RealtimeError::Protocol("missing end of headers".to_string()))?;

        let mut lines = head.lines().map(|line| line.trim_end_matches('\r'));
        let command = lines
            .next()
            .filter(|command| !command.is_empty())
            .ok_or_else(|| RealtimeError::Protocol("missing command".to_string()))?
            .to_string();

        let escape = escapes_headers(&command);
        let mut headers = Vec::new();
        for line in lines {
            let (name, value) = line.split_once(':').ok_or_else(|| {
                RealtimeError::Protocol(format!("malformed header line '{}'", line))
            })?;
            if escape {
                headers.push((unescape(name)?, unescape(value)?));
            } else {
                headers.push((name.to_string(), value.to_string()));
            }
        }

        let content_length = headers
            .iter()
            .find(|(name, _)| name == stomp_headers::CONTENT_LENGTH)
            .map(|(_, value)| {
                value.trim().parse::<usize>().map_err(|_| {
                    RealtimeError::Protocol(format!("invalid content-length '{}'", value))
                })
            })
            .transpose()?;

        let body = match content_length {
            Some(len) => rest
                .get(..len)
                .filter(|_| rest.as_bytes().get(len) == Some(&0))
                .ok_or_else(|| {
                    RealtimeError::Protocol(format!("body shorter than content-length {}", len))
                })?,
            None => {
                let end = rest
                    .find('\0')
                    .ok_or_else(|| RealtimeError::Protocol("missing NUL terminator".to_string()))?;
                &rest[..end]
            }
        };

        Ok(Some(Self {
            command,
            headers,
            body: body.to_string(),
        }))
    }
}

/// CONNECT and CONNECTED frames carry raw header values.
fn escapes_headers(command: &str) -> bool {
    command != stomp_commands::CONNECT && command != stomp_commands::CONNECTED
}

fn split_head(text: &str) -> Option<(&str, &str)> {
    let lf = text.find("\n\n").map(|idx| (idx, 2));
    let crlf = text.find("\r\n\r\n").map(|idx| (idx, 4));
    let (idx, len) = match (lf, crlf) {
        (Some(a), Some(b)) => {
            if a.0 <= b.0 {
                a
            } else {
                b
            }
        }
        (a, b) => a.or(b)?,
    };
    Some((&text[..idx], &text[idx + len..]))
}

fn push_escaped(out: &mut String, raw: &str) {
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
}

fn unescape(raw: &str) -> Result<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            other => {
                return Err(RealtimeError::Protocol(format!(
                    "invalid header escape '\\{}'",
                    other.map(String::from).unwrap_or_default()
                )));
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_subscribe() {
        let frame = StompFrame::subscribe("sub-0", "/topic/room/ABC/wordle");
        assert_eq!(
            frame.encode(),
            "SUBSCRIBE\nid:sub-0\ndestination:/topic/room/ABC/wordle\n\n\0"
        );
    }

    #[test]
    fn test_encode_send_sets_length_and_type() {
        let frame = StompFrame::send("/app/room/ABC/wordle", r#"{"letter":"a"}"#.to_string());
        assert_eq!(frame.header("content-type"), Some("application/json"));
        assert_eq!(frame.header("content-length"), Some("14"));
        assert!(frame.encode().ends_with("\n\n{\"letter\":\"a\"}\0"));
    }

    #[test]
    fn test_decode_message_frame() {
        let raw = "MESSAGE\ndestination:/topic/room/ABC/timer\nsubscription:sub-0\nmessage-id:7\n\n{\"remaining\":30}\0";
        let frame = StompFrame::decode(raw).unwrap().unwrap();
        assert!(frame.is("MESSAGE"));
        assert_eq!(frame.header("subscription"), Some("sub-0"));
        assert_eq!(frame.body, r#"{"remaining":30}"#);
    }

    #[test]
    fn test_decode_heartbeat() {
        assert_eq!(StompFrame::decode("\n").unwrap(), None);
        assert_eq!(StompFrame::decode("\r\n").unwrap(), None);
    }

    #[test]
    fn test_decode_crlf_and_leading_heartbeat() {
        let raw = "\nCONNECTED\r\nversion:1.2\r\nheart-beat:0,0\r\n\r\n\0";
        let frame = StompFrame::decode(raw).unwrap().unwrap();
        assert!(frame.is("CONNECTED"));
        assert_eq!(frame.header("version"), Some("1.2"));
        assert_eq!(frame.header("heart-beat"), Some("0,0"));
    }

    #[test]
    fn test_content_length_allows_nul_in_body() {
        let raw = "MESSAGE\ncontent-length:3\n\na\0b\0";
        let frame = StompFrame::decode(raw).unwrap().unwrap();
        assert_eq!(frame.body, "a\0b");
    }

    #[test]
    fn test_header_escaping() {
        let frame = StompFrame::new("MESSAGE").with_header("note", "a:b\nc");
        let encoded = frame.encode();
        assert!(encoded.contains("note:a\\cb\\nc\n"));
        let decoded = StompFrame::decode(&encoded).unwrap().unwrap();
        assert_eq!(decoded.header("note"), Some("a:b\nc"));
    }

    #[test]
    fn test_connect_headers_are_not_escaped() {
        let frame = StompFrame::connect("localhost:8080", (10000, 10000));
        let encoded = frame.encode();
        assert!(encoded.contains("host:localhost:8080\n"));
        assert!(encoded.contains("heart-beat:10000,10000\n"));
    }

    #[test]
    fn test_repeated_header_first_wins() {
        let raw = "MESSAGE\nfoo:1\nfoo:2\n\n\0";
        let frame = StompFrame::decode(raw).unwrap().unwrap();
        assert_eq!(frame.header("foo"), Some("1"));
    }

    #[test]
    fn test_malformed_frames() {
        assert!(matches!(
            StompFrame::decode("MESSAGE\nno-terminator"),
            Err(RealtimeError::Protocol(_))
        ));
        assert!(matches!(
            StompFrame::decode("MESSAGE\nbadheader\n\n\0"),
            Err(RealtimeError::Protocol(_))
        ));
        assert!(matches!(
            StompFrame::decode("MESSAGE\n\nbody without nul"),
            Err(RealtimeError::Protocol(_))
        ));
        assert!(matches!(
            StompFrame::decode("MESSAGE\ncontent-length:10\n\nshort\0"),
            Err(RealtimeError::Protocol(_))
        ));
        assert!(matches!(
            StompFrame::decode("MESSAGE\nbad:\\x\n\n\0"),
            Err(RealtimeError::Protocol(_))
        ));
    }
}
