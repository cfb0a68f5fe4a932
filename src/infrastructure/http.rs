use crate::infrastructure::status::RoomSnapshot;
use crate::messaging::event::{RoomStatusUpdate, roster_names};
use crate::messaging::topic::Game;
use crate::types::constants::FALLBACK_WEBSOCKET_SUFFIX;
use crate::types::{RealtimeError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

/// REST collaborator polled alongside the realtime channel.
///
/// The server's HTTP view is authoritative; the push channel only gets there
/// first.
#[derive(Clone)]
pub struct RoomApi {
    base: Url,
    http: reqwest::Client,
}

impl RoomApi {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            base,
            http: reqwest::Client::new(),
        })
    }

    /// Builds the API client from the broker endpoint's origin.
    pub fn from_broker_endpoint(ws_endpoint: &str) -> Result<Self> {
        let mut base = Url::parse(&ws_to_http_endpoint(ws_endpoint))?;
        base.set_path("/");
        Self::new(base.as_str())
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    pub async fn room_status(&self, room_code: &str) -> Result<RoomStatusUpdate> {
        self.get_json(&format!("api/rooms/{}/status", room_code))
            .await
    }

    pub async fn players(&self, room_code: &str) -> Result<Vec<String>> {
        let players: Vec<Value> = self
            .get_json(&format!("api/rooms/{}/players", room_code))
            .await?;
        Ok(roster_names(&players))
    }

    /// Per-game answer / target state
    pub async fn game_state(&self, room_code: &str, game: Game) -> Result<Value> {
        self.get_json(&format!("api/rooms/{}/{}", room_code, game))
            .await
    }

    /// Status and roster fetched together
    pub async fn snapshot(&self, room_code: &str) -> Result<RoomSnapshot> {
        let (status, players) =
            tokio::try_join!(self.room_status(room_code), self.players(room_code))?;
        Ok(RoomSnapshot { status, players })
    }

    /// POSTs a page action (join, start, kick, submit-guess, reveal-field)
    pub async fn submit<T: Serialize + ?Sized>(
        &self,
        room_code: &str,
        action: &str,
        body: &T,
    ) -> Result<Value> {
        let url = self.base.join(&format!("api/rooms/{}/{}", room_code, action))?;
        let response = self.http.post(url.clone()).json(body).send().await?;

        if !response.status().is_success() {
            return Err(RealtimeError::Connection(format!(
                "POST {} failed with status: {}",
                url,
                response.status()
            )));
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base.join(path)?;
        let response = self.http.get(url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(RealtimeError::Connection(format!(
                "GET {} failed with status: {}",
                url,
                response.status()
            )));
        }

        let body = response.text().await?;
        tracing::debug!("GET {} -> {}", url, body);
        Ok(serde_json::from_str(&body)?)
    }
}

/// Converts WebSocket endpoint to HTTP endpoint
pub fn ws_to_http_endpoint(ws_endpoint: &str) -> String {
    ws_endpoint
        .replace("ws://", "http://")
        .replace("wss://", "https://")
        .split('?')
        .next()
        .unwrap_or(ws_endpoint)
        .to_string()
}

/// Converts the fallback transport endpoint to the raw WebSocket URL it serves.
pub fn http_to_ws_endpoint(transport_endpoint: &str) -> Result<String> {
    let mut url = Url::parse(transport_endpoint)?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(RealtimeError::Connection(format!(
                "unsupported transport scheme '{}'",
                other
            )));
        }
    };
    url.set_scheme(scheme).map_err(|_| {
        RealtimeError::Connection(format!("cannot convert '{}' to {}", transport_endpoint, scheme))
    })?;

    if !url.path().ends_with(FALLBACK_WEBSOCKET_SUFFIX) {
        let path = format!(
            "{}{}",
            url.path().trim_end_matches('/'),
            FALLBACK_WEBSOCKET_SUFFIX
        );
        url.set_path(&path);
    }
    Ok(url.to_string())
}
