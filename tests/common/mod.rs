//! In-process STOMP broker for driving channels over real sockets.

#![allow(dead_code)]

use futures::{SinkExt, StreamExt};
use icebreaker_realtime::{ChannelEndpoints, ChannelOptions, RetryPolicy, StompFrame};
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

pub const RETRY_DELAY: Duration = Duration::from_millis(100);
pub const WAIT: Duration = Duration::from_secs(5);

/// Short timings so scenarios finish quickly
pub fn test_options() -> ChannelOptions {
    ChannelOptions::default()
        .with_settle_delay(Duration::from_millis(20))
        .with_retry(RetryPolicy::Fixed(RETRY_DELAY))
        .with_connect_timeout(Duration::from_secs(1))
        .without_heartbeat()
}

/// Endpoints pointing at a port nobody listens on
pub fn dead_endpoints() -> ChannelEndpoints {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    ChannelEndpoints::new(
        format!("http://127.0.0.1:{}/ws", port),
        format!("ws://127.0.0.1:{}/ws/websocket", port),
    )
}

/// Polls `condition` until it holds or `WAIT` elapses
pub async fn eventually<F: Fn() -> bool>(condition: F) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

struct BrokerConnection {
    tx: mpsc::UnboundedSender<Message>,
    /// subscription id -> destination
    subscriptions: HashMap<String, String>,
}

#[derive(Default)]
struct BrokerInner {
    refusals_left: AtomicUsize,
    connect_attempts: AtomicUsize,
    next_connection: AtomicU64,
    next_message: AtomicU64,
    connections: Mutex<HashMap<u64, BrokerConnection>>,
    sent: Mutex<Vec<StompFrame>>,
    /// `heart-beat` header sent in CONNECTED; the broker never actually beats
    heartbeat: Mutex<Option<String>>,
}

pub struct FakeBroker {
    addr: SocketAddr,
    inner: Arc<BrokerInner>,
    accept_task: JoinHandle<()>,
}

impl FakeBroker {
    pub async fn start() -> Self {
        Self::refusing(0).await
    }

    /// Broker answering the first `refusals` CONNECT frames with ERROR
    pub async fn refusing(refusals: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let inner = Arc::new(BrokerInner::default());
        inner.refusals_left.store(refusals, Ordering::SeqCst);

        let accept_inner = Arc::clone(&inner);
        let accept_task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(stream, Arc::clone(&accept_inner)));
            }
        });

        Self {
            addr,
            inner,
            accept_task,
        }
    }

    /// Fallback and native endpoints that resolve to the same URL
    pub fn endpoints(&self) -> ChannelEndpoints {
        ChannelEndpoints::new(
            format!("http://{}/ws", self.addr),
            format!("ws://{}/ws/websocket", self.addr),
        )
    }

    pub fn transport_url(&self) -> String {
        format!("http://{}/ws", self.addr)
    }

    /// Advertises `value` as the broker's heart-beat while staying silent
    pub fn advertise_heartbeat(&self, value: &str) {
        *self.inner.heartbeat.lock().unwrap() = Some(value.to_string());
    }

    pub fn set_refusals(&self, refusals: usize) {
        self.inner.refusals_left.store(refusals, Ordering::SeqCst);
    }

    pub fn connect_attempts(&self) -> usize {
        self.inner.connect_attempts.load(Ordering::SeqCst)
    }

    pub fn open_connections(&self) -> usize {
        self.inner.connections.lock().unwrap().len()
    }

    pub fn subscription_count(&self, destination: &str) -> usize {
        self.inner
            .connections
            .lock()
            .unwrap()
            .values()
            .flat_map(|connection| connection.subscriptions.values())
            .filter(|subscribed| subscribed.as_str() == destination)
            .count()
    }

    pub fn sent_frames(&self) -> Vec<StompFrame> {
        self.inner.sent.lock().unwrap().clone()
    }

    pub fn broadcast(&self, destination: &str, body: &Value) {
        broadcast(&self.inner, destination, &body.to_string());
    }

    pub fn broadcast_raw(&self, destination: &str, body: &str) {
        broadcast(&self.inner, destination, body);
    }

    /// Closes every open socket, as a broker restart would
    pub fn drop_connections(&self) {
        let mut connections = self.inner.connections.lock().unwrap();
        for (_, connection) in connections.drain() {
            let _ = connection.tx.send(Message::Close(None));
        }
    }

    /// Sends an ERROR frame to every open connection
    pub fn fail_connections(&self, message: &str) {
        let frame = StompFrame::new("ERROR").with_header("message", message);
        let connections = self.inner.connections.lock().unwrap();
        for connection in connections.values() {
            let _ = connection.tx.send(Message::Text(frame.encode().into()));
        }
    }
}

impl Drop for FakeBroker {
    fn drop(&mut self) {
        self.accept_task.abort();
        self.drop_connections();
    }
}

fn broadcast(inner: &BrokerInner, destination: &str, body: &str) {
    let connections = inner.connections.lock().unwrap();
    for connection in connections.values() {
        for (id, subscribed) in &connection.subscriptions {
            if subscribed != destination {
                continue;
            }
            let message_id = inner.next_message.fetch_add(1, Ordering::SeqCst);
            let frame = StompFrame::new("MESSAGE")
                .with_header("destination", destination)
                .with_header("subscription", id.as_str())
                .with_header("message-id", message_id.to_string())
                .with_header("content-type", "application/json")
                .with_body(body);
            let _ = connection.tx.send(Message::Text(frame.encode().into()));
        }
    }
}

async fn serve(stream: TcpStream, inner: Arc<BrokerInner>) {
    let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };
    let (mut sink, mut source) = ws.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let closing = matches!(message, Message::Close(_));
            if sink.send(message).await.is_err() || closing {
                break;
            }
        }
    });

    let id = inner.next_connection.fetch_add(1, Ordering::SeqCst);

    while let Some(Ok(message)) = source.next().await {
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        let Ok(Some(frame)) = StompFrame::decode(text.as_str()) else {
            continue;
        };

        match frame.command.as_str() {
            "CONNECT" => {
                inner.connect_attempts.fetch_add(1, Ordering::SeqCst);
                let refused = inner
                    .refusals_left
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                    .is_ok();
                if refused {
                    let error = StompFrame::new("ERROR")
                        .with_header("message", "connection refused");
                    let _ = tx.send(Message::Text(error.encode().into()));
                    let _ = tx.send(Message::Close(None));
                    return;
                }
                inner.connections.lock().unwrap().insert(
                    id,
                    BrokerConnection {
                        tx: tx.clone(),
                        subscriptions: HashMap::new(),
                    },
                );
                let heartbeat = inner
                    .heartbeat
                    .lock()
                    .unwrap()
                    .clone()
                    .unwrap_or_else(|| "0,0".to_string());
                let connected = StompFrame::new("CONNECTED")
                    .with_header("version", "1.2")
                    .with_header("heart-beat", heartbeat);
                let _ = tx.send(Message::Text(connected.encode().into()));
            }
            "SUBSCRIBE" => {
                if let (Some(sub_id), Some(destination)) =
                    (frame.header("id"), frame.header("destination"))
                    && let Some(connection) = inner.connections.lock().unwrap().get_mut(&id)
                {
                    connection
                        .subscriptions
                        .insert(sub_id.to_string(), destination.to_string());
                }
            }
            "UNSUBSCRIBE" => {
                if let Some(sub_id) = frame.header("id")
                    && let Some(connection) = inner.connections.lock().unwrap().get_mut(&id)
                {
                    connection.subscriptions.remove(sub_id);
                }
            }
            "SEND" => {
                inner.sent.lock().unwrap().push(frame.clone());
                if let Some(destination) = frame.header("destination")
                    && let Some(action) = destination.strip_prefix("/app/")
                {
                    broadcast(&inner, &format!("/topic/{}", action), &frame.body);
                }
            }
            "DISCONNECT" => break,
            _ => {}
        }
    }

    inner.connections.lock().unwrap().remove(&id);
}
