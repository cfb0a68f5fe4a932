use icebreaker_realtime::{
    Action, ChannelEndpoints, ChannelOptions, ChatMessage, Destination, RealtimeChannel, RoomApi,
    RoomEvent, RoomPoller, RoomStatusTracker, Topic,
};
use std::sync::Arc;
use std::time::Duration;

/// Joins a room's chat, posts one message and follows the room status
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let transport = std::env::var("ICEBREAKER_TRANSPORT_URL")
        .unwrap_or_else(|_| "http://localhost:8080/ws".to_string());
    let broker = std::env::var("ICEBREAKER_BROKER_URL")
        .unwrap_or_else(|_| "ws://localhost:8080/ws/websocket".to_string());
    let room_code = std::env::var("ICEBREAKER_ROOM").unwrap_or_else(|_| "ABCD".to_string());
    let player = std::env::var("ICEBREAKER_PLAYER").unwrap_or_else(|_| "rustacean".to_string());

    println!("📡 Joining room {} via {}\n", room_code, broker);

    let tracker = Arc::new(RoomStatusTracker::new());
    let push_tracker = Arc::clone(&tracker);

    let channel = RealtimeChannel::open_typed(
        ChannelEndpoints::new(&transport, &broker),
        Topic::room(&room_code),
        move |event| {
            if let RoomEvent::Chat(message) = &event {
                println!("💬 {}: {}", message.sender, message.content);
            }
            push_tracker.apply_push(&event);
        },
        |ready| println!("✅ Channel ready: {}", ready),
        ChannelOptions::from_env(),
    );

    let api = RoomApi::from_broker_endpoint(&broker)?;
    let _poller = RoomPoller::spawn(
        api,
        room_code.clone(),
        RoomPoller::default_interval(),
        Arc::clone(&tracker),
    );

    let mut room = tracker.subscribe();
    tokio::spawn(async move {
        while room.changed().await.is_ok() {
            let state = room.borrow_and_update().clone();
            println!(
                "🏠 Room is {} with {} player(s) ({:?})",
                state.status.as_deref().unwrap_or("unknown"),
                state.players.len(),
                state.source
            );
        }
    });

    while !channel.is_ready().await {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let hello = ChatMessage {
        sender: player,
        content: "hello from rust 🦀".to_string(),
    };
    if !channel
        .publish_to(&Destination::new(&room_code, Action::SendMessage), &hello)
        .await
    {
        println!("⚠️  Message dropped, channel not connected");
    }

    println!("⏳ Listening, press Ctrl+C to leave\n");
    tokio::signal::ctrl_c().await?;

    channel.teardown().await;
    println!("👋 Left room {}", room_code);

    Ok(())
}
