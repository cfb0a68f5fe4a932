use icebreaker_realtime::{
    Action, ChannelEndpoints, ChannelOptions, Destination, Game, RealtimeChannel, RetryPolicy,
    RoomEvent, TimerCommand, Topic,
};
use std::time::Duration;

/// Host-side timer: starts a countdown, extends it, then stops it
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let transport = std::env::var("ICEBREAKER_TRANSPORT_URL")
        .unwrap_or_else(|_| "http://localhost:8080/ws".to_string());
    let broker = std::env::var("ICEBREAKER_BROKER_URL")
        .unwrap_or_else(|_| "ws://localhost:8080/ws/websocket".to_string());
    let room_code = std::env::var("ICEBREAKER_ROOM").unwrap_or_else(|_| "ABCD".to_string());

    let options = ChannelOptions::from_env()
        .with_retry(RetryPolicy::backoff())
        .with_max_attempts(10);

    let channel = RealtimeChannel::open_typed(
        ChannelEndpoints::new(transport, broker),
        Topic::game(&room_code, Game::Timer),
        |event| match event {
            RoomEvent::Timer(TimerCommand::Tick { remaining }) => println!("⏱️  {}s left", remaining),
            RoomEvent::Timer(command) => println!("⏱️  {:?}", command),
            other => println!("❓ {:?}", other),
        },
        |ready| println!("✅ Timer channel ready: {}", ready),
        options,
    );

    while !channel.is_ready().await {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let commands = [
        (Action::StartTimer, TimerCommand::Start { seconds: 60 }),
        (Action::ModifyTimer, TimerCommand::Modify { seconds: 90 }),
        (Action::StopTimer, TimerCommand::Stop),
    ];
    for (action, command) in commands {
        println!("➡️  {:?}", command);
        let destination = Destination::new(&room_code, action);
        channel.publish_to(&destination, &command.to_payload()).await;
        tokio::time::sleep(Duration::from_secs(3)).await;
    }

    channel.teardown().await;
    println!("👋 Done");

    Ok(())
}
