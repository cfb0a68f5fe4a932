// Module declarations
mod config;
mod core;
mod state;

// Public API exports
pub use config::{ChannelEndpoints, ChannelOptions};
pub use self::core::{RealtimeChannel, ReadyCallback};
pub use state::{ChannelState, ChannelStatus, Subscription};
