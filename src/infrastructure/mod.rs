// Infrastructure module - Background services and the HTTP polling collaborator
pub mod heartbeat;
pub mod http;
pub mod status;
pub mod task_manager;
pub mod timer;

pub use heartbeat::HeartbeatManager;
pub use http::{RoomApi, http_to_ws_endpoint, ws_to_http_endpoint};
pub use status::{RoomPoller, RoomSnapshot, RoomState, RoomStatusTracker, UpdateSource};
pub use task_manager::TaskManager;
pub use timer::{RetryPolicy, RetryTimer};
