// Module declarations
pub(crate) mod connection;
mod session;

// Public API exports
pub use connection::{ConnectionManager, ConnectionState};
pub use session::StompSession;
