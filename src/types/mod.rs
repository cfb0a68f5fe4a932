pub mod constants;
pub mod error;
pub mod frame;

pub use constants::*;
pub use error::{RealtimeError, Result};
pub use frame::StompFrame;
