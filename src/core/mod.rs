//! Process-wide state and request cancellation.

mod cancel;
mod state;

pub use cancel::{CancelToken, Cancelled};
pub use state::{is_shutdown, register_server, setup_shutdown_handler};
