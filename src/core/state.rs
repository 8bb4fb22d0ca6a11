//! Process state for serve mode.
//!
//! - `SHUTDOWN`: Has shutdown been requested? (Ctrl+C received)

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tiny_http::Server;

/// Shutdown has been requested (Ctrl+C received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// HTTP server reference for graceful shutdown
static SERVER: OnceLock<Arc<Server>> = OnceLock::new();

// =============================================================================
// SHUTDOWN state
// =============================================================================

/// Setup the global Ctrl+C handler. Call once at program start
///
/// The handler behavior depends on whether a server has been registered:
/// - Before `register_server()`: Sets SHUTDOWN flag and exits
/// - After `register_server()`: Graceful shutdown (unblock server, in-flight
///   transcodes observe the flag through their `CancelToken`)
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        SHUTDOWN.store(true, Ordering::SeqCst);

        if let Some(server) = SERVER.get() {
            crate::log!("serve"; "shutting down...");
            server.unblock();
        } else {
            // Nothing to drain yet
            std::process::exit(0);
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Register the HTTP server for graceful shutdown
///
/// Call this after binding the server, before entering the request loop
pub fn register_server(server: Arc<Server>) {
    let _ = SERVER.set(server);
}

/// Check if shutdown has been requested
///
/// Uses Relaxed ordering; worst case a request does one more step before
/// noticing.
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}
