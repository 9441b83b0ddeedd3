// Server loop module
// Accepts connections until a shutdown signal arrives

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use super::shutdown::drain_connections;
use super::signal::SignalHandler;
use crate::config::AppState;
use crate::logger;

/// Accept loop of the prediction server.
///
/// Must run inside a `LocalSet`: connections are served with `spawn_local`.
/// Returns after shutdown was requested and in-flight connections finished
/// or the configured grace period elapsed.
pub async fn run_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    signals: Arc<SignalHandler>,
) -> Result<(), Box<dyn std::error::Error>> {
    let active_connections = Arc::new(AtomicUsize::new(0));

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = signals.shutdown.notified() => {
                break;
            }
        }
    }

    // Stop accepting before waiting on in-flight requests
    drop(listener);

    let grace = Duration::from_secs(state.config.performance.shutdown_timeout);
    logger::log_info(&format!(
        "Waiting up to {}s for {} connection(s) to finish",
        grace.as_secs(),
        active_connections.load(Ordering::SeqCst)
    ));
    let remaining = drain_connections(&active_connections, grace).await;
    logger::log_shutdown_complete(remaining);

    Ok(())
}
