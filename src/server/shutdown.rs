// Shutdown draining module
// Lets in-flight connections finish before the process exits

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Wait until `conn_counter` reaches zero or `grace` elapses.
///
/// Returns the number of connections still open when waiting stopped.
pub async fn drain_connections(conn_counter: &AtomicUsize, grace: Duration) -> usize {
    let deadline = tokio::time::Instant::now() + grace;

    loop {
        let open = conn_counter.load(Ordering::SeqCst);
        if open == 0 {
            return 0;
        }

        tokio::select! {
            () = tokio::time::sleep(POLL_INTERVAL) => {}
            () = tokio::time::sleep_until(deadline) => {
                return conn_counter.load(Ordering::SeqCst);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_returns_immediately_when_idle() {
        let counter = AtomicUsize::new(0);
        assert_eq!(drain_connections(&counter, Duration::from_secs(5)).await, 0);
    }

    #[tokio::test]
    async fn test_gives_up_after_grace_period() {
        let counter = AtomicUsize::new(2);
        assert_eq!(drain_connections(&counter, Duration::from_millis(120)).await, 2);
    }

    #[tokio::test]
    async fn test_waits_for_connections_to_close() {
        let counter = Arc::new(AtomicUsize::new(1));
        let closer = Arc::clone(&counter);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(75)).await;
            closer.fetch_sub(1, Ordering::SeqCst);
        });
        assert_eq!(drain_connections(&counter, Duration::from_secs(2)).await, 0);
    }
}
