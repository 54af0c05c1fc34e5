//! Test helpers: polling and channel reads with deadlines.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, sleep, timeout};

const POLL: Duration = Duration::from_millis(10);

/// Polls `cond` until it holds, panicking once `within` has elapsed.
pub(crate) async fn eventually<F>(within: Duration, mut cond: F)
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + within;
    while !cond() {
        if Instant::now() >= deadline {
            panic!("condition not met within {within:?}");
        }
        sleep(POLL).await;
    }
}

/// Receives one message, panicking if none arrives within `within` or the channel closed.
pub(crate) async fn recv_within<T>(rx: &mut mpsc::Receiver<T>, within: Duration) -> T {
    match timeout(within, rx.recv()).await {
        Ok(Some(v)) => v,
        Ok(None) => panic!("channel closed"),
        Err(_) => panic!("nothing received within {within:?}"),
    }
}
