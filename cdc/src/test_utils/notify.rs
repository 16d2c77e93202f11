use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, timeout};

/// Default timeout for [`wait_until`].
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Polls `condition` until it holds.
///
/// # Panics
///
/// Panics if the condition does not hold within [`DEFAULT_WAIT_TIMEOUT`], so a test fails
/// instead of hanging.
pub async fn wait_until<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let result = timeout(DEFAULT_WAIT_TIMEOUT, async {
        while !condition().await {
            sleep(POLL_INTERVAL).await;
        }
    })
    .await;

    if result.is_err() {
        panic!("condition not reached within {DEFAULT_WAIT_TIMEOUT:?}");
    }
}
