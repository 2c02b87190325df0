//! Condition polling
//!
//! Every wait is poll-until-predicate with a bounded timeout. Fixed sleeps
//! are not used to await UI settling.

use std::future::Future;
use std::time::Duration;

use shopcheck_common::Error;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::driver::{PageDriver, WaitState};
use crate::error::{E2eError, E2eResult};

/// Poll `check` every `interval` until it returns `true` or `timeout` passes
pub async fn poll_until<F, Fut>(what: &str, timeout: Duration, interval: Duration, mut check: F) -> E2eResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<bool>>,
{
    let start = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        if check().await? {
            if attempts > 1 {
                debug!("'{}' satisfied after {} polls", what, attempts);
            }
            return Ok(());
        }
        if start.elapsed() >= timeout {
            break;
        }
        sleep(interval).await;
    }

    Err(Error::Timeout {
        what: what.to_string(),
        after_ms: timeout.as_millis() as u64,
    }
    .into())
}

/// Wait until `selector` reaches `state`
pub async fn wait_for(
    driver: &dyn PageDriver,
    selector: &str,
    state: WaitState,
    timeout: Duration,
    interval: Duration,
) -> E2eResult<()> {
    let what = format!("{} ({:?})", selector, state);
    poll_until(&what, timeout, interval, move || async move {
        Ok(match state {
            WaitState::Visible => driver.is_visible(selector).await?,
            WaitState::Hidden => !driver.is_visible(selector).await?,
            WaitState::Attached => driver.is_present(selector).await?,
            WaitState::Detached => !driver.is_present(selector).await?,
        })
    })
    .await
}

/// Wait until any of `selectors` is visible; returns the index of the first one seen
pub async fn wait_for_any(
    driver: &dyn PageDriver,
    selectors: &[&str],
    timeout: Duration,
    interval: Duration,
) -> E2eResult<usize> {
    let start = Instant::now();
    loop {
        for (i, selector) in selectors.iter().enumerate() {
            if driver.is_visible(selector).await? {
                return Ok(i);
            }
        }
        if start.elapsed() >= timeout {
            return Err(Error::Timeout {
                what: format!("any of [{}]", selectors.join(", ")),
                after_ms: timeout.as_millis() as u64,
            }
            .into());
        }
        sleep(interval).await;
    }
}

/// Run `op`; on a timeout, back off once and run it again.
///
/// Only [`Error::Timeout`] is retried. The second timeout is surfaced.
pub async fn retry_on_timeout<T, F, Fut>(backoff: Duration, mut op: F) -> E2eResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<T>>,
{
    match op().await {
        Err(E2eError::Check(Error::Timeout { what, .. })) => {
            warn!("Timed out waiting for {}, retrying once after {:?}", what, backoff);
            sleep(backoff).await;
            op().await
        }
        other => other,
    }
}
