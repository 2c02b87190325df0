//! Preflight check of the storefront before any scenario runs

use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

/// Poll `base_url` until it answers with a non-server-error status.
///
/// Client errors count as reachable: the site answered, the harness will
/// find out soon enough whether the pages it needs are there.
pub async fn wait_for_reachable(base_url: &str, within: Duration, interval: Duration) -> E2eResult<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .user_agent(concat!("shopcheck/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let start = Instant::now();
    let mut attempts = 0;

    loop {
        attempts += 1;

        match client.get(base_url).send().await {
            Ok(resp) if !resp.status().is_server_error() => {
                info!("{} reachable ({})", base_url, resp.status());
                return Ok(());
            }
            Ok(resp) => {
                warn!("Preflight returned {}", resp.status());
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for {} ...", base_url);
                }
                if !e.is_connect() && !e.is_timeout() {
                    warn!("Preflight error: {}", e);
                }
            }
        }

        if start.elapsed() + interval >= within {
            return Err(E2eError::SiteUnreachable(attempts));
        }
        sleep(interval).await;
    }
}
