//! Base URL reachability check, run before any browser launches

use gridwatch_common::{poll_until, PollOptions};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

/// Per-request timeout for reachability probes
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Poll `url` until it answers with a success status
pub async fn wait_for_reachable(url: &str, options: PollOptions) -> E2eResult<Duration> {
    let client = reqwest::Client::builder().timeout(PROBE_TIMEOUT).build()?;

    let result = poll_until(
        || {
            let client = client.clone();
            let url = url.to_string();
            async move {
                let resp = client.get(&url).send().await?;
                if !resp.status().is_success() {
                    warn!("Preflight {} returned {}", url, resp.status());
                }
                Ok::<_, reqwest::Error>(resp.status().is_success())
            }
        },
        options,
    )
    .await;

    if result.satisfied {
        info!("{} reachable after {} attempt(s)", url, result.attempts);
        return Ok(result.elapsed);
    }

    if let Some(e) = &result.last_error {
        warn!("Last preflight error: {}", e);
    }
    Err(E2eError::Unreachable {
        url: url.to_string(),
        attempts: result.attempts,
    })
}
